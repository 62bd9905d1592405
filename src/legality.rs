//! Legality checking.
//!
//! Four independent checks guard a rename: the new name must parse as the
//! right syntactic category, every moved definition must live inside the
//! workspace, no scope may end up declaring the name twice, and no use may
//! silently change what it resolves to. The checks never abort early;
//! their reasons are unioned so the user sees every blocker at once.

use crate::cursor::{Cursor, CursorKind};
use crate::errors::{Capture, IllegalRenameReason};
use crate::idents::{self, NameCategory, unescape};
use crate::locator;
use crate::model::{Define, IdRole};
use crate::resolver::Resolution;
use crate::span::Loc;
use crate::syntax::SyntaxKind;
use crate::workspace::WorkspaceInfo;
use std::collections::BTreeSet;

/// Run all four checks and union their reasons.
pub fn check(
    ws: &WorkspaceInfo,
    cursor: &Cursor,
    resolution: &Resolution,
    new_name: &str,
) -> BTreeSet<IllegalRenameReason> {
    let mut reasons = BTreeSet::new();

    if let Some(reason) = check_name_syntax(ws, resolution, new_name) {
        reasons.insert(reason);
    }
    if let Some(reason) = check_outside_workspace(ws, resolution) {
        reasons.insert(reason);
    }
    reasons.extend(check_double_declarations(ws, cursor, resolution, new_name));
    if let Some(reason) = check_captures(ws, resolution, new_name) {
        reasons.insert(reason);
    }

    reasons
}

// ---------------------------------------------------------------------------
// 1. Name syntax
// ---------------------------------------------------------------------------

/// The syntactic category the new name must parse as, from the roles of
/// the definitions being moved.
fn required_category(ws: &WorkspaceInfo, resolution: &Resolution) -> NameCategory {
    for def_loc in &resolution.defs {
        match ws.define_at(def_loc).map(|d| d.role) {
            Some(IdRole::Nonterminal) => return NameCategory::Nonterminal,
            Some(IdRole::NonterminalLabel) => return NameCategory::NonterminalLabel,
            _ => {}
        }
    }
    NameCategory::Identifier
}

fn check_name_syntax(
    ws: &WorkspaceInfo,
    resolution: &Resolution,
    new_name: &str,
) -> Option<IllegalRenameReason> {
    let category = required_category(ws, resolution);
    let candidate = idents::escape(new_name);
    if idents::is_legal_name(&candidate, category) {
        None
    } else {
        Some(IllegalRenameReason::InvalidName {
            name: new_name.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// 2. Definitions outside the workspace
// ---------------------------------------------------------------------------

fn check_outside_workspace(
    ws: &WorkspaceInfo,
    resolution: &Resolution,
) -> Option<IllegalRenameReason> {
    let mut outside: Vec<Loc> = resolution
        .defs
        .iter()
        .filter(|d| !ws.is_source_file(&d.file))
        .cloned()
        .collect();
    if outside.is_empty() {
        return None;
    }
    outside.sort();
    Some(IllegalRenameReason::DefinitionsOutsideWorkspace { defs: outside })
}

// ---------------------------------------------------------------------------
// 3. Double declaration
// ---------------------------------------------------------------------------

fn check_double_declarations(
    ws: &WorkspaceInfo,
    cursor: &Cursor,
    resolution: &Resolution,
    new_name: &str,
) -> BTreeSet<IllegalRenameReason> {
    let mut reasons = BTreeSet::new();
    let new_bare = unescape(new_name);

    for def_loc in &resolution.defs {
        let Some(current) = ws.define_at(def_loc) else {
            continue;
        };
        let mut conflicts: Vec<Loc> = Vec::new();
        for existing in ws.defines_named(new_bare) {
            if existing.defined_at == current.defined_at {
                continue;
            }
            if declares_twice(ws, current, existing) {
                conflicts.push(existing.defined_at.clone());
            }
        }
        if !conflicts.is_empty() {
            conflicts.sort();
            conflicts.dedup();
            reasons.insert(IllegalRenameReason::DoubleDeclaration {
                current: current.defined_at.clone(),
                conflicts,
            });
        }
    }

    if cursor.kind == CursorKind::ModuleName
        && let Some(reason) = module_path_collision(ws, resolution, new_bare)
    {
        reasons.insert(reason);
    }

    reasons
}

/// Whether renaming `current` to `existing`'s name declares that name
/// twice in one scope.
fn declares_twice(ws: &WorkspaceInfo, current: &Define, existing: &Define) -> bool {
    // Field declarations clash when they share their container, whatever
    // their individual scopes are.
    if current.role == IdRole::ConstructorField && existing.role == IdRole::ConstructorField {
        return shared_data_declaration(ws, current, existing);
    }

    // Type parameters of one signature would alias each other.
    if current.role == IdRole::TypeParameter && existing.role == IdRole::TypeParameter {
        return current.scope == existing.scope;
    }

    if !existing.scope.encloses(&current.defined_at) {
        return false;
    }

    let same_group = current.role.overload_group() == existing.role.overload_group();
    let overloadable = same_group && current.role.may_overload() && existing.role.may_overload();
    !overloadable
}

fn shared_data_declaration(ws: &WorkspaceInfo, a: &Define, b: &Define) -> bool {
    let Some(tree) = ws.tree(&a.scope.file) else {
        return false;
    };
    let Some(region_a) = locator::data_declaration_region(tree, &a.scope) else {
        return false;
    };
    region_a.encloses(&b.scope)
}

/// Open-question policy: renaming a module onto an existing module path is
/// a double declaration.
fn module_path_collision(
    ws: &WorkspaceInfo,
    resolution: &Resolution,
    new_bare: &str,
) -> Option<IllegalRenameReason> {
    for def_loc in &resolution.defs {
        let Some(current_name) = ws.module_name_of(&def_loc.file) else {
            continue;
        };
        let target = match current_name.rsplit_once("::") {
            Some((prefix, _)) => format!("{prefix}::{new_bare}"),
            None => new_bare.to_string(),
        };
        if let Some(existing) = ws.module_loc(&target)
            && existing != def_loc
        {
            return Some(IllegalRenameReason::DoubleDeclaration {
                current: def_loc.clone(),
                conflicts: vec![existing.clone()],
            });
        }
    }
    None
}

// ---------------------------------------------------------------------------
// 4. Capture and shadowing
// ---------------------------------------------------------------------------

fn check_captures(
    ws: &WorkspaceInfo,
    resolution: &Resolution,
    new_name: &str,
) -> Option<IllegalRenameReason> {
    let new_bare = unescape(new_name);
    let mut captures: BTreeSet<Capture> = BTreeSet::new();

    let current_defines: Vec<&Define> = resolution
        .defs
        .iter()
        .filter_map(|loc| ws.define_at(loc))
        .collect();
    let new_name_defines: Vec<&Define> = ws.defines_named(new_bare).collect();
    let new_name_uses: Vec<Loc> = ws
        .use_def()
        .map(|(use_loc, _)| use_loc.clone())
        .filter(|u| ws.text_at(u).is_some_and(|t| unescape(t) == new_bare))
        .collect();

    // An implicit definition of the new name inside the scope of a current
    // definition turns into a use of it after the rename.
    for implicit in new_name_defines.iter().filter(|d| is_implicit(ws, d)) {
        for current in &current_defines {
            if current.scope.encloses(&implicit.defined_at) {
                captures.insert(Capture {
                    def: current.defined_at.clone(),
                    use_site: implicit.defined_at.clone(),
                });
            }
        }
    }

    // A current use sitting under the scope of an existing definition of
    // the new name gets shadowed by it.
    for use_loc in &resolution.uses {
        let current_scope = ws
            .get_defs(use_loc)
            .into_iter()
            .filter_map(|d| ws.define_at(&d).map(|def| def.scope.clone()))
            .next();
        let Some(current_scope) = current_scope else {
            continue;
        };
        for new_def in &new_name_defines {
            if new_def.scope.encloses(use_loc)
                && current_scope.strictly_encloses(&new_def.scope)
            {
                captures.insert(Capture {
                    def: new_def.defined_at.clone(),
                    use_site: use_loc.clone(),
                });
            }
        }
    }

    // An existing use of the new name inside a current definition's scope
    // starts resolving to the renamed definition.
    for new_use in &new_name_uses {
        let targets = ws.get_defs(new_use);
        for current in &current_defines {
            if !current.scope.encloses(new_use) {
                continue;
            }
            let shadowed = targets.iter().any(|t| {
                ws.define_at(t).is_some_and(|target| {
                    target.defined_at != current.defined_at
                        && target.scope.encloses(&current.scope)
                })
            });
            if shadowed {
                captures.insert(Capture {
                    def: current.defined_at.clone(),
                    use_site: new_use.clone(),
                });
            }
        }
    }

    if captures.is_empty() {
        None
    } else {
        Some(IllegalRenameReason::CaptureChange {
            captures: captures.into_iter().collect(),
        })
    }
}

/// Implicit definitions: variable defines whose occurrence is also a use,
/// plus pattern variables bound in qualified-name, multi-variable or
/// becomes-pattern positions.
fn is_implicit(ws: &WorkspaceInfo, define: &Define) -> bool {
    match define.role {
        IdRole::Variable => ws.is_use(&define.defined_at),
        IdRole::PatternVariable => {
            let Some(tree) = ws.tree(&define.defined_at.file) else {
                return false;
            };
            let Some(node) = tree.smallest_enclosing(define.defined_at.span, |_, n| {
                n.span == define.defined_at.span
            }) else {
                return false;
            };
            tree.enclosed_by(node, SyntaxKind::QualifiedNamePattern)
                || tree.enclosed_by(node, SyntaxKind::MultiVariablePattern)
                || tree.enclosed_by(node, SyntaxKind::BecomesPattern)
        }
        _ => false,
    }
}
