//! Overload expansion and workspace reachability.
//!
//! A rename must move as a unit every definition that is potentially
//! overloaded with the cursor's definition: same simple name, compatible
//! role group, and mutually reachable from a common use site through the
//! import and scope graph. The closure is computed with a worklist over the
//! use/def relation; it converges because the scope graph is finite and
//! acyclic.

use crate::cursor::{Cursor, CursorKind};
use crate::errors::RenameError;
use crate::idents::{escape, unescape};
use crate::locator;
use crate::model::{Define, IdRole, OverloadGroup, TypeExpr};
use crate::span::Loc;
use crate::syntax::SyntaxKind;
use crate::workspace::WorkspaceInfo;
use rustc_hash::FxHashSet;
use std::path::Path;

/// The full def/use closure of a rename, plus the file renames a module
/// rename implies.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub defs: FxHashSet<Loc>,
    pub uses: Vec<Loc>,
    /// `(old path, new path)` pairs; only non-empty for module renames.
    pub file_renames: Vec<(String, String)>,
}

/// The definitions the cursor directly designates, before overload
/// expansion. Used by the driver to decide whether a full workspace load
/// is needed at all.
pub fn initial_defs(ws: &WorkspaceInfo, cursor: &Cursor) -> Result<FxHashSet<Loc>, RenameError> {
    let mut defs: FxHashSet<Loc> = FxHashSet::default();

    match &cursor.kind {
        CursorKind::Use => {
            defs.extend(ws.get_defs(&cursor.loc));
        }
        CursorKind::Def => {
            defs.insert(cursor.loc.clone());
        }
        CursorKind::TypeParameter => {
            for define in ws.defines_named(&cursor.name) {
                if define.role == IdRole::TypeParameter
                    && (define.scope.encloses(&cursor.loc) || define.defined_at == cursor.loc)
                {
                    defs.insert(define.defined_at.clone());
                }
            }
            if defs.is_empty() {
                return Err(RenameError::unsupported(
                    cursor.loc.clone(),
                    "cannot find the type parameter's definition",
                ));
            }
        }
        CursorKind::ModuleName => {
            for target in ws.get_defs(&cursor.loc) {
                if let Some(define) = ws.define_at(&target)
                    && define.role == IdRole::ModuleName
                {
                    defs.insert(define.defined_at.clone());
                }
            }
            if defs.is_empty() {
                for define in ws.defines_named(&cursor.name) {
                    if define.role == IdRole::ModuleName {
                        defs.insert(define.defined_at.clone());
                    }
                }
            }
            if defs.is_empty() {
                return Err(RenameError::unsupported(
                    cursor.loc.clone(),
                    "cannot find the module's definition",
                ));
            }
        }
        CursorKind::DataField { adt, .. }
        | CursorKind::DataKeywordField { adt, .. }
        | CursorKind::DataCommonKeywordField { adt, .. } => {
            defs.extend(adt_field_defs(ws, adt, &cursor.name));
            if defs.is_empty() {
                return Err(RenameError::unsupported(
                    cursor.loc.clone(),
                    "cannot find the field's definition",
                ));
            }
        }
        // Collection fields are structural labels; they have no defines.
        CursorKind::CollectionField { .. } => {}
        CursorKind::ExceptConstructor => {
            for define in ws.reachable_defs(std::slice::from_ref(&cursor.loc)) {
                if define.role == IdRole::Constructor && unescape(&define.name) == cursor.name {
                    defs.insert(define.defined_at.clone());
                }
            }
            if defs.is_empty() {
                return Err(RenameError::unsupported(
                    cursor.loc.clone(),
                    "cannot find the excluded constructor's definition",
                ));
            }
        }
    }

    Ok(defs)
}

/// Expand the initial definitions to the full overload closure and invert
/// the use/def relation over the result.
pub fn resolve(
    ws: &WorkspaceInfo,
    cursor: &Cursor,
    new_name: &str,
) -> Result<Resolution, RenameError> {
    if let CursorKind::CollectionField { container } = &cursor.kind {
        return Ok(Resolution {
            defs: FxHashSet::default(),
            uses: collection_field_occurrences(ws, container, &cursor.name),
            file_renames: Vec::new(),
        });
    }

    let mut defs = initial_defs(ws, cursor)?;
    let group = overload_group_of(ws, &defs);

    // Worklist: any define of the same name and group reachable from a use
    // of the current closure joins the closure.
    if group != OverloadGroup::None {
        loop {
            let uses = ws.uses_of(&defs);
            let mut grew = false;
            for use_loc in &uses {
                for define in ws.reachable_defs(std::slice::from_ref(use_loc)) {
                    if unescape(&define.name) != cursor.name {
                        continue;
                    }
                    if define.role.overload_group() != group {
                        continue;
                    }
                    if !same_field_container(ws, cursor, define) {
                        continue;
                    }
                    if defs.insert(define.defined_at.clone()) {
                        grew = true;
                    }
                }
            }
            if !grew {
                break;
            }
        }
    }

    let mut uses = ws.uses_of(&defs);
    uses.sort();
    uses.dedup();

    let file_renames = if cursor.kind == CursorKind::ModuleName {
        module_file_renames(ws, &defs, new_name)
    } else {
        Vec::new()
    };

    Ok(Resolution {
        defs,
        uses,
        file_renames,
    })
}

/// Whether the whole rename stays inside function bodies, making the full
/// workspace load unnecessary. Module and collection-field renames never
/// qualify.
pub fn is_function_local(ws: &WorkspaceInfo, cursor: &Cursor, defs: &FxHashSet<Loc>) -> bool {
    if !cursor.kind.may_be_function_local() {
        return false;
    }
    if defs.is_empty() {
        return false;
    }
    defs.iter().all(|d| {
        ws.defines().any(|g| {
            g.defined_at != *d
                && g.tipe.is_function()
                && function_region(ws, g).is_some_and(|region| region.strictly_encloses(d))
        })
    })
}

/// The declaration region of a function-typed define, from its syntax tree.
fn function_region(ws: &WorkspaceInfo, define: &Define) -> Option<Loc> {
    let tree = ws.tree(&define.defined_at.file)?;
    let node = tree.smallest_enclosing(define.defined_at.span, |_, n| {
        n.kind == SyntaxKind::FunctionDeclaration
    })?;
    Some(Loc::new(tree.file(), tree.get(node)?.span))
}

fn overload_group_of(ws: &WorkspaceInfo, defs: &FxHashSet<Loc>) -> OverloadGroup {
    defs.iter()
        .filter_map(|loc| ws.define_at(loc))
        .map(|d| d.role.overload_group())
        .next()
        .unwrap_or(OverloadGroup::None)
}

/// Field defines only travel together when they belong to the same ADT.
fn same_field_container(ws: &WorkspaceInfo, cursor: &Cursor, candidate: &Define) -> bool {
    let adt = match &cursor.kind {
        CursorKind::DataField { adt, .. }
        | CursorKind::DataKeywordField { adt, .. }
        | CursorKind::DataCommonKeywordField { adt, .. } => adt,
        _ => return true,
    };
    let Some(tree) = ws.tree(&adt.file) else {
        return false;
    };
    let Some(region) = locator::data_declaration_region(tree, adt) else {
        return false;
    };
    region.encloses(&candidate.scope)
}

/// All field defines of the ADT declared around `adt` with the given name.
fn adt_field_defs(ws: &WorkspaceInfo, adt: &Loc, name: &str) -> Vec<Loc> {
    let Some(tree) = ws.tree(&adt.file) else {
        return Vec::new();
    };
    let Some(region) = locator::data_declaration_region(tree, adt) else {
        return Vec::new();
    };
    ws.defines_named(name)
        .filter(|d| d.role == IdRole::ConstructorField && region.encloses(&d.scope))
        .map(|d| d.defined_at.clone())
        .collect()
}

/// Occurrences of a collection field label: accesses whose subject is a
/// collection carrying the label, and label positions inside collection
/// type expressions that share it.
fn collection_field_occurrences(ws: &WorkspaceInfo, container: &Loc, name: &str) -> Vec<Loc> {
    let mut occurrences: Vec<Loc> = Vec::new();
    let container_type = ws.fact(container);

    let shares_label = |tipe: &TypeExpr| {
        tipe.has_label(name)
            && match container_type {
                Some(ct) => ct.has_label(name) || !ct.is_collection(),
                None => true,
            }
    };

    for (name_loc, subject_loc) in field_accesses(ws, name) {
        if ws.fact(&subject_loc).is_some_and(&shares_label) {
            occurrences.push(name_loc);
        }
    }

    // Label occurrences in type expressions: the label node itself, guarded
    // by the fact of the smallest enclosing typed location.
    for (file, tree) in ws.loaded_trees() {
        let Some(text) = ws.text(file) else { continue };
        for (_, node) in tree.iter() {
            if node.kind != SyntaxKind::TypeLabel {
                continue;
            }
            let Some(label_text) = text.get(node.span.start as usize..node.span.end as usize)
            else {
                continue;
            };
            if unescape(label_text) != name {
                continue;
            }
            let enclosing_fact = ws
                .smallest_fact_containing(file, node.span.start, |t| t.is_collection())
                .map(|(_, t)| t.clone());
            if enclosing_fact.as_ref().is_none_or(|t| shares_label(t)) {
                occurrences.push(Loc::new(file, node.span));
            }
        }
    }

    occurrences.sort();
    occurrences.dedup();
    occurrences
}

/// `(field-name loc, subject loc)` of every `e.name` access in the loaded
/// trees with a matching field name.
fn field_accesses(ws: &WorkspaceInfo, name: &str) -> Vec<(Loc, Loc)> {
    let mut found = Vec::new();
    for (file, tree) in ws.loaded_trees() {
        let Some(text) = ws.text(file) else { continue };
        for (_, node) in tree.iter() {
            if node.kind != SyntaxKind::FieldAccess {
                continue;
            }
            let [subject, field_name, ..] = node.children.as_slice() else {
                continue;
            };
            let Some(name_node) = tree.get(*field_name) else { continue };
            let Some(name_text) =
                text.get(name_node.span.start as usize..name_node.span.end as usize)
            else {
                continue;
            };
            if unescape(name_text) != name {
                continue;
            }
            let Some(subject_node) = tree.get(*subject) else { continue };
            found.push((
                Loc::new(file, name_node.span),
                Loc::new(file, subject_node.span),
            ));
        }
    }
    found
}

/// The file renames implied by giving the module a new simple name: same
/// directory, new file stem, using the loader's path convention.
fn module_file_renames(
    ws: &WorkspaceInfo,
    defs: &FxHashSet<Loc>,
    new_name: &str,
) -> Vec<(String, String)> {
    let mut renames: Vec<(String, String)> = Vec::new();
    for def in defs {
        let Some(define) = ws.define_at(def) else { continue };
        if define.role != IdRole::ModuleName {
            continue;
        }
        let old = define.defined_at.file.clone();
        let path = Path::new(&old);
        let new = path
            .with_file_name(format!("{}.vela", escape(new_name)))
            .to_string_lossy()
            .into_owned();
        if new != old {
            renames.push((old, new));
        }
    }
    renames.sort();
    renames.dedup();
    renames
}
