//! Cursor classification.
//!
//! Given the cursor offset and the preloaded index, decide what kind of
//! entity the cursor designates. Candidate queries each produce the
//! smallest matching location; the kinds tied to the overall smallest
//! location go through a fixed precedence table. Field cursors are refined
//! further: collection fields keep no definitions, ADT fields resolve to
//! common keyword fields, per-constructor keyword fields, or positional
//! fields, in that order.

use crate::errors::{IllegalRenameReason, RenameError};
use crate::idents::unescape;
use crate::locator;
use crate::model::{IdRole, TypeExpr};
use crate::span::Loc;
use crate::syntax::{ModuleTree, SyntaxKind};
use crate::workspace::WorkspaceInfo;

/// What the cursor designates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorKind {
    /// A use site.
    Use,
    /// A definition's identifier occurrence.
    Def,
    /// A type parameter occurrence.
    TypeParameter,
    /// The module's own name (header, import, or qualified-name prefix).
    ModuleName,
    /// A field of a collection type; such fields have no definitions.
    CollectionField { container: Loc },
    /// A positional field of an ADT constructor.
    DataField { adt: Loc, field_type: TypeExpr },
    /// A keyword field of one constructor.
    DataKeywordField { adt: Loc, field_type: TypeExpr },
    /// A keyword field declared on the ADT itself.
    DataCommonKeywordField { adt: Loc, field_type: TypeExpr },
    /// A constructor named in a grammar exception clause.
    ExceptConstructor,
}

impl CursorKind {
    /// Kinds whose rename can stay inside a single function body. Module,
    /// field and grammar renames always need the whole workspace.
    pub fn may_be_function_local(&self) -> bool {
        matches!(
            self,
            CursorKind::Use | CursorKind::Def | CursorKind::TypeParameter
        )
    }
}

/// The classified cursor: kind, the smallest identifier occurrence, and the
/// name with any escape prefix stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub kind: CursorKind,
    pub loc: Loc,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateKind {
    Use,
    Def,
    TypeParameter,
    Field,
    KeywordArgument,
    ModuleName,
    ExceptConstructor,
}

struct Candidate {
    kind: CandidateKind,
    loc: Loc,
    /// For `Field` and `KeywordArgument`: the expression the field hangs off.
    container: Option<Loc>,
}

/// Classify the cursor at `offset` in `file`.
pub fn classify(ws: &WorkspaceInfo, file: &str, offset: u32) -> Result<Cursor, RenameError> {
    let tree = ws
        .tree(file)
        .ok_or_else(|| RenameError::Unexpected(format!("no syntax tree for {file}")))?;
    let text = ws
        .text(file)
        .ok_or_else(|| RenameError::Unexpected(format!("no source text for {file}")))?;

    let Some((cursor_loc, raw_name)) = locator::cursor_at(tree, text, offset) else {
        return Err(RenameError::unsupported(
            Loc::new(file, crate::span::Span::at(offset)),
            "the cursor is not on a renameable name",
        ));
    };
    let name = unescape(raw_name).to_string();

    let candidates = collect_candidates(ws, tree, text, file, offset, &name);
    if candidates.is_empty() {
        return Err(RenameError::unsupported(
            cursor_loc,
            "cannot determine what the cursor points at",
        ));
    }

    // Keep only the kinds tied to the overall smallest location.
    let c = candidates
        .iter()
        .map(|cand| cand.loc.clone())
        .min_by_key(|loc| (loc.len(), loc.span.start))
        .unwrap_or(cursor_loc.clone());
    let tied: Vec<&Candidate> = candidates.iter().filter(|cand| cand.loc == c).collect();
    if tied.is_empty() {
        return Err(RenameError::unsupported(
            cursor_loc,
            "cannot determine what the cursor points at",
        ));
    }

    let has = |kind: CandidateKind| tied.iter().any(|cand| cand.kind == kind);
    let container_of = |kind: CandidateKind| {
        tied.iter()
            .find(|cand| cand.kind == kind)
            .and_then(|cand| cand.container.clone())
    };

    let kind = if has(CandidateKind::ModuleName) {
        CursorKind::ModuleName
    } else if has(CandidateKind::KeywordArgument) {
        let container = container_of(CandidateKind::KeywordArgument)
            .ok_or_else(|| RenameError::unsupported(c.clone(), "keyword argument without a call"))?;
        classify_field(ws, &container, &name)?
    } else if has(CandidateKind::Field) {
        let container = container_of(CandidateKind::Field)
            .ok_or_else(|| RenameError::unsupported(c.clone(), "field access without a subject"))?;
        classify_field(ws, &container, &name)?
    } else if has(CandidateKind::Def) {
        let define = ws
            .define_at(&c)
            .ok_or_else(|| RenameError::unsupported(c.clone(), "definition without a model entry"))?;
        match define.role {
            IdRole::ConstructorField => classify_field_define(ws, &c)?,
            IdRole::AnnotationOnFunction => {
                return Err(RenameError::unsupported(
                    c,
                    "renaming annotations on functions is not supported",
                ));
            }
            _ => CursorKind::Def,
        }
    } else if has(CandidateKind::Use) {
        classify_use(ws, tree, &c, &cursor_loc, offset)
    } else if tied.len() == 1 {
        match tied[0].kind {
            CandidateKind::TypeParameter => CursorKind::TypeParameter,
            CandidateKind::ExceptConstructor => CursorKind::ExceptConstructor,
            _ => unreachable!("handled above"),
        }
    } else {
        return Err(RenameError::unsupported(
            c,
            "ambiguous cursor position",
        ));
    };

    Ok(Cursor { kind, loc: c, name })
}

fn collect_candidates(
    ws: &WorkspaceInfo,
    tree: &ModuleTree,
    text: &str,
    file: &str,
    offset: u32,
    name: &str,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if let Some(loc) = ws.smallest_use_containing(file, offset) {
        candidates.push(Candidate {
            kind: CandidateKind::Use,
            loc,
            container: None,
        });
    }

    if let Some(define) = ws.smallest_define_containing(file, offset, name) {
        candidates.push(Candidate {
            kind: CandidateKind::Def,
            loc: define.defined_at.clone(),
            container: None,
        });
    }

    if let Some((loc, _)) =
        ws.smallest_fact_containing(file, offset, |t| t.type_param_name() == Some(name))
    {
        candidates.push(Candidate {
            kind: CandidateKind::TypeParameter,
            loc,
            container: None,
        });
    }

    if let Some((loc, container)) = field_access_at(tree, offset) {
        candidates.push(Candidate {
            kind: CandidateKind::Field,
            loc,
            container: Some(container),
        });
    }

    if let Some((loc, container)) = keyword_argument_at(tree, offset) {
        candidates.push(Candidate {
            kind: CandidateKind::KeywordArgument,
            loc,
            container,
        });
    }

    if let Some(loc) = module_header_name_at(tree, offset) {
        candidates.push(Candidate {
            kind: CandidateKind::ModuleName,
            loc,
            container: None,
        });
    }

    if let Some(loc) = except_constructor_at(tree, text, offset, name) {
        candidates.push(Candidate {
            kind: CandidateKind::ExceptConstructor,
            loc,
            container: None,
        });
    }

    candidates
}

/// The field-name occurrence of the smallest `e.name` access containing the
/// cursor, with the subject expression as container.
fn field_access_at(tree: &ModuleTree, offset: u32) -> Option<(Loc, Loc)> {
    let access = tree.smallest_of_kind(offset, SyntaxKind::FieldAccess)?;
    let node = tree.get(access)?;
    let [subject, field_name, ..] = node.children.as_slice() else {
        return None;
    };
    let name_span = tree.get(*field_name)?.span;
    if !name_span.contains(offset) {
        return None;
    }
    let subject_span = tree.get(*subject)?.span;
    Some((
        Loc::new(tree.file(), name_span),
        Loc::new(tree.file(), subject_span),
    ))
}

/// The name occurrence of the smallest keyword binding containing the
/// cursor. The container is the enclosing call, whose fact names the
/// constructed value's type.
fn keyword_argument_at(tree: &ModuleTree, offset: u32) -> Option<(Loc, Option<Loc>)> {
    let kw = tree.smallest_of_kind(offset, SyntaxKind::KeywordArgument)?;
    let name = tree.child_of_kind(kw, SyntaxKind::SimpleName)?;
    let name_span = tree.get(name)?.span;
    if !name_span.contains(offset) {
        return None;
    }
    let call = tree
        .ancestors(kw)
        .find(|&a| tree.kind(a) == Some(SyntaxKind::Call));
    let container = call.and_then(|c| tree.get(c)).map(|n| Loc::new(tree.file(), n.span));
    Some((Loc::new(tree.file(), name_span), container))
}

fn module_header_name_at(tree: &ModuleTree, offset: u32) -> Option<Loc> {
    let header = tree.child_of_kind(tree.root(), SyntaxKind::ModuleHeader)?;
    let span = locator::id_span(tree, header)?;
    span.contains(offset).then(|| Loc::new(tree.file(), span))
}

fn except_constructor_at(tree: &ModuleTree, text: &str, offset: u32, name: &str) -> Option<Loc> {
    let clause = tree.smallest_of_kind(offset, SyntaxKind::ExceptClause)?;
    for child in tree.children_of_kind(clause, SyntaxKind::SimpleName) {
        let span = tree.get(child)?.span;
        let child_text = text.get(span.start as usize..span.end as usize)?;
        if span.contains(offset) && unescape(child_text) == name {
            return Some(Loc::new(tree.file(), span));
        }
    }
    None
}

/// The `use` row of the precedence table: module prefixes and type
/// parameters masquerade as uses and must be peeled off first.
fn classify_use(
    ws: &WorkspaceInfo,
    tree: &ModuleTree,
    c: &Loc,
    segment: &Loc,
    offset: u32,
) -> CursorKind {
    let targets = ws.get_defs(c);
    let target_defines: Vec<_> = targets.iter().filter_map(|t| ws.define_at(t)).collect();

    // A use that resolves to a module is a module rename.
    if target_defines.iter().any(|d| d.role == IdRole::ModuleName)
        || targets.iter().any(|t| ws.fact(t).is_some_and(TypeExpr::is_module))
    {
        return CursorKind::ModuleName;
    }

    // A qualified name extending past the cursor segment means the cursor
    // sits on the module prefix, unless the name resolves to a local value.
    if let Some(qualified) = tree.smallest_of_kind(offset, SyntaxKind::QualifiedName) {
        let extends_past = tree
            .get(qualified)
            .is_some_and(|n| n.span.end > segment.span.end && n.span.start <= segment.span.start);
        let all_local = !target_defines.is_empty()
            && target_defines.iter().all(|d| d.role.is_local_value());
        if extends_past && !all_local {
            return CursorKind::ModuleName;
        }
    }

    if ws.fact(c).and_then(TypeExpr::type_param_name).is_some() {
        return CursorKind::TypeParameter;
    }

    CursorKind::Use
}

// ---------------------------------------------------------------------------
// Data-field sub-classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldFlavor {
    Positional,
    Keyword,
    CommonKeyword,
}

/// Classify a field attached to `container` (an expression location whose
/// fact is the container's type).
fn classify_field(
    ws: &WorkspaceInfo,
    container: &Loc,
    field_name: &str,
) -> Result<CursorKind, RenameError> {
    let container_type = ws.fact(container);

    match container_type {
        None => Ok(CursorKind::CollectionField {
            container: container.clone(),
        }),
        Some(t) if t.is_collection() => Ok(CursorKind::CollectionField {
            container: container.clone(),
        }),
        Some(t) => {
            let Some(adt_name) = t.adt_name() else {
                return Err(outside_workspace(container));
            };
            let adt_def = ws
                .reachable_defs(std::slice::from_ref(container))
                .into_iter()
                .find(|d| d.role == IdRole::DataType && unescape(&d.name) == adt_name)
                .cloned()
                .ok_or_else(|| outside_workspace(container))?;
            // The declaring file may not be loaded yet; the exact flavor is
            // then settled after the full load, when the resolver re-reads
            // the field definitions.
            if ws.tree(&adt_def.defined_at.file).is_none() {
                let field_type = ws
                    .defines_named(field_name)
                    .find(|d| {
                        d.role == IdRole::ConstructorField
                            && d.scope.file == adt_def.defined_at.file
                    })
                    .map(|d| d.tipe.clone())
                    .unwrap_or(TypeExpr::Unknown);
                return Ok(CursorKind::DataField {
                    adt: adt_def.defined_at,
                    field_type,
                });
            }
            classify_adt_field(ws, &adt_def.defined_at, field_name)
                .ok_or_else(|| outside_workspace(container))
        }
    }
}

/// Classify a cursor that sits directly on a field definition.
fn classify_field_define(ws: &WorkspaceInfo, defined_at: &Loc) -> Result<CursorKind, RenameError> {
    let define = ws
        .define_at(defined_at)
        .ok_or_else(|| RenameError::unsupported(defined_at.clone(), "unknown field definition"))?;
    let tree = ws
        .tree(&defined_at.file)
        .ok_or_else(|| RenameError::Unexpected(format!("no syntax tree for {}", defined_at.file)))?;
    let adt = data_declaration_name_loc(tree, defined_at)
        .ok_or_else(|| outside_workspace(defined_at))?;
    let flavor = field_flavor(tree, defined_at).unwrap_or(FieldFlavor::Positional);
    Ok(specialised_field_kind(flavor, adt, define.tipe.clone()))
}

/// Walk the ADT's field definitions looking for `field_name`, preferring
/// common keyword fields, then per-constructor keyword fields, then
/// positional fields.
fn classify_adt_field(ws: &WorkspaceInfo, adt_defined_at: &Loc, field_name: &str) -> Option<CursorKind> {
    let tree = ws.tree(&adt_defined_at.file)?;
    let adt_region = locator::data_declaration_region(tree, adt_defined_at)?;

    let mut best: Option<(FieldFlavor, TypeExpr)> = None;
    for define in ws.defines_named(field_name) {
        if define.role != IdRole::ConstructorField {
            continue;
        }
        if !adt_region.encloses(&define.scope) && adt_region != define.scope {
            continue;
        }
        let flavor = field_flavor(tree, &define.defined_at)?;
        let better = match (&best, flavor) {
            (None, _) => true,
            (Some((FieldFlavor::CommonKeyword, _)), _) => false,
            (Some((FieldFlavor::Keyword, _)), FieldFlavor::CommonKeyword) => true,
            (Some((FieldFlavor::Keyword, _)), _) => false,
            (Some((FieldFlavor::Positional, _)), FieldFlavor::Positional) => false,
            (Some((FieldFlavor::Positional, _)), _) => true,
        };
        if better {
            best = Some((flavor, define.tipe.clone()));
        }
    }

    let adt = data_declaration_name_loc(tree, adt_defined_at)?;
    best.map(|(flavor, tipe)| specialised_field_kind(flavor, adt, tipe))
}

fn specialised_field_kind(flavor: FieldFlavor, adt: Loc, field_type: TypeExpr) -> CursorKind {
    match flavor {
        FieldFlavor::Positional => CursorKind::DataField {
            adt,
            field_type,
        },
        FieldFlavor::Keyword => CursorKind::DataKeywordField {
            adt,
            field_type,
        },
        FieldFlavor::CommonKeyword => CursorKind::DataCommonKeywordField {
            adt,
            field_type,
        },
    }
}

/// The declared-type-name occurrence of the data declaration enclosing `at`.
fn data_declaration_name_loc(tree: &ModuleTree, at: &Loc) -> Option<Loc> {
    let region = locator::data_declaration_region(tree, at)?;
    let node = tree.smallest_enclosing(region.span, |_, n| {
        matches!(
            n.kind,
            SyntaxKind::DataDeclaration | SyntaxKind::AbstractDataDeclaration
        )
    })?;
    let span = locator::id_span(tree, node)?;
    Some(Loc::new(tree.file(), span))
}

/// Whether a field's identifier occurrence sits in a keyword formal, and
/// whether that formal hangs off the declaration itself (common) or off one
/// constructor variant.
fn field_flavor(tree: &ModuleTree, at: &Loc) -> Option<FieldFlavor> {
    if at.file != tree.file() {
        return None;
    }
    let name = tree.smallest_enclosing(at.span, |_, n| n.span == at.span)?;
    let mut in_keyword = false;
    for ancestor in tree.ancestors(name) {
        match tree.kind(ancestor)? {
            SyntaxKind::KeywordFormal => in_keyword = true,
            SyntaxKind::DataVariant => {
                return Some(if in_keyword {
                    FieldFlavor::Keyword
                } else {
                    FieldFlavor::Positional
                });
            }
            SyntaxKind::DataDeclaration | SyntaxKind::AbstractDataDeclaration => {
                return Some(if in_keyword {
                    FieldFlavor::CommonKeyword
                } else {
                    FieldFlavor::Positional
                });
            }
            _ => {}
        }
    }
    None
}

fn outside_workspace(witness: &Loc) -> RenameError {
    RenameError::illegal(IllegalRenameReason::DefinitionsOutsideWorkspace {
        defs: vec![witness.clone()],
    })
}
