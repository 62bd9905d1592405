//! Locating names inside module syntax trees.
//!
//! Two queries: given a cursor offset, find the smallest named production
//! and its identifier occurrence; and given a set of def/use locations,
//! find the identifier sub-location of each. Which child of a production
//! carries its name is a closed dispatch table on the production kind.

use crate::span::{Loc, Span};
use crate::syntax::{ModuleTree, NodeId, SyntaxKind};
use rustc_hash::FxHashMap;

/// The identifier sub-span of a named production, or `None` when the node
/// is not a named form.
pub fn id_span(tree: &ModuleTree, id: NodeId) -> Option<Span> {
    let node = tree.get(id)?;
    match node.kind {
        SyntaxKind::SimpleName
        | SyntaxKind::TypeVariable
        | SyntaxKind::TypeLabel
        | SyntaxKind::Nonterminal
        | SyntaxKind::NonterminalLabel => Some(node.span),
        // The last segment names the entity; the prefix names modules.
        SyntaxKind::QualifiedName => {
            let last = node.children.last().copied()?;
            Some(tree.get(last)?.span)
        }
        SyntaxKind::FunctionDeclaration => {
            let sig = tree.child_of_kind(id, SyntaxKind::Signature)?;
            id_span(tree, sig)
        }
        SyntaxKind::Signature
        | SyntaxKind::VariableDeclaration
        | SyntaxKind::Formal
        | SyntaxKind::KeywordFormal
        | SyntaxKind::AliasDeclaration
        | SyntaxKind::DataDeclaration
        | SyntaxKind::AbstractDataDeclaration
        | SyntaxKind::DataVariant => {
            let name = tree.child_of_kind(id, SyntaxKind::SimpleName)?;
            Some(tree.get(name)?.span)
        }
        SyntaxKind::ModuleHeader => {
            if let Some(qualified) = tree.child_of_kind(id, SyntaxKind::QualifiedName) {
                return id_span(tree, qualified);
            }
            let name = tree.child_of_kind(id, SyntaxKind::SimpleName)?;
            Some(tree.get(name)?.span)
        }
        SyntaxKind::SyntaxRule => {
            let nt = tree.child_of_kind(id, SyntaxKind::Nonterminal)?;
            Some(tree.get(nt)?.span)
        }
        _ => None,
    }
}

/// The span of the data declaration enclosing `at`, as a location.
pub fn data_declaration_region(tree: &ModuleTree, at: &Loc) -> Option<Loc> {
    let node = tree.smallest_enclosing(at.span, |_, n| {
        matches!(
            n.kind,
            SyntaxKind::DataDeclaration | SyntaxKind::AbstractDataDeclaration
        )
    })?;
    Some(Loc::new(tree.file(), tree.get(node)?.span))
}

/// The smallest named production whose identifier occurrence contains the
/// cursor offset.
pub fn named_at(tree: &ModuleTree, offset: u32) -> Option<NodeId> {
    tree.smallest_containing(offset, |id, _| {
        id_span(tree, id).is_some_and(|span| span.contains(offset))
    })
}

/// Resolve a cursor offset to the identifier occurrence under it and its
/// textual form (escape prefix intact).
pub fn cursor_at<'t>(tree: &ModuleTree, text: &'t str, offset: u32) -> Option<(Loc, &'t str)> {
    let node = named_at(tree, offset)?;
    let span = id_span(tree, node)?;
    let slice = text.get(span.start as usize..span.end as usize)?;
    Some((Loc::new(tree.file(), span), slice))
}

/// For every given location, the identifier sub-location of the named
/// production at (or tightly around) it. Members that cannot be mapped are
/// returned as `(location, message)` issues.
pub fn id_locations(
    tree: &ModuleTree,
    locs: &[Loc],
) -> Result<FxHashMap<Loc, Loc>, Vec<(Loc, String)>> {
    let mut mapped = FxHashMap::default();
    let mut missing = Vec::new();

    for loc in locs {
        match id_location(tree, loc) {
            Some(sub) => {
                mapped.insert(loc.clone(), sub);
            }
            None => missing.push((
                loc.clone(),
                "cannot determine the identifier position of this occurrence".to_string(),
            )),
        }
    }

    if missing.is_empty() {
        Ok(mapped)
    } else {
        Err(missing)
    }
}

fn id_location(tree: &ModuleTree, loc: &Loc) -> Option<Loc> {
    if loc.file != tree.file() {
        return None;
    }
    let node = tree.smallest_enclosing(loc.span, |id, _| id_span(tree, id).is_some())?;
    let span = id_span(tree, node)?;
    // The requested location must actually cover (or be) the identifier;
    // otherwise the production's name lies elsewhere and a textual
    // replacement at `span` would rewrite the wrong token.
    if loc.span.encloses(span) || span.encloses(loc.span) {
        Some(Loc::new(tree.file(), span))
    } else {
        None
    }
}
