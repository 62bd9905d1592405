//! Module syntax trees, as produced by the external parser.
//!
//! The engine never parses text itself; it consumes a flat arena of
//! `SyntaxNode`s addressed by `NodeId`. The arena is contiguous, so
//! position queries are simple linear scans, and every node records its
//! parent so classification can inspect enclosing productions.

use crate::span::Span;

/// Index of a node in a `ModuleTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Production kinds of the Vela grammar that the rename engine needs to
/// tell apart. Anything else the parser produces is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    /// Whole compilation unit.
    Module,
    /// `module a::b::c` header.
    ModuleHeader,
    /// `import a::b::c;`
    Import,
    /// A plain identifier occurrence.
    SimpleName,
    /// `a::b::c` — children are the `SimpleName` segments.
    QualifiedName,
    /// Function declaration; first child is the `Signature`.
    FunctionDeclaration,
    /// Function signature; holds the name and the formals.
    Signature,
    /// Positional formal parameter or positional constructor field.
    Formal,
    /// `type name = default` keyword formal / keyword field.
    KeywordFormal,
    /// `int a = 1;`
    VariableDeclaration,
    /// `alias T = ...;`
    AliasDeclaration,
    /// `data D = ...;`
    DataDeclaration,
    /// `data D;` without variants.
    AbstractDataDeclaration,
    /// One constructor variant of a data declaration.
    DataVariant,
    /// A grammar rule `syntax N = ...;`
    SyntaxRule,
    /// A nonterminal occurrence in a grammar.
    Nonterminal,
    /// A labeled symbol in a grammar production.
    NonterminalLabel,
    /// A type variable `&T`.
    TypeVariable,
    /// A field label inside a collection type expression.
    TypeLabel,
    /// `e.name` — children are the subject expression and the field name.
    FieldAccess,
    /// `name = expr` in a call or constructor application.
    KeywordArgument,
    /// Function or constructor application.
    Call,
    /// `<q::name>` pattern position.
    QualifiedNamePattern,
    /// `name*` multi-variable pattern position.
    MultiVariablePattern,
    /// `name : pattern` becomes-pattern position.
    BecomesPattern,
    /// `!>` production exception clause naming excluded constructors.
    ExceptClause,
    /// Statement block.
    Block,
    /// Anything the engine does not dispatch on.
    Other,
}

/// One node of a module syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A parsed module: flat node arena plus the root.
#[derive(Debug, Clone)]
pub struct ModuleTree {
    file: String,
    nodes: Vec<SyntaxNode>,
    root: NodeId,
}

impl ModuleTree {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&SyntaxNode> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> Option<SyntaxKind> {
        self.get(id).map(|n| n.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Iterate all `(NodeId, &SyntaxNode)` pairs in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SyntaxNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// First child of the given kind, if any.
    pub fn child_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Option<NodeId> {
        let node = self.get(id)?;
        node.children
            .iter()
            .copied()
            .find(|&c| self.kind(c) == Some(kind))
    }

    /// All children of the given kind.
    pub fn children_of_kind(&self, id: NodeId, kind: SyntaxKind) -> Vec<NodeId> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        node.children
            .iter()
            .copied()
            .filter(|&c| self.kind(c) == Some(kind))
            .collect()
    }

    /// The smallest node whose span contains `offset` and satisfies `pred`.
    pub fn smallest_containing(
        &self,
        offset: u32,
        mut pred: impl FnMut(NodeId, &SyntaxNode) -> bool,
    ) -> Option<NodeId> {
        let mut best: Option<(u32, NodeId)> = None;
        for (id, node) in self.iter() {
            if !node.span.contains(offset) || !pred(id, node) {
                continue;
            }
            let len = node.span.len();
            if best.is_none_or(|(best_len, _)| len < best_len) {
                best = Some((len, id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// The smallest node of the given kind containing `offset`.
    pub fn smallest_of_kind(&self, offset: u32, kind: SyntaxKind) -> Option<NodeId> {
        self.smallest_containing(offset, |_, n| n.kind == kind)
    }

    /// The smallest node enclosing the whole `span` and satisfying `pred`.
    pub fn smallest_enclosing(
        &self,
        span: Span,
        mut pred: impl FnMut(NodeId, &SyntaxNode) -> bool,
    ) -> Option<NodeId> {
        let mut best: Option<(u32, NodeId)> = None;
        for (id, node) in self.iter() {
            if !node.span.encloses(span) || !pred(id, node) {
                continue;
            }
            let len = node.span.len();
            if best.is_none_or(|(best_len, _)| len < best_len) {
                best = Some((len, id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Walk ancestors of `id`, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            let next = current?;
            current = self.parent(next);
            Some(next)
        })
    }

    /// Whether any ancestor (or the node itself) has the given kind.
    pub fn enclosed_by(&self, id: NodeId, kind: SyntaxKind) -> bool {
        if self.kind(id) == Some(kind) {
            return true;
        }
        self.ancestors(id).any(|a| self.kind(a) == Some(kind))
    }
}

/// Incremental builder for `ModuleTree` values. The external parser (and the
/// test fixtures) attach children bottom-up; parents are fixed up on `add`.
#[derive(Debug)]
pub struct TreeBuilder {
    file: String,
    nodes: Vec<SyntaxNode>,
}

impl TreeBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        TreeBuilder {
            file: file.into(),
            nodes: Vec::new(),
        }
    }

    /// Add a node with the given children (already built). Returns its id.
    pub fn add(&mut self, kind: SyntaxKind, span: Span, children: &[NodeId]) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for &child in children {
            if let Some(node) = self.nodes.get_mut(child.index()) {
                node.parent = Some(id);
            }
        }
        self.nodes.push(SyntaxNode {
            kind,
            span,
            parent: None,
            children: children.to_vec(),
        });
        id
    }

    /// Finish the tree with `root` as its root node.
    pub fn build(self, root: NodeId) -> ModuleTree {
        ModuleTree {
            file: self.file,
            nodes: self.nodes,
            root,
        }
    }
}
