//! The type-checker facts model.
//!
//! The checker runs ahead of the rename engine and exports, per file, a set
//! of relations keyed by source location: definitions, use-to-definition
//! edges, per-location types, and the lexical scope nesting. The engine
//! treats these as immutable input.

use crate::span::Loc;
use serde::{Deserialize, Serialize};

/// The role a definition plays. Renames are only supported for roles in
/// this closed set; the classifier refuses everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdRole {
    Variable,
    PatternVariable,
    Parameter,
    KeywordParameter,
    Function,
    AnnotationOnValue,
    AnnotationOnFunction,
    ModuleName,
    Alias,
    DataType,
    Constructor,
    ConstructorField,
    CollectionField,
    TypeParameter,
    Nonterminal,
    NonterminalLabel,
}

impl IdRole {
    /// Roles that bind locally inside a function body or pattern.
    pub fn is_local_value(self) -> bool {
        matches!(
            self,
            IdRole::Variable | IdRole::PatternVariable | IdRole::Parameter | IdRole::KeywordParameter
        )
    }

    /// The overload group this role belongs to. Two defines can only be
    /// overloaded (and therefore renamed as a unit) when their groups match.
    pub fn overload_group(self) -> OverloadGroup {
        match self {
            IdRole::Function => OverloadGroup::Functions,
            IdRole::DataType | IdRole::Alias => OverloadGroup::DataTypes,
            IdRole::Constructor => OverloadGroup::Constructors,
            IdRole::ConstructorField | IdRole::CollectionField => OverloadGroup::Fields,
            IdRole::Nonterminal => OverloadGroup::Nonterminals,
            _ => OverloadGroup::None,
        }
    }

    /// Whether two defines of this role may legally coexist under one scope
    /// with the same name.
    pub fn may_overload(self) -> bool {
        matches!(
            self,
            IdRole::Function | IdRole::Constructor | IdRole::Nonterminal
        )
    }
}

/// Overload grouping of roles; see `IdRole::overload_group`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverloadGroup {
    Functions,
    DataTypes,
    Constructors,
    Fields,
    Nonterminals,
    None,
}

/// Collection shapes that carry field labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    List,
    Set,
    Relation,
    Map,
    Tuple,
}

/// A static type expression, as the checker computes it. Only the structure
/// the rename engine dispatches on is modelled; everything else collapses
/// into `Atom` or `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeExpr {
    /// A builtin or opaque named type (`int`, `str`, ...).
    Atom(String),
    /// A function type.
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// A type parameter `&T`.
    TypeParam { name: String },
    /// A user-defined algebraic data type.
    Adt { name: String, args: Vec<TypeExpr> },
    /// A collection type, optionally with field labels.
    Collection {
        kind: CollectionKind,
        elems: Vec<TypeExpr>,
        labels: Vec<String>,
    },
    /// The type of a module name occurrence.
    ModuleType { name: String },
    /// The type of a grammar nonterminal.
    NonterminalType { name: String },
    /// An overload set.
    Overloaded(Vec<TypeExpr>),
    Unknown,
}

impl TypeExpr {
    pub fn is_function(&self) -> bool {
        match self {
            TypeExpr::Function { .. } => true,
            TypeExpr::Overloaded(alts) => alts.iter().any(TypeExpr::is_function),
            _ => false,
        }
    }

    pub fn is_module(&self) -> bool {
        matches!(self, TypeExpr::ModuleType { .. })
    }

    /// The name of the type parameter, when this is one.
    pub fn type_param_name(&self) -> Option<&str> {
        match self {
            TypeExpr::TypeParam { name } => Some(name),
            _ => None,
        }
    }

    /// The ADT name this type designates, if any. Looks through overloads
    /// and function return types, which is how constructor types name their
    /// data type.
    pub fn adt_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Adt { name, .. } => Some(name),
            TypeExpr::Function { ret, .. } => ret.adt_name(),
            TypeExpr::Overloaded(alts) => alts.iter().find_map(TypeExpr::adt_name),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, TypeExpr::Collection { .. })
    }

    /// Whether this collection type carries the given field label.
    pub fn has_label(&self, label: &str) -> bool {
        match self {
            TypeExpr::Collection { labels, .. } => labels.iter().any(|l| l == label),
            _ => false,
        }
    }
}

/// One definition of one name at one source location.
///
/// `defined_at` is the identifier occurrence; `scope` is the lexical region
/// the definition is visible in, and always encloses `defined_at`. For
/// module-scope definitions the scope is the whole file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Define {
    pub scope: Loc,
    pub name: String,
    pub role: IdRole,
    pub defined_at: Loc,
    pub tipe: TypeExpr,
}

impl Define {
    /// Defines are compared by their identifier occurrence; two checker runs
    /// never produce two defines at one location.
    pub fn key(&self) -> &Loc {
        &self.defined_at
    }
}

/// One diagnostic the checker attached to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerMessage {
    pub loc: Loc,
    pub message: String,
    pub is_error: bool,
}

/// The checker's model for a single file: the slice of every relation that
/// belongs to that file, plus the checker's own diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileModel {
    pub defines: Vec<Define>,
    /// Use location to the definition(s) it resolves to. Multiple targets
    /// only occur for legal overloads.
    pub use_def: Vec<(Loc, Vec<Loc>)>,
    /// Types for arbitrary sub-expression locations.
    pub facts: Vec<(Loc, TypeExpr)>,
    /// Inner scope to the directly enclosing scope.
    pub scopes: Vec<(Loc, Loc)>,
    pub messages: Vec<CheckerMessage>,
}

impl FileModel {
    /// Whether the checker reported any error for this file.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.is_error)
    }

    /// Error messages, for surfacing when a rename touches a broken file.
    pub fn error_messages(&self) -> impl Iterator<Item = &CheckerMessage> {
        self.messages.iter().filter(|m| m.is_error)
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn overload_groups_separate_roles() {
        assert_eq!(IdRole::Function.overload_group(), OverloadGroup::Functions);
        assert_eq!(IdRole::Constructor.overload_group(), OverloadGroup::Constructors);
        assert_ne!(
            IdRole::Function.overload_group(),
            IdRole::Variable.overload_group()
        );
        assert!(!IdRole::Variable.may_overload());
        assert!(IdRole::Function.may_overload());
    }

    #[test]
    fn constructor_types_name_their_adt() {
        let cons = TypeExpr::Function {
            params: vec![TypeExpr::Atom("int".into())],
            ret: Box::new(TypeExpr::Adt {
                name: "D".into(),
                args: vec![],
            }),
        };
        assert_eq!(cons.adt_name(), Some("D"));
        assert!(cons.is_function());
    }

    #[test]
    fn collection_labels() {
        let rel = TypeExpr::Collection {
            kind: CollectionKind::Relation,
            elems: vec![TypeExpr::Atom("int".into()), TypeExpr::Atom("str".into())],
            labels: vec!["from".into(), "to".into()],
        };
        assert!(rel.has_label("from"));
        assert!(!rel.has_label("via"));
    }

    #[test]
    fn file_model_error_detection() {
        let mut model = FileModel::default();
        assert!(!model.has_errors());
        model.messages.push(CheckerMessage {
            loc: Loc::new("m.vela", Span::at(0)),
            message: "undefined name".into(),
            is_error: true,
        });
        assert!(model.has_errors());
        assert_eq!(model.error_messages().count(), 1);
    }
}
