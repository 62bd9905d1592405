//! Rename-symbol refactoring engine for the Vela language server.
//!
//! Given a cursor position and a proposed new identifier, the engine
//! determines every definition and use across the workspace that must be
//! rewritten, proves that the rewrite preserves the program's static
//! semantics, and returns textual and file-level edits to apply.
//!
//! Architecture:
//! - `span` / `position` -- byte-span locations and the UTF-16 column mapper
//! - `syntax` / `locator` -- module trees and identifier sub-locations
//! - `model` / `oracle` -- the type-checker facts contract
//! - `workspace` -- the lazy, name-screened workspace index
//! - `cursor` -- cursor classification
//! - `resolver` -- overload expansion and reachability
//! - `legality` -- name syntax, double declarations, capture analysis
//! - `edits` -- edit planning and the document-edit wire format
//! - `driver` -- the request pipeline with progress and cancellation
//! - `versioned` -- versioned cells and debouncing for the host server
//!
//! The parser and the type checker are external collaborators; the engine
//! consumes their output through the traits in `oracle`.

pub mod cancel;
pub mod cursor;
pub mod driver;
pub mod edits;
pub mod errors;
pub mod idents;
pub mod legality;
pub mod locator;
pub mod model;
pub mod oracle;
pub mod position;
pub mod resolver;
pub mod span;
pub mod syntax;
pub mod versioned;
pub mod workspace;

pub use cancel::CancellationToken;
pub use cursor::{Cursor, CursorKind};
pub use driver::{RenameEngine, RenameOutcome, RenameRequest};
pub use edits::{ChangeAnnotation, DocumentEdit, EditPlan, RenameLocation, TextEdit};
pub use errors::{Capture, IllegalRenameReason, RenameError};
pub use model::{CheckerMessage, Define, FileModel, IdRole, TypeExpr};
pub use oracle::{
    ModuleParser, NullProgress, OracleError, ParseError, PathConfig, ProgressReporter,
    TypeCheckOracle,
};
pub use position::{LineMap, Position, Range};
pub use span::{Loc, Span};
pub use syntax::{ModuleTree, NodeId, SyntaxKind, SyntaxNode, TreeBuilder};
pub use versioned::{Debouncer, Versioned, VersionedCell};
pub use workspace::{LoadState, WorkspaceInfo};
