//! The rename error taxonomy.
//!
//! Two user-visible failure families: a rename that was fully analysed and
//! rejected for semantic reasons (`Illegal`), and a rename the engine cannot
//! reason about (`Unsupported`). Oracle precondition violations surface as
//! `Unexpected`; cancellation is its own variant and is never folded into
//! `Unexpected`.

use crate::span::Loc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// A use that would resolve to a different definition after the rename.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    /// The definition the use would newly resolve to.
    pub def: Loc,
    /// The captured use site.
    pub use_site: Loc,
}

/// One reason a fully-analysed rename is rejected. Reasons are aggregated
/// across all affected files before the engine fails, so the user sees
/// every blocker at once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum IllegalRenameReason {
    /// The new name does not parse as the required syntactic category.
    InvalidName { name: String },
    /// Some definitions live outside the open workspace folders.
    DefinitionsOutsideWorkspace { defs: Vec<Loc> },
    /// The rename would declare the same name twice in one scope.
    DoubleDeclaration { current: Loc, conflicts: Vec<Loc> },
    /// The rename would change what at least one use resolves to.
    CaptureChange { captures: Vec<Capture> },
}

impl fmt::Display for IllegalRenameReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalRenameReason::InvalidName { name } => {
                write!(f, "'{name}' is not a valid name here")
            }
            IllegalRenameReason::DefinitionsOutsideWorkspace { defs } => {
                write!(f, "{} definition(s) are outside the workspace", defs.len())
            }
            IllegalRenameReason::DoubleDeclaration { current, conflicts } => {
                write!(
                    f,
                    "renaming the definition at {current} clashes with {} existing declaration(s)",
                    conflicts.len()
                )
            }
            IllegalRenameReason::CaptureChange { captures } => {
                write!(f, "{} use(s) would change meaning", captures.len())
            }
        }
    }
}

/// Everything that can stop a rename.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenameError {
    /// Rename analysed and rejected; carries every reason found.
    #[error("rename is not allowed: {}", format_reasons(.0))]
    Illegal(BTreeSet<IllegalRenameReason>),
    /// The engine cannot reason about this form.
    #[error("rename is not supported here: {}", format_issues(.0))]
    Unsupported(Vec<(Loc, String)>),
    /// An oracle or parser precondition was violated.
    #[error("{0}")]
    Unexpected(String),
    /// The request was cancelled by the client.
    #[error("rename was cancelled")]
    Cancelled,
}

impl RenameError {
    /// Convenience constructor for a single illegal reason.
    pub fn illegal(reason: IllegalRenameReason) -> Self {
        RenameError::Illegal(BTreeSet::from([reason]))
    }

    /// Convenience constructor for a single unsupported location.
    pub fn unsupported(loc: Loc, message: impl Into<String>) -> Self {
        RenameError::Unsupported(vec![(loc, message.into())])
    }
}

fn format_reasons(reasons: &BTreeSet<IllegalRenameReason>) -> String {
    reasons
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_issues(issues: &[(Loc, String)]) -> String {
    issues
        .iter()
        .map(|(loc, msg)| format!("{loc}: {msg}"))
        .collect::<Vec<_>>()
        .join("; ")
}
