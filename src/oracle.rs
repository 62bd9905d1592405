//! Interfaces to the engine's external collaborators.
//!
//! The parser and the type checker live outside this crate; the engine
//! only specifies what it consumes from them. Both are addressed by
//! physical file paths, are idempotent, and have no side effects the
//! engine can observe.

use crate::model::FileModel;
use crate::span::Loc;
use crate::syntax::ModuleTree;
use thiserror::Error;

/// A parse failure, with a byte-accurate source range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{loc}: {message}")]
pub struct ParseError {
    pub loc: Loc,
    pub message: String,
}

/// An oracle precondition violation (missing model, checker crash, ...).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct OracleError {
    pub message: String,
}

impl OracleError {
    pub fn new(message: impl Into<String>) -> Self {
        OracleError {
            message: message.into(),
        }
    }
}

/// Parses one file into a module syntax tree with byte-accurate sub-tree
/// locations.
pub trait ModuleParser {
    fn parse(&self, file: &str, text: &str) -> Result<ModuleTree, ParseError>;
}

/// The type-checker oracle. For one or more files, returns the
/// precomputed model with defines, use-def edges, facts and scopes.
/// Models for files with type errors may be returned, but then carry the
/// checker's error messages.
///
/// A file's model covers everything visible in that file, so definitions
/// imported from other modules travel with the importing file's model.
/// The workspace index merges each definition exactly once.
pub trait TypeCheckOracle {
    fn model(&self, files: &[String]) -> Result<Vec<(String, FileModel)>, OracleError>;
}

/// Per-workspace-folder source configuration.
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Directories whose `*.vela` files belong to the project.
    pub source_roots: Vec<String>,
    /// Path substrings to skip during enumeration (generated code, caches).
    pub ignore_patterns: Vec<String>,
}

impl PathConfig {
    /// Whether a candidate path is excluded by the ignore patterns.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.ignore_patterns.iter().any(|pat| path.contains(pat.as_str()))
    }
}

/// Receives one `(label, increment)` report per pipeline step.
pub trait ProgressReporter {
    fn report(&self, label: &str, increment: u32);
}

/// A reporter that swallows all progress. Useful for tests and batch hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn report(&self, _label: &str, _increment: u32) {}
}
