//! The rename driver.
//!
//! Orchestrates the pipeline: preload the cursor file, classify the
//! cursor, fully load the workspace unless the rename is provably
//! function-local, resolve the overload closure, check legality per file,
//! and plan the edits. Each step reports one unit of progress and checks
//! the cancellation token; on any error the outcome carries no edits.

use crate::cancel::CancellationToken;
use crate::cursor::{self, Cursor};
use crate::edits::{self, ChangeAnnotation, DocumentEdit};
use crate::errors::RenameError;
use crate::idents::unescape;
use crate::legality;
use crate::oracle::{ModuleParser, PathConfig, ProgressReporter, TypeCheckOracle};
use crate::resolver;
use crate::workspace::WorkspaceInfo;
use rustc_hash::FxHashMap;

/// A rename request: cursor position plus the proposed new name.
#[derive(Debug, Clone)]
pub struct RenameRequest {
    /// File under the cursor.
    pub file: String,
    /// Byte offset of the cursor.
    pub offset: u32,
    /// The proposed new name; reserved words are accepted and escaped.
    pub new_name: String,
}

/// A successful rename: the document edits and their annotation table.
#[derive(Debug, Clone, Default)]
pub struct RenameOutcome {
    pub edits: Vec<DocumentEdit>,
    pub change_annotations: FxHashMap<String, ChangeAnnotation>,
}

/// The rename engine, bound to its external collaborators for the duration
/// of one or more requests. Each request owns a transient `WorkspaceInfo`;
/// engines on different threads share nothing mutable.
pub struct RenameEngine<'a> {
    oracle: &'a dyn TypeCheckOracle,
    parser: &'a dyn ModuleParser,
    progress: &'a dyn ProgressReporter,
    cancel: CancellationToken,
}

impl<'a> RenameEngine<'a> {
    pub fn new(
        oracle: &'a dyn TypeCheckOracle,
        parser: &'a dyn ModuleParser,
        progress: &'a dyn ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        RenameEngine {
            oracle,
            parser,
            progress,
            cancel,
        }
    }

    /// Compute all edits needed to rename the symbol under the cursor.
    pub fn rename_symbol(
        &self,
        request: &RenameRequest,
        workspace_folders: &[String],
        path_config_for: &dyn Fn(&str) -> PathConfig,
    ) -> Result<RenameOutcome, RenameError> {
        let _span = tracing::info_span!(
            "rename",
            file = %request.file,
            new_name = %request.new_name
        )
        .entered();

        if owning_folder(workspace_folders, &request.file).is_none() {
            return Err(RenameError::Unexpected(format!(
                "{} is not inside any workspace folder",
                request.file
            )));
        }

        self.checkpoint()?;
        self.progress.report("Loading the file under the cursor", 1);
        let mut ws = WorkspaceInfo::new();
        ws.preload(&request.file, self.parser, self.oracle)?;

        self.checkpoint()?;
        self.progress.report("Classifying the cursor", 1);
        let cursor = cursor::classify(&ws, &request.file, request.offset)?;
        tracing::debug!(kind = ?cursor.kind, name = %cursor.name, "cursor classified");

        // Renaming to the current name is a no-op, never an error.
        if cursor.name == unescape(&request.new_name) {
            return Ok(RenameOutcome::default());
        }

        self.checkpoint()?;
        self.progress.report("Loading workspace type information", 1);
        let function_local = cursor.kind.may_be_function_local() && {
            let initial = resolver::initial_defs(&ws, &cursor)?;
            resolver::is_function_local(&ws, &cursor, &initial)
        };
        if function_local {
            tracing::debug!("rename is function-local, skipping full load");
        } else {
            let needles = screening_needles(&cursor, &request.new_name);
            ws.full_load(
                workspace_folders,
                path_config_for,
                self.parser,
                self.oracle,
                &needles,
            )?;
        }

        self.checkpoint()?;
        self.progress.report("Resolving definitions and uses", 1);
        let resolution = resolver::resolve(&ws, &cursor, &request.new_name)?;
        tracing::debug!(
            defs = resolution.defs.len(),
            uses = resolution.uses.len(),
            "resolved rename closure"
        );

        self.checkpoint()?;
        self.progress.report("Checking rename legality", 1);
        let reasons = legality::check(&ws, &cursor, &resolution, &request.new_name);
        if !reasons.is_empty() {
            return Err(RenameError::Illegal(reasons));
        }

        self.checkpoint()?;
        self.progress.report("Building edits", 1);
        let plan = edits::plan(&ws, &cursor, &resolution, &request.new_name)?;
        Ok(RenameOutcome {
            edits: plan.edits,
            change_annotations: plan.annotations,
        })
    }

    fn checkpoint(&self) -> Result<(), RenameError> {
        if self.cancel.is_cancelled() {
            Err(RenameError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The strings whose textual presence forces a file into the full load:
/// the cursor name and the proposed new name, in bare and escaped form.
fn screening_needles(cursor: &Cursor, new_name: &str) -> Vec<String> {
    let mut needles = vec![
        cursor.name.clone(),
        format!("\\{}", cursor.name),
        unescape(new_name).to_string(),
        format!("\\{}", unescape(new_name)),
    ];
    needles.sort();
    needles.dedup();
    needles
}

/// The workspace folder with the longest path prefix of `file`.
fn owning_folder<'f>(folders: &'f [String], file: &str) -> Option<&'f String> {
    folders
        .iter()
        .filter(|folder| std::path::Path::new(file).starts_with(folder.as_str()))
        .max_by_key(|folder| folder.len())
}
