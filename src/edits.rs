//! Edit planning and the document-edit wire format.
//!
//! The planner turns the resolved def/use closure into per-file text
//! replacements at identifier sub-locations, plus file renames for module
//! renames. Wire types mirror the host protocol: ranges are line/character
//! pairs with UTF-16 columns, text edits may carry a change-annotation
//! identifier, and the annotation table travels next to the edits.

use crate::cursor::Cursor;
use crate::errors::RenameError;
use crate::idents::escape;
use crate::locator;
use crate::position::Range;
use crate::resolver::Resolution;
use crate::span::Loc;
use crate::workspace::WorkspaceInfo;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Identifier of the annotation attached to edits outside the cursor file.
pub const CROSS_FILE_ANNOTATION: &str = "crossFileRename";

/// One occurrence scheduled for replacement. The annotation identifier, if
/// any, flows through to the text edit emitted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameLocation {
    pub loc: Loc,
    pub annotation: Option<String>,
}

/// A single text replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl TextEdit {
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        TextEdit {
            range,
            new_text: new_text.into(),
            annotation: None,
        }
    }

    pub fn annotated(range: Range, new_text: impl Into<String>, annotation: &str) -> Self {
        TextEdit {
            range,
            new_text: new_text.into(),
            annotation: Some(annotation.to_string()),
        }
    }
}

/// One document-level edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DocumentEdit {
    Changed { file: String, edits: Vec<TextEdit> },
    Renamed { from: String, to: String },
    Created { file: String },
    Removed { file: String },
}

/// User-visible metadata for a group of annotated edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAnnotation {
    pub label: String,
    pub description: String,
    pub needs_confirmation: bool,
}

/// The planner's output: document edits plus the annotation table.
#[derive(Debug, Clone, Default)]
pub struct EditPlan {
    pub edits: Vec<DocumentEdit>,
    pub annotations: FxHashMap<String, ChangeAnnotation>,
}

/// Convert the resolution into concrete edits. Every def and use location
/// is replaced at its identifier sub-location with the escaped new name;
/// module renames append one file rename per module file.
pub fn plan(
    ws: &WorkspaceInfo,
    cursor: &Cursor,
    resolution: &Resolution,
    new_name: &str,
) -> Result<EditPlan, RenameError> {
    // Group all occurrences per file, ordered by file and offset so the
    // output is deterministic.
    let mut occurrences: Vec<Loc> = resolution
        .defs
        .iter()
        .cloned()
        .chain(resolution.uses.iter().cloned())
        .collect();
    occurrences.sort();
    occurrences.dedup();

    let mut by_file: IndexMap<String, Vec<Loc>> = IndexMap::new();
    for loc in occurrences {
        by_file.entry(loc.file.clone()).or_default().push(loc);
    }

    let replacement = escape(new_name);
    let mut plan = EditPlan::default();

    for (file, locs) in &by_file {
        let tree = ws
            .tree(file)
            .ok_or_else(|| RenameError::Unexpected(format!("no syntax tree for {file}")))?;
        let text = ws
            .text(file)
            .ok_or_else(|| RenameError::Unexpected(format!("no source text for {file}")))?;
        let line_map = ws
            .line_map(file)
            .ok_or_else(|| RenameError::Unexpected(format!("no line map for {file}")))?;

        let sub_locations =
            locator::id_locations(tree, locs).map_err(RenameError::Unsupported)?;

        // Edits away from the cursor file carry a needs-confirmation
        // annotation; the annotation id flows through each rename location.
        let cross_file = *file != cursor.loc.file;
        let annotation = cross_file.then(|| CROSS_FILE_ANNOTATION.to_string());
        let mut targets: Vec<RenameLocation> = locs
            .iter()
            .filter_map(|loc| sub_locations.get(loc))
            .map(|sub| RenameLocation {
                loc: sub.clone(),
                annotation: annotation.clone(),
            })
            .collect();
        targets.sort_by(|a, b| a.loc.cmp(&b.loc));
        targets.dedup();

        let edits: Vec<TextEdit> = targets
            .into_iter()
            .map(|target| TextEdit {
                range: line_map.range(target.loc.span, text),
                new_text: replacement.clone(),
                annotation: target.annotation,
            })
            .collect();

        if cross_file {
            plan.annotations
                .entry(CROSS_FILE_ANNOTATION.to_string())
                .or_insert_with(|| ChangeAnnotation {
                    label: format!("Rename '{}' to '{}'", cursor.name, new_name),
                    description: "Occurrences outside the file the rename started in".to_string(),
                    needs_confirmation: true,
                });
        }

        plan.edits.push(DocumentEdit::Changed {
            file: file.clone(),
            edits,
        });
    }

    for (from, to) in &resolution.file_renames {
        plan.edits.push(DocumentEdit::Renamed {
            from: from.clone(),
            to: to.clone(),
        });
    }

    Ok(plan)
}
