//! The workspace information index.
//!
//! A `WorkspaceInfo` is created per rename request and populated in two
//! phases: `preload` brings in just the cursor file so the cursor can be
//! classified; `full_load` sweeps every source file under the workspace
//! folders. Files whose text does not mention the cursor name (or its
//! escaped variant, or the proposed new name) are registered as known but
//! never parsed or checked, which bounds the cost of a workspace-wide
//! rename. Within one request no file is ever loaded twice.

use crate::errors::RenameError;
use crate::model::{Define, FileModel, TypeExpr};
use crate::oracle::{ModuleParser, PathConfig, TypeCheckOracle};
use crate::position::LineMap;
use crate::span::{Loc, Span};
use crate::syntax::{ModuleTree, SyntaxKind};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use walkdir::WalkDir;

/// How much of the workspace has been brought into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Empty,
    Preloaded,
    Full,
}

/// The lazily-populated union of all loaded per-file models, plus the
/// parsed module trees and texts the engine needs alongside them.
pub struct WorkspaceInfo {
    defines: Vec<Define>,
    define_index: BTreeMap<Loc, usize>,
    /// Which files' models contributed each define. Imported defines travel
    /// with the importing file's model, so a define can have several.
    contributors: FxHashMap<Loc, FxHashSet<String>>,
    use_def: BTreeMap<Loc, Vec<Loc>>,
    facts: BTreeMap<Loc, TypeExpr>,
    scopes: FxHashMap<Loc, Loc>,
    scope_locs: FxHashSet<Loc>,
    source_files: FxHashSet<String>,
    modules: FxHashMap<String, Loc>,
    imports: FxHashMap<String, Vec<String>>,
    trees: FxHashMap<String, ModuleTree>,
    texts: FxHashMap<String, String>,
    line_maps: FxHashMap<String, LineMap>,
    file_scopes: FxHashMap<String, Loc>,
    loaded_files: FxHashSet<String>,
    known_unloaded: FxHashSet<String>,
    loaded: LoadState,
}

impl WorkspaceInfo {
    pub fn new() -> Self {
        WorkspaceInfo {
            defines: Vec::new(),
            define_index: BTreeMap::new(),
            contributors: FxHashMap::default(),
            use_def: BTreeMap::new(),
            facts: BTreeMap::new(),
            scopes: FxHashMap::default(),
            scope_locs: FxHashSet::default(),
            source_files: FxHashSet::default(),
            modules: FxHashMap::default(),
            imports: FxHashMap::default(),
            trees: FxHashMap::default(),
            texts: FxHashMap::default(),
            line_maps: FxHashMap::default(),
            file_scopes: FxHashMap::default(),
            loaded_files: FxHashSet::default(),
            known_unloaded: FxHashSet::default(),
            loaded: LoadState::Empty,
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.loaded
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Phase one: bring in the cursor file alone. Parse and type-check
    /// failures here abort the rename.
    pub fn preload(
        &mut self,
        cursor_file: &str,
        parser: &dyn ModuleParser,
        oracle: &dyn TypeCheckOracle,
    ) -> Result<(), RenameError> {
        let text = std::fs::read_to_string(cursor_file)
            .map_err(|e| RenameError::Unexpected(format!("cannot read {cursor_file}: {e}")))?;
        self.load_file(cursor_file, text, parser, oracle)?;
        self.loaded = LoadState::Preloaded;
        Ok(())
    }

    /// Phase two: sweep every `*.vela` file under the workspace folders.
    /// `needles` are the strings whose textual presence forces a file to be
    /// loaded; files mentioning none of them are registered and skipped.
    pub fn full_load(
        &mut self,
        folders: &[String],
        path_config_for: &dyn Fn(&str) -> PathConfig,
        parser: &dyn ModuleParser,
        oracle: &dyn TypeCheckOracle,
        needles: &[String],
    ) -> Result<(), RenameError> {
        let mut candidates: Vec<String> = Vec::new();
        for folder in folders {
            let config = path_config_for(folder);
            let roots = if config.source_roots.is_empty() {
                vec![folder.clone()]
            } else {
                config.source_roots.clone()
            };
            for root in &roots {
                for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let path = entry.path().to_string_lossy().into_owned();
                    if !path.ends_with(".vela") || config.is_ignored(&path) {
                        continue;
                    }
                    if self.loaded_files.contains(&path) || self.known_unloaded.contains(&path) {
                        continue;
                    }
                    candidates.push(path);
                }
            }
        }
        candidates.sort();
        candidates.dedup();

        // Read and screen in parallel; merging stays sequential.
        let screened: Vec<(String, Option<String>)> = candidates
            .into_par_iter()
            .map(|path| {
                let text = match std::fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(file = %path, error = %e, "skipping unreadable file");
                        return (path, None);
                    }
                };
                let hit = needles.iter().any(|needle| text.contains(needle.as_str()));
                (path, hit.then_some(text))
            })
            .collect();

        let mut loaded = 0usize;
        let mut skipped = 0usize;
        for (path, text) in screened {
            match text {
                Some(text) => {
                    self.load_file(&path, text, parser, oracle)?;
                    loaded += 1;
                }
                None => {
                    self.source_files.insert(path.clone());
                    self.known_unloaded.insert(path);
                    skipped += 1;
                }
            }
        }
        tracing::debug!(loaded, skipped, "full workspace load complete");
        self.loaded = LoadState::Full;
        Ok(())
    }

    /// Parse one file, fetch its model, and merge both. Loading is
    /// idempotent per file within one request.
    fn load_file(
        &mut self,
        file: &str,
        text: String,
        parser: &dyn ModuleParser,
        oracle: &dyn TypeCheckOracle,
    ) -> Result<(), RenameError> {
        if self.loaded_files.contains(file) {
            return Ok(());
        }
        let tree = parser
            .parse(file, &text)
            .map_err(|e| RenameError::Unexpected(format!("parse error in {e}")))?;
        let models = oracle
            .model(&[file.to_string()])
            .map_err(|e| RenameError::Unexpected(e.to_string()))?;

        for (model_file, model) in models {
            if model.has_errors() {
                let summary = model
                    .error_messages()
                    .map(|m| format!("{}: {}", m.loc, m.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(RenameError::Unexpected(format!(
                    "cannot rename: {model_file} has type errors: {summary}"
                )));
            }
            self.merge_model(file, model);
        }

        self.register_module(&tree, &text);
        self.file_scopes
            .insert(file.to_string(), Loc::whole_file(file, text.len() as u32));
        self.line_maps.insert(file.to_string(), LineMap::build(&text));
        self.trees.insert(file.to_string(), tree);
        self.texts.insert(file.to_string(), text);
        self.source_files.insert(file.to_string());
        self.loaded_files.insert(file.to_string());
        self.known_unloaded.remove(file);
        tracing::trace!(%file, "loaded file into workspace index");
        Ok(())
    }

    fn merge_model(&mut self, source_file: &str, model: FileModel) {
        for define in model.defines {
            self.contributors
                .entry(define.defined_at.clone())
                .or_default()
                .insert(source_file.to_string());
            if self.define_index.contains_key(&define.defined_at) {
                continue;
            }
            self.define_index
                .insert(define.defined_at.clone(), self.defines.len());
            self.scope_locs.insert(define.scope.clone());
            self.defines.push(define);
        }
        for (use_loc, def_locs) in model.use_def {
            let targets = self.use_def.entry(use_loc).or_default();
            targets.extend(def_locs);
            targets.sort();
            targets.dedup();
        }
        for (loc, tipe) in model.facts {
            self.facts.entry(loc).or_insert(tipe);
        }
        for (inner, outer) in model.scopes {
            self.scope_locs.insert(inner.clone());
            self.scope_locs.insert(outer.clone());
            self.scopes.insert(inner, outer);
        }
    }

    /// Record the module's qualified name and its imports, both read from
    /// the header section of the tree.
    fn register_module(&mut self, tree: &ModuleTree, text: &str) {
        let root = tree.root();
        if let Some(header) = tree.child_of_kind(root, SyntaxKind::ModuleHeader)
            && let Some(span) = crate::locator::id_span(tree, header)
        {
            let name = qualified_name_text(tree, text, header);
            self.modules
                .insert(name, Loc::new(tree.file(), span));
        }
        let mut imported = Vec::new();
        for (id, node) in tree.iter() {
            if node.kind == SyntaxKind::Import {
                imported.push(qualified_name_text(tree, text, id));
            }
        }
        if !imported.is_empty() {
            self.imports.insert(tree.file().to_string(), imported);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// `use_def[loc]` when `loc` is a use; otherwise `{loc}`.
    pub fn get_defs(&self, loc: &Loc) -> Vec<Loc> {
        match self.use_def.get(loc) {
            Some(defs) => defs.clone(),
            None => vec![loc.clone()],
        }
    }

    /// The define whose identifier occurrence is exactly `loc`.
    pub fn define_at(&self, loc: &Loc) -> Option<&Define> {
        self.define_index.get(loc).map(|&i| &self.defines[i])
    }

    pub fn defines(&self) -> impl Iterator<Item = &Define> {
        self.defines.iter()
    }

    /// All defines with the given (unescaped) name.
    pub fn defines_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Define> {
        self.defines
            .iter()
            .filter(move |d| crate::idents::unescape(&d.name) == name)
    }

    /// The smallest use location in `file` containing `offset`.
    pub fn smallest_use_containing(&self, file: &str, offset: u32) -> Option<Loc> {
        smallest_key_containing(self.use_def.keys(), file, offset)
    }

    /// The smallest fact location in `file` containing `offset` whose type
    /// satisfies `pred`.
    pub fn smallest_fact_containing(
        &self,
        file: &str,
        offset: u32,
        mut pred: impl FnMut(&TypeExpr) -> bool,
    ) -> Option<(Loc, &TypeExpr)> {
        let mut best: Option<(Loc, &TypeExpr)> = None;
        for (loc, tipe) in file_range(&self.facts, file, offset) {
            if !loc.span.contains(offset) || !pred(tipe) {
                continue;
            }
            if best
                .as_ref()
                .is_none_or(|(best_loc, _)| loc.len() < best_loc.len())
            {
                best = Some((loc.clone(), tipe));
            }
        }
        best
    }

    /// The smallest define in `file` whose identifier occurrence contains
    /// `offset` and whose name matches.
    pub fn smallest_define_containing(&self, file: &str, offset: u32, name: &str) -> Option<&Define> {
        let mut best: Option<&Define> = None;
        for (loc, &idx) in file_range(&self.define_index, file, offset) {
            if !loc.span.contains(offset) {
                continue;
            }
            let define = &self.defines[idx];
            if crate::idents::unescape(&define.name) != name {
                continue;
            }
            if best.is_none_or(|b| define.defined_at.len() < b.defined_at.len()) {
                best = Some(define);
            }
        }
        best
    }

    /// The exact fact for a location, if the checker recorded one.
    pub fn fact(&self, loc: &Loc) -> Option<&TypeExpr> {
        self.facts.get(loc)
    }

    pub fn facts(&self) -> impl Iterator<Item = (&Loc, &TypeExpr)> {
        self.facts.iter()
    }

    /// All use locations whose resolution intersects `defs`.
    pub fn uses_of(&self, defs: &FxHashSet<Loc>) -> Vec<Loc> {
        self.use_def
            .iter()
            .filter(|(_, targets)| targets.iter().any(|t| defs.contains(t)))
            .map(|(use_loc, _)| use_loc.clone())
            .collect()
    }

    /// Whether a location is a use site.
    pub fn is_use(&self, loc: &Loc) -> bool {
        self.use_def.contains_key(loc)
    }

    pub fn use_def(&self) -> impl Iterator<Item = (&Loc, &Vec<Loc>)> {
        self.use_def.iter()
    }

    /// The transitive closure of defines reachable from the seed locations
    /// through the scope and import relations. Terminates because scopes
    /// nest lexically and the import graph is traversed with a visited set.
    pub fn reachable_defs(&self, seeds: &[Loc]) -> Vec<&Define> {
        let mut visible_scopes: FxHashSet<Loc> = FxHashSet::default();
        let mut files: Vec<String> = Vec::new();
        let mut seen_files: FxHashSet<String> = FxHashSet::default();

        for seed in seeds {
            // Every enclosing scope region in the seed's file is visible.
            for scope in &self.scope_locs {
                if scope.file == seed.file && scope.span.encloses(seed.span) {
                    visible_scopes.insert(scope.clone());
                }
            }
            if let Some(file_scope) = self.file_scopes.get(&seed.file) {
                visible_scopes.insert(file_scope.clone());
            }
            if seen_files.insert(seed.file.clone()) {
                files.push(seed.file.clone());
            }
        }

        // Module scopes of transitively imported files are visible too.
        while let Some(file) = files.pop() {
            let Some(imported) = self.imports.get(&file) else {
                continue;
            };
            for module_name in imported {
                let Some(module_loc) = self.modules.get(module_name) else {
                    continue;
                };
                if let Some(file_scope) = self.file_scopes.get(&module_loc.file) {
                    visible_scopes.insert(file_scope.clone());
                }
                if seen_files.insert(module_loc.file.clone()) {
                    files.push(module_loc.file.clone());
                }
            }
        }

        self.defines
            .iter()
            .filter(|d| {
                if visible_scopes.contains(&d.scope) {
                    return true;
                }
                // Module-scope defines imported into a visible file's model
                // are visible from it even before their own file is loaded.
                d.scope.span.start == 0
                    && self
                        .contributors
                        .get(&d.defined_at)
                        .is_some_and(|from| from.iter().any(|f| seen_files.contains(f)))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Per-file access
    // -----------------------------------------------------------------------

    pub fn tree(&self, file: &str) -> Option<&ModuleTree> {
        self.trees.get(file)
    }

    /// Every loaded tree, keyed by file.
    pub fn loaded_trees(&self) -> impl Iterator<Item = (&str, &ModuleTree)> {
        self.trees.iter().map(|(file, tree)| (file.as_str(), tree))
    }

    pub fn text(&self, file: &str) -> Option<&str> {
        self.texts.get(file).map(String::as_str)
    }

    pub fn line_map(&self, file: &str) -> Option<&LineMap> {
        self.line_maps.get(file)
    }

    pub fn is_source_file(&self, file: &str) -> bool {
        self.source_files.contains(file)
    }

    pub fn is_loaded(&self, file: &str) -> bool {
        self.loaded_files.contains(file)
    }

    pub fn module_loc(&self, qualified_name: &str) -> Option<&Loc> {
        self.modules.get(qualified_name)
    }

    pub fn modules(&self) -> impl Iterator<Item = (&String, &Loc)> {
        self.modules.iter()
    }

    /// The qualified module name of a loaded file, if its header was seen.
    pub fn module_name_of(&self, file: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|(_, loc)| loc.file == file)
            .map(|(name, _)| name.as_str())
    }

    /// The text under a location. Used for conservativeness checks and for
    /// reading names of use sites.
    pub fn text_at(&self, loc: &Loc) -> Option<&str> {
        let text = self.texts.get(&loc.file)?;
        text.get(loc.span.start as usize..loc.span.end as usize)
    }
}

impl Default for WorkspaceInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl WorkspaceInfo {
    /// Install a file's tree, text and model directly, bypassing the
    /// filesystem and the external collaborators.
    pub(crate) fn adopt_for_tests(
        &mut self,
        file: &str,
        text: &str,
        tree: ModuleTree,
        model: FileModel,
    ) {
        self.merge_model(file, model);
        self.register_module(&tree, text);
        self.file_scopes
            .insert(file.to_string(), Loc::whole_file(file, text.len() as u32));
        self.line_maps.insert(file.to_string(), LineMap::build(text));
        self.trees.insert(file.to_string(), tree);
        self.texts.insert(file.to_string(), text.to_string());
        self.source_files.insert(file.to_string());
        self.loaded_files.insert(file.to_string());
        self.loaded = LoadState::Full;
    }
}

/// The textual form of the qualified name under `id` (header or import).
fn qualified_name_text(tree: &ModuleTree, text: &str, id: crate::syntax::NodeId) -> String {
    let span = tree
        .child_of_kind(id, SyntaxKind::QualifiedName)
        .or_else(|| tree.child_of_kind(id, SyntaxKind::SimpleName))
        .and_then(|child| tree.get(child))
        .map(|n| n.span);
    match span {
        Some(span) => text
            .get(span.start as usize..span.end as usize)
            .unwrap_or("")
            .to_string(),
        None => String::new(),
    }
}

/// Range-scan helper: iterate entries of `file` whose span could contain
/// `offset` (start at or before it).
fn file_range<'a, V>(
    map: &'a BTreeMap<Loc, V>,
    file: &str,
    offset: u32,
) -> impl Iterator<Item = (&'a Loc, &'a V)> {
    let from = Loc::new(file, Span::at(0));
    let to = Loc::new(file, Span::new(offset, u32::MAX));
    map.range(from..=to)
}

fn smallest_key_containing<'a>(
    keys: impl Iterator<Item = &'a Loc>,
    file: &str,
    offset: u32,
) -> Option<Loc> {
    let mut best: Option<&Loc> = None;
    for loc in keys {
        if loc.file != file || !loc.span.contains(offset) {
            continue;
        }
        if best.is_none_or(|b| loc.len() < b.len()) {
            best = Some(loc);
        }
    }
    best.cloned()
}
