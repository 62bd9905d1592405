//! Shared fixtures for the integration tests.
//!
//! A fixture workspace materializes modules in a temp directory and serves
//! hand-assembled syntax trees and checker models for them, playing the
//! roles of the external parser and type-checker oracle.

use std::collections::HashMap;
use vela_rename::{
    CancellationToken, Define, FileModel, IdRole, Loc, ModuleParser, ModuleTree, NullProgress,
    OracleError, ParseError, PathConfig, RenameEngine, RenameError, RenameOutcome, RenameRequest,
    Span, TypeCheckOracle, TypeExpr,
};

pub struct FixtureWorkspace {
    dir: tempfile::TempDir,
    trees: HashMap<String, ModuleTree>,
    models: HashMap<String, FileModel>,
}

impl FixtureWorkspace {
    pub fn new() -> Self {
        FixtureWorkspace {
            dir: tempfile::tempdir().expect("create temp workspace"),
            trees: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// The single workspace folder.
    pub fn folder(&self) -> String {
        self.dir.path().to_string_lossy().into_owned()
    }

    /// Write a module file to disk; tree and model are installed separately
    /// once their locations are known.
    pub fn write(&self, rel: &str, text: &str) -> String {
        let path = self.dir.path().join(rel);
        std::fs::write(&path, text).expect("write fixture module");
        path.to_string_lossy().into_owned()
    }

    pub fn install(&mut self, path: &str, tree: ModuleTree, model: FileModel) {
        self.trees.insert(path.to_string(), tree);
        self.models.insert(path.to_string(), model);
    }

    /// Run a rename through the full driver pipeline.
    pub fn rename(
        &self,
        file: &str,
        offset: u32,
        new_name: &str,
    ) -> Result<RenameOutcome, RenameError> {
        self.rename_with(file, offset, new_name, CancellationToken::new())
    }

    /// As `rename`, with a caller-owned cancellation token.
    pub fn rename_with(
        &self,
        file: &str,
        offset: u32,
        new_name: &str,
        cancel: CancellationToken,
    ) -> Result<RenameOutcome, RenameError> {
        let parser = MapParser { trees: &self.trees };
        let oracle = MapOracle {
            models: &self.models,
        };
        let engine = RenameEngine::new(&oracle, &parser, &NullProgress, cancel);
        let request = RenameRequest {
            file: file.to_string(),
            offset,
            new_name: new_name.to_string(),
        };
        engine.rename_symbol(&request, &[self.folder()], &|_| PathConfig::default())
    }
}

struct MapParser<'a> {
    trees: &'a HashMap<String, ModuleTree>,
}

impl ModuleParser for MapParser<'_> {
    fn parse(&self, file: &str, _text: &str) -> Result<ModuleTree, ParseError> {
        self.trees.get(file).cloned().ok_or_else(|| ParseError {
            loc: Loc::new(file, Span::at(0)),
            message: "fixture has no tree for this file".to_string(),
        })
    }
}

struct MapOracle<'a> {
    models: &'a HashMap<String, FileModel>,
}

impl TypeCheckOracle for MapOracle<'_> {
    fn model(&self, files: &[String]) -> Result<Vec<(String, FileModel)>, OracleError> {
        files
            .iter()
            .map(|file| {
                self.models
                    .get(file)
                    .cloned()
                    .map(|m| (file.clone(), m))
                    .ok_or_else(|| OracleError::new(format!("no model for {file}")))
            })
            .collect()
    }
}

/// Byte span of the `nth` occurrence of `needle` in `text` (0-based).
pub fn span_of(text: &str, needle: &str, nth: usize) -> Span {
    let mut from = 0usize;
    for _ in 0..nth {
        let hit = text[from..].find(needle).expect("occurrence exists");
        from += hit + needle.len();
    }
    let hit = text[from..].find(needle).expect("occurrence exists");
    let start = (from + hit) as u32;
    Span::from_len(start, needle.len() as u32)
}

/// Span of `name` inside the first occurrence of `context`. Keeps test
/// positions readable when a short name occurs all over the module.
pub fn name_in(text: &str, context: &str, name: &str) -> Span {
    let ctx_start = text.find(context).expect("context exists");
    let ctx = &text[ctx_start..ctx_start + context.len()];
    let rel = ctx.find(name).expect("name inside context");
    Span::from_len((ctx_start + rel) as u32, name.len() as u32)
}

pub fn define(scope: Loc, name: &str, role: IdRole, at: Loc, tipe: TypeExpr) -> Define {
    Define {
        scope,
        name: name.to_string(),
        role,
        defined_at: at,
        tipe,
    }
}

pub fn int_type() -> TypeExpr {
    TypeExpr::Atom("int".to_string())
}

pub fn fun_int_to_int() -> TypeExpr {
    TypeExpr::Function {
        params: vec![int_type()],
        ret: Box::new(int_type()),
    }
}
