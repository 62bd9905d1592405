//! End-to-end rename scenarios through the full driver pipeline.

mod common;

use common::{FixtureWorkspace, define, fun_int_to_int, int_type, name_in, span_of};
use vela_rename::{
    CancellationToken, DocumentEdit, FileModel, IdRole, IllegalRenameReason, LineMap, Loc,
    ModuleTree, RenameError, Span, SyntaxKind, TreeBuilder, TypeExpr,
};

// ---------------------------------------------------------------------------
// Module M: a top-level variable, a clashing sibling, and a function whose
// parameter shadows the variable's name.
// ---------------------------------------------------------------------------

const M_TEXT: &str = "module M\nint a = 1;\nint b = 2;\nint f(int a) { return a; }";

fn build_m(path: &str) -> (ModuleTree, FileModel) {
    let t = M_TEXT;
    let header_name = name_in(t, "module M", "M");
    let a_def = name_in(t, "int a = 1;", "a");
    let b_def = name_in(t, "int b = 2;", "b");
    let f_def = name_in(t, "int f(", "f");
    let p_def = name_in(t, "(int a)", "a");
    let a_use = name_in(t, "return a", "a");
    let fun_span = span_of(t, "int f(int a) { return a; }", 0);

    let mut b = TreeBuilder::new(path);
    let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
    let header = b.add(SyntaxKind::ModuleHeader, span_of(t, "module M", 0), &[hn]);
    let an = b.add(SyntaxKind::SimpleName, a_def, &[]);
    let ad = b.add(SyntaxKind::VariableDeclaration, span_of(t, "int a = 1;", 0), &[an]);
    let bn = b.add(SyntaxKind::SimpleName, b_def, &[]);
    let bd = b.add(SyntaxKind::VariableDeclaration, span_of(t, "int b = 2;", 0), &[bn]);
    let fname = b.add(SyntaxKind::SimpleName, f_def, &[]);
    let pname = b.add(SyntaxKind::SimpleName, p_def, &[]);
    let formal = b.add(SyntaxKind::Formal, span_of(t, "int a", 1), &[pname]);
    let sig = b.add(SyntaxKind::Signature, span_of(t, "int f(int a)", 0), &[fname, formal]);
    let ua = b.add(SyntaxKind::SimpleName, a_use, &[]);
    let body = b.add(SyntaxKind::Block, span_of(t, "{ return a; }", 0), &[ua]);
    let fun = b.add(SyntaxKind::FunctionDeclaration, fun_span, &[sig, body]);
    let root = b.add(
        SyntaxKind::Module,
        Span::new(0, t.len() as u32),
        &[header, ad, bd, fun],
    );
    let tree = b.build(root);

    let file_scope = Loc::whole_file(path, t.len() as u32);
    let fun_scope = Loc::new(path, fun_span);
    let model = FileModel {
        defines: vec![
            define(
                file_scope.clone(),
                "M",
                IdRole::ModuleName,
                Loc::new(path, header_name),
                TypeExpr::ModuleType { name: "M".into() },
            ),
            define(file_scope.clone(), "a", IdRole::Variable, Loc::new(path, a_def), int_type()),
            define(file_scope.clone(), "b", IdRole::Variable, Loc::new(path, b_def), int_type()),
            define(
                file_scope.clone(),
                "f",
                IdRole::Function,
                Loc::new(path, f_def),
                fun_int_to_int(),
            ),
            define(fun_scope.clone(), "a", IdRole::Parameter, Loc::new(path, p_def), int_type()),
        ],
        use_def: vec![(Loc::new(path, a_use), vec![Loc::new(path, p_def)])],
        facts: vec![],
        scopes: vec![(fun_scope, file_scope)],
        messages: vec![],
    };
    (tree, model)
}

fn fixture_m() -> (FixtureWorkspace, String) {
    let mut fixture = FixtureWorkspace::new();
    let path = fixture.write("M.vela", M_TEXT);
    let (tree, model) = build_m(&path);
    fixture.install(&path, tree, model);
    (fixture, path)
}

/// Assert that a changed edit's replacements all land on `old_name` in
/// `text`, and return their byte spans.
fn edit_spans(edits: &[vela_rename::TextEdit], text: &str, old_name: &str) -> Vec<Span> {
    let line_map = LineMap::build(text);
    edits
        .iter()
        .map(|edit| {
            let start = line_map.offset(edit.range.start, text).unwrap();
            let end = line_map.offset(edit.range.end, text).unwrap();
            assert_eq!(
                &text[start as usize..end as usize],
                old_name,
                "replacement must land on the old name"
            );
            Span::new(start, end)
        })
        .collect()
}

#[test]
fn s1_renaming_local_parameter_touches_only_the_function() {
    let (fixture, path) = fixture_m();
    // A file mentioning `a` with no tree or model registered: if the
    // engine tried a full workspace load it would fail on it.
    fixture.write("Stray.vela", "module Stray\nint a = 0;\n");

    let p_def = name_in(M_TEXT, "(int a)", "a");
    let outcome = fixture.rename(&path, p_def.start, "x").expect("rename succeeds");

    assert_eq!(outcome.edits.len(), 1, "exactly one changed document");
    let DocumentEdit::Changed { file, edits } = &outcome.edits[0] else {
        panic!("expected a changed edit, got {:?}", outcome.edits[0]);
    };
    assert_eq!(file, &path);
    assert!(edits.iter().all(|e| e.new_text == "x"));

    let spans = edit_spans(edits, M_TEXT, "a");
    let a_use = name_in(M_TEXT, "return a", "a");
    assert!(spans.contains(&p_def), "signature occurrence is renamed");
    assert!(spans.contains(&a_use), "body occurrence is renamed");
    assert_eq!(spans.len(), 2, "the module-level a is untouched");
}

#[test]
fn s2_renaming_to_sibling_name_is_double_declaration() {
    let (fixture, path) = fixture_m();
    let a_def = name_in(M_TEXT, "int a = 1;", "a");
    let b_def = name_in(M_TEXT, "int b = 2;", "b");

    let err = fixture.rename(&path, a_def.start, "b").expect_err("rename must fail");
    let RenameError::Illegal(reasons) = err else {
        panic!("expected an illegal rename, got {err:?}");
    };
    assert!(
        reasons.iter().any(|r| matches!(
            r,
            IllegalRenameReason::DoubleDeclaration { current, conflicts }
                if *current == Loc::new(&path, a_def)
                    && conflicts.contains(&Loc::new(&path, b_def))
        )),
        "expected a double declaration with both witnesses, got {reasons:?}"
    );
}

#[test]
fn s3_renaming_variable_onto_function_cannot_overload() {
    let (fixture, path) = fixture_m();
    let a_def = name_in(M_TEXT, "int a = 1;", "a");

    let err = fixture.rename(&path, a_def.start, "f").expect_err("rename must fail");
    let RenameError::Illegal(reasons) = err else {
        panic!("expected an illegal rename, got {err:?}");
    };
    assert!(
        reasons
            .iter()
            .any(|r| matches!(r, IllegalRenameReason::DoubleDeclaration { .. })),
        "a variable and a function cannot overload: {reasons:?}"
    );
}

#[test]
fn s4_identity_rename_is_an_empty_success() {
    let (fixture, path) = fixture_m();
    let a_def = name_in(M_TEXT, "int a = 1;", "a");

    let outcome = fixture.rename(&path, a_def.start, "a").expect("identity rename never fails");
    assert!(outcome.edits.is_empty());
    assert!(outcome.change_annotations.is_empty());
}

#[test]
fn invalid_new_name_is_rejected_with_a_witness() {
    let (fixture, path) = fixture_m();
    let p_def = name_in(M_TEXT, "(int a)", "a");

    let err = fixture.rename(&path, p_def.start, "9bad").expect_err("rename must fail");
    let RenameError::Illegal(reasons) = err else {
        panic!("expected an illegal rename, got {err:?}");
    };
    assert!(reasons.contains(&IllegalRenameReason::InvalidName { name: "9bad".into() }));
}

// ---------------------------------------------------------------------------
// Modules D/Main: an ADT with positional fields, accessed across an import.
// ---------------------------------------------------------------------------

const DATA_TEXT: &str = "module M\ndata D = d(int foo, int baz);";
const MAIN_TEXT: &str = "module Main\nimport M;\nint g(D x) { return x.foo; }";

fn build_data(path: &str) -> (ModuleTree, FileModel) {
    let t = DATA_TEXT;
    let header_name = name_in(t, "module M", "M");
    let d_type = name_in(t, "data D", "D");
    let d_cons = name_in(t, "= d(", "d");
    let foo_def = name_in(t, "int foo", "foo");
    let baz_def = name_in(t, "int baz", "baz");
    let variant_span = span_of(t, "d(int foo, int baz)", 0);
    let decl_span = span_of(t, "data D = d(int foo, int baz);", 0);

    let mut b = TreeBuilder::new(path);
    let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
    let header = b.add(SyntaxKind::ModuleHeader, span_of(t, "module M", 0), &[hn]);
    let dn = b.add(SyntaxKind::SimpleName, d_type, &[]);
    let vn = b.add(SyntaxKind::SimpleName, d_cons, &[]);
    let foo_n = b.add(SyntaxKind::SimpleName, foo_def, &[]);
    let foo_f = b.add(SyntaxKind::Formal, span_of(t, "int foo", 0), &[foo_n]);
    let baz_n = b.add(SyntaxKind::SimpleName, baz_def, &[]);
    let baz_f = b.add(SyntaxKind::Formal, span_of(t, "int baz", 0), &[baz_n]);
    let variant = b.add(SyntaxKind::DataVariant, variant_span, &[vn, foo_f, baz_f]);
    let decl = b.add(SyntaxKind::DataDeclaration, decl_span, &[dn, variant]);
    let root = b.add(SyntaxKind::Module, Span::new(0, t.len() as u32), &[header, decl]);
    let tree = b.build(root);

    let file_scope = Loc::whole_file(path, t.len() as u32);
    let variant_scope = Loc::new(path, variant_span);
    let adt = TypeExpr::Adt {
        name: "D".into(),
        args: vec![],
    };
    let cons_type = TypeExpr::Function {
        params: vec![int_type(), int_type()],
        ret: Box::new(adt.clone()),
    };
    let model = FileModel {
        defines: vec![
            define(
                file_scope.clone(),
                "M",
                IdRole::ModuleName,
                Loc::new(path, header_name),
                TypeExpr::ModuleType { name: "M".into() },
            ),
            define(file_scope.clone(), "D", IdRole::DataType, Loc::new(path, d_type), adt),
            define(file_scope.clone(), "d", IdRole::Constructor, Loc::new(path, d_cons), cons_type),
            define(
                variant_scope.clone(),
                "foo",
                IdRole::ConstructorField,
                Loc::new(path, foo_def),
                int_type(),
            ),
            define(
                variant_scope.clone(),
                "baz",
                IdRole::ConstructorField,
                Loc::new(path, baz_def),
                int_type(),
            ),
        ],
        use_def: vec![],
        facts: vec![],
        scopes: vec![(variant_scope, file_scope)],
        messages: vec![],
    };
    (tree, model)
}

fn build_main(path: &str, data_path: &str) -> (ModuleTree, FileModel) {
    let t = MAIN_TEXT;
    let header_name = name_in(t, "module Main", "Main");
    let import_m = name_in(t, "import M", "M");
    let g_def = name_in(t, "int g(", "g");
    let d_use = name_in(t, "(D x)", "D");
    let x_def = name_in(t, "(D x)", "x");
    let x_use = name_in(t, "x.foo", "x");
    let foo_use = name_in(t, "x.foo", "foo");
    let fun_span = span_of(t, "int g(D x) { return x.foo; }", 0);

    let mut b = TreeBuilder::new(path);
    let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
    let header = b.add(SyntaxKind::ModuleHeader, span_of(t, "module Main", 0), &[hn]);
    let imp_n = b.add(SyntaxKind::SimpleName, import_m, &[]);
    let imp = b.add(SyntaxKind::Import, span_of(t, "import M;", 0), &[imp_n]);

    let gn = b.add(SyntaxKind::SimpleName, g_def, &[]);
    let dn = b.add(SyntaxKind::SimpleName, d_use, &[]);
    let d_type = b.add(SyntaxKind::Other, d_use, &[dn]);
    let xn = b.add(SyntaxKind::SimpleName, x_def, &[]);
    let formal = b.add(SyntaxKind::Formal, span_of(t, "D x", 0), &[d_type, xn]);
    let sig = b.add(SyntaxKind::Signature, span_of(t, "int g(D x)", 0), &[gn, formal]);
    let x_subj = b.add(SyntaxKind::SimpleName, x_use, &[]);
    let foo_n = b.add(SyntaxKind::SimpleName, foo_use, &[]);
    let access = b.add(SyntaxKind::FieldAccess, span_of(t, "x.foo", 0), &[x_subj, foo_n]);
    let body = b.add(SyntaxKind::Block, span_of(t, "{ return x.foo; }", 0), &[access]);
    let fun = b.add(SyntaxKind::FunctionDeclaration, fun_span, &[sig, body]);
    let root = b.add(
        SyntaxKind::Module,
        Span::new(0, t.len() as u32),
        &[header, imp, fun],
    );
    let tree = b.build(root);

    let file_scope = Loc::whole_file(path, t.len() as u32);
    let fun_scope = Loc::new(path, fun_span);
    let data_scope = Loc::whole_file(data_path, DATA_TEXT.len() as u32);
    let data_variant = Loc::new(data_path, span_of(DATA_TEXT, "d(int foo, int baz)", 0));
    let adt = TypeExpr::Adt {
        name: "D".into(),
        args: vec![],
    };
    let foo_in_data = Loc::new(data_path, name_in(DATA_TEXT, "int foo", "foo"));
    let d_in_data = Loc::new(data_path, name_in(DATA_TEXT, "data D", "D"));
    let model = FileModel {
        defines: vec![
            define(
                file_scope.clone(),
                "Main",
                IdRole::ModuleName,
                Loc::new(path, header_name),
                TypeExpr::ModuleType { name: "Main".into() },
            ),
            define(file_scope.clone(), "g", IdRole::Function, Loc::new(path, g_def), fun_int_to_int()),
            define(fun_scope.clone(), "x", IdRole::Parameter, Loc::new(path, x_def), adt.clone()),
            // Imported definitions travel with this module's model.
            define(data_scope.clone(), "D", IdRole::DataType, d_in_data.clone(), adt.clone()),
            define(
                data_variant.clone(),
                "foo",
                IdRole::ConstructorField,
                foo_in_data.clone(),
                int_type(),
            ),
        ],
        use_def: vec![
            (Loc::new(path, x_use), vec![Loc::new(path, x_def)]),
            (Loc::new(path, foo_use), vec![foo_in_data]),
            (Loc::new(path, d_use), vec![d_in_data]),
        ],
        facts: vec![(Loc::new(path, x_use), adt)],
        scopes: vec![(fun_scope, file_scope)],
        messages: vec![],
    };
    (tree, model)
}

fn fixture_data_main() -> (FixtureWorkspace, String, String) {
    let mut fixture = FixtureWorkspace::new();
    let data_path = fixture.write("M.vela", DATA_TEXT);
    let main_path = fixture.write("Main.vela", MAIN_TEXT);
    let (data_tree, data_model) = build_data(&data_path);
    let (main_tree, main_model) = build_main(&main_path, &data_path);
    fixture.install(&data_path, data_tree, data_model);
    fixture.install(&main_path, main_tree, main_model);
    (fixture, data_path, main_path)
}

#[test]
fn s5_field_rename_from_the_access_touches_both_modules() {
    let (fixture, data_path, main_path) = fixture_data_main();
    let foo_use = name_in(MAIN_TEXT, "x.foo", "foo");

    let outcome = fixture
        .rename(&main_path, foo_use.start, "qux")
        .expect("field rename succeeds");

    assert_eq!(outcome.edits.len(), 2, "one changed edit per module");
    for edit in &outcome.edits {
        let DocumentEdit::Changed { file, edits } = edit else {
            panic!("field renames produce only changed edits, got {edit:?}");
        };
        if file == &data_path {
            let spans = edit_spans(edits, DATA_TEXT, "foo");
            assert_eq!(spans, vec![name_in(DATA_TEXT, "int foo", "foo")]);
            assert!(
                edits.iter().all(|e| e.annotation.is_some()),
                "edits away from the cursor file carry the annotation"
            );
        } else {
            assert_eq!(file, &main_path);
            let spans = edit_spans(edits, MAIN_TEXT, "foo");
            assert_eq!(spans, vec![foo_use]);
        }
    }
    assert!(
        outcome.change_annotations.contains_key(vela_rename::edits::CROSS_FILE_ANNOTATION),
        "the annotation table describes the cross-file edits"
    );
}

#[test]
fn s5_field_rename_from_the_definition_touches_both_modules() {
    let (fixture, data_path, main_path) = fixture_data_main();
    let foo_def = name_in(DATA_TEXT, "int foo", "foo");

    let outcome = fixture
        .rename(&data_path, foo_def.start, "qux")
        .expect("field rename succeeds");

    let mut changed_files: Vec<&String> = outcome
        .edits
        .iter()
        .map(|e| match e {
            DocumentEdit::Changed { file, .. } => file,
            other => panic!("unexpected edit {other:?}"),
        })
        .collect();
    changed_files.sort();
    let mut expected = vec![&data_path, &main_path];
    expected.sort();
    assert_eq!(changed_files, expected);
}

#[test]
fn sibling_field_is_not_renamed() {
    let (fixture, data_path, _main_path) = fixture_data_main();
    let foo_def = name_in(DATA_TEXT, "int foo", "foo");

    let outcome = fixture
        .rename(&data_path, foo_def.start, "qux")
        .expect("field rename succeeds");
    for edit in &outcome.edits {
        if let DocumentEdit::Changed { file, edits } = edit
            && file == &data_path
        {
            let baz = name_in(DATA_TEXT, "int baz", "baz");
            let spans = edit_spans(edits, DATA_TEXT, "foo");
            assert!(!spans.contains(&baz), "baz must not be touched");
        }
    }
}

// ---------------------------------------------------------------------------
// Module rename: imports follow, and the file is renamed on disk.
// ---------------------------------------------------------------------------

const MOD_TEXT: &str = "module M\n";
const IMPORTER_TEXT: &str = "module Main\nimport M;\n";

fn build_plain_module(path: &str) -> (ModuleTree, FileModel) {
    let t = MOD_TEXT;
    let header_name = name_in(t, "module M", "M");
    let mut b = TreeBuilder::new(path);
    let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
    let header = b.add(SyntaxKind::ModuleHeader, span_of(t, "module M", 0), &[hn]);
    let root = b.add(SyntaxKind::Module, Span::new(0, t.len() as u32), &[header]);
    let tree = b.build(root);

    let file_scope = Loc::whole_file(path, t.len() as u32);
    let model = FileModel {
        defines: vec![define(
            file_scope,
            "M",
            IdRole::ModuleName,
            Loc::new(path, header_name),
            TypeExpr::ModuleType { name: "M".into() },
        )],
        ..FileModel::default()
    };
    (tree, model)
}

fn build_importer(path: &str, module_path: &str) -> (ModuleTree, FileModel) {
    let t = IMPORTER_TEXT;
    let header_name = name_in(t, "module Main", "Main");
    let import_m = name_in(t, "import M", "M");
    let mut b = TreeBuilder::new(path);
    let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
    let header = b.add(SyntaxKind::ModuleHeader, span_of(t, "module Main", 0), &[hn]);
    let imp_n = b.add(SyntaxKind::SimpleName, import_m, &[]);
    let imp = b.add(SyntaxKind::Import, span_of(t, "import M;", 0), &[imp_n]);
    let root = b.add(SyntaxKind::Module, Span::new(0, t.len() as u32), &[header, imp]);
    let tree = b.build(root);

    let file_scope = Loc::whole_file(path, t.len() as u32);
    let m_def = Loc::new(module_path, name_in(MOD_TEXT, "module M", "M"));
    let model = FileModel {
        defines: vec![
            define(
                file_scope,
                "Main",
                IdRole::ModuleName,
                Loc::new(path, header_name),
                TypeExpr::ModuleType { name: "Main".into() },
            ),
            define(
                Loc::whole_file(module_path, MOD_TEXT.len() as u32),
                "M",
                IdRole::ModuleName,
                m_def.clone(),
                TypeExpr::ModuleType { name: "M".into() },
            ),
        ],
        use_def: vec![(Loc::new(path, import_m), vec![m_def])],
        ..FileModel::default()
    };
    (tree, model)
}

fn fixture_module_rename() -> (FixtureWorkspace, String, String) {
    let mut fixture = FixtureWorkspace::new();
    let module_path = fixture.write("M.vela", MOD_TEXT);
    let importer_path = fixture.write("Main.vela", IMPORTER_TEXT);
    let (m_tree, m_model) = build_plain_module(&module_path);
    let (i_tree, i_model) = build_importer(&importer_path, &module_path);
    fixture.install(&module_path, m_tree, m_model);
    fixture.install(&importer_path, i_tree, i_model);
    (fixture, module_path, importer_path)
}

#[test]
fn s6_module_rename_rewrites_imports_and_renames_the_file() {
    let (fixture, module_path, importer_path) = fixture_module_rename();
    let header_m = name_in(MOD_TEXT, "module M", "M");

    let outcome = fixture
        .rename(&module_path, header_m.start, "N")
        .expect("module rename succeeds");

    let mut saw_header = false;
    let mut saw_import = false;
    let mut saw_file_rename = false;
    for edit in &outcome.edits {
        match edit {
            DocumentEdit::Changed { file, edits } if file == &module_path => {
                let spans = edit_spans(edits, MOD_TEXT, "M");
                assert_eq!(spans, vec![header_m]);
                saw_header = true;
            }
            DocumentEdit::Changed { file, edits } if file == &importer_path => {
                let spans = edit_spans(edits, IMPORTER_TEXT, "M");
                assert_eq!(spans, vec![name_in(IMPORTER_TEXT, "import M", "M")]);
                saw_import = true;
            }
            DocumentEdit::Renamed { from, to } => {
                assert_eq!(from, &module_path);
                assert!(to.ends_with("N.vela"), "new path derives from the new name: {to}");
                saw_file_rename = true;
            }
            other => panic!("unexpected edit {other:?}"),
        }
    }
    assert!(saw_header && saw_import && saw_file_rename);
}

#[test]
fn module_rename_onto_existing_module_path_is_rejected() {
    let (mut fixture, module_path, _importer_path) = fixture_module_rename();
    // An existing module N occupies the target path.
    let n_text = "module N\n";
    let n_path = fixture.write("N.vela", n_text);
    let (n_tree, n_model) = {
        let header_name = name_in(n_text, "module N", "N");
        let mut b = TreeBuilder::new(&n_path);
        let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
        let header = b.add(SyntaxKind::ModuleHeader, span_of(n_text, "module N", 0), &[hn]);
        let root = b.add(SyntaxKind::Module, Span::new(0, n_text.len() as u32), &[header]);
        let tree = b.build(root);
        let model = FileModel {
            defines: vec![define(
                Loc::whole_file(&n_path, n_text.len() as u32),
                "N",
                IdRole::ModuleName,
                Loc::new(&n_path, header_name),
                TypeExpr::ModuleType { name: "N".into() },
            )],
            ..FileModel::default()
        };
        (tree, model)
    };
    fixture.install(&n_path, n_tree, n_model);

    let header_m = name_in(MOD_TEXT, "module M", "M");
    let err = fixture
        .rename(&module_path, header_m.start, "N")
        .expect_err("colliding module rename must fail");
    let RenameError::Illegal(reasons) = err else {
        panic!("expected an illegal rename, got {err:?}");
    };
    assert!(
        reasons
            .iter()
            .any(|r| matches!(r, IllegalRenameReason::DoubleDeclaration { .. })),
        "a module path collision is a double declaration: {reasons:?}"
    );
}

// ---------------------------------------------------------------------------
// Pipeline-level behaviors
// ---------------------------------------------------------------------------

#[test]
fn cancelled_request_unwinds_with_cancelled() {
    let (fixture, path) = fixture_m();
    let token = CancellationToken::new();
    token.cancel();
    let p_def = name_in(M_TEXT, "(int a)", "a");
    let err = fixture
        .rename_with(&path, p_def.start, "x", token)
        .expect_err("cancelled request must not produce edits");
    assert_eq!(err, RenameError::Cancelled);
}

#[test]
fn cursor_file_with_type_errors_aborts() {
    let mut fixture = FixtureWorkspace::new();
    let path = fixture.write("Broken.vela", M_TEXT);
    let (tree, mut model) = build_m(&path);
    model.messages.push(vela_rename::CheckerMessage {
        loc: Loc::new(&path, Span::new(0, 1)),
        message: "undefined name q".into(),
        is_error: true,
    });
    fixture.install(&path, tree, model);

    let a_def = name_in(M_TEXT, "int a = 1;", "a");
    let err = fixture.rename(&path, a_def.start, "c").expect_err("broken file must abort");
    match err {
        RenameError::Unexpected(message) => {
            assert!(message.contains("type errors"), "got: {message}");
            assert!(message.contains("undefined name q"), "got: {message}");
        }
        other => panic!("expected an unexpected-failure abort, got {other:?}"),
    }
}

#[test]
fn cursor_file_outside_the_workspace_is_refused() {
    let (fixture, _path) = fixture_m();
    let err = fixture
        .rename("/nowhere/Q.vela", 0, "x")
        .expect_err("file outside the workspace folders");
    assert!(matches!(err, RenameError::Unexpected(_)), "got {err:?}");
}

#[test]
fn files_not_mentioning_either_name_are_never_loaded() {
    // The stray module has neither the old nor the new name in its text,
    // so the full load must screen it out; the fixture would fail the
    // request if the engine tried to parse it.
    const C_TEXT: &str = "module C\nint counter = 0;\nint next() { return counter; }";
    let mut fixture = FixtureWorkspace::new();
    let path = fixture.write("C.vela", C_TEXT);
    fixture.write("Stray.vela", "module Stray\nint unrelated = 1;\n");

    let t = C_TEXT;
    let header_name = name_in(t, "module C", "C");
    let counter_def = name_in(t, "int counter", "counter");
    let next_def = name_in(t, "int next(", "next");
    let counter_use = name_in(t, "return counter", "counter");
    let fun_span = span_of(t, "int next() { return counter; }", 0);

    let mut b = TreeBuilder::new(&path);
    let hn = b.add(SyntaxKind::SimpleName, header_name, &[]);
    let header = b.add(SyntaxKind::ModuleHeader, span_of(t, "module C", 0), &[hn]);
    let cn = b.add(SyntaxKind::SimpleName, counter_def, &[]);
    let cd = b.add(SyntaxKind::VariableDeclaration, span_of(t, "int counter = 0;", 0), &[cn]);
    let nn = b.add(SyntaxKind::SimpleName, next_def, &[]);
    let sig = b.add(SyntaxKind::Signature, span_of(t, "int next()", 0), &[nn]);
    let cu = b.add(SyntaxKind::SimpleName, counter_use, &[]);
    let body = b.add(SyntaxKind::Block, span_of(t, "{ return counter; }", 0), &[cu]);
    let fun = b.add(SyntaxKind::FunctionDeclaration, fun_span, &[sig, body]);
    let root = b.add(SyntaxKind::Module, Span::new(0, t.len() as u32), &[header, cd, fun]);
    let tree = b.build(root);

    let file_scope = Loc::whole_file(&path, t.len() as u32);
    let fun_scope = Loc::new(&path, fun_span);
    let model = FileModel {
        defines: vec![
            define(
                file_scope.clone(),
                "C",
                IdRole::ModuleName,
                Loc::new(&path, header_name),
                TypeExpr::ModuleType { name: "C".into() },
            ),
            define(
                file_scope.clone(),
                "counter",
                IdRole::Variable,
                Loc::new(&path, counter_def),
                int_type(),
            ),
            define(
                file_scope.clone(),
                "next",
                IdRole::Function,
                Loc::new(&path, next_def),
                fun_int_to_int(),
            ),
        ],
        use_def: vec![(Loc::new(&path, counter_use), vec![Loc::new(&path, counter_def)])],
        facts: vec![],
        scopes: vec![(fun_scope, file_scope)],
        messages: vec![],
    };
    fixture.install(&path, tree, model);

    let outcome = fixture
        .rename(&path, counter_def.start, "total")
        .expect("rename succeeds; the stray file is screened out");
    let DocumentEdit::Changed { edits, .. } = &outcome.edits[0] else {
        panic!("expected a changed edit");
    };
    let spans = edit_spans(edits, C_TEXT, "counter");
    assert_eq!(spans, vec![counter_def, counter_use]);
}

#[test]
fn cursor_on_whitespace_is_unsupported() {
    let (fixture, path) = fixture_m();
    // The `=` in `int a = 1;` is not a name.
    let eq = span_of(M_TEXT, "=", 0);
    let err = fixture.rename(&path, eq.start, "x").expect_err("no name under cursor");
    assert!(matches!(err, RenameError::Unsupported(_)), "got {err:?}");
}
