//! Identifier syntax, reserved words, and escaping.
//!
//! Vela reserves its keywords even in binding position; a reserved word can
//! still be used as a name by prefixing it with a single backslash
//! (`\data`). Name comparison throughout the engine is done on the escaped
//! prefix stripped, while generated edits always write the escaped form.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Keywords of the host language. A proposed new name equal to one of these
/// parses as an identifier only in escaped form.
static RESERVED: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "module", "import", "extend", "data", "alias", "syntax", "int", "bool", "str", "real",
        "void", "list", "set", "rel", "map", "tuple", "if", "else", "for", "while", "switch",
        "case", "return", "visit", "insert", "fail", "true", "false", "type", "value", "node",
        "public", "private", "test", "throws", "try", "catch",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` is a reserved word of the language.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(name)
}

/// Strip the escape prefix, if present. Names are compared in this form.
pub fn unescape(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

/// Escape a name for output: reserved words get a single backslash prefix,
/// everything else is emitted verbatim.
pub fn escape(name: &str) -> String {
    let bare = unescape(name);
    if is_reserved(bare) {
        format!("\\{bare}")
    } else {
        bare.to_string()
    }
}

fn is_name_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_name_part(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

fn is_word(name: &str, start: impl Fn(char) -> bool) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if start(first) => {}
        _ => return false,
    }
    chars.all(is_name_part)
}

/// The syntactic category a new name must parse as, determined by the roles
/// of the definitions being renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameCategory {
    /// Ordinary value/type identifier; reserved words only in escaped form.
    Identifier,
    /// Grammar nonterminal: upper-case initial letter.
    Nonterminal,
    /// Grammar nonterminal label: lower-case initial letter.
    NonterminalLabel,
}

/// Parse the (possibly escaped) `name` as the given category.
pub fn is_legal_name(name: &str, category: NameCategory) -> bool {
    let escaped = name.starts_with('\\');
    let bare = unescape(name);
    if bare.is_empty() {
        return false;
    }
    match category {
        NameCategory::Identifier => {
            if is_reserved(bare) && !escaped {
                return false;
            }
            is_word(bare, is_name_start)
        }
        // Grammar names never take the escape prefix.
        NameCategory::Nonterminal => !escaped && is_word(bare, |c| c.is_ascii_uppercase()),
        NameCategory::NonterminalLabel => !escaped && is_word(bare, |c| c.is_ascii_lowercase()),
    }
}
