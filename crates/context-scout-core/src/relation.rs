//! Heuristic relationship classification between two artifacts.
//!
//! [`detect_relation_type`] answers "how is `candidate` related to
//! `target`?" by evaluating a fixed, priority-ordered rule list and
//! returning the first match:
//!
//! | Priority | Relation | Base score | Needs both paths |
//! |----------|----------|-----------|------------------|
//! | 1 | `test_file` | 1.0 | yes |
//! | 2 | `documentation` | 0.9 | no |
//! | 3 | `symbol_ref` | 0.8 | no |
//! | 4 | `import` | 0.7 | yes |
//! | 5 | `commit_history` | 0.6 | (git miner only) |
//! | 6 | `similar_code` | 0.5 | yes |
//! | 99 | unknown (`""`) | 0.3 | — |
//!
//! Scores and priorities live in one table indexed by the enum, so sort
//! tie-breaks and base scores cannot drift apart.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::models::DocumentMetadata;

/// Closed set of relationships the engine can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    TestFile = 0,
    Documentation = 1,
    SymbolRef = 2,
    Import = 3,
    CommitHistory = 4,
    SimilarCode = 5,
    Unknown = 6,
}

/// Static properties of one [`RelationType`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationInfo {
    pub name: &'static str,
    pub base_score: f64,
    /// Lower sorts first.
    pub priority: u8,
}

const RELATION_TABLE: [RelationInfo; 7] = [
    RelationInfo { name: "test_file", base_score: 1.0, priority: 1 },
    RelationInfo { name: "documentation", base_score: 0.9, priority: 2 },
    RelationInfo { name: "symbol_ref", base_score: 0.8, priority: 3 },
    RelationInfo { name: "import", base_score: 0.7, priority: 4 },
    RelationInfo { name: "commit_history", base_score: 0.6, priority: 5 },
    RelationInfo { name: "similar_code", base_score: 0.5, priority: 6 },
    RelationInfo { name: "", base_score: 0.3, priority: 99 },
];

impl RelationType {
    pub const ALL: [RelationType; 7] = [
        RelationType::TestFile,
        RelationType::Documentation,
        RelationType::SymbolRef,
        RelationType::Import,
        RelationType::CommitHistory,
        RelationType::SimilarCode,
        RelationType::Unknown,
    ];

    pub fn info(self) -> &'static RelationInfo {
        &RELATION_TABLE[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        self.info().name
    }

    pub fn base_score(self) -> f64 {
        self.info().base_score
    }

    pub fn priority(self) -> u8 {
        self.info().priority
    }
}

impl Serialize for RelationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Order by score descending, then relation priority ascending.
pub fn compare_by_score_then_priority(
    a_score: f64,
    a_rel: RelationType,
    b_score: f64,
    b_rel: RelationType,
) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then(a_rel.priority().cmp(&b_rel.priority()))
}

const DOC_EXTENSIONS: &[&str] = &["md", "rst", "txt", "adoc", "asciidoc"];
const DOC_DIR_MARKERS: &[&str] = &["docs", "documentation", "wiki"];
const SYMBOL_CHUNK_TYPES: &[&str] = &["function", "class", "struct", "interface", "method"];
const CODE_EXTENSIONS: &[&str] = &[
    "go", "rs", "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "java", "kt", "kts", "scala", "c",
    "h", "cc", "cpp", "cxx", "hpp", "cs", "rb", "php", "swift", "m", "mm", "sh", "lua", "dart",
    "ex", "exs", "erl", "hs", "ml", "clj", "vue", "svelte", "sql",
];

/// Classify how `candidate` relates to `target`.
///
/// Deterministic and total: every input yields exactly one variant.
/// Test-file, import and similar-code rules require both paths to be
/// non-empty; documentation and symbol rules do not.
pub fn detect_relation_type(
    target: &str,
    candidate: &str,
    chunk_type: &str,
    metadata: &DocumentMetadata,
) -> RelationType {
    let both_paths = !target.is_empty() && !candidate.is_empty();

    if both_paths && is_test_pair(target, candidate) {
        return RelationType::TestFile;
    }
    if is_documentation(candidate) {
        return RelationType::Documentation;
    }
    if is_symbol_reference(chunk_type, metadata) {
        return RelationType::SymbolRef;
    }
    if both_paths && is_import_neighbor(target, candidate) {
        return RelationType::Import;
    }
    if both_paths && is_similar_code(target, candidate) {
        return RelationType::SimilarCode;
    }
    RelationType::Unknown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Go,
    JvmLike,
    Python,
    JavaScript,
    Rust,
}

fn language_of(ext: &str) -> Option<Language> {
    match ext {
        "go" => Some(Language::Go),
        "java" | "kt" | "kts" => Some(Language::JvmLike),
        "py" => Some(Language::Python),
        "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => Some(Language::JavaScript),
        "rs" => Some(Language::Rust),
        _ => None,
    }
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// File name without its final extension, lower-cased.
fn stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn directory(path: &str) -> &Path {
    Path::new(path).parent().unwrap_or_else(|| Path::new(""))
}

fn is_test_pair(target: &str, candidate: &str) -> bool {
    let (Some(lang_t), Some(lang_c)) = (
        language_of(&extension(target)),
        language_of(&extension(candidate)),
    ) else {
        return false;
    };
    if lang_t != lang_c {
        return false;
    }

    let t = stem(target);
    let c = stem(candidate);
    if t.is_empty() || c.is_empty() {
        return false;
    }

    match lang_t {
        Language::Go => is_affixed(&t, &c, "", "_test"),
        Language::JvmLike => is_affixed(&t, &c, "test", "") || is_affixed(&t, &c, "", "test"),
        Language::Python => is_affixed(&t, &c, "test_", "") || is_affixed(&t, &c, "", "_test"),
        Language::JavaScript => is_js_test_pair(&t, &c),
        Language::Rust => {
            Path::new(candidate)
                .parent()
                .is_some_and(|dir| dir.components().any(|part| part.as_os_str() == "tests"))
                && t == c
        }
    }
}

/// True when one name is the other with `prefix`/`suffix` added.
fn is_affixed(a: &str, b: &str, prefix: &str, suffix: &str) -> bool {
    let wraps = |long: &str, short: &str| {
        long.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .is_some_and(|core| core == short)
    };
    wraps(a, b) || wraps(b, a)
}

fn strip_js_test_marker(name: &str) -> Option<String> {
    [".test", ".spec"]
        .iter()
        .find(|marker| name.contains(*marker))
        .map(|marker| name.replacen(marker, "", 1))
}

fn is_js_test_pair(target: &str, candidate: &str) -> bool {
    match (strip_js_test_marker(target), strip_js_test_marker(candidate)) {
        (Some(cleaned), None) => cleaned == candidate,
        (None, Some(cleaned)) => cleaned == target,
        _ => false,
    }
}

fn is_documentation(candidate: &str) -> bool {
    if DOC_EXTENSIONS.contains(&extension(candidate).as_str()) {
        return true;
    }
    let dir = directory(candidate).to_string_lossy().to_lowercase();
    if DOC_DIR_MARKERS.iter().any(|marker| dir.contains(marker)) {
        return true;
    }
    file_name(candidate).starts_with("readme")
}

fn is_symbol_reference(chunk_type: &str, metadata: &DocumentMetadata) -> bool {
    SYMBOL_CHUNK_TYPES.contains(&chunk_type.to_lowercase().as_str())
        || metadata.symbol_name.is_some()
}

fn is_import_neighbor(target: &str, candidate: &str) -> bool {
    let ext = extension(target);
    if ext.is_empty() || ext != extension(candidate) {
        return false;
    }
    let dir_t = directory(target);
    let dir_c = directory(candidate);
    dir_t == dir_c || dir_t.starts_with(dir_c) || dir_c.starts_with(dir_t)
}

fn is_similar_code(target: &str, candidate: &str) -> bool {
    let ext = extension(target);
    ext == extension(candidate) && CODE_EXTENSIONS.contains(&ext.as_str())
}
