//! # Document Store & Corpus Merger
//!
//! Ingests compliance-profile documents from a list of input locations and
//! produces the [`Corpus`]: an insertion-ordered map from source path to
//! parsed document, plus one synthetic entry holding the deep merge of
//! every document in discovery order.
//!
//! A directory input is searched under the fixed profile conventions
//! (`SIMP/compliance_profiles` and `simp/compliance_profiles`) for `.yaml`,
//! `.yml`, and `.json` files; an explicit file path is parsed directly. Unreadable
//! or unparseable files are reported and skipped — only a location that
//! does not exist at all aborts the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

use cmlint_core::{Report, Value};

/// Key of the synthetic merged-view entry in the corpus.
///
/// The merged view participates in linting like any other document but is
/// never itself an input to the merge and never appears in [`Corpus::files`].
pub const MERGED_KEY: &str = "merged data";

/// Relative subpaths searched inside a directory input, in order.
pub const PROFILE_SUBDIRS: [&str; 2] = ["SIMP/compliance_profiles", "simp/compliance_profiles"];

/// Fatal ingestion failure.
#[derive(Error, Debug)]
pub enum LoadError {
    /// An input location is neither an existing file nor a directory.
    #[error("input location does not exist: {0}")]
    NotFound(PathBuf),
}

/// The parsed corpus: source documents plus the synthetic merged view.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: IndexMap<String, Value>,
}

impl Corpus {
    /// Every document, merged view included, in discovery order.
    pub fn documents(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.documents.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Source documents only, in discovery order.
    pub fn source_documents(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.documents()
            .filter(|(key, _)| *key != MERGED_KEY)
    }

    /// Paths of successfully loaded files, excluding the merged view.
    pub fn files(&self) -> Vec<&str> {
        self.source_documents().map(|(key, _)| key).collect()
    }

    /// The synthetic merged view. `Null` when no files loaded.
    pub fn merged(&self) -> &Value {
        static EMPTY: Value = Value::Null;
        self.documents.get(MERGED_KEY).unwrap_or(&EMPTY)
    }

    /// Look up one document by key (path or [`MERGED_KEY`]).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.documents.get(key)
    }

    /// True when no file produced a document.
    pub fn is_empty(&self) -> bool {
        self.files().is_empty()
    }
}

/// Build the corpus from a list of input locations.
///
/// Parse failures and unsupported extensions are appended to `report` as
/// errors and the file is excluded; the run continues.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] when a location exists neither as a
/// file nor as a directory.
pub fn load_corpus(paths: &[PathBuf], report: &mut Report) -> Result<Corpus, LoadError> {
    let mut discovered: Vec<PathBuf> = Vec::new();

    for location in paths {
        if location.is_dir() {
            for subdir in PROFILE_SUBDIRS {
                let root = location.join(subdir);
                if root.is_dir() {
                    discovered.extend(find_profile_files(&root));
                }
            }
        } else if location.is_file() {
            discovered.push(location.clone());
        } else {
            return Err(LoadError::NotFound(location.clone()));
        }
    }

    // Memoized by path: a file reachable through two input locations is
    // parsed once and appears once.
    let mut cache: HashMap<PathBuf, Value> = HashMap::new();
    let mut documents: IndexMap<String, Value> = IndexMap::new();

    for path in discovered {
        let key = path.display().to_string();
        if documents.contains_key(&key) {
            continue;
        }
        if let Some(parsed) = cache.get(&path) {
            documents.insert(key, parsed.clone());
            continue;
        }
        match parse_file(&path) {
            Ok(parsed) => {
                cache.insert(path, parsed.clone());
                documents.insert(key, parsed);
            }
            Err(reason) => {
                report.error(format!("{key}: {reason}"));
            }
        }
    }

    if !documents.is_empty() {
        let mut merged = Value::mapping();
        for document in documents.values() {
            merged.deep_merge(document);
        }
        documents.insert(MERGED_KEY.to_string(), merged);
    }

    Ok(Corpus { documents })
}

/// Parse a single file, selecting the format by extension.
fn parse_file(path: &Path) -> Result<Value, String> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension {
        "yaml" | "yml" => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read file: {e}"))?;
            let parsed: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| format!("invalid YAML: {e}"))?;
            Value::from_yaml(&parsed).map_err(|e| format!("invalid YAML: {e}"))
        }
        "json" => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read file: {e}"))?;
            let parsed: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| format!("invalid JSON: {e}"))?;
            Ok(Value::from_json(&parsed))
        }
        other => Err(format!("unsupported file extension '{other}'")),
    }
}

/// Recursively collect `.yaml`/`.yml`/`.json` files under `dir`, sorted
/// for a deterministic discovery order.
fn find_profile_files(dir: &Path) -> Vec<PathBuf> {
    let mut results = Vec::new();
    walk_profile_dir(dir, &mut results);
    results.sort();
    results
}

fn walk_profile_dir(dir: &Path, acc: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "failed to read directory during profile discovery"
            );
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            walk_profile_dir(&path, acc);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml") | Some("json")
        ) {
            acc.push(path);
        }
    }
}
