//! Where annotations come from: command-line literals, text files (one per
//! line) and JSON manifests mapping field names to annotations.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub label: String,
    pub annotation: String,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),
    #[error("glob pattern matched no files: {0}")]
    NoMatch(String),
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{}: {message}", path.display())]
    Json { path: PathBuf, message: String },
}

pub fn from_literals<I>(annotations: I) -> Vec<Entry>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    annotations
        .into_iter()
        .enumerate()
        .map(|(i, a)| Entry { label: format!("arg:{}", i + 1), annotation: a.as_ref().to_string() })
        .collect()
}

/// Expand patterns and load every matched file, in pattern order.
pub fn load_inputs<I>(patterns: I) -> Result<Vec<Entry>, SourceError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Vec::new();
    for path in resolve_file_path_patterns(patterns)? {
        let entries = load_file(&path)?;
        tracing::debug!(path = %path.display(), count = entries.len(), "loaded annotations");
        out.extend(entries);
    }
    Ok(out)
}

pub fn load_file(path: &Path) -> Result<Vec<Entry>, SourceError> {
    let source = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let fields = from_str_with_path::<IndexMap<String, String>>(&source)
            .map_err(|message| SourceError::Json { path: path.to_path_buf(), message })?;
        let shown = path.display();
        Ok(fields
            .into_iter()
            .map(|(field, annotation)| Entry { label: format!("{shown}#{field}"), annotation })
            .collect())
    } else {
        Ok(parse_lines(&path.display().to_string(), &source))
    }
}

/// One annotation per line; blank lines and `#` comments are skipped.
pub fn parse_lines(label: &str, source: &str) -> Vec<Entry> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            Some(Entry { label: format!("{label}:{}", i + 1), annotation: line.to_string() })
        })
        .collect()
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Deserialize with JSON-path context in error messages.
fn from_str_with_path<T: serde::de::DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, SourceError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(p) => {
                        matched_any = true;
                        out.push(p);
                    }
                    Err(e) => {
                        let path = e.path().to_path_buf();
                        return Err(SourceError::Io { path, source: e.into() });
                    }
                }
            }
            if !matched_any {
                return Err(SourceError::NoMatch(pattern.to_string()));
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
