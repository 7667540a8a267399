use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// One release entry: declared dependency ranges and the publish time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    dependencies: Option<BTreeMap<String, String>>,
    pub timestamp: String,
}

impl VersionRecord {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            dependencies: None,
            timestamp: timestamp.into(),
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), range.into());
        self
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .flatten()
            .map(|(name, range)| (name.as_str(), range.as_str()))
    }
}

/// A package and every version of it found in the input.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionRecord>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>, record: VersionRecord) -> Self {
        self.versions.insert(version.into(), record);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped { pkgs: Vec<PackageRecord> },
    Bare(Vec<PackageRecord>),
}

/// The normalized package dump produced by the ingestion pipeline.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub packages: Vec<PackageRecord>,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed package document {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Document {
    pub fn new(packages: Vec<PackageRecord>) -> Self {
        Self { packages }
    }

    /// Accepts either `{"pkgs": [...]}` or a bare array of package records.
    pub fn parse(content: &str) -> Result<Self, DocumentError> {
        Self::parse_from(content, "<input>")
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_from(&content, &path.display().to_string())
    }

    fn parse_from(content: &str, origin: &str) -> Result<Self, DocumentError> {
        let raw: RawDocument =
            serde_json::from_str(content).map_err(|source| DocumentError::Json {
                origin: origin.to_string(),
                source,
            })?;
        let packages = match raw {
            RawDocument::Wrapped { pkgs } => pkgs,
            RawDocument::Bare(pkgs) => pkgs,
        };
        Ok(Self { packages })
    }

    pub fn release_count(&self) -> usize {
        self.packages.iter().map(|pkg| pkg.versions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::document::{Document, DocumentError};

    #[test]
    fn parses_wrapped_document() {
        let doc = Document::parse(
            r#"{"pkgs": [{"name": "a", "versions": {
                "1.0.0": {"dependencies": {"b": "^1.0.0"}, "timestamp": "2020-01-01T00:00:00Z"}
            }}]}"#,
        )
        .expect("parse wrapped document");
        assert_eq!(doc.packages.len(), 1);
        let record = &doc.packages[0].versions["1.0.0"];
        assert_eq!(record.dependencies().collect::<Vec<_>>(), vec![("b", "^1.0.0")]);
    }

    #[test]
    fn parses_bare_array_with_null_dependencies() {
        let doc = Document::parse(
            r#"[{"name": "a", "versions": {
                "1.0.0": {"dependencies": null, "timestamp": "2020-01-01T00:00:00Z"},
                "1.1.0": {"timestamp": "2020-02-01T00:00:00Z"}
            }}]"#,
        )
        .expect("parse bare document");
        assert_eq!(doc.release_count(), 2);
        assert_eq!(doc.packages[0].versions["1.0.0"].dependencies().count(), 0);
    }

    #[test]
    fn malformed_document_is_fatal() {
        let err = Document::parse(r#"{"pkgs": "nope"}"#).expect_err("expected parse failure");
        assert!(matches!(err, DocumentError::Json { .. }));
        assert!(err.to_string().contains("<input>"));
    }
}
