use crate::domain::config::Config;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Content stored in place of binary or oversized files.
pub const BINARY_PLACEHOLDER: &str = "[Binary file]";

/// Semantic category assigned to a bundled file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    Code,
    Docs,
    Config,
    Text,
    Binary,
    /// Any extra include category from configuration (e.g. `asciidoc`).
    Category(String),
}

impl FileType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "code" => FileType::Code,
            "docs" => FileType::Docs,
            "config" => FileType::Config,
            "text" => FileType::Text,
            "binary" => FileType::Binary,
            other => FileType::Category(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FileType::Code => "code",
            FileType::Docs => "docs",
            FileType::Config => "config",
            FileType::Text => "text",
            FileType::Binary => "binary",
            FileType::Category(name) => name,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file discovered under the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedFile {
    /// Project-relative, forward-slash separated.
    pub path: String,
    pub full_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub source: CollectedFile,
    pub file_type: FileType,
    pub content: String,
}

impl ClassifiedFile {
    pub fn path(&self) -> &str {
        &self.source.path
    }
}

#[derive(Debug, Clone)]
pub struct BundleMetadata {
    pub created: DateTime<Utc>,
    pub project_path: PathBuf,
    pub config: Config,
}

#[derive(Debug, Clone)]
pub struct Bundle {
    pub metadata: BundleMetadata,
    pub files: Vec<ClassifiedFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleStats {
    pub total_files: usize,
    pub file_types: BTreeMap<String, usize>,
    /// Files dropped because they could not be read.
    pub skipped: usize,
}

impl BundleStats {
    pub fn from_files(files: &[ClassifiedFile], skipped: usize) -> Self {
        let mut file_types = BTreeMap::new();
        for file in files {
            *file_types.entry(file.file_type.to_string()).or_insert(0) += 1;
        }
        Self {
            total_files: files.len(),
            file_types,
            skipped,
        }
    }
}

/// Signals that a collected path still lies inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionWarning {
    OutputDirectoryLeak { path: String, output_dir: String },
}

impl fmt::Display for CollectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionWarning::OutputDirectoryLeak { path, output_dir } => write!(
                f,
                "collected file {} lies inside the output directory {}",
                path, output_dir
            ),
        }
    }
}

#[derive(Debug)]
pub struct BundleResult {
    pub output_path: PathBuf,
    pub stats: BundleStats,
    pub warnings: Vec<CollectionWarning>,
}

/// A file about to be written by the extractor; `path` is already validated
/// and relative to the extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    /// Counts of successfully extracted files per category.
    pub file_types: BTreeMap<String, usize>,
    pub failures: Vec<ExtractionFailure>,
}

impl ExtractionReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub(crate) fn record_success(&mut self, file_type: &str) {
        self.successful += 1;
        *self.file_types.entry(file_type.to_string()).or_insert(0) += 1;
    }

    pub(crate) fn record_failure(&mut self, path: &str, reason: String) {
        self.failed += 1;
        self.failures.push(ExtractionFailure {
            path: path.to_string(),
            reason,
        });
    }
}
