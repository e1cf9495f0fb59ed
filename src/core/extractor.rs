use crate::core::bundle_reader::{BundleEntry, parse_bundle};
use crate::domain::error::{BundleError, Result};
use crate::domain::models::{ExtractedFile, ExtractionReport};
use crate::domain::progress::ProgressReporter;
use crate::infra::file_system::write_text_file;
use log::{debug, info};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Characters rejected anywhere in an entry path: wildcards and characters
/// reserved on common file systems.
const RESERVED_PATH_CHARS: [char; 8] = ['*', '?', '<', '>', ':', '"', '|', '\0'];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("path is empty")]
    Empty,

    #[error("invalid characters in path: {0}")]
    InvalidCharacters(String),

    #[error("absolute paths are not allowed: {0}")]
    Absolute(String),

    #[error("path escapes the output directory: {0}")]
    EscapesRoot(String),
}

/// Validates a bundle entry path and turns it into a relative path that
/// stays under the extraction root. Both `/` and `\` count as separators.
pub fn validate_entry_path(path: &str) -> std::result::Result<PathBuf, PathRejection> {
    if path.trim().is_empty() {
        return Err(PathRejection::Empty);
    }
    if path.chars().any(|c| RESERVED_PATH_CHARS.contains(&c) || c.is_control()) {
        return Err(PathRejection::InvalidCharacters(path.to_string()));
    }
    if path.starts_with('/') || path.starts_with('\\') || Path::new(path).has_root() {
        return Err(PathRejection::Absolute(path.to_string()));
    }

    let mut relative = PathBuf::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(PathRejection::EscapesRoot(path.to_string())),
            name => relative.push(name),
        }
    }

    let only_normal = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if relative.as_os_str().is_empty() {
        return Err(PathRejection::Empty);
    }
    if !only_normal {
        return Err(PathRejection::EscapesRoot(path.to_string()));
    }
    Ok(relative)
}

/// Recreates a directory tree from bundle documents.
pub struct Extractor {
    output_root: PathBuf,
    reporter: Rc<dyn ProgressReporter>,
}

impl Extractor {
    pub fn new(output_root: impl Into<PathBuf>, reporter: Rc<dyn ProgressReporter>) -> Self {
        Self {
            output_root: output_root.into(),
            reporter,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Reads the bundle at `bundle_path` and extracts it.
    pub fn extract_file(&self, bundle_path: &Path) -> Result<ExtractionReport> {
        info!("Bundle: {}", bundle_path.display());
        let text =
            fs::read_to_string(bundle_path).map_err(|e| BundleError::io(bundle_path, e))?;
        self.extract(&text)
    }

    /// Extracts every entry of `bundle_text` under the output root.
    ///
    /// A document without a `<bundle>` envelope fails before anything is
    /// written. Entries with unsafe paths or failed writes are counted in the
    /// report and do not stop the remaining entries.
    pub fn extract(&self, bundle_text: &str) -> Result<ExtractionReport> {
        info!("Output: {}", self.output_root.display());
        let parsed = parse_bundle(bundle_text)?;

        fs::create_dir_all(&self.output_root)
            .map_err(|e| BundleError::io(&self.output_root, e))?;

        let mut report = ExtractionReport {
            total_files: parsed.entries.len(),
            ..Default::default()
        };

        for entry in &parsed.entries {
            let label = entry.path.as_deref().unwrap_or("<missing path>");
            match self.extract_entry(entry) {
                Ok(file) => {
                    debug!("Extracted: {}", file.path.display());
                    self.reporter.file_extracted(label, &entry.file_type);
                    report.record_success(&entry.file_type);
                }
                Err(reason) => {
                    self.reporter.extraction_failed(label, &reason);
                    report.record_failure(label, reason);
                }
            }
        }

        info!(
            "Extracted {} of {} files ({} failed)",
            report.successful, report.total_files, report.failed
        );
        Ok(report)
    }

    fn extract_entry(&self, entry: &BundleEntry) -> std::result::Result<ExtractedFile, String> {
        let raw_path = entry.path.as_deref().ok_or("file entry has no path")?;
        let path = validate_entry_path(raw_path).map_err(|e| e.to_string())?;
        let content = entry
            .content
            .as_ref()
            .ok_or("file entry has no content")?
            .text()
            .to_string();

        let file = ExtractedFile { path, content };
        let full_path = self.output_root.join(&file.path);
        write_text_file(&full_path, &file.content)
            .map_err(|e| format!("Error writing file: {e}"))?;
        Ok(file)
    }
}

/// Extracts `bundle_text` under `output_root`, reporting through the log.
pub fn extract(bundle_text: &str, output_root: &Path) -> Result<ExtractionReport> {
    Extractor::new(output_root, Rc::new(crate::infra::progress::LogReporter)).extract(bundle_text)
}
