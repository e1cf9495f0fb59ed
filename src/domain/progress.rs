use crate::domain::models::FileType;

/// Per-file progress hooks for the collector, bundler and extractor.
///
/// Implementations are handed to each component at construction; the
/// default methods do nothing.
pub trait ProgressReporter {
    fn file_scanned(&self, _path: &str, _matched: bool) {}

    fn scan_finished(&self, _scanned: usize, _matched: usize) {}

    fn file_bundled(&self, _path: &str, _file_type: &FileType) {}

    fn file_skipped(&self, _path: &str, _reason: &str) {}

    fn file_extracted(&self, _path: &str, _file_type: &str) {}

    fn extraction_failed(&self, _path: &str, _reason: &str) {}
}
