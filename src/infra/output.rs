use crate::core::bundle_writer::write_bundle;
use crate::domain::models::{BundleResult, BundleStats, ExtractionReport};
use crossterm::{
    ExecutableCommand,
    style::{Color, ResetColor, SetForegroundColor},
};
use log::{debug, info};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

pub trait OutputWriter {
    fn write(&self, content: &str) -> anyhow::Result<()>;
}

pub struct FileWriter {
    path: PathBuf,
}

impl FileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl OutputWriter for FileWriter {
    fn write(&self, content: &str) -> anyhow::Result<()> {
        debug!("Writing output to file: {}", self.path.display());
        write_bundle(&self.path, content)?;
        info!("Output written to file: {}", self.path.display());
        Ok(())
    }
}

pub struct ConsoleWriter;

impl OutputWriter for ConsoleWriter {
    fn write(&self, content: &str) -> anyhow::Result<()> {
        debug!("Writing output to console");
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        Ok(())
    }
}

pub fn create_writer(output_path: Option<PathBuf>) -> Box<dyn OutputWriter> {
    match output_path {
        Some(path) => Box::new(FileWriter::new(path)) as Box<dyn OutputWriter>,
        None => Box::new(ConsoleWriter) as Box<dyn OutputWriter>,
    }
}

fn print_colored(color: Color, message: &str) -> io::Result<()> {
    let mut stderr = io::stderr();
    stderr.execute(SetForegroundColor(color))?;
    writeln!(stderr, "{}", message)?;
    stderr.execute(ResetColor)?;
    Ok(())
}

pub fn print_success(message: &str) -> io::Result<()> {
    print_colored(Color::Green, &format!("✓ {message}"))
}

pub fn print_warning(message: &str) -> io::Result<()> {
    print_colored(Color::Yellow, &format!("⚠ {message}"))
}

fn type_lines(file_types: &BTreeMap<String, usize>) -> Vec<String> {
    file_types
        .iter()
        .map(|(file_type, count)| format!("  {file_type}: {count}"))
        .collect()
}

pub fn bundle_summary(stats: &BundleStats) -> Vec<String> {
    let mut lines = vec![format!("Total files: {}", stats.total_files)];
    lines.extend(type_lines(&stats.file_types));
    if stats.skipped > 0 {
        lines.push(format!("Skipped (unreadable): {}", stats.skipped));
    }
    lines
}

pub fn extraction_summary(report: &ExtractionReport) -> Vec<String> {
    let mut lines = vec![
        format!("Total files: {}", report.total_files),
        format!("Extracted: {}", report.successful),
        format!("Failed: {}", report.failed),
    ];
    lines.extend(type_lines(&report.file_types));
    lines.extend(
        report
            .failures
            .iter()
            .map(|failure| format!("  ✗ {}: {}", failure.path, failure.reason)),
    );
    lines
}

pub fn print_bundle_result(result: &BundleResult) -> io::Result<()> {
    print_success(&format!("Bundle created: {}", result.output_path.display()))?;
    for warning in &result.warnings {
        print_warning(&warning.to_string())?;
    }
    let mut stderr = io::stderr();
    for line in bundle_summary(&result.stats) {
        writeln!(stderr, "{line}")?;
    }
    Ok(())
}

pub fn print_extraction_report(report: &ExtractionReport) -> io::Result<()> {
    if report.success() {
        print_success(&format!("Extracted {} files", report.successful))?;
    } else {
        print_warning(&format!(
            "Extracted {} of {} files, {} failed",
            report.successful, report.total_files, report.failed
        ))?;
    }
    let mut stderr = io::stderr();
    for line in extraction_summary(report) {
        writeln!(stderr, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ExtractionFailure;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_writer() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/bundle.txt");
        let writer = FileWriter::new(&path);
        let content = "Test output";

        writer.write(content).unwrap();

        let read_content = fs::read_to_string(path).unwrap();
        assert_eq!(read_content, content);
    }

    #[test]
    fn test_create_writer() {
        let file_writer = create_writer(Some(PathBuf::from("test.txt")));
        assert_eq!(
            std::any::type_name_of_val(&*file_writer),
            "dyn project_bundler::infra::output::OutputWriter"
        );

        let console_writer = create_writer(None);
        assert_eq!(
            std::any::type_name_of_val(&*console_writer),
            "dyn project_bundler::infra::output::OutputWriter"
        );
    }

    #[test]
    fn test_bundle_summary_lines() {
        let mut stats = BundleStats {
            total_files: 3,
            ..Default::default()
        };
        stats.file_types.insert("docs".to_string(), 2);
        stats.file_types.insert("code".to_string(), 1);

        assert_eq!(
            bundle_summary(&stats),
            vec!["Total files: 3", "  code: 1", "  docs: 2"]
        );

        stats.skipped = 2;
        assert_eq!(bundle_summary(&stats).last().unwrap(), "Skipped (unreadable): 2");
    }

    #[test]
    fn test_extraction_summary_lists_failures() {
        let report = ExtractionReport {
            total_files: 2,
            successful: 1,
            failed: 1,
            file_types: BTreeMap::from([("text".to_string(), 1)]),
            failures: vec![ExtractionFailure {
                path: "invalid/*/test.js".to_string(),
                reason: "invalid characters in path: invalid/*/test.js".to_string(),
            }],
        };

        let lines = extraction_summary(&report);

        assert_eq!(lines[0], "Total files: 2");
        assert!(lines.contains(&"  text: 1".to_string()));
        assert!(lines.last().unwrap().starts_with("  ✗ invalid/*/test.js"));
    }
}
