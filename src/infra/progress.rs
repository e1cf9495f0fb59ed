use crate::domain::models::FileType;
use crate::domain::progress::ProgressReporter;
use crossterm::{
    ExecutableCommand, cursor,
    terminal::{Clear, ClearType},
};
use log::{debug, error, info, warn};
use std::cell::Cell;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Reports progress through the `log` facade only.
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn file_scanned(&self, path: &str, matched: bool) {
        if matched {
            debug!("Found matching file: {}", path);
        }
    }

    fn scan_finished(&self, scanned: usize, matched: usize) {
        info!("Scanned {} files, {} matched", scanned, matched);
    }

    fn file_bundled(&self, path: &str, file_type: &FileType) {
        debug!("Processed: {} ({})", path, file_type);
    }

    fn file_skipped(&self, path: &str, reason: &str) {
        warn!("Could not process {}: {}", path, reason);
    }

    fn file_extracted(&self, path: &str, _file_type: &str) {
        debug!("Extracted: {}", path);
    }

    fn extraction_failed(&self, path: &str, reason: &str) {
        error!("Failed to extract {}: {}", path, reason);
    }
}

pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Spinner on stderr while scanning, then falls back to [`LogReporter`].
pub struct ConsoleProgress {
    start_time: Instant,
    update_interval: Duration,
    last_update: Cell<Instant>,
    scanned_count: Cell<usize>,
    matched_count: Cell<usize>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            update_interval: Duration::from_millis(250),
            last_update: Cell::new(Instant::now()),
            scanned_count: Cell::new(0),
            matched_count: Cell::new(0),
        }
    }

    pub fn scanned(&self) -> usize {
        self.scanned_count.get()
    }

    pub fn matched(&self) -> usize {
        self.matched_count.get()
    }

    fn files_per_sec(&self, elapsed: f32) -> f32 {
        if elapsed > 0.0 {
            self.scanned_count.get() as f32 / elapsed
        } else {
            0.0
        }
    }

    fn draw(&self) -> io::Result<()> {
        let now = Instant::now();
        if now.duration_since(self.last_update.get()) < self.update_interval {
            return Ok(());
        }
        self.last_update.set(now);

        let elapsed = now.duration_since(self.start_time).as_secs_f32();
        let spinner_idx =
            ((self.start_time.elapsed().as_millis() / 100) % SPINNER_CHARS.len() as u128) as usize;

        let mut stderr = io::stderr();
        stderr.execute(cursor::SavePosition)?;
        stderr.execute(Clear(ClearType::CurrentLine))?;
        write!(
            stderr,
            "{} Scanning files: {} scanned, {} matched ({:.1} files/sec)",
            SPINNER_CHARS[spinner_idx],
            self.scanned_count.get(),
            self.matched_count.get(),
            self.files_per_sec(elapsed)
        )?;
        stderr.flush()?;
        stderr.execute(cursor::RestorePosition)?;
        Ok(())
    }

    fn finish(&self) -> io::Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let mut stderr = io::stderr();
        stderr.execute(Clear(ClearType::CurrentLine))?;
        writeln!(
            stderr,
            "✓ Scan complete: {} files scanned, {} files matched in {:.1}s ({:.1} files/sec)",
            self.scanned_count.get(),
            self.matched_count.get(),
            elapsed,
            self.files_per_sec(elapsed)
        )
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn file_scanned(&self, path: &str, matched: bool) {
        self.scanned_count.set(self.scanned_count.get() + 1);
        if matched {
            self.matched_count.set(self.matched_count.get() + 1);
        }
        LogReporter.file_scanned(path, matched);
        // Terminal trouble must not fail the scan.
        if let Err(e) = self.draw() {
            debug!("Progress display failed: {}", e);
        }
    }

    fn scan_finished(&self, scanned: usize, matched: usize) {
        if let Err(e) = self.finish() {
            debug!("Progress display failed: {}", e);
        }
        LogReporter.scan_finished(scanned, matched);
    }

    fn file_bundled(&self, path: &str, file_type: &FileType) {
        LogReporter.file_bundled(path, file_type);
    }

    fn file_skipped(&self, path: &str, reason: &str) {
        LogReporter.file_skipped(path, reason);
    }

    fn file_extracted(&self, path: &str, file_type: &str) {
        LogReporter.file_extracted(path, file_type);
    }

    fn extraction_failed(&self, path: &str, reason: &str) {
        LogReporter.extraction_failed(path, reason);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_progress_counts() {
        let progress = ConsoleProgress::new();

        progress.file_scanned("a.js", true);
        progress.file_scanned("b.bin", false);
        progress.file_scanned("c.md", true);

        assert_eq!(progress.scanned(), 3);
        assert_eq!(progress.matched(), 2);
    }

    #[test]
    fn test_files_per_sec_handles_zero_elapsed() {
        let progress = ConsoleProgress::new();
        assert_eq!(progress.files_per_sec(0.0), 0.0);
    }

    #[test]
    fn test_recording_reporter_filters_by_kind() {
        let recorder = testing::RecordingReporter::default();
        recorder.file_scanned("a.js", true);
        recorder.file_skipped("b.js", "unreadable");

        assert_eq!(recorder.events_of("matched"), vec!["a.js".to_string()]);
        assert_eq!(recorder.events_of("skipped"), vec!["b.js".to_string()]);
    }
}
