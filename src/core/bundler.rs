use crate::core::bundle_writer::{output_path, serialize, write_bundle};
use crate::core::classifier::FileClassifier;
use crate::core::file_collector::FileCollector;
use crate::domain::config::Config;
use crate::domain::error::Result;
use crate::domain::models::{
    BINARY_PLACEHOLDER, Bundle, BundleMetadata, BundleResult, BundleStats, ClassifiedFile,
    CollectedFile, CollectionWarning, FileType,
};
use crate::domain::progress::ProgressReporter;
use crate::infra::file_system::{decode_text, file_size, read_file_bytes};
use chrono::Utc;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// An in-memory bundle with the numbers gathered while building it.
#[derive(Debug)]
pub struct BuiltBundle {
    pub bundle: Bundle,
    pub stats: BundleStats,
    pub warnings: Vec<CollectionWarning>,
}

/// Collects, classifies and reads project files into a [`Bundle`].
pub struct Bundler {
    config: Config,
    collector: FileCollector,
    classifier: FileClassifier,
    reporter: Rc<dyn ProgressReporter>,
}

impl Bundler {
    pub fn new(
        project_root: &Path,
        config: Config,
        reporter: Rc<dyn ProgressReporter>,
    ) -> Result<Self> {
        let collector = FileCollector::new(project_root, &config, reporter.clone())?;
        let classifier = FileClassifier::new(&config);
        Ok(Self {
            config,
            collector,
            classifier,
            reporter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        self.collector.project_root()
    }

    pub fn output_dir(&self) -> &Path {
        self.collector.output_dir()
    }

    pub fn create_metadata(&self) -> BundleMetadata {
        BundleMetadata {
            created: Utc::now(),
            project_path: self.project_root().to_path_buf(),
            config: self.config.clone(),
        }
    }

    pub fn output_path(&self, metadata: &BundleMetadata) -> PathBuf {
        output_path(
            self.output_dir(),
            &self.config.output.filename,
            self.config.output.timestamped,
            &metadata.created,
        )
    }

    /// Binary and oversized files get the placeholder and are never read.
    fn classify_file(&self, file: CollectedFile) -> std::result::Result<ClassifiedFile, String> {
        if file.path.contains('"') {
            return Err("path contains a double quote".to_string());
        }

        let file_type = if self.classifier.is_binary(&file.path) {
            FileType::Binary
        } else {
            let size = file_size(&file.full_path).map_err(|e| e.to_string())?;
            self.classifier.file_type(&file.path, size)
        };

        let content = if file_type == FileType::Binary {
            BINARY_PLACEHOLDER.to_string()
        } else {
            let bytes = read_file_bytes(&file.full_path).map_err(|e| e.to_string())?;
            decode_text(&file.full_path, bytes)
        };

        Ok(ClassifiedFile {
            source: file,
            file_type,
            content,
        })
    }

    /// Builds the bundle in memory. Unreadable files are skipped and counted.
    pub fn build(&self) -> Result<BuiltBundle> {
        let metadata = self.create_metadata();
        let collection = self.collector.collect()?;
        info!("Processing {} files", collection.files.len());

        let mut files = Vec::with_capacity(collection.files.len());
        let mut skipped = 0;
        for file in collection.files {
            let path = file.path.clone();
            match self.classify_file(file) {
                Ok(classified) => {
                    self.reporter.file_bundled(&path, &classified.file_type);
                    files.push(classified);
                }
                Err(reason) => {
                    self.reporter.file_skipped(&path, &reason);
                    skipped += 1;
                }
            }
        }

        let stats = BundleStats::from_files(&files, skipped);
        debug!("Bundle stats: {:?}", stats);
        Ok(BuiltBundle {
            bundle: Bundle { metadata, files },
            stats,
            warnings: collection.warnings,
        })
    }

    /// Builds, serializes and atomically writes the bundle.
    pub fn bundle(&self) -> Result<BundleResult> {
        let built = self.build()?;
        let output_path = self.output_path(&built.bundle.metadata);
        let document = serialize(&built.bundle)?;
        write_bundle(&output_path, &document)?;
        info!("Bundle created: {}", output_path.display());

        Ok(BundleResult {
            output_path,
            stats: built.stats,
            warnings: built.warnings,
        })
    }
}

/// Bundles `project_root` with `config`, reporting through the log.
pub fn bundle(project_root: &Path, config: Config) -> Result<BundleResult> {
    Bundler::new(project_root, config, Rc::new(crate::infra::progress::LogReporter))?.bundle()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::Extractor;
    use crate::infra::progress::SilentReporter;
    use crate::infra::progress::testing::RecordingReporter;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn test_project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "README.md", "# Test Project\n");
        write(root, "src/index.js", "console.log(\"Hello World\");\n");
        write(root, "docs/api.md", "# API Documentation\n");
        write(root, ".env", "SECRET=test");
        temp_dir
    }

    fn untimestamped() -> Config {
        let mut config = Config::default();
        config.output.timestamped = false;
        config
    }

    fn bundler(root: &Path, config: Config) -> Bundler {
        Bundler::new(root, config, Rc::new(SilentReporter)).unwrap()
    }

    fn bundled_paths(built: &BuiltBundle) -> Vec<&str> {
        built.bundle.files.iter().map(|f| f.path()).collect()
    }

    #[test]
    fn test_builds_project_scenario() {
        let temp_dir = test_project();
        let built = bundler(temp_dir.path(), untimestamped()).build().unwrap();

        assert_eq!(bundled_paths(&built), vec!["README.md", "docs/api.md", "src/index.js"]);
        let types: Vec<&FileType> = built.bundle.files.iter().map(|f| &f.file_type).collect();
        assert_eq!(types, vec![&FileType::Docs, &FileType::Docs, &FileType::Code]);
        assert_eq!(built.stats.total_files, 3);
        assert_eq!(built.stats.file_types.get("docs"), Some(&2));
        assert_eq!(built.stats.file_types.get("code"), Some(&1));
        assert_eq!(built.stats.skipped, 0);
        assert!(built.warnings.is_empty());
    }

    #[test]
    fn test_env_file_is_never_bundled() {
        let temp_dir = test_project();
        let mut config = untimestamped();
        config.files.include.insert("env", vec![".env".to_string()]);

        let result = bundler(temp_dir.path(), config).bundle().unwrap();
        let document = fs::read_to_string(&result.output_path).unwrap();

        assert!(!document.contains("path=\".env\""));
        assert!(!document.contains("SECRET=test"));
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let temp_dir = test_project();
        let root = temp_dir.path();
        write(root, "src/compare.ts", "if (a < b && b > c) { return \"<ok>\"; }\n");
        write(root, "src/quotes.py", "print('it''s' + \"x\") # a & b\n\n");

        let result = bundler(root, untimestamped()).bundle().unwrap();
        let extract_dir = TempDir::new().unwrap();
        let report = Extractor::new(extract_dir.path(), Rc::new(SilentReporter))
            .extract_file(&result.output_path)
            .unwrap();

        assert!(report.success());
        assert_eq!(report.total_files, result.stats.total_files);
        for relative in [
            "README.md",
            "docs/api.md",
            "src/index.js",
            "src/compare.ts",
            "src/quotes.py",
        ] {
            assert_eq!(
                fs::read(extract_dir.path().join(relative)).unwrap(),
                fs::read(root.join(relative)).unwrap(),
                "content of {relative} changed"
            );
        }
    }

    #[test]
    fn test_binary_files_get_placeholder() {
        let temp_dir = test_project();
        fs::write(temp_dir.path().join("logo.png"), [0x89, 0x50, 0x4e, 0x47, 0xff]).unwrap();
        let mut config = untimestamped();
        config.files.include.insert("images", vec![".png".to_string()]);

        let built = bundler(temp_dir.path(), config).build().unwrap();
        let logo = built
            .bundle
            .files
            .iter()
            .find(|f| f.path() == "logo.png")
            .unwrap();

        assert_eq!(logo.file_type, FileType::Binary);
        assert_eq!(logo.content, BINARY_PLACEHOLDER);
        assert_eq!(built.stats.file_types.get("binary"), Some(&1));
    }

    #[test]
    fn test_binary_files_need_an_include_extension() {
        let temp_dir = test_project();
        fs::write(temp_dir.path().join("logo.png"), [0x89, 0x50]).unwrap();

        let built = bundler(temp_dir.path(), untimestamped()).build().unwrap();
        assert!(!bundled_paths(&built).contains(&"logo.png"));
    }

    #[test]
    fn test_oversized_files_are_not_read() {
        let temp_dir = test_project();
        write(temp_dir.path(), "src/big.js", &"x".repeat(64));
        let mut config = untimestamped();
        config.files.binary.max_size = 32;

        let built = bundler(temp_dir.path(), config).build().unwrap();
        let big = built
            .bundle
            .files
            .iter()
            .find(|f| f.path() == "src/big.js")
            .unwrap();

        assert_eq!(big.file_type, FileType::Binary);
        assert_eq!(big.content, BINARY_PLACEHOLDER);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let temp_dir = test_project();
        fs::write(temp_dir.path().join("src/latin1.js"), b"caf\xe9").unwrap();

        let built = bundler(temp_dir.path(), untimestamped()).build().unwrap();
        let file = built
            .bundle
            .files
            .iter()
            .find(|f| f.path() == "src/latin1.js")
            .unwrap();

        assert_eq!(file.content, "caf\u{fffd}");
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_files_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = test_project();
        let locked = temp_dir.path().join("src/locked.js");
        fs::write(&locked, "secret").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&locked).is_ok() {
            // Running with privileges that ignore permissions.
            return;
        }

        let recorder = Rc::new(RecordingReporter::default());
        let built = Bundler::new(temp_dir.path(), untimestamped(), recorder.clone())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(built.stats.skipped, 1);
        assert_eq!(recorder.events_of("skipped"), vec!["src/locked.js".to_string()]);
        assert!(!bundled_paths(&built).contains(&"src/locked.js"));
    }

    #[test]
    fn test_second_run_excludes_previous_bundle() {
        let temp_dir = test_project();
        let mut config = untimestamped();
        config.output.filename = "bundle.md".to_string();

        let first = bundler(temp_dir.path(), config.clone()).bundle().unwrap();
        assert!(first.output_path.ends_with("out/bundle.md"));

        let second = bundler(temp_dir.path(), config).build().unwrap();
        assert!(!bundled_paths(&second).iter().any(|p| p.starts_with("out/")));
        assert_eq!(second.stats.total_files, first.stats.total_files);
    }

    #[test]
    fn test_timestamped_output_file() {
        let temp_dir = test_project();
        let result = bundler(temp_dir.path(), Config::default()).bundle().unwrap();

        let name = result.output_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("project_bundle_"));
        assert!(name.ends_with(".txt"));
        assert!(!name.contains(':'));
        assert!(result.output_path.exists());
        assert_eq!(result.output_path.parent().unwrap(), temp_dir.path().join("out"));
    }

    #[test]
    fn test_document_records_metadata() {
        let temp_dir = test_project();
        let result = bundle(temp_dir.path(), untimestamped()).unwrap();
        let document = fs::read_to_string(&result.output_path).unwrap();

        assert!(document.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(document.contains("<projectPath>"));
        assert!(document.contains("<filename>project_bundle.txt</filename>"));
        assert!(document.contains("  <file path=\"src/index.js\" type=\"code\">"));
    }

    #[test]
    fn test_missing_project_root_fails_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let result = bundle(&missing, untimestamped());

        assert!(matches!(result, Err(crate::domain::error::BundleError::Io { .. })));
        assert!(!missing.exists());
    }

    #[test]
    fn test_reports_bundled_files() {
        let temp_dir = test_project();
        let recorder = Rc::new(RecordingReporter::default());
        Bundler::new(temp_dir.path(), untimestamped(), recorder.clone())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            recorder.events_of("bundled"),
            vec!["README.md", "docs/api.md", "src/index.js"]
        );
    }
}
