use crate::domain::config::Config;
use crate::domain::models::FileType;

/// Categories consulted before any other configured include category.
const PRIORITY_CATEGORIES: [&str; 3] = ["code", "docs", "config"];

/// Assigns a [`FileType`] to project-relative paths.
///
/// Classification depends only on the path and the configuration it was
/// built from; it never touches the file system.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    categories: Vec<(FileType, Vec<String>)>,
    binary_extensions: Vec<String>,
    project_markers: Vec<String>,
    max_size: u64,
}

impl FileClassifier {
    pub fn new(config: &Config) -> Self {
        let include = &config.files.include;
        let mut ordered_names: Vec<&str> = Vec::new();
        for name in PRIORITY_CATEGORIES {
            if include.get(name).is_some() {
                ordered_names.push(name);
            }
        }
        for name in include.names() {
            if !PRIORITY_CATEGORIES.contains(&name) {
                ordered_names.push(name);
            }
        }

        let categories = ordered_names
            .into_iter()
            .map(|name| {
                let extensions = include
                    .get(name)
                    .unwrap_or_default()
                    .iter()
                    .map(|ext| ext.to_lowercase())
                    .collect();
                (FileType::from_name(name), extensions)
            })
            .collect();

        Self {
            categories,
            binary_extensions: config
                .files
                .binary
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            project_markers: config.project.markers().map(str::to_string).collect(),
            max_size: config.files.binary.max_size,
        }
    }

    pub fn is_binary(&self, path: &str) -> bool {
        extension_of(path).is_some_and(|ext| self.binary_extensions.contains(&ext))
    }

    /// True when `size` exceeds the configured limit; a zero limit disables it.
    pub fn is_oversized(&self, size: u64) -> bool {
        self.max_size > 0 && size > self.max_size
    }

    /// Category from path rules alone, ignoring binary detection.
    pub fn classify(&self, path: &str) -> FileType {
        let (dir, file_name) = match path.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", path),
        };

        let is_root_config = dir.is_empty()
            && (file_name.starts_with('.')
                || self.project_markers.iter().any(|m| m == file_name)
                || file_name.to_lowercase().contains("config"));
        if dir.contains("config") || is_root_config {
            return FileType::Config;
        }

        if dir.starts_with("docs") || dir.ends_with("docs") {
            return FileType::Docs;
        }

        if let Some(ext) = extension_of(path) {
            let found = self
                .categories
                .iter()
                .find(|(_, extensions)| extensions.contains(&ext));
            if let Some((file_type, _)) = found {
                return file_type.clone();
            }
        }

        FileType::Text
    }

    /// Full classification for a file of `size` bytes: binary detection
    /// first, then the path rules.
    pub fn file_type(&self, path: &str, size: u64) -> FileType {
        if self.is_binary(path) || self.is_oversized(size) {
            FileType::Binary
        } else {
            self.classify(path)
        }
    }
}

/// Lowercased extension including the dot, taken after the last `.` of the
/// file name. Dot-files count as their own extension (`.eslintrc`).
pub fn extension_of(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rfind('.')
        .map(|idx| file_name[idx..].to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> FileClassifier {
        FileClassifier::new(&Config::default())
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("src/index.JS"), Some(".js".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some(".gz".to_string()));
        assert_eq!(extension_of(".eslintrc"), Some(".eslintrc".to_string()));
        assert_eq!(extension_of("v1.2/Makefile"), None);
    }

    #[test]
    fn test_detects_file_types() {
        let classifier = classifier();

        assert_eq!(classifier.classify("test.js"), FileType::Code);
        assert_eq!(classifier.classify("doc.md"), FileType::Docs);
        assert_eq!(classifier.classify("package.json"), FileType::Config);
        assert_eq!(classifier.classify("docs/data.json"), FileType::Docs);
        assert_eq!(classifier.classify("unknown.xyz"), FileType::Text);
    }

    #[test]
    fn test_project_scenario() {
        let classifier = classifier();

        assert_eq!(classifier.classify("README.md"), FileType::Docs);
        assert_eq!(classifier.classify("src/index.js"), FileType::Code);
        assert_eq!(classifier.classify("docs/api.md"), FileType::Docs);
    }

    #[test]
    fn test_config_rules() {
        let classifier = classifier();

        assert_eq!(classifier.classify(".eslintrc.json"), FileType::Config);
        assert_eq!(classifier.classify("webpack.Config.js"), FileType::Config);
        assert_eq!(classifier.classify("setup.py"), FileType::Config);
        assert_eq!(classifier.classify("src/config/db.js"), FileType::Config);
        assert_eq!(classifier.classify("app/configs/x.md"), FileType::Config);
        // Only root-level files get the dot-file and name rules.
        assert_eq!(classifier.classify("src/.hidden.js"), FileType::Code);
        assert_eq!(classifier.classify("src/appConfig.js"), FileType::Code);
    }

    #[test]
    fn test_docs_directory_rules() {
        let classifier = classifier();

        assert_eq!(classifier.classify("docs/intro.js"), FileType::Docs);
        assert_eq!(classifier.classify("api/docs/x.ts"), FileType::Docs);
        assert_eq!(classifier.classify("docsite/page.ts"), FileType::Docs);
        assert_eq!(classifier.classify("src/mydocs/a.py"), FileType::Docs);
    }

    #[test]
    fn test_extension_priority_code_docs_config() {
        let classifier = classifier();

        // .json is listed under docs and config; docs wins.
        assert_eq!(classifier.classify("src/data.json"), FileType::Docs);
        assert_eq!(classifier.classify("src/Cargo.toml"), FileType::Config);
    }

    #[test]
    fn test_extra_categories_follow_priority_ones() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("guide/manual.adoc"),
            FileType::Category("asciidoc".to_string())
        );

        let mut config = Config::default();
        config
            .files
            .include
            .insert("markup", vec![".md".to_string(), ".rst".to_string()]);
        let classifier = FileClassifier::new(&config);
        assert_eq!(classifier.classify("notes/a.md"), FileType::Docs);
        assert_eq!(
            classifier.classify("notes/a.rst"),
            FileType::Category("markup".to_string())
        );
    }

    #[test]
    fn test_identifies_binary_files() {
        let classifier = classifier();

        assert!(classifier.is_binary("image.png"));
        assert!(classifier.is_binary("assets/photo.JPG"));
        assert!(classifier.is_binary("document.pdf"));
        assert!(!classifier.is_binary("script.js"));
        assert!(!classifier.is_binary("Makefile"));
    }

    #[test]
    fn test_file_type_short_circuits_binary_and_oversized() {
        let classifier = classifier();

        assert_eq!(classifier.file_type("config/logo.png", 10), FileType::Binary);
        assert_eq!(classifier.file_type("src/huge.js", 2_000_000), FileType::Binary);
        assert_eq!(classifier.file_type("src/small.js", 100), FileType::Code);

        let mut config = Config::default();
        config.files.binary.max_size = 0;
        let unlimited = FileClassifier::new(&config);
        assert_eq!(unlimited.file_type("src/huge.js", u64::MAX), FileType::Code);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let classifier = classifier();
        for path in ["README.md", "src/index.js", "a/b/c.unknown", ".env", "docs/x"] {
            assert_eq!(classifier.classify(path), classifier.classify(path));
        }
    }
}
