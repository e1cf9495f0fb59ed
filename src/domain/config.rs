use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Fully resolved bundler configuration.
///
/// Every section falls back to its defaults when missing, so a partial JSON
/// document deserializes into a complete value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub output: OutputConfig,
    pub files: FilesConfig,
    pub project: ProjectConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    pub directory: String,
    pub filename: String,
    pub timestamped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilesConfig {
    pub include: CategoryRules,
    pub exclude: ExcludeConfig,
    pub binary: BinaryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExcludeConfig {
    pub directories: Vec<String>,
    pub files: Vec<String>,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BinaryConfig {
    pub extensions: Vec<String>,
    /// Files larger than this many bytes are bundled as binary placeholders.
    /// Zero disables the limit.
    pub max_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    pub main_files: Vec<String>,
    pub type_rules: CategoryRules,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "./out".to_string(),
            filename: "project_bundle.txt".to_string(),
            timestamped: true,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        let include = [
            ("asciidoc", &[".adoc", ".asc", ".asciidoc"][..]),
            (
                "code",
                &[
                    ".js", ".jsx", ".ts", ".tsx", ".py", ".rb", ".java", ".cpp", ".html", ".css",
                    ".scss",
                ][..],
            ),
            ("docs", &[".md", ".json", ".yaml", ".yml"][..]),
            ("config", &[".json", ".yml", ".yaml", ".toml"][..]),
        ]
        .into_iter()
        .map(|(name, exts)| (name.to_string(), to_strings(exts)))
        .collect();

        Self {
            include,
            exclude: ExcludeConfig::default(),
            binary: BinaryConfig::default(),
        }
    }
}

impl Default for ExcludeConfig {
    fn default() -> Self {
        Self {
            directories: to_strings(&[
                "node_modules",
                ".git",
                "dist",
                "build",
                ".vercel",
                ".github",
                ".vscode",
            ]),
            files: to_strings(&[
                ".env",
                ".DS_Store",
                "package-lock.json",
                "yarn.lock",
                ".gitignore",
            ]),
            patterns: to_strings(&["*.log"]),
        }
    }
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            extensions: to_strings(&[
                ".png", ".jpg", ".jpeg", ".gif", ".pdf", ".mp4", ".mov", ".zip", ".tar", ".gz",
            ]),
            max_size: 1_048_576,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let type_rules = [
            ("node", &["package.json"][..]),
            ("python", &["requirements.txt", "setup.py"][..]),
            ("asciidoc", &[".adoc", ".asc"][..]),
        ]
        .into_iter()
        .map(|(name, entries)| (name.to_string(), to_strings(entries)))
        .collect();

        Self {
            main_files: to_strings(&["README.md"]),
            type_rules,
        }
    }
}

impl ProjectConfig {
    /// Filenames that mark a root-level file as project configuration
    /// (`package.json`, `setup.py`, ...). Extension-like rules are skipped.
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.type_rules
            .iter()
            .flat_map(|(_, entries)| entries.iter())
            .map(String::as_str)
            .filter(|entry| !entry.starts_with('.'))
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Ordered mapping of category name to a list of entries.
///
/// Serialized as a JSON object; key order is significant since it decides
/// classification precedence, so this keeps insertion order instead of
/// sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryRules(Vec<(String, Vec<String>)>);

impl CategoryRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the entries for `name`, keeping its position if present.
    pub fn insert(&mut self, name: impl Into<String>, entries: Vec<String>) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = entries,
            None => self.0.push((name, entries)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, entries)| entries.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    /// All entries across categories, first occurrence wins.
    pub fn all_entries(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for (_, entries) in &self.0 {
            for entry in entries {
                if !seen.contains(&entry.as_str()) {
                    seen.push(entry.as_str());
                }
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for CategoryRules {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut rules = CategoryRules::new();
        for (name, entries) in iter {
            rules.insert(name, entries);
        }
        rules
    }
}

impl Serialize for CategoryRules {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, entries) in &self.0 {
            map.serialize_entry(name, entries)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryRules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RulesVisitor;

        impl<'de> Visitor<'de> for RulesVisitor {
            type Value = CategoryRules;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category names to lists of strings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut rules = CategoryRules::new();
                while let Some((name, entries)) = access.next_entry::<String, Vec<String>>()? {
                    rules.insert(name, entries);
                }
                Ok(rules)
            }
        }

        deserializer.deserialize_map(RulesVisitor)
    }
}
