//! Bundle document rendering.
//!
//! The document is XML-shaped but deliberately escapes only `<` and `>`.
//! Quotes, apostrophes and ampersands are written verbatim so embedded
//! source stays readable; readers of the format rely on this exact policy.

use crate::domain::error::{BundleError, Result};
use crate::domain::models::{Bundle, BundleMetadata};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Escapes the two structural delimiters and nothing else.
pub fn minimal_escape(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// `created` in the form used inside the document, e.g. `2025-01-05T12:00:00.000Z`.
pub fn format_created(created: &DateTime<Utc>) -> String {
    created.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Filesystem-safe, sortable form of `created`, e.g. `2025-01-05_12-00-00-000`.
pub fn filename_timestamp(created: &DateTime<Utc>) -> String {
    created.format("%Y-%m-%d_%H-%M-%S-%3f").to_string()
}

/// Inserts `_<timestamp>` before the last extension of `filename`.
pub fn timestamped_filename(filename: &str, created: &DateTime<Utc>) -> String {
    let timestamp = filename_timestamp(created);
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_{timestamp}.{ext}"),
        None => format!("{filename}_{timestamp}"),
    }
}

pub fn output_path(
    output_dir: &Path,
    filename: &str,
    timestamped: bool,
    created: &DateTime<Utc>,
) -> PathBuf {
    debug!("Timestamp option: {}", timestamped);
    if timestamped {
        output_dir.join(timestamped_filename(filename, created))
    } else {
        output_dir.join(filename)
    }
}

fn metadata_value(metadata: &BundleMetadata) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    fields.insert(
        "created".to_string(),
        Value::String(format_created(&metadata.created)),
    );
    fields.insert(
        "projectPath".to_string(),
        Value::String(metadata.project_path.display().to_string()),
    );
    fields.insert("config".to_string(), serde_json::to_value(&metadata.config)?);
    Ok(fields)
}

/// Keeps element names parseable: anything outside `[A-Za-z0-9_.-]` becomes `_`.
fn element_name(key: &str) -> String {
    let name: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() { "_".to_string() } else { name }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Nested objects recurse, arrays are comma-joined, nulls are skipped.
fn render_object(fields: &Map<String, Value>, indent: &str, lines: &mut Vec<String>) {
    for (key, value) in fields {
        let name = element_name(key);
        match value {
            Value::Null => {}
            Value::Object(inner) => {
                lines.push(format!("{indent}<{name}>"));
                render_object(inner, &format!("{indent}  "), lines);
                lines.push(format!("{indent}</{name}>"));
            }
            Value::Array(items) => {
                let joined = items.iter().map(scalar_text).collect::<Vec<_>>().join(",");
                lines.push(format!("{indent}<{name}>{}</{name}>", minimal_escape(&joined)));
            }
            scalar => {
                lines.push(format!(
                    "{indent}<{name}>{}</{name}>",
                    minimal_escape(&scalar_text(scalar))
                ));
            }
        }
    }
}

pub fn serialize(bundle: &Bundle) -> Result<String> {
    debug!("Serializing bundle with {} files", bundle.files.len());
    let mut lines = vec![
        XML_DECLARATION.to_string(),
        "<bundle>".to_string(),
        "<metadata>".to_string(),
    ];
    render_object(&metadata_value(&bundle.metadata)?, "", &mut lines);
    lines.push("</metadata>".to_string());

    lines.push("<files>".to_string());
    for file in &bundle.files {
        lines.push(format!(
            "  <file path=\"{}\" type=\"{}\">",
            minimal_escape(file.path()),
            minimal_escape(file.file_type.as_str())
        ));
        lines.push(format!("    <content>{}</content>", minimal_escape(&file.content)));
        lines.push("  </file>".to_string());
    }
    lines.push("</files>".to_string());
    lines.push("</bundle>".to_string());

    Ok(lines.join("\n"))
}

/// Writes the document through a temp file in the target directory and
/// renames it into place, so a failed write never leaves a partial bundle.
pub fn write_bundle(path: &Path, content: &str) -> Result<()> {
    info!("Saving bundle to: {}", path.display());
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| BundleError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| BundleError::io(parent, e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| BundleError::io(temp.path().to_path_buf(), e))?;
    temp.persist(path)
        .map_err(|e| BundleError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::Config;
    use crate::domain::models::{ClassifiedFile, CollectedFile, FileType};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap()
    }

    fn bundle_with(files: Vec<(&str, FileType, &str)>) -> Bundle {
        Bundle {
            metadata: BundleMetadata {
                created: created(),
                project_path: PathBuf::from("/test/project"),
                config: Config::default(),
            },
            files: files
                .into_iter()
                .map(|(path, file_type, content)| ClassifiedFile {
                    source: CollectedFile {
                        path: path.to_string(),
                        full_path: PathBuf::from("/test/project").join(path),
                    },
                    file_type,
                    content: content.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_escapes_structural_characters() {
        let escaped = minimal_escape(r#"<script>alert("test");</script>"#);

        assert!(!escaped.contains("<script>"));
        assert_eq!(escaped, r#"&lt;script&gt;alert("test");&lt;/script&gt;"#);
    }

    #[test]
    fn test_minimal_escaping_is_pinned() {
        // Full entity escaping would break compatibility with existing readers.
        let text = r#"a && b || c != "d" && 'e'"#;
        assert_eq!(minimal_escape(text), text);
        assert_eq!(minimal_escape("&lt;"), "&lt;");
    }

    #[test]
    fn test_serialize_structure() {
        let bundle = bundle_with(vec![
            ("src/index.js", FileType::Code, "if (a < b && c > d) {}"),
            ("README.md", FileType::Docs, "# Test Project"),
        ]);

        let output = serialize(&bundle).unwrap();

        assert!(output.starts_with("<?xml"));
        assert!(output.contains("<bundle>"));
        assert!(output.ends_with("</bundle>"));
        assert!(output.contains("<created>2025-01-05T12:00:00.000Z</created>"));
        assert!(output.contains("<projectPath>/test/project</projectPath>"));
        assert!(output.contains("  <file path=\"src/index.js\" type=\"code\">"));
        assert!(output.contains("    <content>if (a &lt; b && c &gt; d) {}</content>"));
        assert!(output.contains("<content># Test Project</content>"));
    }

    #[test]
    fn test_metadata_renders_nested_config() {
        let output = serialize(&bundle_with(vec![])).unwrap();

        assert!(output.contains("<config>\n  <output>\n    <directory>./out</directory>"));
        assert!(output.contains("    <timestamped>true</timestamped>"));
        assert!(output.contains("      <code>.js,.jsx,.ts,.tsx,.py,.rb,.java,.cpp,.html,.css,.scss</code>"));
        assert!(output.contains("    <maxSize>1048576</maxSize>"));
        assert!(output.contains("<files>\n</files>"));
    }

    #[test]
    fn test_element_name_sanitizes_keys() {
        assert_eq!(element_name("typeRules"), "typeRules");
        assert_eq!(element_name("my category"), "my_category");
        assert_eq!(element_name(""), "_");
    }

    #[test]
    fn test_timestamped_output_path() {
        let dir = Path::new("/project/out");

        assert_eq!(
            output_path(dir, "project_bundle.txt", true, &created()),
            PathBuf::from("/project/out/project_bundle_2025-01-05_12-00-00-000.txt")
        );
        assert_eq!(
            output_path(dir, "bundle.v2.xml", true, &created()),
            PathBuf::from("/project/out/bundle.v2_2025-01-05_12-00-00-000.xml")
        );
        assert_eq!(
            output_path(dir, "bundle", true, &created()),
            PathBuf::from("/project/out/bundle_2025-01-05_12-00-00-000")
        );
        assert_eq!(
            output_path(dir, "project_bundle.txt", false, &created()),
            PathBuf::from("/project/out/project_bundle.txt")
        );
    }

    #[test]
    fn test_filename_timestamp_is_filesystem_safe() {
        let stamp = filename_timestamp(&created());
        assert!(!stamp.contains(':'));
        assert!(!stamp.contains('.'));
        assert!(!stamp.contains('T'));
        assert!(!stamp.contains('Z'));
    }

    #[test]
    fn test_write_bundle_creates_parents_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/out/bundle.txt");

        write_bundle(&path, "first").unwrap();
        write_bundle(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
