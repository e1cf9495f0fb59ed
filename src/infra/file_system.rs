use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Lexically resolves `.` and `..` components without touching the disk.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Makes `path` absolute against the current directory and normalizes it.
pub fn absolute_path(path: &Path) -> io::Result<PathBuf> {
    Ok(normalize_path(&std::path::absolute(path)?))
}

/// Joins path components with `/` regardless of the host separator.
pub fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .map(|c| match c {
            Component::RootDir => String::new(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
        .replace("//", "/")
}

/// Forward-slash path from `base` to `target`; both must be normalized and
/// absolute. Returns an empty string when they are the same directory.
pub fn relative_path(base: &Path, target: &Path) -> String {
    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        parts.push("..".to_string());
    }
    for component in &target_parts[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

pub fn read_file_bytes(path: &Path) -> io::Result<Vec<u8>> {
    debug!("Reading file contents: {}", path.display());
    let bytes = fs::read(path)?;
    debug!("Read {} bytes from file", bytes.len());
    Ok(bytes)
}

/// Decodes file bytes as UTF-8, replacing invalid sequences.
pub fn decode_text(path: &Path, bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "File {} is not valid UTF-8, invalid sequences replaced",
                path.display()
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// Writes `content`, creating parent directories and replacing any existing file.
pub fn write_text_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
