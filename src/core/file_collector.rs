use crate::domain::config::Config;
use crate::domain::error::{BundleError, Result};
use crate::domain::models::{CollectedFile, CollectionWarning};
use crate::domain::progress::ProgressReporter;
use crate::infra::file_system::{absolute_path, normalize_path, relative_path, to_forward_slashes};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::WalkDir;

/// Files found by a collection run, plus any invariant violations noticed.
#[derive(Debug, Default)]
pub struct Collection {
    pub files: Vec<CollectedFile>,
    pub warnings: Vec<CollectionWarning>,
}

/// Turns include/exclude configuration into a list of project files.
pub struct FileCollector {
    project_root: PathBuf,
    output_dir: PathBuf,
    relative_output_dir: String,
    include_patterns: Vec<String>,
    ignore_patterns: Vec<String>,
    include: GlobSet,
    exclude: GlobSet,
    pruned_dirs: GlobSet,
    excluded_files: HashSet<String>,
    reporter: Rc<dyn ProgressReporter>,
}

impl FileCollector {
    pub fn new(
        project_root: &Path,
        config: &Config,
        reporter: Rc<dyn ProgressReporter>,
    ) -> Result<Self> {
        let project_root =
            absolute_path(project_root).map_err(|e| BundleError::io(project_root, e))?;
        if !project_root.is_dir() {
            return Err(BundleError::io(
                &project_root,
                io::Error::new(io::ErrorKind::NotFound, "project directory not found"),
            ));
        }
        let output_dir = normalize_path(&project_root.join(&config.output.directory));
        let relative_output_dir = relative_path(&project_root, &output_dir);

        info!("Project Path: {}", project_root.display());
        info!("Output Dir (absolute): {}", output_dir.display());
        info!("Output Dir (relative): {}", relative_output_dir);

        let include_patterns = include_patterns(config);
        let output_patterns = output_patterns(&relative_output_dir, &output_dir);
        let ignore_patterns = ignore_patterns(config, &output_patterns);
        debug!("Glob Patterns: {:?}", include_patterns);
        debug!("Ignore Patterns: {:?}", ignore_patterns);

        let mut dir_patterns: Vec<String> = config
            .files
            .exclude
            .directories
            .iter()
            .map(|dir| format!("**/{}", dir.trim_matches('/')))
            .collect();
        if !relative_output_dir.is_empty() {
            dir_patterns.push(escape_glob(&relative_output_dir));
        }

        Ok(Self {
            include: build_glob_set(&include_patterns)?,
            exclude: build_glob_set(&ignore_patterns)?,
            pruned_dirs: build_glob_set(&dir_patterns)?,
            excluded_files: config.files.exclude.files.iter().cloned().collect(),
            include_patterns,
            ignore_patterns,
            project_root,
            output_dir,
            relative_output_dir,
            reporter,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }

    pub fn ignore_patterns(&self) -> &[String] {
        &self.ignore_patterns
    }

    /// True when a project-relative path passes the include and exclude rules.
    pub fn is_selected(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.is_excluded(relative)
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.excluded_files.contains(relative) || self.exclude.is_match(relative)
    }

    fn relative(&self, path: &Path) -> String {
        to_forward_slashes(path.strip_prefix(&self.project_root).unwrap_or(path))
    }

    pub fn collect(&self) -> Result<Collection> {
        info!("Listing files in: {}", self.project_root.display());
        debug!("Output directory exists: {}", self.output_dir.exists());

        let walker = WalkDir::new(&self.project_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !self.pruned_dirs.is_match(self.relative(e.path()))
            });

        let mut collection = Collection::default();
        let mut scanned = 0;

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.project_root.clone());
                    return Err(BundleError::io(path, e.into()));
                }
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            scanned += 1;
            let relative = self.relative(entry.path());
            let matched = self.is_selected(&relative);
            self.reporter.file_scanned(&relative, matched);

            if matched {
                collection.files.push(CollectedFile {
                    path: relative,
                    full_path: entry.path().to_path_buf(),
                });
            }
        }

        collection.warnings = self.check_output_leaks(&collection.files);
        self.reporter
            .scan_finished(scanned, collection.files.len());
        info!("Files Found: {}", collection.files.len());
        Ok(collection)
    }

    fn check_output_leaks(&self, files: &[CollectedFile]) -> Vec<CollectionWarning> {
        if self.relative_output_dir.is_empty() {
            return Vec::new();
        }
        let prefix = format!("{}/", self.relative_output_dir);
        let dotted_prefix = format!("./{}", prefix);

        files
            .iter()
            .filter(|file| {
                file.path == self.relative_output_dir
                    || file.path.starts_with(&prefix)
                    || file.path.starts_with(&dotted_prefix)
            })
            .map(|file| {
                warn!("Found file from output directory: {}", file.path);
                CollectionWarning::OutputDirectoryLeak {
                    path: file.path.clone(),
                    output_dir: self.relative_output_dir.clone(),
                }
            })
            .collect()
    }
}

/// One recursive pattern per configured include extension.
pub fn include_patterns(config: &Config) -> Vec<String> {
    config
        .files
        .include
        .all_entries()
        .into_iter()
        .map(|ext| format!("**/*{ext}"))
        .collect()
}

fn output_patterns(relative_output_dir: &str, output_dir: &Path) -> Vec<String> {
    if relative_output_dir.is_empty() {
        return Vec::new();
    }
    let relative = escape_glob(relative_output_dir);
    let absolute = escape_glob(&to_forward_slashes(output_dir));
    vec![
        relative.clone(),
        format!("{relative}/**"),
        format!("./{relative}"),
        format!("./{relative}/**"),
        absolute.clone(),
        format!("{absolute}/**"),
    ]
}

/// Glob exclusions: output directory forms, excluded directories and free-form
/// patterns. Literal filenames are matched exactly and are not part of this list.
pub fn ignore_patterns(config: &Config, output_patterns: &[String]) -> Vec<String> {
    let exclude = &config.files.exclude;
    let directories = exclude
        .directories
        .iter()
        .map(|dir| format!("**/{}/**", dir.trim_matches('/')));
    let patterns = exclude.patterns.iter().map(|pattern| {
        if pattern.contains('/') {
            pattern.clone()
        } else {
            format!("**/{pattern}")
        }
    });

    output_patterns
        .iter()
        .cloned()
        .chain(directories)
        .chain(patterns)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Quotes glob metacharacters so a literal path can be used as a pattern.
fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        match c {
            '*' | '?' | '[' | ']' | '{' | '}' => {
                escaped.push('[');
                escaped.push(c);
                escaped.push(']');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| BundleError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| BundleError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}
