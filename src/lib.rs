//! Bundles a project's source tree into one XML-shaped document and
//! recreates the tree from such a document.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infra;

pub use crate::core::bundler::{Bundler, bundle};
pub use crate::core::config_resolver::{ConfigDiagnostic, ConfigResolution, resolve};
pub use crate::core::extractor::{Extractor, extract};
pub use crate::domain::config::Config;
pub use crate::domain::error::{BundleError, Result};
pub use crate::domain::models::{BundleResult, ExtractionReport, FileType};
pub use crate::domain::progress::ProgressReporter;
