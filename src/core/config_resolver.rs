//! Merging of partial configuration overrides onto a base [`Config`].
//!
//! Scalars in the override replace the base, lists are unioned with the base
//! order kept first, and objects merge recursively. Resolution never fails:
//! a bad override yields the base plus a [`ConfigDiagnostic`].

use crate::domain::config::Config;
use log::debug;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

/// Why an override was ignored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigDiagnostic {
    #[error("configuration is not valid JSON: {0}")]
    Malformed(String),

    #[error("configuration does not match the expected shape: {0}")]
    InvalidShape(String),

    #[error("could not read configuration file {}: {message}", path.display())]
    Unreadable { path: PathBuf, message: String },
}

#[derive(Debug, Clone)]
pub struct ConfigResolution {
    pub config: Config,
    pub diagnostic: Option<ConfigDiagnostic>,
}

impl ConfigResolution {
    pub fn resolved(config: Config) -> Self {
        Self {
            config,
            diagnostic: None,
        }
    }

    pub fn fallback(base: &Config, diagnostic: ConfigDiagnostic) -> Self {
        debug!("Falling back to base configuration: {}", diagnostic);
        Self {
            config: base.clone(),
            diagnostic: Some(diagnostic),
        }
    }
}

/// Merges a JSON override document onto `base`.
pub fn resolve(base: &Config, override_text: Option<&str>) -> ConfigResolution {
    let Some(text) = override_text else {
        return ConfigResolution::resolved(base.clone());
    };

    match serde_json::from_str::<Value>(text) {
        Ok(overlay) => resolve_value(base, &overlay),
        Err(e) => ConfigResolution::fallback(base, ConfigDiagnostic::Malformed(e.to_string())),
    }
}

/// Merges an already parsed override onto `base`.
pub fn resolve_value(base: &Config, overlay: &Value) -> ConfigResolution {
    let base_value = match serde_json::to_value(base) {
        Ok(value) => value,
        Err(e) => {
            return ConfigResolution::fallback(base, ConfigDiagnostic::InvalidShape(e.to_string()));
        }
    };

    if !overlay.is_object() {
        return ConfigResolution::fallback(
            base,
            ConfigDiagnostic::InvalidShape("top level must be an object".to_string()),
        );
    }

    let merged = merge_values(Some(&base_value), overlay);
    match serde_json::from_value::<Config>(merged) {
        Ok(config) => ConfigResolution::resolved(config),
        Err(e) => ConfigResolution::fallback(base, ConfigDiagnostic::InvalidShape(e.to_string())),
    }
}

/// Deep merge of `overlay` onto `base`. `null` values in the overlay are skipped.
pub fn merge_values(base: Option<&Value>, overlay: &Value) -> Value {
    match overlay {
        Value::Array(items) => {
            let base_items = base
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut merged: Vec<Value> = Vec::with_capacity(base_items.len() + items.len());
            for item in base_items.iter().chain(items) {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            Value::Array(merged)
        }
        Value::Object(fields) => {
            let mut merged: Map<String, Value> =
                base.and_then(Value::as_object).cloned().unwrap_or_default();
            for (key, value) in fields {
                if value.is_null() {
                    continue;
                }
                let next = merge_values(merged.get(key), value);
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        scalar => scalar.clone(),
    }
}
