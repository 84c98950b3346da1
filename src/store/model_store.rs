use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::paths;
use crate::model::{CapabilitySet, Rule, RuleSet};

const MODEL_FILE: &str = "sieve-script.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No per-user configuration directory available")]
    NoConfigDir,
    #[error("Cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot encode model: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn model_path() -> Option<PathBuf> {
    paths::config_dir().map(|d| d.join(MODEL_FILE))
}

/// The stored model, or the editor default when nothing has been saved yet.
pub fn load_model() -> Result<RuleSet, StoreError> {
    let path = model_path().ok_or(StoreError::NoConfigDir)?;
    load_model_from(&path)
}

pub fn load_model_from(path: &Path) -> Result<RuleSet, StoreError> {
    match fs::read_to_string(path) {
        Ok(data) => Ok(decode_model(&data)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no stored model, using defaults");
            Ok(RuleSet::default())
        }
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn save_model(rule_set: &RuleSet) -> Result<PathBuf, StoreError> {
    let path = model_path().ok_or(StoreError::NoConfigDir)?;
    save_model_to(&path, rule_set)?;
    Ok(path)
}

pub fn save_model_to(path: &Path, rule_set: &RuleSet) -> Result<(), StoreError> {
    let data = encode_model(rule_set)?;
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, data).map_err(io_err)
}

pub fn encode_model(rule_set: &RuleSet) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rule_set)
}

/// Decode a stored model, recovering whatever is usable.
///
/// Invalid JSON gives an empty model with every extension disabled.
/// Malformed rules are dropped, non-boolean extension flags ignored and
/// duplicate ids re-minted.
pub fn decode_model(data: &str) -> RuleSet {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "stored model is not valid JSON, starting empty");
            return RuleSet::empty();
        }
    };
    let Value::Object(mut root) = value else {
        warn!("stored model is not a JSON object, starting empty");
        return RuleSet::empty();
    };

    let rules = match root.remove("rules") {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match serde_json::from_value::<Rule>(item) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    warn!(index = idx, %err, "dropping malformed rule");
                    None
                }
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            warn!("stored 'rules' is not a list, ignoring it");
            Vec::new()
        }
    };

    let extensions = match root.remove("extensions") {
        Some(Value::Object(flags)) => CapabilitySet::from_flags(flags.into_iter().filter_map(
            |(name, flag)| match flag {
                Value::Bool(enabled) => Some((name, enabled)),
                other => {
                    warn!(extension = %name, value = %other, "ignoring non-boolean extension flag");
                    None
                }
            },
        )),
        Some(Value::Null) | None => CapabilitySet::none(),
        Some(_) => {
            warn!("stored 'extensions' is not an object, ignoring it");
            CapabilitySet::none()
        }
    };

    let mut rule_set = RuleSet::new(rules, extensions);
    let reminted = rule_set.ensure_unique_ids();
    if reminted > 0 {
        warn!(count = reminted, "re-minted duplicate rule ids");
    }
    rule_set
}
