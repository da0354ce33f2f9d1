//! Sync between the game's `options.txt` and the `gameSettings` table of
//! `mcconfig.json`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::errors::{InstanceError, Result};
use crate::instance::{InstanceLayout, InstanceRecord, write_atomic};

/// Keys left out of captured settings. A trailing `*` matches a prefix.
pub const DEFAULT_IGNORED: &[&str] = &[
    "fullscreen",
    "overrideWidth",
    "overrideHeight",
    "fullscreenResolution",
    "lastServer",
    "resourcePacks",
    "incompatibleResourcePacks",
    "key_*",
    "narrator",
    "highContrast",
    "telemetryOptInExtra",
    "onboardAccessibility",
];

pub fn is_ignored(key: &str, ignore: &[&str]) -> bool {
    ignore.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == *pattern,
    })
}

/// Parse `key:value` lines; booleans and numbers become JSON scalars
pub fn parse_options(content: &str) -> BTreeMap<String, Value> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| line.split_once(':'))
        .map(|(key, raw)| (key.to_string(), typed_value(raw)))
        .collect()
}

fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .and_then(|n| {
                if raw.contains(['.', 'e', 'E']) {
                    serde_json::Number::from_f64(n).map(Value::Number)
                } else {
                    raw.parse::<i64>().ok().map(Value::from)
                }
            })
            .unwrap_or_else(|| Value::String(raw.to_string())),
    }
}

pub fn render_options(options: &BTreeMap<String, Value>) -> String {
    options
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}:{s}\n"),
            other => format!("{key}:{other}\n"),
        })
        .collect()
}

/// Store the non-ignored contents of `options.txt` as the instance's
/// `gameSettings`. Returns how many settings were captured.
#[instrument(skip(ignore))]
pub async fn capture(instance_dir: &Path, ignore: &[&str]) -> Result<usize> {
    let layout = InstanceLayout::new(instance_dir);
    let options_file = layout.options_file();
    let content = match tokio::fs::read_to_string(&options_file).await {
        Ok(content) => content,
        Err(_) => {
            return Err(InstanceError::OptionsFileNotFound {
                path: instance_dir.to_path_buf(),
            });
        }
    };

    let captured: BTreeMap<String, Value> = parse_options(&content)
        .into_iter()
        .filter(|(key, _)| !is_ignored(key, ignore))
        .collect();

    if captured.is_empty() {
        debug!("Nothing to capture from {}", options_file.display());
        return Ok(0);
    }

    let mut record = InstanceRecord::load(instance_dir).await?;
    let count = captured.len();
    record.game_settings = captured;
    record.save(instance_dir).await?;

    info!("Captured {} game settings", count);
    Ok(count)
}

/// Merge the instance's `gameSettings` into `options.txt`, creating it if
/// needed. Returns how many settings were applied.
#[instrument(skip(record))]
pub async fn apply(instance_dir: &Path, record: &InstanceRecord) -> Result<usize> {
    if record.game_settings.is_empty() {
        return Ok(0);
    }

    let options_file = InstanceLayout::new(instance_dir).options_file();
    let mut options = match tokio::fs::read_to_string(&options_file).await {
        Ok(content) => parse_options(&content),
        Err(_) => BTreeMap::new(),
    };
    options.extend(record.game_settings.clone());

    write_atomic(&options_file, render_options(&options).as_bytes())
        .await
        .context("Failed to write options.txt")
        .map_err(|e| InstanceError::InstanceFileWriteFailed {
            path: options_file.clone(),
            source: e,
        })?;

    debug!("Applied {} game settings", record.game_settings.len());
    Ok(record.game_settings.len())
}
