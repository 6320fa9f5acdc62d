use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};
use crate::file::{Convertibility, ExtensionPair, DEFAULT_EXCLUDED_DIRS};
use crate::paths;
use crate::search::{Comparison, LineCountFilter, NamePattern, SearchCriteria};
use crate::selection::DEFAULT_SELECTION_CAP;
use crate::utils::io;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Converting files to Kotlin with safe renaming.";

/// Root configuration structure for carryover.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CarryoverConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via carryover.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    #[serde(default = "default_target_extension")]
    pub target_extension: String,

    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    #[serde(default = "default_selection_cap")]
    pub selection_cap: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<ConverterConfig>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            target_extension: default_target_extension(),
            excluded_dirs: default_excluded_dirs(),
            selection_cap: default_selection_cap(),
            converter: None,
        }
    }
}

/// External converter invocation: `[program, args...]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConverterConfig {
    pub command: Vec<String>,
}

impl Defaults {
    pub fn extension_pair(&self) -> Result<ExtensionPair> {
        ExtensionPair::new(&self.source_extension, &self.target_extension).map_err(|e| {
            Error::config_invalid_value(
                "defaults.source_extension",
                Some(format!("{} -> {}", self.source_extension, self.target_extension)),
                e.message,
            )
        })
    }

    pub fn convertibility(&self, pair: &ExtensionPair) -> Convertibility {
        Convertibility::new(pair.source.clone(), self.excluded_dirs.clone())
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_source_extension() -> String {
    ExtensionPair::default().source
}

fn default_target_extension() -> String {
    ExtensionPair::default().target
}

fn default_excluded_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect()
}

fn default_selection_cap() -> usize {
    DEFAULT_SELECTION_CAP
}

// =============================================================================
// Search preferences
// =============================================================================

/// Last-used search values, owned and persisted by the CLI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPreferences {
    #[serde(default)]
    pub regex_enabled: bool,
    #[serde(default)]
    pub regex: String,
    #[serde(default)]
    pub line_count_enabled: bool,
    #[serde(default)]
    pub line_count: i64,
    #[serde(default = "default_comparison")]
    pub comparison: Comparison,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

impl Default for SearchPreferences {
    fn default() -> Self {
        Self {
            regex_enabled: false,
            regex: String::new(),
            line_count_enabled: false,
            line_count: 0,
            comparison: default_comparison(),
            commit_message: default_commit_message(),
        }
    }
}

fn default_comparison() -> Comparison {
    Comparison::Lt
}

fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}

impl SearchPreferences {
    /// Criteria for the enabled stages. A disabled line-count stage is
    /// carried as threshold -1 so it stays a no-op.
    pub fn to_criteria(&self) -> SearchCriteria {
        let mut criteria = SearchCriteria::new();
        if self.regex_enabled && !self.regex.is_empty() {
            criteria = criteria.with_pattern(NamePattern::literal(&self.regex));
        }
        let threshold = if self.line_count_enabled {
            self.line_count
        } else {
            -1
        };
        criteria.with_line_count(LineCountFilter::new(self.comparison, threshold))
    }
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load the full carryover.json config, falling back to defaults on any error.
pub fn load_config() -> CarryoverConfig {
    match load_config_from_file() {
        Ok(Some(config)) => config,
        Ok(None) => CarryoverConfig::default(),
        Err(err) => {
            crate::log_status!("config", "Ignoring carryover.json: {}", err.message);
            CarryoverConfig::default()
        }
    }
}

fn load_config_from_file() -> Result<Option<CarryoverConfig>> {
    let path = paths::carryover_json()?;
    if !path.exists() {
        return Ok(None);
    }

    let content = io::read_text_lossy(&path, "read carryover.json")?;
    let config = serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
    Ok(Some(config))
}

/// Save config to carryover.json (creates if missing).
pub fn save_config(config: &CarryoverConfig) -> Result<()> {
    let path = paths::carryover_json()?;
    let content = serde_json::to_string_pretty(config).map_err(|e| {
        Error::internal_json(e.to_string(), Some("serialize carryover.json".to_string()))
    })?;
    io::write_file_atomic(&path, &content, "write carryover.json")
}

pub fn config_exists() -> bool {
    paths::carryover_json().map(|p| p.exists()).unwrap_or(false)
}

/// Delete carryover.json (reset to defaults)
pub fn reset_config() -> Result<bool> {
    let path = paths::carryover_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub fn config_path() -> Result<String> {
    Ok(paths::carryover_json()?.display().to_string())
}

/// Built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

/// Remembered search values, or the documented defaults.
pub fn load_preferences() -> SearchPreferences {
    paths::preferences_json()
        .ok()
        .filter(|p| p.exists())
        .and_then(|p| io::read_text_lossy(&p, "read preferences.json").ok())
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

pub fn save_preferences(preferences: &SearchPreferences) -> Result<()> {
    let path = paths::preferences_json()?;
    let content = serde_json::to_string_pretty(preferences).map_err(|e| {
        Error::internal_json(e.to_string(), Some("serialize preferences.json".to_string()))
    })?;
    io::write_file_atomic(&path, &content, "write preferences.json")
}
