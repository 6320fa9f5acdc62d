use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use carryover::defaults::{self, CarryoverConfig, Defaults, SearchPreferences};

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (merged defaults + file) and remembered search values
    Show {
        /// Show only built-in defaults (ignore carryover.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Set a configuration value at a JSON pointer path
    Set {
        /// JSON pointer path (e.g., /defaults/selection_cap)
        pointer: String,
        /// Value to set (JSON)
        value: String,
    },
    /// Reset configuration to built-in defaults (deletes carryover.json)
    Reset,
    /// Show the path to carryover.json
    Path,
}

#[derive(Debug, Serialize, Default)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<CarryoverConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<Defaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferences: Option<SearchPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<bool>,
}

pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin),
        ConfigCommand::Set { pointer, value } => set(&pointer, &value),
        ConfigCommand::Reset => reset(),
        ConfigCommand::Path => path(),
    }
}

fn show(builtin: bool) -> CmdResult<ConfigOutput> {
    let output = if builtin {
        ConfigOutput {
            command: "config.show".to_string(),
            defaults: Some(defaults::builtin_defaults()),
            preferences: Some(SearchPreferences::default()),
            ..ConfigOutput::default()
        }
    } else {
        ConfigOutput {
            command: "config.show".to_string(),
            config: Some(defaults::load_config()),
            preferences: Some(defaults::load_preferences()),
            ..ConfigOutput::default()
        }
    };
    Ok((output, 0))
}

fn set(pointer: &str, value_str: &str) -> CmdResult<ConfigOutput> {
    if !pointer.starts_with('/') {
        return Err(carryover::Error::validation_invalid_argument(
            "pointer",
            "JSON pointer must start with '/'",
            None,
            None,
        ));
    }

    let value: Value = serde_json::from_str(value_str).map_err(|e| {
        carryover::Error::validation_invalid_json(
            e,
            Some("parse value".to_string()),
            Some(value_str.chars().take(200).collect::<String>()),
        )
    })?;

    let mut config_json = serde_json::to_value(defaults::load_config()).map_err(|e| {
        carryover::Error::internal_unexpected(format!("Failed to serialize config: {}", e))
    })?;
    set_json_pointer(&mut config_json, pointer, value.clone())?;

    let config: CarryoverConfig = serde_json::from_value(config_json).map_err(|e| {
        carryover::Error::validation_invalid_json(e, Some("deserialize config".to_string()), None)
    })?;
    config.defaults.extension_pair()?;
    if let Some(converter) = &config.defaults.converter {
        carryover::trigger::CommandConverter::from_command(&converter.command)?;
    }

    defaults::save_config(&config)?;

    Ok((
        ConfigOutput {
            command: "config.set".to_string(),
            config: Some(config),
            pointer: Some(pointer.to_string()),
            value: Some(value),
            ..ConfigOutput::default()
        },
        0,
    ))
}

/// Replace the value at `pointer`, or add it as a new key of an existing object.
fn set_json_pointer(root: &mut Value, pointer: &str, value: Value) -> carryover::Result<()> {
    if let Some(slot) = root.pointer_mut(pointer) {
        *slot = value;
        return Ok(());
    }

    let missing = || {
        carryover::Error::validation_invalid_argument(
            "pointer",
            format!("No configuration object at {}", pointer),
            Some(pointer.to_string()),
            None,
        )
    };
    let (parent, key) = pointer.rsplit_once('/').ok_or_else(missing)?;
    match root.pointer_mut(parent) {
        Some(Value::Object(map)) if !key.is_empty() => {
            map.insert(key.replace("~1", "/").replace("~0", "~"), value);
            Ok(())
        }
        _ => Err(missing()),
    }
}

fn reset() -> CmdResult<ConfigOutput> {
    let deleted = defaults::reset_config()?;

    Ok((
        ConfigOutput {
            command: "config.reset".to_string(),
            defaults: Some(defaults::builtin_defaults()),
            path: Some(defaults::config_path()?),
            deleted: Some(deleted),
            ..ConfigOutput::default()
        },
        0,
    ))
}

fn path() -> CmdResult<ConfigOutput> {
    Ok((
        ConfigOutput {
            command: "config.path".to_string(),
            path: Some(defaults::config_path()?),
            exists: Some(defaults::config_exists()),
            ..ConfigOutput::default()
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_replaces_existing_value() {
        let mut root = json!({"defaults": {"selection_cap": 15}});
        set_json_pointer(&mut root, "/defaults/selection_cap", json!(30)).unwrap();
        assert_eq!(root["defaults"]["selection_cap"], 30);
    }

    #[test]
    fn pointer_adds_key_to_existing_object() {
        let mut root = json!({"defaults": {}});
        set_json_pointer(
            &mut root,
            "/defaults/converter",
            json!({"command": ["j2k"]}),
        )
        .unwrap();
        assert_eq!(root["defaults"]["converter"]["command"][0], "j2k");
    }

    #[test]
    fn pointer_into_missing_object_fails() {
        let mut root = json!({"defaults": {}});
        let err = set_json_pointer(&mut root, "/defaults/converter/command", json!([])).unwrap_err();
        assert_eq!(err.details["field"], "pointer");
    }
}
