//! Configuration source
//!
//! Options are read from a flat YAML mapping keyed by option name, e.g.
//!
//! ```yaml
//! ResetBotLevel.MaxLevel: 80
//! ResetBotLevel.ResetChance: 25
//! ResetBotLevel.ScaledChance: true
//! ResetBotLevel.ExcludedBotNames: "Thrall, Jaina"
//! ```
//!
//! Lookups never fail: a missing key or a value of the wrong type yields the
//! caller's default. Range validation happens when the [`Policy`] is built.
//!
//! [`Policy`]: crate::reset::Policy

use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Default location of the option file
pub const DEFAULT_CONFIG_FILE: &str = "config/bot_reset.yaml";

/// Option keys
pub mod keys {
    pub const MAX_LEVEL: &str = "ResetBotLevel.MaxLevel";
    pub const RESET_TO_LEVEL: &str = "ResetBotLevel.ResetToLevel";
    pub const SKIP_FROM_LEVEL: &str = "ResetBotLevel.SkipFromLevel";
    pub const SKIP_TO_LEVEL: &str = "ResetBotLevel.SkipToLevel";
    pub const RESET_CHANCE: &str = "ResetBotLevel.ResetChance";
    pub const SCALED_CHANCE: &str = "ResetBotLevel.ScaledChance";
    pub const RESTRICT_TIME_PLAYED: &str = "ResetBotLevel.RestrictTimePlayed";
    pub const MIN_TIME_PLAYED: &str = "ResetBotLevel.MinTimePlayed";
    pub const PLAYED_TIME_CHECK_FREQUENCY: &str = "ResetBotLevel.PlayedTimeCheckFrequency";
    pub const GUILD_TRACKER_UPDATE_FREQUENCY: &str = "ResetBotLevel.GuildTrackerUpdateFrequency";
    pub const IGNORE_GUILDS_WITH_REAL_PLAYERS: &str = "ResetBotLevel.IgnoreGuildsWithRealPlayers";
    pub const EXCLUDED_BOT_NAMES: &str = "ResetBotLevel.ExcludedBotNames";
    pub const RESET_PAIRS: &str = "ResetBotLevel.ResetPairs";
    pub const DEBUG_MODE: &str = "ResetBotLevel.DebugMode";
}

/// Errors raised while reading configuration or data files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Expected a mapping of option names to values")]
    NotAMapping,
}

/// Typed option lookup with defaults
pub trait ConfigSource {
    /// Read an unsigned integer option
    fn get_u32(&self, key: &str, default: u32) -> u32;

    /// Read a boolean option
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Read a string option
    fn get_string(&self, key: &str, default: &str) -> String;
}

/// Options loaded from a YAML file
#[derive(Debug, Clone, Default)]
pub struct YamlConfig {
    values: BTreeMap<String, Value>,
}

impl YamlConfig {
    /// Load options from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a YAML mapping.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse(&content)
    }

    /// Parse options from YAML text. An empty document yields no options.
    ///
    /// # Errors
    /// Returns an error if the text is not a YAML mapping.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(content)?;
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => return Err(ConfigError::NotAMapping),
        };

        let values = mapping
            .into_iter()
            .filter_map(|(key, value)| match key {
                Value::String(key) => Some((key, value)),
                other => {
                    warn!("Ignoring non-string option key {other:?}");
                    None
                }
            })
            .collect();

        Ok(Self { values })
    }

    /// Set an option, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    fn type_mismatch<T: std::fmt::Debug>(key: &str, value: &Value, default: T) -> T {
        warn!("Option {key} has unexpected value {value:?}, using default {default:?}");
        default
    }
}

impl ConfigSource for YamlConfig {
    fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.values.get(key) {
            None => default,
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_else(|| Self::type_mismatch(key, &Value::Number(n.clone()), default)),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .unwrap_or_else(|_| Self::type_mismatch(key, &Value::String(s.clone()), default)),
            Some(other) => Self::type_mismatch(key, other, default),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) if n.as_u64() == Some(0) => false,
            Some(Value::Number(n)) if n.as_u64() == Some(1) => true,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => Self::type_mismatch(key, &Value::String(s.clone()), default),
            },
            Some(other) => Self::type_mismatch(key, other, default),
        }
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            None => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => Self::type_mismatch(key, other, default.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookups() {
        let config = YamlConfig::parse(
            r#"
ResetBotLevel.MaxLevel: 70
ResetBotLevel.ScaledChance: true
ResetBotLevel.RestrictTimePlayed: 1
ResetBotLevel.ResetPairs: "80:1;58:70"
ResetBotLevel.MinTimePlayed: "3600"
"#,
        )
        .unwrap();

        assert_eq!(config.get_u32(keys::MAX_LEVEL, 80), 70);
        assert!(config.get_bool(keys::SCALED_CHANCE, false));
        assert!(config.get_bool(keys::RESTRICT_TIME_PLAYED, false));
        assert_eq!(config.get_string(keys::RESET_PAIRS, ""), "80:1;58:70");
        assert_eq!(config.get_u32(keys::MIN_TIME_PLAYED, 86400), 3600);
    }

    #[test]
    fn test_missing_and_mistyped_fall_back_to_default() {
        let config = YamlConfig::parse(
            r"
ResetBotLevel.MaxLevel: [1, 2]
ResetBotLevel.ResetChance: -5
ResetBotLevel.DebugMode: maybe
",
        )
        .unwrap();

        assert_eq!(config.get_u32(keys::MAX_LEVEL, 80), 80);
        assert_eq!(config.get_u32(keys::RESET_CHANCE, 100), 100);
        assert!(!config.get_bool(keys::DEBUG_MODE, false));
        assert_eq!(config.get_u32(keys::SKIP_FROM_LEVEL, 0), 0);
        assert_eq!(config.get_string(keys::EXCLUDED_BOT_NAMES, ""), "");
    }

    #[test]
    fn test_empty_document() {
        let config = YamlConfig::parse("").unwrap();
        assert_eq!(config.get_u32(keys::MAX_LEVEL, 80), 80);
    }

    #[test]
    fn test_rejects_non_mapping() {
        assert!(matches!(
            YamlConfig::parse("- 1\n- 2\n"),
            Err(ConfigError::NotAMapping)
        ));
    }

    #[test]
    fn test_set_overrides() {
        let mut config = YamlConfig::default();
        config.set(keys::RESET_CHANCE, 40);
        config.set(keys::SCALED_CHANCE, true);
        assert_eq!(config.get_u32(keys::RESET_CHANCE, 100), 40);
        assert!(config.get_bool(keys::SCALED_CHANCE, false));
    }
}
