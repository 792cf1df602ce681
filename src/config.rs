//! Configuration module for the dispatcher
//!
//! Configuration is loaded from a TOML file and then overridden by
//! environment variables (a `.env` file is honored). Two sections:
//!
//! ```toml
//! [session]
//! mode = "provide_bytes"
//! schedule_by_default_in_bytes_mode = true
//! acting_on_behalf_of = "0.0.1001"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::dispatch::session::{OperationalMode, SessionConfig};
use crate::types::EntityId;

pub const ENV_MODE: &str = "OPDISPATCH_MODE";
pub const ENV_SCHEDULE_BY_DEFAULT: &str = "OPDISPATCH_SCHEDULE_BY_DEFAULT";
pub const ENV_ACTING_ON_BEHALF_OF: &str = "OPDISPATCH_ACTING_ON_BEHALF_OF";
pub const ENV_LOG_LEVEL: &str = "OPDISPATCH_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "OPDISPATCH_LOG_JSON";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[session]` as written in the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default)]
    pub mode: OperationalMode,

    /// Whether bytes mode wraps operations in a schedule unless told otherwise
    #[serde(default)]
    pub schedule_by_default_in_bytes_mode: bool,

    /// The user the operating identity acts for, `shard.realm.num`
    #[serde(default)]
    pub acting_on_behalf_of: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl DispatchConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: DispatchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file, then apply `.env` and process environment overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides_from(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for deployments without a file
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides_from(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup`
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE) {
            self.session.mode = mode
                .parse()
                .map_err(|e: String| anyhow!(e))
                .with_context(|| format!("invalid {}", ENV_MODE))?;
            debug!(mode = %self.session.mode, "Mode overridden from environment");
        }
        if let Some(flag) = lookup(ENV_SCHEDULE_BY_DEFAULT) {
            self.session.schedule_by_default_in_bytes_mode = parse_bool(&flag)
                .with_context(|| format!("invalid {}", ENV_SCHEDULE_BY_DEFAULT))?;
        }
        if let Some(account) = lookup(ENV_ACTING_ON_BEHALF_OF) {
            let account = account.trim();
            self.session.acting_on_behalf_of =
                (!account.is_empty()).then(|| account.to_string());
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level.trim().to_ascii_lowercase();
        }
        if let Some(flag) = lookup(ENV_LOG_JSON) {
            self.logging.json =
                parse_bool(&flag).with_context(|| format!("invalid {}", ENV_LOG_JSON))?;
        }
        self.validate()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(account) = &self.session.acting_on_behalf_of {
            account
                .parse::<EntityId>()
                .map_err(|e| anyhow!(e))
                .context("session.acting_on_behalf_of is not an entity id")?;
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "logging.level must be one of {:?}, got '{}'",
                LOG_LEVELS,
                self.logging.level
            ));
        }
        Ok(())
    }

    /// The session snapshot this configuration describes
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let acting_on_behalf_of = self
            .session
            .acting_on_behalf_of
            .as_deref()
            .map(str::parse::<EntityId>)
            .transpose()
            .map_err(|e| anyhow!(e))?;
        Ok(SessionConfig {
            mode: self.session.mode,
            schedule_by_default_in_bytes_mode: self.session.schedule_by_default_in_bytes_mode,
            acting_on_behalf_of,
        })
    }
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("expected a boolean, got '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.session.mode, OperationalMode::DirectExecution);
        assert!(!config.session.schedule_by_default_in_bytes_mode);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[session]
mode = "provide_bytes"
schedule_by_default_in_bytes_mode = true
acting_on_behalf_of = "0.0.1001"

[logging]
level = "debug"
json = true
"#
        )
        .unwrap();

        let config = DispatchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session.mode, OperationalMode::ProvideBytes);
        assert!(config.logging.json);

        let session = config.session_config().unwrap();
        assert!(session.schedule_by_default_in_bytes_mode);
        assert_eq!(session.acting_on_behalf_of, Some(EntityId::from_num(1001)));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = DispatchConfig::from_toml_str("").unwrap();
        assert_eq!(config, DispatchConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(DispatchConfig::from_toml_str("[session]\nmode = \"sometimes\"").is_err());
        assert!(DispatchConfig::from_toml_str("[session]\nacting_on_behalf_of = \"alice\"").is_err());
        assert!(DispatchConfig::from_toml_str("[logging]\nlevel = \"loud\"").is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DispatchConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_MODE, "provide_bytes"),
            (ENV_SCHEDULE_BY_DEFAULT, "yes"),
            (ENV_ACTING_ON_BEHALF_OF, "0.0.77"),
            (ENV_LOG_LEVEL, "WARN"),
            (ENV_LOG_JSON, "1"),
        ]
        .into_iter()
        .collect();

        let mut config = DispatchConfig::default();
        config
            .apply_env_overrides_from(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.session.mode, OperationalMode::ProvideBytes);
        assert!(config.session.schedule_by_default_in_bytes_mode);
        assert_eq!(config.session.acting_on_behalf_of.as_deref(), Some("0.0.77"));
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = DispatchConfig::default();
        let result = config.apply_env_overrides_from(|name| {
            (name == ENV_SCHEDULE_BY_DEFAULT).then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_acting_id_clears_it() {
        let mut config = DispatchConfig::default();
        config.session.acting_on_behalf_of = Some("0.0.5".to_string());
        config
            .apply_env_overrides_from(|name| (name == ENV_ACTING_ON_BEHALF_OF).then(String::new))
            .unwrap();
        assert_eq!(config.session.acting_on_behalf_of, None);
    }
}
