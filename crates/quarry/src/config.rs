//! Engine configuration loaded from TOML.
//!
//! ```toml
//! pagination = true
//!
//! [sql_debug]
//! level = "debug"
//! max_sql_length = 200
//!
//! [slow_query]
//! threshold_ms = 500
//! ```

use crate::error::{Error, ExecResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Register the built-in pagination interceptor.
    #[serde(default)]
    pub pagination: bool,

    /// Register the SQL debug interceptor.
    pub sql_debug: Option<SqlDebugConfig>,

    /// Register the slow-query interceptor.
    pub slow_query: Option<SlowQueryConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlDebugConfig {
    #[serde(default = "default_level")]
    pub level: String,
    pub max_sql_length: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlowQueryConfig {
    pub threshold_ms: u64,
}

fn default_level() -> String {
    "debug".to_string()
}

impl SqlDebugConfig {
    /// The configured level as a tracing level.
    pub fn tracing_level(&self) -> ExecResult<Level> {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => Err(Error::Config(format!("unknown sql_debug.level: {other}"))),
        }
    }
}

impl SlowQueryConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> ExecResult<Self> {
        let config: EngineConfig = toml::from_str(raw)
            .map_err(|e| Error::Config(format!("failed to parse engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ExecResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> ExecResult<()> {
        if let Some(debug) = &self.sql_debug {
            debug.tracing_level()?;
            if debug.max_sql_length == Some(0) {
                return Err(Error::Config(
                    "sql_debug.max_sql_length must be greater than 0".into(),
                ));
            }
        }
        if let Some(slow) = &self.slow_query {
            if slow.threshold_ms == 0 {
                return Err(Error::Config(
                    "slow_query.threshold_ms must be greater than 0".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = EngineConfig::from_toml_str(
            r#"
            pagination = true

            [sql_debug]
            level = "INFO"
            max_sql_length = 200

            [slow_query]
            threshold_ms = 500
            "#,
        )
        .unwrap();

        assert!(config.pagination);
        let debug = config.sql_debug.as_ref().unwrap();
        assert_eq!(debug.tracing_level().unwrap(), Level::INFO);
        assert_eq!(debug.max_sql_length, Some(200));
        assert_eq!(
            config.slow_query.unwrap().threshold(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn empty_config_enables_nothing() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn debug_level_defaults_to_debug() {
        let config = EngineConfig::from_toml_str("[sql_debug]\n").unwrap();
        assert_eq!(
            config.sql_debug.unwrap().tracing_level().unwrap(),
            Level::DEBUG
        );
    }

    #[test]
    fn rejects_invalid_values() {
        for raw in [
            "[sql_debug]\nlevel = \"loud\"",
            "[sql_debug]\nmax_sql_length = 0",
            "[slow_query]\nthreshold_ms = 0",
            "paginate = true",
        ] {
            let err = EngineConfig::from_toml_str(raw).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = EngineConfig::from_path("/nonexistent/quarry.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
