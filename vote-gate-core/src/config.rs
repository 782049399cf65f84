//! Gate configuration
//!
//! Loaded from YAML. The file is found through `VOTE_GATE_CONFIG` unless a
//! path is given explicitly; without either, built-in defaults apply.

use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

use crate::credential::{DEFAULT_SESSION_TTL_MINUTES, MAX_SESSION_TTL_MINUTES};
use crate::gate::GateSettings;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "VOTE_GATE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GateConfig {
    /// Package whose seal keys session credentials unlock.
    pub package_id: String,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
    /// Indexer serving `GET /vote-pools/{id}`. Fixture data is used when absent.
    #[serde(default)]
    pub query_base_url: Option<String>,
}

fn default_session_ttl_minutes() -> i64 {
    DEFAULT_SESSION_TTL_MINUTES
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            package_id: GateSettings::default().package_id,
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            query_base_url: None,
        }
    }
}

impl GateConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: GateConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then `VOTE_GATE_CONFIG`, then defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path),
            Err(_) => Ok(Self::default()),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.package_id.trim().is_empty() {
            anyhow::bail!("package_id must not be empty");
        }
        if self.session_ttl_minutes <= 0 || self.session_ttl_minutes > MAX_SESSION_TTL_MINUTES {
            anyhow::bail!(
                "session_ttl_minutes must be between 1 and {}, got {}",
                MAX_SESSION_TTL_MINUTES,
                self.session_ttl_minutes
            );
        }
        Ok(())
    }

    pub fn settings(&self) -> GateSettings {
        GateSettings {
            package_id: self.package_id.clone(),
            session_ttl: Duration::minutes(
                self.session_ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ttl_defaults_to_ten_minutes() {
        let config = GateConfig::from_yaml("package_id: \"0xpkg\"\n").unwrap();
        assert_eq!(config.session_ttl_minutes, 10);
        assert_eq!(config.query_base_url, None);
        assert_eq!(config.settings().session_ttl, Duration::minutes(10));
    }

    #[test]
    fn rejects_non_positive_ttl() {
        let err = GateConfig::from_yaml("package_id: \"0xpkg\"\nsession_ttl_minutes: 0\n")
            .unwrap_err();
        assert!(err.to_string().contains("session_ttl_minutes"));
    }

    #[test]
    fn rejects_oversized_ttl() {
        for ttl in ["1441", "200000000000", "9223372036854775807"] {
            let yaml = format!("package_id: \"0xpkg\"\nsession_ttl_minutes: {ttl}\n");
            let err = GateConfig::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("session_ttl_minutes"), "{ttl}: {err}");
        }
        let config =
            GateConfig::from_yaml("package_id: \"0xpkg\"\nsession_ttl_minutes: 1440\n").unwrap();
        assert_eq!(config.settings().session_ttl, Duration::days(1));

        let unchecked = GateConfig {
            session_ttl_minutes: i64::MAX,
            ..GateConfig::default()
        };
        assert_eq!(unchecked.settings().session_ttl, Duration::days(1));
    }

    #[test]
    fn loads_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "package_id: \"0xfeed\"\nsession_ttl_minutes: 30\nquery_base_url: http://localhost:9000"
        )
        .unwrap();
        let config = GateConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.package_id, "0xfeed");
        assert_eq!(config.settings().session_ttl, Duration::minutes(30));
        assert_eq!(
            config.query_base_url.as_deref(),
            Some("http://localhost:9000")
        );
    }
}
