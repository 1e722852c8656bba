use crate::constants::defaults;
use crate::error::{PromotionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// What `start_promotion_job` does when a non-terminal job already exists
/// for the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateStartPolicy {
    /// Replace the registry entry. The earlier loop keeps running against
    /// its own, now unregistered, job object.
    #[default]
    Overwrite,
    /// Refuse the second start with `JobAlreadyRunning`
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub throttle_every: usize,
    pub throttle_delay_ms: u64,
    pub job_retention_hours: i64,
    pub final_grade: i32,
    pub duplicate_start_policy: DuplicateStartPolicy,
    pub cleanup_interval_secs: u64,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::MAX_CONNECTIONS,
            throttle_every: defaults::THROTTLE_EVERY,
            throttle_delay_ms: defaults::THROTTLE_DELAY_MS,
            job_retention_hours: defaults::JOB_RETENTION_HOURS,
            final_grade: defaults::FINAL_GRADE,
            duplicate_start_policy: DuplicateStartPolicy::default(),
            cleanup_interval_secs: defaults::CLEANUP_INTERVAL_SECS,
        }
    }
}

impl PromotionConfig {
    /// Defaults overlaid with `PROMOTION_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::load_with_env(None::<&Path>, None)
    }

    /// Defaults, then the TOML file at `path` (if it exists), then the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(Some(path), None)
    }

    /// Layered load with an explicit environment map, so callers (and tests)
    /// do not have to touch the process environment.
    pub fn load_with_env<P: AsRef<Path>>(
        path: Option<P>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let database_url = match &env {
            Some(vars) => vars.get("DATABASE_URL").cloned(),
            None => std::env::var("DATABASE_URL").ok(),
        };

        builder = builder.add_source(
            config::Environment::with_prefix("PROMOTION")
                .try_parsing(true)
                .source(env),
        );

        if let Some(url) = database_url {
            builder = builder.set_override("database_url", url)?;
        }

        let config: PromotionConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.throttle_every == 0 {
            return Err(PromotionError::Configuration(
                "throttle_every must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(PromotionError::Configuration(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        if self.job_retention_hours <= 0
            || chrono::Duration::try_hours(self.job_retention_hours).is_none()
        {
            return Err(PromotionError::Configuration(format!(
                "Invalid job_retention_hours: {}",
                self.job_retention_hours
            )));
        }
        if self.cleanup_interval_secs == 0 {
            return Err(PromotionError::Configuration(
                "cleanup_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_delay_ms)
    }

    /// Saturates at the largest representable window; `validate` rejects
    /// values that would need it
    pub fn job_retention(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.job_retention_hours).unwrap_or(chrono::TimeDelta::MAX)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_match_source_behavior() {
        let config = PromotionConfig::default();
        assert_eq!(config.throttle_every, 10);
        assert_eq!(config.throttle_delay(), Duration::from_millis(100));
        assert_eq!(config.job_retention(), chrono::Duration::hours(24));
        assert_eq!(config.final_grade, 12);
        assert_eq!(config.duplicate_start_policy, DuplicateStartPolicy::Overwrite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let config = PromotionConfig::load_with_env(
            None::<&Path>,
            env(&[
                ("PROMOTION_THROTTLE_EVERY", "25"),
                ("PROMOTION_DUPLICATE_START_POLICY", "reject"),
                ("DATABASE_URL", "postgresql://db/school_test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.throttle_every, 25);
        assert_eq!(config.duplicate_start_policy, DuplicateStartPolicy::Reject);
        assert_eq!(config.database_url, "postgresql://db/school_test");
    }

    #[test]
    fn test_toml_file_then_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "throttle_delay_ms = 5\njob_retention_hours = 48").unwrap();

        let config = PromotionConfig::load_with_env(
            Some(file.path()),
            env(&[("PROMOTION_JOB_RETENTION_HOURS", "12")]),
        )
        .unwrap();

        assert_eq!(config.throttle_delay_ms, 5);
        assert_eq!(config.job_retention_hours, 12);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config =
            PromotionConfig::load_with_env(Some("does/not/exist.toml"), env(&[])).unwrap();
        assert_eq!(config, PromotionConfig::default());
    }

    #[test]
    fn test_rejects_zero_throttle() {
        let result = PromotionConfig::load_with_env(
            None::<&Path>,
            env(&[("PROMOTION_THROTTLE_EVERY", "0")]),
        );
        assert!(matches!(result, Err(PromotionError::Configuration(_))));
    }

    #[test]
    fn test_rejects_zero_cleanup_interval() {
        let result = PromotionConfig::load_with_env(
            None::<&Path>,
            env(&[("PROMOTION_CLEANUP_INTERVAL_SECS", "0")]),
        );
        assert!(matches!(result, Err(PromotionError::Configuration(_))));
    }

    #[test]
    fn test_rejects_unrepresentable_retention() {
        let result = PromotionConfig::load_with_env(
            None::<&Path>,
            env(&[("PROMOTION_JOB_RETENTION_HOURS", "9223372036854775807")]),
        );
        assert!(matches!(result, Err(PromotionError::Configuration(_))));

        let config = PromotionConfig {
            job_retention_hours: i64::MAX,
            ..PromotionConfig::default()
        };
        assert_eq!(config.job_retention(), chrono::TimeDelta::MAX);
    }
}
