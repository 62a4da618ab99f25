//! Harness configuration: wait budgets, poll cadence, typing delay, and
//! the retry bound.
//!
//! Values come from defaults, an optional JSON file, and `COMPROBAR_*`
//! environment overrides, in that order of precedence (lowest first).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::interaction::DEFAULT_SLOW_TYPE_DELAY_MS;
use crate::result::{ComprobarError, ComprobarResult};
use crate::retry::DEFAULT_MAX_RETRIES;
use crate::sync::{DEFAULT_OVERLAY_TIMEOUT_MS, DEFAULT_TOAST_TIMEOUT_MS};
use crate::wait::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Configuration for one harness session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Explicit-wait timeout in milliseconds
    pub wait_timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
    /// Budget for overlay disappearance in milliseconds
    pub overlay_timeout_ms: u64,
    /// Budget for toast appearance/disappearance in milliseconds
    pub toast_timeout_ms: u64,
    /// Delay between characters for slow typing in milliseconds
    pub slow_type_delay_ms: u64,
    /// Maximum automatic retries per execution unit
    pub max_retry_attempts: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            overlay_timeout_ms: DEFAULT_OVERLAY_TIMEOUT_MS,
            toast_timeout_ms: DEFAULT_TOAST_TIMEOUT_MS,
            slow_type_delay_ms: DEFAULT_SLOW_TYPE_DELAY_MS,
            max_retry_attempts: DEFAULT_MAX_RETRIES,
        }
    }
}

impl HarnessConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Load from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> ComprobarResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COMPROBAR_*` environment overrides on top of this config.
    ///
    /// Recognized variables: `COMPROBAR_WAIT_TIMEOUT_MS`,
    /// `COMPROBAR_POLL_INTERVAL_MS`, `COMPROBAR_OVERLAY_TIMEOUT_MS`,
    /// `COMPROBAR_TOAST_TIMEOUT_MS`, `COMPROBAR_SLOW_TYPE_DELAY_MS`,
    /// `COMPROBAR_MAX_RETRY_ATTEMPTS`.
    ///
    /// # Errors
    ///
    /// A set-but-unparsable variable is a [`ComprobarError::Configuration`].
    pub fn overridden_from_env(mut self) -> ComprobarResult<Self> {
        if let Some(value) = env_u64("COMPROBAR_WAIT_TIMEOUT_MS")? {
            self.wait_timeout_ms = value;
        }
        if let Some(value) = env_u64("COMPROBAR_POLL_INTERVAL_MS")? {
            self.poll_interval_ms = value;
        }
        if let Some(value) = env_u64("COMPROBAR_OVERLAY_TIMEOUT_MS")? {
            self.overlay_timeout_ms = value;
        }
        if let Some(value) = env_u64("COMPROBAR_TOAST_TIMEOUT_MS")? {
            self.toast_timeout_ms = value;
        }
        if let Some(value) = env_u64("COMPROBAR_SLOW_TYPE_DELAY_MS")? {
            self.slow_type_delay_ms = value;
        }
        if let Some(value) = env_u64("COMPROBAR_MAX_RETRY_ATTEMPTS")? {
            self.max_retry_attempts = value as u32;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject budgets the wait engine would refuse anyway
    pub fn validate(&self) -> ComprobarResult<()> {
        if self.wait_timeout_ms == 0 || self.poll_interval_ms == 0 {
            return Err(ComprobarError::Configuration {
                message: format!(
                    "wait budget must be positive (timeout {}ms, poll {}ms)",
                    self.wait_timeout_ms, self.poll_interval_ms
                ),
            });
        }
        Ok(())
    }
}

fn env_u64(name: &str) -> ComprobarResult<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ComprobarError::Configuration {
                message: format!("{name} must be a number, got {raw:?}"),
            }),
        Err(_) => Ok(None),
    }
}

/// Builder for [`HarnessConfig`]
#[derive(Debug, Clone, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Set the explicit-wait timeout
    #[must_use]
    pub const fn wait_timeout_ms(mut self, ms: u64) -> Self {
        self.config.wait_timeout_ms = ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the overlay-disappearance budget
    #[must_use]
    pub const fn overlay_timeout_ms(mut self, ms: u64) -> Self {
        self.config.overlay_timeout_ms = ms;
        self
    }

    /// Set the toast budget
    #[must_use]
    pub const fn toast_timeout_ms(mut self, ms: u64) -> Self {
        self.config.toast_timeout_ms = ms;
        self
    }

    /// Set the slow-typing delay
    #[must_use]
    pub const fn slow_type_delay_ms(mut self, ms: u64) -> Self {
        self.config.slow_type_delay_ms = ms;
        self
    }

    /// Set the retry budget
    #[must_use]
    pub const fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.config.max_retry_attempts = attempts;
        self
    }

    /// Finish building
    pub fn build(self) -> ComprobarResult<HarnessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.wait_timeout_ms, 10_000);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.overlay_timeout_ms, 5_000);
        assert_eq!(config.toast_timeout_ms, 3_000);
        assert_eq!(config.slow_type_delay_ms, 50);
        assert_eq!(config.max_retry_attempts, 2);
    }

    #[test]
    fn test_builder_chained() {
        let config = HarnessConfig::builder()
            .wait_timeout_ms(2000)
            .poll_interval_ms(25)
            .max_retry_attempts(1)
            .build()
            .unwrap();
        assert_eq!(config.wait_timeout_ms, 2000);
        assert_eq!(config.poll_interval_ms, 25);
        assert_eq!(config.max_retry_attempts, 1);
        // Untouched fields keep defaults.
        assert_eq!(config.toast_timeout_ms, 3_000);
    }

    #[test]
    fn test_builder_rejects_zero_budget() {
        let result = HarnessConfig::builder().wait_timeout_ms(0).build();
        assert!(matches!(
            result,
            Err(ComprobarError::Configuration { .. })
        ));
    }

    #[test]
    fn test_from_json_file_partial_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "wait_timeout_ms": 4000, "max_retry_attempts": 3 }}"#).unwrap();
        let config = HarnessConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.wait_timeout_ms, 4000);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.poll_interval_ms, 50);
    }

    #[test]
    fn test_from_json_file_missing_is_io_error() {
        let result = HarnessConfig::from_json_file("/nonexistent/comprobar.json");
        assert!(matches!(result, Err(ComprobarError::Io(_))));
    }

    #[test]
    fn test_env_overrides_apply_and_reject_garbage() {
        // One test owns all COMPROBAR_* variables so parallel tests
        // never observe each other's values.
        std::env::set_var("COMPROBAR_WAIT_TIMEOUT_MS", "2500");
        let config = HarnessConfig::default().overridden_from_env().unwrap();
        assert_eq!(config.wait_timeout_ms, 2500);
        assert_eq!(config.poll_interval_ms, 50);

        std::env::set_var("COMPROBAR_WAIT_TIMEOUT_MS", "fast");
        let result = HarnessConfig::default().overridden_from_env();
        assert!(matches!(
            result,
            Err(ComprobarError::Configuration { .. })
        ));
        std::env::remove_var("COMPROBAR_WAIT_TIMEOUT_MS");
    }

    #[test]
    fn test_serde_round_trip() {
        let config = HarnessConfig::builder()
            .wait_timeout_ms(1234)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
