//! Step configuration forwarded to the durable step host.
//!
//! Nothing in the rollback layer interprets these values. They are handed to
//! [`StepExecutor::execute_step`](crate::StepExecutor::execute_step) verbatim,
//! and only hosts decide what a retry limit or a timeout means.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound accepted for `retries.limit` in loaded configuration.
pub const MAX_RETRY_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Constant,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub limit: u32,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
}

impl RetryConfig {
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            delay_ms: 0,
            backoff: Backoff::Constant,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay to wait before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        let millis = match self.backoff {
            Backoff::Constant => self.delay_ms,
            Backoff::Linear => self.delay_ms.saturating_mul(u64::from(retry)),
            Backoff::Exponential => self.delay_ms.saturating_mul(2_u64.saturating_pow(retry - 1)),
        };
        Duration::from_millis(millis)
    }
}

/// Opaque execution configuration for a single step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<RetryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl StepConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_retries(mut self, retries: RetryConfig) -> Self {
        self.retries = Some(retries);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub fn retry_limit(&self) -> u32 {
        self.retries.as_ref().map_or(0, |r| r.limit)
    }

    fn validate(&self, scope: &str) -> Result<(), ConfigError> {
        let limit = self.retry_limit();
        if limit > MAX_RETRY_LIMIT {
            return Err(ConfigError::InvalidRetryLimit {
                scope: scope.to_string(),
                limit,
                max: MAX_RETRY_LIMIT,
            });
        }
        Ok(())
    }
}

/// Which configuration the undo half of a compensating step runs with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "UndoConfigValue", into = "UndoConfigValue")]
pub enum UndoConfig {
    /// Reuse the run step's configuration exactly.
    #[default]
    Inherit,
    /// Use this configuration for the undo step, ignoring the run's.
    Override(StepConfig),
}

impl UndoConfig {
    /// Configuration the undo step executes with, given the run's.
    #[must_use]
    pub fn resolve(&self, run: Option<&StepConfig>) -> Option<StepConfig> {
        match self {
            Self::Inherit => run.cloned(),
            Self::Override(config) => Some(config.clone()),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum UndoConfigValue {
    Keyword(UndoKeyword),
    Config(StepConfig),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum UndoKeyword {
    Inherit,
}

impl From<UndoConfigValue> for UndoConfig {
    fn from(value: UndoConfigValue) -> Self {
        match value {
            UndoConfigValue::Keyword(UndoKeyword::Inherit) => Self::Inherit,
            UndoConfigValue::Config(config) => Self::Override(config),
        }
    }
}

impl From<UndoConfig> for UndoConfigValue {
    fn from(value: UndoConfig) -> Self {
        match value {
            UndoConfig::Inherit => Self::Keyword(UndoKeyword::Inherit),
            UndoConfig::Override(config) => Self::Config(config),
        }
    }
}

/// Options for a compensating step: the run configuration plus the undo
/// configuration policy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RollbackOptions {
    pub config: Option<StepConfig>,
    pub undo: UndoConfig,
}

impl RollbackOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_undo(mut self, undo: UndoConfig) -> Self {
        self.undo = undo;
        self
    }

    /// Configuration for the undo step after applying the undo policy.
    #[must_use]
    pub fn undo_config(&self) -> Option<StepConfig> {
        self.undo.resolve(self.config.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct StepSettings {
    #[serde(default)]
    retries: Option<RetryConfig>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    undo: UndoConfig,
}

impl StepSettings {
    fn step_config(&self) -> StepConfig {
        StepConfig {
            retries: self.retries.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StepConfigsFile {
    #[serde(default)]
    default: Option<StepSettings>,
    #[serde(default)]
    steps: BTreeMap<String, StepSettings>,
}

/// Named step configurations loaded from TOML.
///
/// ```toml
/// [default]
/// timeout-ms = 30000
///
/// [steps.reserve-seat]
/// retries = { limit = 5, delay-ms = 100, backoff = "exponential" }
/// undo = { timeout-ms = 60000 }
/// ```
///
/// A step without its own table falls back to `[default]`; with neither, it
/// has no configuration at all.
#[derive(Debug, Clone, Default)]
pub struct StepConfigs {
    default: Option<StepSettings>,
    steps: BTreeMap<String, StepSettings>,
}

impl StepConfigs {
    /// Parses step configurations from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML, contains unknown
    /// keys, or declares a retry limit above [`MAX_RETRY_LIMIT`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: StepConfigsFile = toml::from_str(content)?;

        if let Some(default) = &file.default {
            default.step_config().validate("default")?;
            if let UndoConfig::Override(undo) = &default.undo {
                undo.validate("default.undo")?;
            }
        }
        for (name, settings) in &file.steps {
            settings.step_config().validate(name)?;
            if let UndoConfig::Override(undo) = &settings.undo {
                undo.validate(&format!("{name}.undo"))?;
            }
        }

        Ok(Self {
            default: file.default,
            steps: file.steps,
        })
    }

    /// Reads and parses a step configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails to parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    fn settings(&self, name: &str) -> Option<&StepSettings> {
        self.steps.get(name).or(self.default.as_ref())
    }

    /// Run configuration for `name`.
    #[must_use]
    pub fn config(&self, name: &str) -> Option<StepConfig> {
        self.settings(name).map(StepSettings::step_config)
    }

    /// Options for a compensating step named `name`.
    #[must_use]
    pub fn options(&self, name: &str) -> RollbackOptions {
        match self.settings(name) {
            Some(settings) => RollbackOptions {
                config: Some(settings.step_config()),
                undo: settings.undo.clone(),
            },
            None => RollbackOptions::default(),
        }
    }

    /// Names of all explicitly configured steps.
    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }
}
