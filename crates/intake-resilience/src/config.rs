//! File-based configuration for the whole intake stack.
//!
//! Every component keeps its own builder; [`IntakeConfig`] is the serialized
//! form an operator edits. It is read from TOML, validated as a whole, and
//! turned into builders so callers can still attach names and listeners:
//!
//! ```rust
//! use intake_resilience::IntakeConfig;
//!
//! let config = IntakeConfig::from_toml_str(r#"
//!     baseAdmissionLimit = 50
//!     windowMs = 30000
//!     concurrencyGateSize = 4
//!
//!     [circuitBreaker]
//!     resetTimeoutMs = 10000
//!
//!     [retry]
//!     maxRetries = 2
//!     retryablePatterns = ["ETIMEDOUT", { regex = "^5\\d\\d " }]
//! "#).unwrap();
//!
//! let gate = config.gate().name("uploads").build();
//! assert_eq!(gate.capacity(), 4);
//! ```
//!
//! Keys left out of the file take the documented defaults.

use intake_resilience_admission::AdmissionConfigBuilder;
use intake_resilience_circuitbreaker::CircuitBreakerConfigBuilder;
use intake_resilience_gate::GateConfigBuilder;
use intake_resilience_loadlimit::AdaptiveLimitConfigBuilder;
use intake_resilience_retry::{RetryConfigBuilder, RetryablePattern};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or has unknown keys.
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    /// One or more values are out of range.
    #[error("invalid configuration: {}", join_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

/// A single rejected value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ConfigIssue {
    /// Key path, as written in the file.
    pub field: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration for admission, load sensing, the breaker, retry and the
/// concurrency gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Per-identity budget per window on a healthy host. Default: 100
    pub base_admission_limit: usize,
    /// Admission window length. Default: 60000
    pub window_ms: u64,
    /// CPU utilization above which the host counts as loaded. Default: 80
    pub cpu_threshold_percent: f64,
    /// Memory utilization above which the host counts as loaded. Default: 85
    pub memory_threshold_percent: f64,
    /// Multiplier applied to the budget under load. Default: 0.5
    pub high_load_limit_factor: f64,
    /// How long a computed budget is reused. Default: 5000
    pub cache_duration_ms: u64,
    pub circuit_breaker: BreakerSettings,
    pub retry: RetrySettings,
    /// Slots in the concurrency gate. Default: 10
    pub concurrency_gate_size: usize,
}

/// Breaker section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BreakerSettings {
    /// Time spent open before a trial call. Default: 30000
    pub reset_timeout_ms: u64,
    /// Failure percentage that must be exceeded to open. Default: 50
    pub error_threshold_percentage: f64,
    /// Length of the rolling outcome window. Default: 10000
    pub rolling_count_timeout_ms: u64,
    /// Calls the window must hold before it can open. Default: 0
    pub volume_threshold: usize,
}

/// Retry section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Default: 3
    pub max_retries: usize,
    /// Default: 100
    pub initial_delay_ms: u64,
    /// Default: 10000
    pub max_delay_ms: u64,
    /// Default: 2.0
    pub backoff_factor: f64,
    /// Errors to retry. Empty retries every error. Default: empty
    pub retryable_patterns: Vec<PatternSetting>,
}

/// A retryable pattern as written in the file: a bare string is a literal
/// substring, `{ regex = "..." }` is a regular expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternSetting {
    Literal(String),
    Regex { regex: String },
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            base_admission_limit: 100,
            window_ms: 60_000,
            cpu_threshold_percent: 80.0,
            memory_threshold_percent: 85.0,
            high_load_limit_factor: 0.5,
            cache_duration_ms: 5_000,
            circuit_breaker: BreakerSettings::default(),
            retry: RetrySettings::default(),
            concurrency_gate_size: 10,
        }
    }
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            reset_timeout_ms: 30_000,
            error_threshold_percentage: 50.0,
            rolling_count_timeout_ms: 10_000,
            volume_threshold: 0,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            retryable_patterns: Vec::new(),
        }
    }
}

impl PatternSetting {
    fn compile(&self) -> Result<RetryablePattern, String> {
        match self {
            PatternSetting::Literal(text) if text.is_empty() => {
                Err("empty literal pattern matches every error".to_string())
            }
            PatternSetting::Literal(text) => Ok(RetryablePattern::literal(text.clone())),
            PatternSetting::Regex { regex } => {
                RetryablePattern::regex(regex).map_err(|e| format!("bad regex {regex:?}: {e}"))
            }
        }
    }
}

impl IntakeConfig {
    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: IntakeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded intake configuration");
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Checks every value and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        let mut reject = |field: &'static str, reason: String| {
            issues.push(ConfigIssue { field, reason });
        };

        if self.base_admission_limit == 0 {
            reject("baseAdmissionLimit", "must be at least 1".into());
        }
        if self.window_ms == 0 {
            reject("windowMs", "must be greater than 0".into());
        }
        for (field, value) in [
            ("cpuThresholdPercent", self.cpu_threshold_percent),
            ("memoryThresholdPercent", self.memory_threshold_percent),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                reject(field, format!("must be in (0, 100], got {value}"));
            }
        }
        let factor = self.high_load_limit_factor;
        if !(factor > 0.0 && factor <= 1.0) {
            reject("highLoadLimitFactor", format!("must be in (0, 1], got {factor}"));
        }
        if self.cache_duration_ms == 0 {
            reject("cacheDurationMs", "must be greater than 0".into());
        }

        let breaker = &self.circuit_breaker;
        if breaker.reset_timeout_ms == 0 {
            reject("circuitBreaker.resetTimeoutMs", "must be greater than 0".into());
        }
        if breaker.rolling_count_timeout_ms == 0 {
            reject(
                "circuitBreaker.rollingCountTimeoutMs",
                "must be greater than 0".into(),
            );
        }
        let threshold = breaker.error_threshold_percentage;
        if !(0.0..=100.0).contains(&threshold) {
            reject(
                "circuitBreaker.errorThresholdPercentage",
                format!("must be in [0, 100], got {threshold}"),
            );
        }

        let retry = &self.retry;
        if !(retry.backoff_factor.is_finite() && retry.backoff_factor >= 1.0) {
            reject(
                "retry.backoffFactor",
                format!("must be at least 1, got {}", retry.backoff_factor),
            );
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            reject(
                "retry.initialDelayMs",
                format!(
                    "{} exceeds retry.maxDelayMs {}",
                    retry.initial_delay_ms, retry.max_delay_ms
                ),
            );
        }
        for pattern in &retry.retryable_patterns {
            if let Err(reason) = pattern.compile() {
                reject("retry.retryablePatterns", reason);
            }
        }

        if self.concurrency_gate_size == 0 {
            reject("concurrencyGateSize", "must be at least 1".into());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            tracing::warn!(issues = issues.len(), "rejected intake configuration");
            Err(ConfigError::Invalid(issues))
        }
    }

    /// Admission window length.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Builder for the adaptive budget.
    pub fn load_limit(&self) -> AdaptiveLimitConfigBuilder {
        AdaptiveLimitConfigBuilder::new()
            .base_limit(self.base_admission_limit)
            .cpu_threshold_percent(self.cpu_threshold_percent)
            .memory_threshold_percent(self.memory_threshold_percent)
            .high_load_factor(self.high_load_limit_factor)
            .cache_duration(Duration::from_millis(self.cache_duration_ms))
    }

    /// Builder for the admission controller.
    pub fn admission(&self) -> AdmissionConfigBuilder {
        AdmissionConfigBuilder::new().window(self.window())
    }

    /// Builder for the circuit breaker.
    pub fn circuit_breaker(&self) -> CircuitBreakerConfigBuilder {
        let breaker = &self.circuit_breaker;
        CircuitBreakerConfigBuilder::new()
            .reset_timeout(Duration::from_millis(breaker.reset_timeout_ms))
            .error_threshold_percentage(breaker.error_threshold_percentage)
            .rolling_count_timeout(Duration::from_millis(breaker.rolling_count_timeout_ms))
            .volume_threshold(breaker.volume_threshold)
    }

    /// Builder for the retry policy. Fails if a pattern does not compile.
    pub fn retry(&self) -> Result<RetryConfigBuilder, ConfigError> {
        let retry = &self.retry;
        let mut patterns = Vec::with_capacity(retry.retryable_patterns.len());
        let mut issues = Vec::new();
        for setting in &retry.retryable_patterns {
            match setting.compile() {
                Ok(pattern) => patterns.push(pattern),
                Err(reason) => issues.push(ConfigIssue {
                    field: "retry.retryablePatterns",
                    reason,
                }),
            }
        }
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }

        Ok(RetryConfigBuilder::new()
            .max_retries(retry.max_retries)
            .initial_delay(Duration::from_millis(retry.initial_delay_ms))
            .max_delay(Duration::from_millis(retry.max_delay_ms))
            .backoff_factor(retry.backoff_factor)
            .retryable_patterns(patterns))
    }

    /// Builder for the concurrency gate.
    pub fn gate(&self) -> GateConfigBuilder {
        GateConfigBuilder::new().capacity(self.concurrency_gate_size)
    }
}
