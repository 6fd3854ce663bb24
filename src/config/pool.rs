//! Pool configuration structures.

use serde::{Deserialize, Serialize};

/// Default for installing the built-in constraints.
fn default_install_default_constraints() -> bool {
    true
}

/// Default bound for in-memory audit sinks.
fn default_audit_buffer_size() -> usize {
    1024
}

/// Pool construction configuration.
///
/// # Example
///
/// ```rust
/// use alphatier::config::PoolConfig;
/// use alphatier::core::{InMemoryAuditSink, Pool};
///
/// let config = PoolConfig::new().with_audit_buffer_size(256);
/// assert!(config.validate().is_ok());
///
/// let sink = InMemoryAuditSink::from_config(&config);
/// let pool = Pool::with_config(config).with_audit(Box::new(sink));
/// assert_eq!(pool.config().audit_buffer_size, 256);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Install the built-in `optimistic-locking` and
    /// `no-resource-overbooking` constraints on creation.
    ///
    /// Disable only when the consistency contract is replaced wholesale by
    /// user-supplied constraints.
    #[serde(default = "default_install_default_constraints")]
    pub install_default_constraints: bool,

    /// Bound for in-memory audit sinks built from this configuration via
    /// [`InMemoryAuditSink::from_config`](crate::core::audit::InMemoryAuditSink::from_config).
    #[serde(default = "default_audit_buffer_size")]
    pub audit_buffer_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            install_default_constraints: default_install_default_constraints(),
            audit_buffer_size: default_audit_buffer_size(),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the built-in constraints are installed.
    #[must_use]
    pub fn with_install_default_constraints(mut self, install: bool) -> Self {
        self.install_default_constraints = install;
        self
    }

    /// Set the audit buffer bound.
    #[must_use]
    pub fn with_audit_buffer_size(mut self, size: usize) -> Self {
        self.audit_buffer_size = size;
        self
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when a value is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if self.audit_buffer_size == 0 {
            return Err("audit_buffer_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
