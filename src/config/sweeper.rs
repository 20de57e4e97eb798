//! Expiry sweeper configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Background expiry sweep configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// Seconds between sweep passes
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum memberships examined per pass
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl SweeperConfig {
    /// Get the sweep interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate sweeper configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.batch_size < 1 || self.batch_size > 1000 {
            return Err(ValidationError::InvalidSweepBatchSize);
        }
        Ok(())
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_interval() -> u64 {
    3600
}

fn default_batch_size() -> i64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeper_config_defaults() {
        let config = SweeperConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert_eq!(config.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_interval_fails_validation() {
        let config = SweeperConfig {
            interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_batch_fails_validation() {
        let config = SweeperConfig {
            batch_size: 5000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
