use std::time::Duration;

use crate::handlers::http::MAX_BODY_BYTES;
use crate::region::Region;
use crate::DEFAULT_TIMEOUT_MS;

/// Configuration of an in-process prober
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// The region this prober reports results for
    pub region: Region,

    /// Timeout applied when a request carries none
    pub default_timeout: Duration,

    /// Response bodies beyond this size are truncated
    pub max_body_bytes: usize,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            region: Region::Ams,
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

impl ProberConfig {
    /// Create a new configuration builder
    pub fn builder() -> ProberConfigBuilder {
        ProberConfigBuilder::default()
    }
}

/// Builder for ProberConfig
#[derive(Debug, Default)]
pub struct ProberConfigBuilder {
    config: ProberConfig,
}

impl ProberConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> ProberConfig {
        self.config
    }

    pub fn region(mut self, region: Region) -> Self {
        self.config.region = region;
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ProberConfig::builder()
            .region(Region::Hkg)
            .default_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.region, Region::Hkg);
        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert_eq!(config.max_body_bytes, MAX_BODY_BYTES);
    }
}
