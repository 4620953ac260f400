//! Configuration types for the Onehop proxy.

mod listen;
mod scheme;
mod upstream;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use listen::ListenConfig;
pub use scheme::Scheme;
pub use upstream::{ConnectionPoolConfig, UpstreamConfig};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,

    /// Single upstream target; every proxied request goes here.
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,

    /// Seconds allowed for one upstream exchange, pool wait included.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Forward the caller's Host header instead of the configured
    /// upstream host.
    #[serde(default)]
    pub forward_client_host: bool,

    /// Transparent gzip/deflate response compression.
    #[serde(default)]
    pub compression: bool,
}

fn default_request_timeout() -> u64 {
    15
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.addrs.is_empty() {
            anyhow::bail!("At least one listen address is required");
        }

        if self.upstream.host.is_empty() {
            anyhow::bail!("Upstream host must not be empty");
        }

        // The host is an authority, not a URL; catch the common mistake early.
        if self.upstream.host.contains("://") {
            anyhow::bail!(
                "Upstream host must not include a scheme (got '{}'); \
                 use the 'scheme' field instead",
                self.upstream.host
            );
        }

        if self.connection_pool.max_connections == 0 {
            anyhow::bail!("connection_pool.max_connections must be at least 1");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be at least 1");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
