//! Listener configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    /// TCP addresses accepting inbound HTTP requests.
    #[serde(default = "default_listen_addrs")]
    pub addrs: Vec<SocketAddr>,
}

fn default_listen_addrs() -> Vec<SocketAddr> {
    vec![SocketAddr::from(([0, 0, 0, 0], 8098))]
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            addrs: default_listen_addrs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listen_addr() {
        let listen = ListenConfig::default();
        assert_eq!(listen.addrs.len(), 1);
        assert_eq!(listen.addrs[0].port(), 8098);
    }
}
