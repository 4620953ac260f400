//! Error taxonomy for the forwarding pipeline.
//!
//! Every variant maps to the same caller-visible `502 Bad Gateway`; the
//! distinction only matters for logging.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound request-target could not be composed into a valid
    /// outbound URI. The upstream is never contacted.
    #[error("invalid request target: {0}")]
    InvalidTarget(#[from] hyper::http::uri::InvalidUri),

    /// Connection failure, reset, or protocol error talking to the
    /// upstream. The faulty connection is discarded, not pooled.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] hyper_util::client::legacy::Error),

    /// The exchange did not complete within the configured timeout.
    #[error("upstream exchange timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// Waiting for a pool slot outlived the configured timeout.
    #[error("upstream connection pool exhausted after {0:?}")]
    PoolExhausted(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_names_the_deadline() {
        let err = ProxyError::UpstreamTimeout(Duration::from_secs(15));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("15s"));
    }

    #[test]
    fn test_pool_exhausted_display() {
        let err = ProxyError::PoolExhausted(Duration::from_secs(3));
        assert!(err.to_string().contains("pool exhausted"));
    }

    #[test]
    fn test_invalid_target_from_parse_failure() {
        let parse_err = "http://\\bad".parse::<hyper::Uri>().unwrap_err();
        let err = ProxyError::from(parse_err);
        assert!(matches!(err, ProxyError::InvalidTarget(_)));
    }
}
