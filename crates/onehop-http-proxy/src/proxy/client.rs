//! Upstream connector: pooled connections and the single-exchange call.
//!
//! The hyper-util legacy client owns connection reuse (idle connections
//! go back to its pool, errored or abandoned ones are discarded). The
//! semaphore on top enforces the hard bound the pool settings alone do
//! not give: at most `max_connections` upstream connections open at
//! once, with saturated callers waiting up to the request timeout.

use super::error::ProxyError;
use super::tls::NoVerifier;
use crate::config::Config;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Frame, Incoming, SizeHint};
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{info, warn};

type PooledClient = Client<
    hyper_rustls::HttpsConnector<HttpConnector>,
    BoxBody<Bytes, hyper::Error>,
>;

/// Client for the single configured upstream.
pub struct UpstreamClient {
    client: PooledClient,
    limiter: Arc<Semaphore>,
}

impl UpstreamClient {
    /// Build the pooled client from configuration.
    pub fn new(config: &Config) -> Self {
        let pool = &config.connection_pool;

        let mut http_connector = HttpConnector::new();
        http_connector.set_keepalive(Some(Duration::from_secs(pool.keepalive_timeout_secs)));
        http_connector.set_connect_timeout(Some(Duration::from_secs(pool.connect_timeout_secs)));
        http_connector.enforce_http(false); // Allow both HTTP and HTTPS

        // HTTPS-capable connector, HTTP/1.1 only
        let https_connector = if config.upstream.tls_skip_verify {
            warn!("TLS certificate verification DISABLED for the upstream (development/testing only)");
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_tls_config(
                    rustls::ClientConfig::builder()
                        .dangerous()
                        .with_custom_certificate_verifier(Arc::new(NoVerifier))
                        .with_no_client_auth(),
                )
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector)
        } else {
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .expect("Failed to load native root certificates")
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector)
        };

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .pool_max_idle_per_host(pool.max_connections)
            .build(https_connector);

        info!(
            "Connection pool configured (HTTP/1.1): max_connections={}, idle_timeout={}s, keepalive={}s",
            pool.max_connections, pool.idle_timeout_secs, pool.keepalive_timeout_secs
        );

        Self {
            client,
            limiter: Arc::new(Semaphore::new(pool.max_connections)),
        }
    }

    /// Perform exactly one request/response exchange against the upstream.
    ///
    /// One deadline covers the pool wait and the exchange. The returned
    /// response body holds its pool slot until fully consumed or dropped;
    /// a timed-out or failed exchange abandons its connection instead of
    /// returning it to the pool. Never retries.
    pub async fn execute(
        &self,
        request: Request<BoxBody<Bytes, hyper::Error>>,
        timeout: Duration,
    ) -> Result<Response<PermitBody<Incoming>>, ProxyError> {
        let deadline = tokio::time::Instant::now() + timeout;

        let permit = tokio::time::timeout_at(deadline, Arc::clone(&self.limiter).acquire_owned())
            .await
            .map_err(|_| ProxyError::PoolExhausted(timeout))?
            .expect("connection limiter is never closed");

        let response = tokio::time::timeout_at(deadline, self.client.request(request))
            .await
            .map_err(|_| ProxyError::UpstreamTimeout(timeout))??;

        Ok(response.map(|body| PermitBody::new(body, permit)))
    }
}

/// Response body that keeps its pool slot until the stream ends.
#[derive(Debug)]
pub struct PermitBody<B> {
    inner: B,
    _permit: OwnedSemaphorePermit,
}

impl<B> PermitBody<B> {
    fn new(inner: B, permit: OwnedSemaphorePermit) -> Self {
        Self {
            inner,
            _permit: permit,
        }
    }
}

impl<B> Body for PermitBody<B>
where
    B: Body + Unpin,
{
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
