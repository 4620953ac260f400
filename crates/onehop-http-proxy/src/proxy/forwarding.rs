//! Request forwarding logic.
//!
//! Translates one inbound request into one outbound request against the
//! configured upstream, invokes the connector, and translates the result
//! back. Bodies stream through in both directions; any connector failure
//! becomes a uniform `502 Bad Gateway` with a fixed body.

use super::client::UpstreamClient;
use super::error::ProxyError;
use super::headers::forward_headers;
use crate::config::Config;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderValue};
use hyper::{Request, Response, StatusCode, Uri};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// Immutable description of the single upstream, precomputed at startup.
pub struct UpstreamOrigin {
    /// `{scheme}://{authority}`, the prefix of every outbound URI.
    origin: String,
    /// Host header value forced onto outbound requests by default.
    host_header: HeaderValue,
    /// When set, the caller's Host header wins over the forced value.
    forward_client_host: bool,
}

impl UpstreamOrigin {
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let authority = config.upstream.authority();
        let host_header = HeaderValue::from_str(&authority)
            .map_err(|e| anyhow::anyhow!("Invalid upstream host '{authority}': {e}"))?;

        Ok(Self {
            origin: config.upstream.origin(),
            host_header,
            forward_client_host: config.forward_client_host,
        })
    }

    /// Compose the outbound URI: origin plus the verbatim request-target.
    /// No normalization, no path rewriting.
    fn target_uri(&self, request_target: &str) -> Result<Uri, ProxyError> {
        Ok(format!("{}{}", self.origin, request_target).parse::<Uri>()?)
    }

    /// Host header for the outbound request, per policy.
    fn host_value(&self, inbound: &hyper::HeaderMap) -> HeaderValue {
        if self.forward_client_host {
            if let Some(host) = inbound.get(header::HOST) {
                return host.clone();
            }
        }
        self.host_header.clone()
    }
}

/// Forward one inbound request to the upstream and stream the result back.
///
/// Never fails at the service layer: every error path answers the caller
/// with a gateway error and reports the cause to the log, nothing more.
pub async fn forward_request<B>(
    client: &UpstreamClient,
    origin: &UpstreamOrigin,
    timeout: Duration,
    req: Request<B>,
) -> Response<BoxBody<Bytes, hyper::Error>>
where
    B: Body<Data = Bytes, Error = hyper::Error> + Send + Sync + 'static,
{
    let (parts, body) = req.into_parts();
    let request_target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let target = match origin.target_uri(request_target) {
        Ok(uri) => uri,
        Err(err) => {
            warn!(request_target, error = %err, "Rejecting unforwardable request");
            return gateway_error();
        }
    };

    debug!("Forwarding {} {} to {}", parts.method, request_target, target);

    // Streaming pass-through; the body is never materialized here.
    let mut outbound = Request::builder()
        .method(parts.method)
        .uri(target)
        .version(parts.version)
        .body(BoxBody::new(body))
        .unwrap();
    *outbound.headers_mut() = forward_headers(&parts.headers, origin.host_value(&parts.headers));

    match client.execute(outbound, timeout).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, BoxBody::new(body))
        }
        Err(err) => {
            warn!(request_target, error = %err, "Upstream exchange failed");
            gateway_error()
        }
    }
}

/// The uniform caller-visible failure: 502 with a short fixed body.
/// Internal error detail stays in the logs.
pub fn gateway_error() -> Response<BoxBody<Bytes, hyper::Error>> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(BoxBody::new(
            Full::new(Bytes::from_static(b"Bad Gateway"))
                .map_err(|never: Infallible| match never {}),
        ))
        .unwrap()
}
