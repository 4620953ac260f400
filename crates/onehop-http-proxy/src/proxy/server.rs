//! ProxyServer struct and main run loop.
//!
//! Binds the configured listen addresses, accepts connections, and
//! serves each one over HTTP/1.x on its own task. When transparent
//! compression is enabled the per-request service is wrapped in
//! tower-http's `CompressionLayer`; the forwarding core is unaware of it.

use super::client::UpstreamClient;
use super::forwarding::{forward_request, UpstreamOrigin};
use super::network::create_reusable_listener;
use crate::config::Config;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tracing::{error, info};

/// The proxy server: immutable configuration, the upstream origin, and
/// the pooled upstream client.
pub struct ProxyServer {
    config: Arc<Config>,
    origin: UpstreamOrigin,
    client: UpstreamClient,
}

impl ProxyServer {
    /// Create a new ProxyServer from configuration.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let origin = UpstreamOrigin::from_config(&config)?;
        let client = UpstreamClient::new(&config);

        Ok(Self {
            config: Arc::new(config),
            origin,
            client,
        })
    }

    /// Run the proxy server until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let addrs = self.config.listen.addrs.clone();
        let upstream = self.config.upstream.origin();
        let server = Arc::new(self);

        let mut accept_loops: Vec<JoinHandle<()>> = Vec::with_capacity(addrs.len());
        for addr in addrs {
            let listener = create_reusable_listener(addr)?;
            info!("Listening on http://{}", listener.local_addr()?);
            accept_loops.push(tokio::spawn(accept_loop(listener, Arc::clone(&server))));
        }
        info!("Proxying to {}", upstream);

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received, closing listeners");
        for handle in &accept_loops {
            handle.abort();
        }
        // Dropping the last Arc<Self> drops the upstream client and with
        // it every pooled connection.
        Ok(())
    }

    /// Per-request entry point; infallible so one bad request can never
    /// tear down the connection task.
    async fn handle(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
        Ok(forward_request(&self.client, &self.origin, self.config.request_timeout(), req).await)
    }
}

async fn accept_loop(listener: TcpListener, server: Arc<ProxyServer>) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!("Failed to accept connection: {}", err);
                continue;
            }
        };
        let server = Arc::clone(&server);

        tokio::spawn(async move {
            let io = TokioIo::new(stream);

            if server.config.compression {
                let service = tower::service_fn(move |req: Request<Incoming>| {
                    let server = Arc::clone(&server);
                    async move { server.handle(req).await }
                });
                let service = ServiceBuilder::new()
                    .layer(CompressionLayer::new())
                    .service(service);

                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, TowerToHyperService::new(service))
                    .await
                {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            } else {
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            }
        });
    }
}
