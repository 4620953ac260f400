use clap::Parser;
use onehop_http_proxy::config::{Config, ConnectionPoolConfig, ListenConfig, Scheme, UpstreamConfig};
use onehop_http_proxy::proxy::ProxyServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "onehop", about = "Transparent single-upstream HTTP reverse proxy")]
struct Args {
    /// TCP addresses to listen on for HTTP requests
    #[arg(short, long, value_delimiter = ',', default_value = "0.0.0.0:8098")]
    listen: Vec<SocketAddr>,

    /// Upstream host to proxy data to
    #[arg(short, long)]
    upstream_host: Option<String>,

    /// Upstream port; omitted means the scheme default
    #[arg(long)]
    upstream_port: Option<u16>,

    /// Scheme for the upstream exchange
    #[arg(long, default_value = "http")]
    scheme: Scheme,

    /// Maximum pooled connections to the upstream host
    #[arg(long, default_value_t = 50)]
    max_upstream_conns: usize,

    /// Seconds allowed for one upstream exchange
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    /// Forward the caller's Host header instead of the upstream host
    #[arg(long)]
    forward_client_host: bool,

    /// Enable transparent response compression
    #[arg(long)]
    compress: bool,

    /// YAML configuration file; when set, the other flags are ignored
    #[arg(short, long, env = "ONEHOP_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config, anyhow::Error> {
        let host = self
            .upstream_host
            .ok_or_else(|| anyhow::anyhow!("--upstream-host is required without --config"))?;

        let config = Config {
            listen: ListenConfig { addrs: self.listen },
            upstream: UpstreamConfig {
                host,
                port: self.upstream_port,
                scheme: self.scheme,
                tls_skip_verify: false,
            },
            connection_pool: ConnectionPoolConfig {
                max_connections: self.max_upstream_conns,
                ..Default::default()
            },
            request_timeout_secs: self.timeout_secs,
            forward_client_host: self.forward_client_host,
            compression: self.compress,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match args.config {
        Some(ref path) => Config::from_file(path)?,
        None => args.into_config()?,
    };

    ProxyServer::new(config)?.run().await
}
