use anyhow::{Context, Result};
use clap::Parser;
use skein_metadata::{FileLogSource, TopicRegistry};
use skein_server::config::{ServerConfig, DEFAULT_METADATA_LOG};
use skein_server::Server;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

/// Kafka-wire broker answering topic metadata from a KRaft metadata log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:9092")]
    bind: SocketAddr,

    /// Maximum number of concurrent connections
    #[arg(long, default_value = "1024")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Path of the __cluster_metadata log segment
    #[arg(long, default_value = DEFAULT_METADATA_LOG)]
    metadata_log: PathBuf,

    /// Close connections idle for this many seconds
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Largest request frame accepted, in bytes
    #[arg(long, default_value = "104857600")]
    max_frame_bytes: usize,

    /// Parse the metadata log before accepting connections
    #[arg(long)]
    preload: bool,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            max_connections: self.max_connections,
            idle_timeout: self.idle_timeout_secs.map(Duration::from_secs),
            max_frame_bytes: self.max_frame_bytes,
            metadata_log: self.metadata_log.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    skein_common::logging::init_logging(args.log_level);

    let config = args.server_config();
    info!("Starting skein broker...");
    info!("Binding to {}", config.bind_addr);
    info!("Max connections: {}", config.max_connections);
    info!("Metadata log: {:?}", config.metadata_log);

    let registry = Arc::new(TopicRegistry::new(Arc::new(FileLogSource::new(
        config.metadata_log.clone(),
    ))));
    if args.preload {
        let catalog = registry
            .ensure_loaded()
            .await
            .context("loading metadata log")?;
        for topic in catalog.topics() {
            info!(
                "Topic {} ({}) with {} partitions",
                topic.name,
                topic.id,
                topic.partitions.len()
            );
        }
        for feature in catalog.feature_levels() {
            info!("Feature {} at level {}", feature.name, feature.feature_level);
        }
    }

    let (server, shutdown_sender) = Server::bind(&config, registry)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received");
    let _ = shutdown_sender.send(());
    server_handle.await?;

    info!("Server shutting down");

    Ok(())
}
