use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skein_client::Client;
use std::net::SocketAddr;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "127.0.0.1:9092")]
    broker: SocketAddr,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the APIs the broker supports
    ApiVersions {
        #[arg(long, default_value = "4")]
        version: i16,
    },
    /// Describe topics and their partitions
    Describe {
        /// Topic names
        #[arg(required = true)]
        topics: Vec<String>,
    },
    /// Fetch from a topic by id
    Fetch {
        #[arg(short, long)]
        topic_id: Uuid,
        #[arg(short, long, default_value = "0")]
        partition: Vec<i32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    skein_common::logging::init_logging(tracing::Level::INFO);
    let args = Args::parse();

    let mut client = Client::connect(args.broker)
        .await
        .with_context(|| format!("connecting to {}", args.broker))?;

    match args.command {
        Commands::ApiVersions { version } => {
            let response = client.api_versions(version).await?;
            println!("error code: {}", response.error_code);
            for api in response.api_keys.items() {
                println!(
                    "api key {:>3}: versions {}..={}",
                    api.api_key, api.min_version, api.max_version
                );
            }
        }
        Commands::Describe { topics } => {
            let names: Vec<&str> = topics.iter().map(String::as_str).collect();
            let response = client.describe_topic_partitions(&names).await?;
            for topic in response.topics.items() {
                println!(
                    "{} id={} error={} partitions={}",
                    topic.name.0.as_deref().unwrap_or("<null>"),
                    topic.topic_id,
                    topic.error_code,
                    topic.partitions.len()
                );
                for partition in topic.partitions.items() {
                    println!(
                        "  partition {} leader={} replicas={:?} isr={:?}",
                        partition.partition_index,
                        partition.leader_id,
                        partition.replica_nodes.items(),
                        partition.isr_nodes.items()
                    );
                }
            }
        }
        Commands::Fetch {
            topic_id,
            partition,
        } => {
            let response = client.fetch(&[(topic_id, partition)]).await?;
            for topic in response.responses.items() {
                for part in topic.partitions.items() {
                    println!(
                        "{}/{}: error={} high_watermark={}",
                        topic.topic_id, part.partition_index, part.error_code, part.high_watermark
                    );
                }
            }
        }
    }

    Ok(())
}
