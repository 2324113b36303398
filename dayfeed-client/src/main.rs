//! dayfeed-client - command-line feed consumer
//!
//! Fetches the daily feed (or confirms a task) through the resilient
//! fetcher and prints the JSON response on stdout. Logs go to stderr so
//! the output can be piped.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dayfeed_client::{FetchError, FetcherConfig, ResilientFetcher};
use dayfeed_common::api::AcknowledgeRequest;
use dayfeed_common::time::now_millis;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dayfeed-client")]
#[command(about = "Fetch the daily feed from a dayfeed server", long_about = None)]
#[command(version)]
struct Args {
    /// Server base URL
    #[arg(long, env = "DAYFEED_URL", default_value = "http://127.0.0.1:5740")]
    base_url: String,

    /// Client identifier
    #[arg(long, env = "DAYFEED_CLIENT_ID")]
    client_id: String,

    /// Total attempts before giving up
    #[arg(long, default_value_t = 3)]
    max_retries: u32,

    /// Per-attempt timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Shared secret for request signing (0 = unsigned)
    #[arg(long, env = "DAYFEED_SHARED_SECRET", default_value_t = 0)]
    shared_secret: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch today's feed
    Feed,
    /// Confirm a daily task
    Ack {
        #[arg(long)]
        task_type: String,
        #[arg(long)]
        time_slot: String,
        #[arg(long)]
        description: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => {}
        Err(e) => {
            let code = e
                .downcast_ref::<FetchError>()
                .map(|f| f.kind().exit_code())
                .unwrap_or(1);
            error!("{:#}", e);
            std::process::exit(code);
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = FetcherConfig {
        shared_secret: args.shared_secret,
        timeout: Duration::from_millis(args.timeout_ms),
        ..FetcherConfig::new(args.base_url)
    };
    let fetcher = ResilientFetcher::new(config)?;

    let output = match args.command {
        Command::Feed => {
            let feed = fetcher.fetch(&args.client_id, args.max_retries).await?;
            info!(tasks = feed.tasks.len(), "Feed received");
            serde_json::to_string_pretty(&feed)?
        }
        Command::Ack {
            task_type,
            time_slot,
            description,
        } => {
            let request = AcknowledgeRequest {
                client_id: args.client_id,
                task_type,
                time_slot,
                description,
                timestamp: now_millis(),
                hash: None,
            };
            let response = fetcher.acknowledge(&request, args.max_retries).await?;
            serde_json::to_string_pretty(&response)?
        }
    };

    println!("{}", output);
    Ok(())
}
