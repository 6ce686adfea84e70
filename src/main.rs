use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use pod_feeder::config::{Cli, FileConfig, RunMode, Settings};
use pod_feeder::pipeline::{run_cycle, CycleReport};
use pod_feeder::publish::PodClient;
use pod_feeder::storage::{Store, StoreError};

const USER_AGENT: &str = concat!("pod-feeder/", env!("CARGO_PKG_VERSION"));

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise --debug selects the level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let file_config = match &cli.config {
        Some(path) => FileConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli, file_config).context("Invalid configuration")?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let db_path = settings
        .database
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let store = match Store::open(db_path).await {
        Ok(store) => store,
        Err(StoreError::Locked) => {
            eprintln!("Error: {}", StoreError::Locked);
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database {}: {}", db_path, e));
        }
    };

    let result = match &settings.run_mode {
        RunMode::Publish(credentials) => {
            let pod = PodClient::new(client.clone(), credentials)
                .context("Failed to configure pod client")?;
            run_cycle(&store, &client, &settings, Some(&pod)).await
        }
        RunMode::FetchOnly => run_cycle::<PodClient>(&store, &client, &settings, None).await,
    };
    store.close().await;

    let CycleReport {
        fetched,
        queued,
        published,
        failed,
    } = result?;
    tracing::info!(
        feed_id = %settings.feed_id,
        fetched = fetched,
        queued = queued,
        published = published,
        failed = failed,
        "Run complete"
    );

    Ok(())
}
