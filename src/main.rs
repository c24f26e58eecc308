use anyhow::Context;
use clap::Parser;
use peer_latency::app::{handle_fatal_error, init_logging, AppConfig};
use peer_latency::config::TimingConfig;
use peer_latency::logs::PeerId;
use peer_latency::run::LatencyRun;
use peer_latency::sampler::AveragePolicy;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Measure transaction-to-consensus latency across cluster peers
#[derive(Parser, Debug)]
#[command(name = "peer-latency", version)]
#[command(about = "Measure how long a transaction takes to reach consensus on every peer", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Peer to sample (repeatable, replaces the configured list)
    #[arg(long = "peer", value_name = "NAME")]
    peers: Vec<String>,

    /// Transaction submission endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Per-peer deadline in milliseconds
    #[arg(long, value_name = "MS")]
    deadline_ms: Option<u64>,

    /// Pause between log queries in milliseconds
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Number of padding characters appended to the transaction
    #[arg(long)]
    padding: Option<usize>,

    /// Denominator for the average
    #[arg(long, value_enum)]
    policy: Option<AveragePolicy>,

    /// Do not start or stop the cluster; it is managed elsewhere
    #[arg(long)]
    external_cluster: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Command-line flags take precedence over file and environment.
    fn apply_overrides(&self, config: &mut TimingConfig) {
        if !self.peers.is_empty() {
            config.peers = self.peers.iter().map(|p| PeerId::from(p.as_str())).collect();
        }
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(ms) = self.deadline_ms {
            config.deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(padding) = self.padding {
            config.payload_padding = padding;
        }
        if let Some(policy) = self.policy {
            config.average_policy = policy;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = AppConfig::new(cli.verbose).with_json_output(cli.json);
    init_logging(&app_config);

    if let Err(e) = run(cli, &app_config).await {
        handle_fatal_error(e, app_config.verbose);
    }
}

async fn run(cli: Cli, app_config: &AppConfig) -> anyhow::Result<()> {
    let mut config = TimingConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    debug!("Effective configuration: {:?}", config);

    let run = LatencyRun::from_config(&config, cli.external_cluster)?;
    let report = run.execute().await?;

    if app_config.json_output {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        println!("{report}");
    }
    Ok(())
}
