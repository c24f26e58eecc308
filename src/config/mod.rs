//! Run configuration
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML
//! file, `PEER_LATENCY_*` environment variables, and command-line flags
//! (applied by the binary).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorCode, LatencyError, Result};
use crate::logs::{MarkerSet, PeerId};
use crate::sampler::AveragePolicy;

pub const ENV_ENDPOINT: &str = "PEER_LATENCY_ENDPOINT";
pub const ENV_DEADLINE_MS: &str = "PEER_LATENCY_DEADLINE_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "PEER_LATENCY_POLL_INTERVAL_MS";
pub const ENV_PEERS: &str = "PEER_LATENCY_PEERS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Peers to sample, in report order
    pub peers: Vec<PeerId>,
    /// Transaction submission endpoint
    pub endpoint: String,
    /// How long each peer may take to reach consensus
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
    /// Pause between log queries for one peer
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Wait between cluster start and submission
    #[serde(with = "humantime_serde")]
    pub startup_delay: Duration,
    /// Upper bound for a single `docker logs` call
    #[serde(with = "humantime_serde")]
    pub log_query_timeout: Duration,
    /// HTTP timeout for the submission request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Number of padding characters appended to the transaction
    pub payload_padding: usize,
    pub average_policy: AveragePolicy,
    pub docker_binary: String,
    pub markers: MarkerSet,
    pub cluster: ClusterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Command that brings the peers up
    pub start: Vec<String>,
    /// Command that tears the peers down
    pub stop: Vec<String>,
    /// Directory the commands run in
    pub working_dir: Option<PathBuf>,
    /// Optional limit for each command
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            start: vec!["python3".to_string(), "start_docker.py".to_string()],
            stop: vec!["python3".to_string(), "stop_docker.py".to_string()],
            working_dir: None,
            timeout: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(4),
            endpoint: "http://0.0.0.0:3015/send-transaction".to_string(),
            deadline: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            startup_delay: Duration::from_secs(1),
            log_query_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            payload_padding: 10,
            average_policy: AveragePolicy::default(),
            docker_binary: "docker".to_string(),
            markers: MarkerSet::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

/// `peer_1` .. `peer_<count>`, the container names used by the cluster scripts
pub fn default_peers(count: usize) -> Vec<PeerId> {
    (1..=count).map(|i| PeerId::new(format!("peer_{}", i))).collect()
}

impl TimingConfig {
    /// Defaults, overlaid with `path` when given, then with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.merge_env_vars();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LatencyError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("cannot read {}", path.display()),
            )
            .with_source(e)
        })?;
        Self::from_toml(&content).map_err(|e| e.with_context(path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            LatencyError::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, e.to_string())
                .with_source(e)
        })
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Unparseable numbers are ignored with a
    /// warning.
    pub fn merge_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }

        if let Some(ms) = lookup(ENV_DEADLINE_MS) {
            match ms.parse::<u64>() {
                Ok(ms) => self.deadline = Duration::from_millis(ms),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_DEADLINE_MS, ms, e),
            }
        }

        if let Some(ms) = lookup(ENV_POLL_INTERVAL_MS) {
            match ms.parse::<u64>() {
                Ok(ms) => self.poll_interval = Duration::from_millis(ms),
                Err(e) => tracing::warn!("Ignoring {}={:?}: {}", ENV_POLL_INTERVAL_MS, ms, e),
            }
        }

        if let Some(peers) = lookup(ENV_PEERS) {
            self.peers = peers
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PeerId::from)
                .collect();
        }
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(LatencyError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                message.to_string(),
            ))
        };

        if self.peers.is_empty() {
            return invalid("at least one peer is required");
        }
        if self.deadline.is_zero() {
            return invalid("deadline must be greater than zero");
        }
        if self.poll_interval.is_zero() {
            return invalid("poll_interval must be greater than zero");
        }
        if self.markers.received.is_empty() || self.markers.consensus.is_empty() {
            return invalid("markers must not be empty");
        }
        if self.markers.received == self.markers.consensus {
            return invalid("received and consensus markers must differ");
        }
        if self.cluster.start.is_empty() || self.cluster.stop.is_empty() {
            return invalid("cluster start and stop commands must not be empty");
        }
        if self.endpoint.trim().is_empty() {
            return invalid("endpoint must not be empty");
        }
        Ok(())
    }
}
