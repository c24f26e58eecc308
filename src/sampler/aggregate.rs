use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::peer::{PeerSampleResult, PeerSampler, SampleOutcome};
use crate::error::{LatencyError, Result};
use crate::logs::PeerId;

/// Denominator used for the average latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AveragePolicy {
    /// Mean over the peers that produced a sample.
    #[default]
    SuccessfulSamples,
    /// Sum of samples divided by every peer in the run. Peers that timed out
    /// or failed pull the average toward zero.
    TotalPeers,
}

impl fmt::Display for AveragePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AveragePolicy::SuccessfulSamples => f.write_str("successful-samples"),
            AveragePolicy::TotalPeers => f.write_str("total-peers"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    /// `None` when no peer produced a sample.
    pub average_elapsed_ms: Option<f64>,
    pub sample_count: usize,
    pub total_peers: usize,
    pub policy: AveragePolicy,
    pub results: Vec<PeerSampleResult>,
}

impl AggregateResult {
    /// Reduce per-peer results, in peer order, into one aggregate.
    pub fn from_results(results: Vec<PeerSampleResult>, policy: AveragePolicy) -> Self {
        let samples: Vec<u64> = results.iter().filter_map(PeerSampleResult::elapsed_ms).collect();
        let sample_count = samples.len();
        let total_peers = results.len();

        let denominator = match policy {
            AveragePolicy::SuccessfulSamples => sample_count,
            AveragePolicy::TotalPeers => total_peers,
        };
        let average_elapsed_ms = if sample_count == 0 {
            None
        } else {
            Some(samples.iter().sum::<u64>() as f64 / denominator as f64)
        };

        Self {
            average_elapsed_ms,
            sample_count,
            total_peers,
            policy,
            results,
        }
    }

    pub fn timed_out_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SampleOutcome::TimedOut { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, SampleOutcome::Failed { .. }))
            .count()
    }

    /// Every peer contributed a sample.
    pub fn is_complete(&self) -> bool {
        self.sample_count == self.total_peers
    }
}

/// Runs one [`PeerSampler`] task per peer and averages the results.
pub struct LatencyAggregator {
    sampler: PeerSampler,
    policy: AveragePolicy,
}

impl LatencyAggregator {
    pub fn new(sampler: PeerSampler, policy: AveragePolicy) -> Self {
        Self { sampler, policy }
    }

    /// Sample all `peers` concurrently.
    ///
    /// Timeouts and peer-scoped failures are part of the result. A timestamp
    /// error from any peer fails the run once every task has finished.
    pub async fn run(&self, peers: &[PeerId]) -> Result<AggregateResult> {
        debug!(
            "Sampling {} peers with a {:?} deadline each",
            peers.len(),
            self.sampler.deadline()
        );

        let tasks = peers.iter().cloned().map(|peer| {
            let sampler = self.sampler.clone();
            tokio::spawn(async move { sampler.sample(&peer).await })
        });
        let joined = join_all(tasks).await;

        let mut results = Vec::with_capacity(peers.len());
        for (peer, outcome) in peers.iter().zip(joined) {
            let result = outcome.map_err(|e| {
                LatencyError::internal(format!("sampling task for {} did not finish: {}", peer, e))
            })??;
            results.push(result);
        }

        let aggregate = AggregateResult::from_results(results, self.policy);
        info!(
            "{}/{} peers reported ({} timed out, {} failed)",
            aggregate.sample_count,
            aggregate.total_peers,
            aggregate.timed_out_count(),
            aggregate.failed_count()
        );
        Ok(aggregate)
    }
}
