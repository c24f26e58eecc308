//! One end-to-end latency measurement
//!
//! A run starts the cluster, waits for it to settle, submits a single
//! transaction and samples every peer concurrently. The cluster is stopped
//! on every exit path, including Ctrl-C.

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cluster::{with_cluster, ClusterLifecycle, CommandClusterLifecycle, ExternalCluster};
use crate::config::TimingConfig;
use crate::error::{LatencyError, Result};
use crate::logs::{DockerLogSource, LogSource, PeerId};
use crate::sampler::{AggregateResult, LatencyAggregator, PeerSampler, SampleOutcome};
use crate::submit::{build_payload, HttpSubmitter, TransactionSubmitter};
use crate::subprocess::SubprocessManager;

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Length in characters of the submitted transaction
    pub payload_length: usize,
    #[serde(flatten)]
    pub aggregate: AggregateResult,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "String length: {}. ", self.payload_length)?;
        match self.aggregate.average_elapsed_ms {
            Some(avg) => write!(f, "Average time: {:.1}ms.", avg)?,
            None => write!(f, "Average time: no samples.")?,
        }
        write!(
            f,
            " ({}/{} peers reported)",
            self.aggregate.sample_count, self.aggregate.total_peers
        )
    }
}

pub struct LatencyRun {
    peers: Vec<PeerId>,
    startup_delay: Duration,
    payload_padding: usize,
    aggregator: LatencyAggregator,
    cluster: Arc<dyn ClusterLifecycle>,
    submitter: Arc<dyn TransactionSubmitter>,
}

impl LatencyRun {
    pub fn new(
        config: &TimingConfig,
        logs: Arc<dyn LogSource>,
        cluster: Arc<dyn ClusterLifecycle>,
        submitter: Arc<dyn TransactionSubmitter>,
    ) -> Self {
        let sampler = PeerSampler::new(logs, config.deadline)
            .with_markers(config.markers.clone())
            .with_poll_interval(config.poll_interval)
            .with_query_timeout(config.log_query_timeout);

        Self {
            peers: config.peers.clone(),
            startup_delay: config.startup_delay,
            payload_padding: config.payload_padding,
            aggregator: LatencyAggregator::new(sampler, config.average_policy),
            cluster,
            submitter,
        }
    }

    /// Wire up docker logs, the configured cluster commands and the HTTP
    /// endpoint. `external_cluster` leaves starting and stopping to the
    /// caller.
    pub fn from_config(config: &TimingConfig, external_cluster: bool) -> Result<Self> {
        let runner = SubprocessManager::production().runner();

        let logs = DockerLogSource::new(Arc::clone(&runner))
            .with_binary(&config.docker_binary)
            .with_query_timeout(config.log_query_timeout);

        let cluster: Arc<dyn ClusterLifecycle> = if external_cluster {
            Arc::new(ExternalCluster)
        } else {
            Arc::new(
                CommandClusterLifecycle::new(
                    runner,
                    config.cluster.start.clone(),
                    config.cluster.stop.clone(),
                )
                .with_working_dir(config.cluster.working_dir.clone())
                .with_timeout(config.cluster.timeout),
            )
        };

        let submitter = HttpSubmitter::new(&config.endpoint, config.request_timeout)?;

        Ok(Self::new(config, Arc::new(logs), cluster, Arc::new(submitter)))
    }

    /// Run once, treating Ctrl-C as an interruption.
    ///
    /// The handler is installed before the cluster starts, so a Ctrl-C
    /// during start is honoured once start returns and teardown still runs.
    pub async fn execute(&self) -> Result<RunReport> {
        let mut interrupt = Box::pin(ctrl_c());
        if futures::poll!(interrupt.as_mut()).is_ready() {
            return Err(LatencyError::Interrupted);
        }
        self.execute_until(interrupt).await
    }

    /// Run once, aborting the measurement with `Interrupted` when `shutdown`
    /// resolves first. The cluster is still stopped.
    pub async fn execute_until<S>(&self, shutdown: S) -> Result<RunReport>
    where
        S: Future<Output = ()>,
    {
        with_cluster(self.cluster.as_ref(), || async move {
            tokio::select! {
                biased;
                () = shutdown => {
                    warn!("Interrupted, stopping cluster");
                    Err(LatencyError::Interrupted)
                }
                report = self.measure() => report,
            }
        })
        .await
    }

    async fn measure(&self) -> Result<RunReport> {
        if !self.startup_delay.is_zero() {
            debug!("Waiting {:?} for the cluster to settle", self.startup_delay);
            tokio::time::sleep(self.startup_delay).await;
        }

        let payload = build_payload(self.payload_padding);
        let payload_length = payload.chars().count();
        self.submitter.submit(&payload).await?;
        info!("Submitted {} character transaction", payload_length);

        let aggregate = self.aggregator.run(&self.peers).await?;
        for result in &aggregate.results {
            match &result.outcome {
                SampleOutcome::Completed { elapsed_ms } => {
                    info!("{}: {} ms", result.peer, elapsed_ms)
                }
                SampleOutcome::TimedOut { waited } => {
                    warn!("{}: no consensus within {:?}", result.peer, waited)
                }
                SampleOutcome::Failed { failure } => warn!("{}: {:?}", result.peer, failure),
            }
        }

        Ok(RunReport {
            payload_length,
            aggregate,
        })
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::logs::InMemoryLogSource;
    use crate::sampler::{AveragePolicy, PeerSampleResult};
    use crate::submit::SubmitAck;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSubmitter {
        payloads: Mutex<Vec<String>>,
        reject: bool,
    }

    #[async_trait]
    impl TransactionSubmitter for RecordingSubmitter {
        async fn submit(&self, payload: &str) -> Result<SubmitAck> {
            self.payloads.lock().unwrap().push(payload.to_string());
            if self.reject {
                return Err(LatencyError::submission_with_code(
                    ErrorCode::SUBMIT_REJECTED,
                    "busy",
                ));
            }
            Ok(SubmitAck {
                status: 200,
                body: String::new(),
            })
        }
    }

    #[derive(Default)]
    struct CountingCluster {
        starts: AtomicUsize,
        stops: AtomicUsize,
        start_delay: Duration,
    }

    #[async_trait]
    impl ClusterLifecycle for CountingCluster {
        async fn start(&self) -> Result<()> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.start_delay).await;
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(peers: &[&str]) -> TimingConfig {
        TimingConfig {
            peers: peers.iter().map(|p| PeerId::from(*p)).collect(),
            deadline: Duration::from_millis(300),
            poll_interval: Duration::from_millis(10),
            startup_delay: Duration::ZERO,
            ..TimingConfig::default()
        }
    }

    fn seeded_logs() -> InMemoryLogSource {
        let logs = InMemoryLogSource::new();
        logs.append("peer_1", "12:00:00.000 - Received transaction abc");
        logs.append("peer_1", "12:00:00.200 - \u{1b}[32mCONSENSUS\u{1b}[0m reached");
        logs.append("peer_2", "12:00:00.000 - Received transaction abc");
        logs.append("peer_2", "12:00:00.210 - CONSENSUS reached");
        logs
    }

    #[tokio::test]
    async fn test_full_run_reports_average() {
        let cluster = Arc::new(CountingCluster::default());
        let submitter = Arc::new(RecordingSubmitter::default());
        let run = LatencyRun::new(
            &test_config(&["peer_1", "peer_2"]),
            Arc::new(seeded_logs()),
            cluster.clone(),
            submitter.clone(),
        );

        let report = run.execute_until(std::future::pending()).await.unwrap();

        assert_eq!(report.payload_length, 30);
        assert_eq!(report.aggregate.average_elapsed_ms, Some(205.0));
        assert_eq!(
            report.to_string(),
            "String length: 30. Average time: 205.0ms. (2/2 peers reported)"
        );
        assert_eq!(
            submitter.payloads.lock().unwrap().as_slice(),
            ["123+rebel_ i*on#yjhkssssssssss"]
        );
        assert_eq!(cluster.starts.load(Ordering::SeqCst), 1);
        assert_eq!(cluster.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_without_failing_run() {
        let logs = seeded_logs();
        logs.register("peer_3");
        let config = TimingConfig {
            average_policy: AveragePolicy::TotalPeers,
            ..test_config(&["peer_1", "peer_2", "peer_3"])
        };
        let run = LatencyRun::new(
            &config,
            Arc::new(logs),
            Arc::new(CountingCluster::default()),
            Arc::new(RecordingSubmitter::default()),
        );

        let report = run.execute_until(std::future::pending()).await.unwrap();
        assert_eq!(report.aggregate.sample_count, 2);
        assert_eq!(report.aggregate.timed_out_count(), 1);
        assert_eq!(report.aggregate.average_elapsed_ms, Some(410.0 / 3.0));
    }

    #[tokio::test]
    async fn test_rejected_submission_stops_cluster() {
        let cluster = Arc::new(CountingCluster::default());
        let run = LatencyRun::new(
            &test_config(&["peer_1"]),
            Arc::new(seeded_logs()),
            cluster.clone(),
            Arc::new(RecordingSubmitter {
                reject: true,
                ..Default::default()
            }),
        );

        let err = run.execute_until(std::future::pending()).await.unwrap_err();
        assert_eq!(err.exit_code(), 6);
        assert_eq!(cluster.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_and_stops_cluster() {
        let logs = InMemoryLogSource::new();
        logs.register("peer_1");
        let cluster = Arc::new(CountingCluster::default());
        let config = TimingConfig {
            deadline: Duration::from_secs(30),
            ..test_config(&["peer_1"])
        };
        let run = LatencyRun::new(
            &config,
            Arc::new(logs),
            cluster.clone(),
            Arc::new(RecordingSubmitter::default()),
        );

        let err = run
            .execute_until(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, LatencyError::Interrupted));
        assert_eq!(err.exit_code(), 130);
        assert_eq!(cluster.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupt_during_start_skips_submission_and_stops() {
        let cluster = Arc::new(CountingCluster {
            start_delay: Duration::from_millis(100),
            ..Default::default()
        });
        let submitter = Arc::new(RecordingSubmitter::default());
        let run = LatencyRun::new(
            &test_config(&["peer_1"]),
            Arc::new(seeded_logs()),
            cluster.clone(),
            submitter.clone(),
        );

        let err = run
            .execute_until(tokio::time::sleep(Duration::from_millis(10)))
            .await
            .unwrap_err();

        assert!(matches!(err, LatencyError::Interrupted));
        assert!(submitter.payloads.lock().unwrap().is_empty());
        assert_eq!(cluster.starts.load(Ordering::SeqCst), 1);
        assert_eq!(cluster.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_summary_without_samples() {
        let report = RunReport {
            payload_length: 20,
            aggregate: AggregateResult::from_results(
                vec![PeerSampleResult {
                    peer: PeerId::from("peer_1"),
                    outcome: SampleOutcome::TimedOut {
                        waited: Duration::from_secs(10),
                    },
                }],
                AveragePolicy::SuccessfulSamples,
            ),
        };
        assert_eq!(
            report.to_string(),
            "String length: 20. Average time: no samples. (0/1 peers reported)"
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = RunReport {
            payload_length: 30,
            aggregate: AggregateResult::from_results(
                vec![PeerSampleResult::completed("peer_1", 120)],
                AveragePolicy::SuccessfulSamples,
            ),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["payload_length"], 30);
        assert_eq!(json["average_elapsed_ms"], 120.0);
        assert_eq!(json["policy"], "successful-samples");
        assert_eq!(json["results"][0]["peer"], "peer_1");
        assert_eq!(json["results"][0]["status"], "completed");
    }
}
