use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, trace, warn};

use crate::error::{LatencyError, Result};
use crate::logs::{LogSource, Marker, MarkerSet, PeerId, PeerMarkerEvent};
use crate::timing::elapsed;

/// Why a peer could not contribute a sample, other than running out of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PeerFailure {
    /// Consensus was logged but the receive line was not.
    InconsistentLogState { missing: String },
    /// The peer's log could not be read.
    LogSourceUnavailable { message: String },
}

impl PeerFailure {
    /// Peer-scoped failure carried by `err`, if it is one.
    pub fn from_error(err: &LatencyError) -> Option<Self> {
        match err {
            LatencyError::InconsistentLogState { missing, .. } => Some(Self::InconsistentLogState {
                missing: missing.clone(),
            }),
            LatencyError::LogSourceUnavailable { .. } => Some(Self::LogSourceUnavailable {
                message: err.developer_message(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleOutcome {
    Completed {
        elapsed_ms: u64,
    },
    TimedOut {
        #[serde(with = "humantime_serde")]
        waited: Duration,
    },
    Failed {
        failure: PeerFailure,
    },
}

/// Result of sampling one peer once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerSampleResult {
    pub peer: PeerId,
    #[serde(flatten)]
    pub outcome: SampleOutcome,
}

impl PeerSampleResult {
    pub fn completed(peer: impl Into<PeerId>, elapsed_ms: u64) -> Self {
        Self {
            peer: peer.into(),
            outcome: SampleOutcome::Completed { elapsed_ms },
        }
    }

    pub fn elapsed_ms(&self) -> Option<u64> {
        match self.outcome {
            SampleOutcome::Completed { elapsed_ms } => Some(elapsed_ms),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.elapsed_ms().is_some()
    }
}

/// Polls one peer's log until both markers are present or the deadline
/// passes.
#[derive(Clone)]
pub struct PeerSampler {
    source: Arc<dyn LogSource>,
    markers: MarkerSet,
    deadline: Duration,
    poll_interval: Duration,
    query_timeout: Duration,
}

impl PeerSampler {
    pub fn new(source: Arc<dyn LogSource>, deadline: Duration) -> Self {
        Self {
            source,
            markers: MarkerSet::default(),
            deadline,
            poll_interval: Duration::from_millis(100),
            query_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_markers(mut self, markers: MarkerSet) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bound for the receive-line lookup once consensus has been seen. That
    /// lookup is outside the deadline.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Sample `peer`.
    ///
    /// Timeouts and peer-scoped failures are returned as outcomes. Timestamp
    /// errors mean the log format assumption is broken and are returned as
    /// errors.
    pub async fn sample(&self, peer: &PeerId) -> Result<PeerSampleResult> {
        let started = Instant::now();

        let outcome = match self.poll_until_consensus(peer, started).await {
            Ok(outcome) => outcome,
            Err(err) => match PeerFailure::from_error(&err) {
                Some(failure) => {
                    warn!("Sampling {} failed: {}", peer, err);
                    SampleOutcome::Failed { failure }
                }
                None => return Err(err),
            },
        };

        Ok(PeerSampleResult {
            peer: peer.clone(),
            outcome,
        })
    }

    async fn poll_until_consensus(&self, peer: &PeerId, started: Instant) -> Result<SampleOutcome> {
        let consensus = self.markers.pattern(Marker::ConsensusReached);
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            let Some(stop_line) = self.query(peer, consensus, started).await? else {
                return Ok(self.timed_out(peer, started, polls));
            };

            if let Some(stop_line) = stop_line {
                debug!("{}: consensus marker found after {} polls", peer, polls);
                return self.complete(peer, &stop_line).await;
            }

            let remaining = self.deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Ok(self.timed_out(peer, started, polls));
            }

            trace!("{}: no consensus yet, {:?} left", peer, remaining);
            sleep(self.poll_interval.min(remaining)).await;
        }
    }

    async fn complete(&self, peer: &PeerId, stop_line: &str) -> Result<SampleOutcome> {
        let received = self.markers.pattern(Marker::Received);
        let start_line = timeout(self.query_timeout, self.source.find_line(peer, received))
            .await
            .map_err(|_| {
                LatencyError::log_source_unavailable(
                    peer,
                    format!(
                        "{:?} lookup did not finish within {:?}",
                        received, self.query_timeout
                    ),
                )
            })??;
        let start_line = start_line.ok_or_else(|| LatencyError::InconsistentLogState {
            peer: peer.to_string(),
            missing: received.to_string(),
        })?;

        let start = PeerMarkerEvent::from_line(peer, Marker::Received, &start_line)?;
        let stop = PeerMarkerEvent::from_line(peer, Marker::ConsensusReached, stop_line)?;
        let elapsed_ms = elapsed(&start.timestamp, &stop.timestamp)?;

        info!(
            "{}: received at {}, consensus at {} ({} ms)",
            peer, start.timestamp, stop.timestamp, elapsed_ms
        );
        Ok(SampleOutcome::Completed { elapsed_ms })
    }

    /// One consensus query bounded by what is left of the deadline. The
    /// outer `None` means the query itself ran out of time.
    async fn query(
        &self,
        peer: &PeerId,
        marker: &str,
        started: Instant,
    ) -> Result<Option<Option<String>>> {
        let remaining = self.deadline.saturating_sub(started.elapsed());
        match timeout(remaining, self.source.find_line(peer, marker)).await {
            Ok(found) => found.map(Some),
            Err(_) => Ok(None),
        }
    }

    fn timed_out(&self, peer: &PeerId, started: Instant, polls: u32) -> SampleOutcome {
        let waited = started.elapsed();
        warn!(
            "{}: out of time after {:?} ({} polls) without reaching consensus",
            peer, waited, polls
        );
        SampleOutcome::TimedOut { waited }
    }
}
