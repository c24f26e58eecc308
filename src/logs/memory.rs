use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{LogSource, PeerId};
use crate::error::{LatencyError, Result};

#[derive(Debug, Default)]
struct PeerLog {
    lines: Vec<String>,
    unavailable: bool,
}

/// Append-only per-peer log buffers held in memory.
///
/// Peers that were never registered behave like missing containers and
/// report `LogSourceUnavailable`. Clones share the same buffers, so a test
/// can keep writing lines while samplers poll.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogSource {
    peers: Arc<RwLock<HashMap<PeerId, PeerLog>>>,
}

impl InMemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `peer` known with an empty log.
    pub fn register(&self, peer: impl Into<PeerId>) {
        self.peers.write().unwrap().entry(peer.into()).or_default();
    }

    pub fn append(&self, peer: impl Into<PeerId>, line: impl Into<String>) {
        self.peers
            .write()
            .unwrap()
            .entry(peer.into())
            .or_default()
            .lines
            .push(line.into());
    }

    /// Make every further query for `peer` fail as if its process was gone.
    pub fn mark_unavailable(&self, peer: impl Into<PeerId>) {
        self.peers
            .write()
            .unwrap()
            .entry(peer.into())
            .or_default()
            .unavailable = true;
    }

    pub fn line_count(&self, peer: &PeerId) -> usize {
        self.peers
            .read()
            .unwrap()
            .get(peer)
            .map(|log| log.lines.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl LogSource for InMemoryLogSource {
    async fn find_line(&self, peer: &PeerId, marker: &str) -> Result<Option<String>> {
        let peers = self.peers.read().unwrap();
        match peers.get(peer) {
            None => Err(LatencyError::log_source_unavailable(peer, "unknown peer")),
            Some(log) if log.unavailable => {
                Err(LatencyError::log_source_unavailable(peer, "log no longer readable"))
            }
            Some(log) => Ok(log.lines.iter().find(|line| line.contains(marker)).cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_then_find_first_match() {
        let source = InMemoryLogSource::new();
        source.append("peer_1", "12:00:00.000 - Received transaction");
        source.append("peer_1", "12:00:00.300 - CONSENSUS ACHIEVED");
        source.append("peer_1", "12:00:05.000 - CONSENSUS ACHIEVED");

        let line = source
            .find_line(&PeerId::from("peer_1"), "CONSENSUS")
            .await
            .unwrap();
        assert_eq!(line.as_deref(), Some("12:00:00.300 - CONSENSUS ACHIEVED"));
        assert_eq!(source.line_count(&PeerId::from("peer_1")), 3);
    }

    #[tokio::test]
    async fn test_registered_peer_without_lines() {
        let source = InMemoryLogSource::new();
        source.register("peer_2");

        let line = source
            .find_line(&PeerId::from("peer_2"), "CONSENSUS")
            .await
            .unwrap();
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn test_unknown_and_unavailable_peers() {
        let source = InMemoryLogSource::new();
        let unknown = source.find_line(&PeerId::from("ghost"), "CONSENSUS").await;
        assert!(matches!(
            unknown,
            Err(LatencyError::LogSourceUnavailable { .. })
        ));

        source.append("peer_3", "12:00:00.000 - Received transaction");
        source.mark_unavailable("peer_3");
        let gone = source
            .find_line(&PeerId::from("peer_3"), "Received transaction")
            .await;
        assert!(matches!(gone, Err(LatencyError::LogSourceUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_clones_share_buffers() {
        let source = InMemoryLogSource::new();
        let writer = source.clone();
        writer.append("peer_1", "12:00:00.000 - CONSENSUS");

        assert!(source
            .find_line(&PeerId::from("peer_1"), "CONSENSUS")
            .await
            .unwrap()
            .is_some());
    }
}
