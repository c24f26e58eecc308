//! Peer log access
//!
//! A [`LogSource`] answers one question: the first log line of a peer that
//! contains a given marker, if any. Each query reflects the log as it is at
//! call time, so callers poll it.

pub mod docker;
pub mod memory;

pub use docker::DockerLogSource;
pub use memory::InMemoryLogSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::timing::Timestamp;

/// Name of one peer, e.g. the container name `peer_1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PeerId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// The two events timed for every peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Received,
    ConsensusReached,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Received => f.write_str("received"),
            Marker::ConsensusReached => f.write_str("consensus reached"),
        }
    }
}

/// Log substrings that identify each [`Marker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSet {
    pub received: String,
    pub consensus: String,
}

impl MarkerSet {
    pub fn pattern(&self, marker: Marker) -> &str {
        match marker {
            Marker::Received => &self.received,
            Marker::ConsensusReached => &self.consensus,
        }
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            received: "Received transaction".to_string(),
            consensus: "CONSENSUS".to_string(),
        }
    }
}

/// A marker located in a peer's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerMarkerEvent {
    pub peer: PeerId,
    pub marker: Marker,
    pub timestamp: Timestamp,
}

impl PeerMarkerEvent {
    /// Build the event from the matching log line.
    pub fn from_line(peer: &PeerId, marker: Marker, line: &str) -> Result<Self> {
        Ok(Self {
            peer: peer.clone(),
            marker,
            timestamp: Timestamp::parse(line)?,
        })
    }
}

#[async_trait]
pub trait LogSource: Send + Sync {
    /// First line of `peer`'s log containing `marker`, or `None` if no such
    /// line has been written yet.
    ///
    /// Fails with `LogSourceUnavailable` when the peer's log cannot be read
    /// at all.
    async fn find_line(&self, peer: &PeerId, marker: &str) -> Result<Option<String>>;
}

/// First line of `text` containing `marker`.
pub fn first_matching_line<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.lines().find(|line| line.contains(marker))
}
