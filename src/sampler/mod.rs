//! Latency sampling
//!
//! - `peer` - polling loop for a single peer
//! - `aggregate` - concurrent sampling across peers and averaging

pub mod aggregate;
pub mod peer;

pub use aggregate::{AggregateResult, AveragePolicy, LatencyAggregator};
pub use peer::{PeerFailure, PeerSampleResult, PeerSampler, SampleOutcome};
