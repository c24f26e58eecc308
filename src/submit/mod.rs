//! Transaction submission
//!
//! Sampling only makes sense after a transaction has been handed to the
//! cluster; this module sends it.

mod http;

pub use http::HttpSubmitter;

use async_trait::async_trait;

use crate::error::Result;

/// Fixed prefix of every submitted transaction.
pub const PAYLOAD_BASE: &str = "123+rebel_ i*on#yjhk";

/// Transaction text: [`PAYLOAD_BASE`] followed by `padding` `'s'`
/// characters, so runs can compare latency across payload sizes.
pub fn build_payload(padding: usize) -> String {
    let mut payload = String::with_capacity(PAYLOAD_BASE.len() + padding);
    payload.push_str(PAYLOAD_BASE);
    payload.extend(std::iter::repeat('s').take(padding));
    payload
}

/// Receipt for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitAck {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit(&self, payload: &str) -> Result<SubmitAck>;
}
