//! Log timestamp handling
//!
//! Peers prefix every log line with a time of day in `HH:MM:SS.mmm` form.
//! This module extracts that prefix and differences two of them.

mod timestamp;

pub use timestamp::{elapsed, Timestamp, SEPARATOR};
