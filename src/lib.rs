//! # peer-latency
//!
//! Measures how long a transaction takes to reach consensus on every peer of
//! a local cluster, by reading the time between the "Received transaction"
//! and "CONSENSUS" lines in each peer's log.
//!
//! ## Usage
//!
//! ```bash
//! peer-latency [-c config.toml] [--peer peer_1 ...] [--deadline-ms 10000] [--json]
//! ```
//!
//! ## Modules
//!
//! - `app` - Logging setup and fatal error reporting for the binary
//! - `cluster` - Starting and stopping the cluster as a scoped resource
//! - `config` - Run configuration from defaults, TOML and the environment
//! - `error` - Error type with numeric codes and exit codes
//! - `logs` - Peer log access (`docker logs` or in-memory buffers)
//! - `run` - One end-to-end measurement
//! - `sampler` - Per-peer polling and the concurrent aggregate
//! - `submit` - Transaction submission over HTTP
//! - `subprocess` - Subprocess abstraction layer for testing
//! - `timing` - Log timestamp parsing and interval arithmetic
pub mod app;
pub mod cluster;
pub mod config;
pub mod error;
pub mod logs;
pub mod run;
pub mod sampler;
pub mod submit;
pub mod subprocess;
pub mod timing;
