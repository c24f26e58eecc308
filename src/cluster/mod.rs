//! Cluster lifecycle
//!
//! The cluster under test is a scoped resource: [`with_cluster`] starts it,
//! runs the measurement, and stops it on every exit path.

mod command;

pub use command::CommandClusterLifecycle;

use async_trait::async_trait;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};

use crate::error::Result;

#[async_trait]
pub trait ClusterLifecycle: Send + Sync {
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<()>;
}

/// A cluster that is started and stopped by someone else.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalCluster;

#[async_trait]
impl ClusterLifecycle for ExternalCluster {
    async fn start(&self) -> Result<()> {
        info!("Using an externally managed cluster");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Run `body` against a started cluster and stop the cluster afterwards.
///
/// `stop` runs whether `body` returns `Ok`, returns `Err` or panics. A
/// failed `start` also triggers `stop` to clean up partially started nodes.
/// When both `body` and `stop` fail, the body's error is returned and the
/// stop error is logged.
pub async fn with_cluster<F, Fut, T>(lifecycle: &dyn ClusterLifecycle, body: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Err(err) = lifecycle.start().await {
        if let Err(stop_err) = lifecycle.stop().await {
            warn!("Stopping cluster after failed start also failed: {}", stop_err);
        }
        return Err(err);
    }

    let outcome = AssertUnwindSafe(body()).catch_unwind().await;
    let stopped = lifecycle.stop().await;

    match outcome {
        Ok(Ok(value)) => stopped.map(|()| value),
        Ok(Err(err)) => {
            if let Err(stop_err) = stopped {
                warn!("Failed to stop cluster: {}", stop_err);
            }
            Err(err)
        }
        Err(panic) => {
            if let Err(stop_err) = stopped {
                warn!("Failed to stop cluster: {}", stop_err);
            }
            std::panic::resume_unwind(panic)
        }
    }
}
