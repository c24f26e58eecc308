use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use super::{first_matching_line, LogSource, PeerId};
use crate::error::{LatencyError, Result};
use crate::subprocess::{ExitStatus, ProcessCommandBuilder, ProcessRunner};

/// Reads peer logs with `docker logs <container>`.
///
/// Every query fetches the container's full log and scans it, so each poll
/// costs time proportional to the log size.
pub struct DockerLogSource {
    runner: Arc<dyn ProcessRunner>,
    docker_binary: String,
    query_timeout: Duration,
}

impl DockerLogSource {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            docker_binary: "docker".to_string(),
            query_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.docker_binary = binary.into();
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

#[async_trait]
impl LogSource for DockerLogSource {
    async fn find_line(&self, peer: &PeerId, marker: &str) -> Result<Option<String>> {
        let command = ProcessCommandBuilder::new(&self.docker_binary)
            .args(["logs", peer.as_str()])
            .timeout(self.query_timeout)
            .build();

        let output = self.runner.run(command).await.map_err(|e| {
            LatencyError::log_source_unavailable(
                peer,
                format!("{} logs failed", self.docker_binary),
            )
            .with_source(e)
        })?;

        match output.status {
            ExitStatus::Success => {}
            status => {
                let stderr = output.stderr.trim();
                let detail = if stderr.is_empty() {
                    format!("{} logs exited with {:?}", self.docker_binary, status)
                } else {
                    stderr.to_string()
                };
                return Err(LatencyError::log_source_unavailable(peer, detail));
            }
        }

        trace!(
            "Scanning {} bytes of logs from {} for {:?}",
            output.stdout.len() + output.stderr.len(),
            peer,
            marker
        );

        // Containers may log to either stream; docker keeps them separate.
        Ok(first_matching_line(&output.stdout, marker)
            .or_else(|| first_matching_line(&output.stderr, marker))
            .map(str::to_string))
    }
}
