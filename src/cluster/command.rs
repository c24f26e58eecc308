use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::ClusterLifecycle;
use crate::error::{ErrorCode, LatencyError, Result};
use crate::subprocess::{ExitStatus, ProcessCommandBuilder, ProcessRunner};

/// Starts and stops the cluster by running configured commands, e.g. the
/// scripts that bring the peer containers up and down.
pub struct CommandClusterLifecycle {
    runner: Arc<dyn ProcessRunner>,
    start: Vec<String>,
    stop: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandClusterLifecycle {
    pub fn new(runner: Arc<dyn ProcessRunner>, start: Vec<String>, stop: Vec<String>) -> Self {
        Self {
            runner,
            start,
            stop,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_step(&self, step: &str, argv: &[String]) -> Result<()> {
        let mut builder = ProcessCommandBuilder::from_argv(argv).ok_or_else(|| {
            LatencyError::config_with_code(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("cluster {} command is empty", step),
            )
        })?;
        if let Some(dir) = &self.working_dir {
            builder = builder.current_dir(dir);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let command = builder.build();
        let command_line = command.display();

        debug!("Cluster {}: {}", step, command_line);
        let output = self.runner.run(command).await?;

        match output.status {
            ExitStatus::Success => {
                info!("Cluster {} finished in {:?}", step, output.duration);
                Ok(())
            }
            ExitStatus::Error(code) => Err(LatencyError::cluster_with_code(
                ErrorCode::EXEC_SUBPROCESS_FAILED,
                format!("{} exited with code {}: {}", step, code, output.stderr.trim()),
                Some(command_line),
            )
            .with_exit_code(code)),
            ExitStatus::Signal(signal) => Err(LatencyError::cluster_with_code(
                ErrorCode::EXEC_SIGNAL_RECEIVED,
                format!("{} terminated by signal {}", step, signal),
                Some(command_line),
            )),
        }
    }
}

#[async_trait]
impl ClusterLifecycle for CommandClusterLifecycle {
    async fn start(&self) -> Result<()> {
        self.run_step("start", &self.start).await
    }

    async fn stop(&self) -> Result<()> {
        self.run_step("stop", &self.stop).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn lifecycle(mock: &MockProcessRunner) -> CommandClusterLifecycle {
        CommandClusterLifecycle::new(
            Arc::new(mock.clone()),
            argv(&["python3", "start_docker.py"]),
            argv(&["python3", "stop_docker.py"]),
        )
    }

    #[tokio::test]
    async fn test_runs_start_and_stop_scripts() {
        let mock = MockProcessRunner::new();
        mock.expect_command("python3").finish();

        let cluster = lifecycle(&mock).with_working_dir(Some(PathBuf::from("/srv/cluster")));
        cluster.start().await.unwrap();
        cluster.stop().await.unwrap();

        let history = mock.get_call_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].args, ["start_docker.py"]);
        assert_eq!(history[1].args, ["stop_docker.py"]);
        assert_eq!(history[0].working_dir, Some(PathBuf::from("/srv/cluster")));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_cluster_error() {
        let mock = MockProcessRunner::new();
        mock.expect_command("python3")
            .returns_exit_code(2)
            .returns_stderr("docker: not running\n")
            .finish();

        let err = lifecycle(&mock).start().await.unwrap_err();
        match err {
            LatencyError::Cluster {
                code,
                exit_code,
                command,
                message,
                ..
            } => {
                assert_eq!(code, ErrorCode::EXEC_SUBPROCESS_FAILED);
                assert_eq!(exit_code, Some(2));
                assert_eq!(command.as_deref(), Some("python3 start_docker.py"));
                assert!(message.contains("docker: not running"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let mock = MockProcessRunner::new();
        mock.expect_command("python3").returns_not_found().finish();

        let err = lifecycle(&mock).stop().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::EXEC_COMMAND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_command_is_config_error() {
        let mock = MockProcessRunner::new();
        let cluster = CommandClusterLifecycle::new(Arc::new(mock.clone()), Vec::new(), Vec::new());

        let err = cluster.start().await.unwrap_err();
        assert!(matches!(err, LatencyError::Config { .. }));
        assert!(mock.get_call_history().is_empty());
    }
}
