use std::process::{ExitStatus, Stdio};

use crate::docker::DockerError;

/// Environment variable overriding the docker binary (e.g. `podman`).
pub const DOCKER_BIN_ENV: &str = "MULTIARCH_DOCKER";

/// Abstraction over docker CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait DockerExecutor: Send + Sync {
    /// Execute a docker command and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, DockerError>;

    /// Execute a docker command attached to the terminal.
    ///
    /// stdin is inherited too, so interactive prompts (`docker login`) work.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError>;

    /// Execute a docker command with data piped to stdin.
    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, DockerError>;
}

/// Real docker CLI executor.
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Uses `$MULTIARCH_DOCKER` when set, `docker` otherwise.
    pub fn from_env() -> Self {
        match std::env::var(DOCKER_BIN_ENV) {
            Ok(program) if !program.trim().is_empty() => Self::new(program),
            _ => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: &[String]) -> tokio::process::Command {
        tracing::debug!(program = %self.program, ?args, "running");
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(args);
        cmd
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, DockerError> {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| DockerError::InvalidUtf8 { source: e })
        } else {
            Err(command_failed(
                args,
                String::from_utf8_lossy(&output.stderr).to_string(),
                output.status,
            ))
        }
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError> {
        let status = self
            .command(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(command_failed(args, format!("exit status: {status}"), status))
        }
    }

    async fn exec_with_stdin(
        &self,
        args: &[String],
        stdin_data: &[u8],
    ) -> Result<String, DockerError> {
        use tokio::io::AsyncWriteExt;

        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DockerError::NotFound { source: e })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(|e| DockerError::StdinWrite { source: e })?;
            stdin
                .shutdown()
                .await
                .map_err(|e| DockerError::StdinWrite { source: e })?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| DockerError::InvalidUtf8 { source: e })
        } else {
            Err(command_failed(
                args,
                String::from_utf8_lossy(&output.stderr).to_string(),
                output.status,
            ))
        }
    }
}

fn command_failed(args: &[String], stderr: String, status: ExitStatus) -> DockerError {
    DockerError::CommandFailed {
        args: args.to_vec(),
        stderr,
        code: status.code(),
    }
}
