#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("docker CLI not found — install: https://docs.docker.com/get-docker/")]
    NotFound { source: std::io::Error },

    #[error("docker command failed: {args:?}\n{stderr}")]
    CommandFailed {
        args: Vec<String>,
        stderr: String,
        /// Exit code of the child; `None` if it was killed by a signal.
        code: Option<i32>,
    },

    #[error("docker output was not valid UTF-8")]
    InvalidUtf8 { source: std::string::FromUtf8Error },

    #[error("failed to write to docker stdin")]
    StdinWrite { source: std::io::Error },
}

impl DockerError {
    /// Exit code to propagate to the caller's process.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => *code,
            // Same convention as a shell for "command not found".
            Self::NotFound { .. } => Some(127),
            _ => None,
        }
    }
}
