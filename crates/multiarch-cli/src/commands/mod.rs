mod builder;
mod clean;
mod dockerfile;
mod doctor;
mod eject;
mod init;
mod inspect;
mod publish;
mod publish_pipeline;

use multiarch_docker::{Credentials, DockerError};

pub use builder::{builder_ensure, builder_rm};
pub use clean::clean;
pub use dockerfile::dockerfile;
pub use doctor::doctor;
pub use eject::eject;
pub use init::init_project;
pub use inspect::inspect;
pub use publish::publish;
pub use publish_pipeline::PublishOptions;

/// Process exit code for a failed command.
///
/// The first failing docker step's own exit code is propagated; anything
/// else exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<DockerError>())
        .and_then(DockerError::exit_code)
        .filter(|code| (1..=255).contains(code))
        .map_or(1, |code| code as u8)
}

/// Registry credentials, when both halves are provided.
pub fn credentials(
    username: Option<String>,
    password: Option<String>,
) -> anyhow::Result<Option<Credentials>> {
    match (username, password) {
        (Some(user), Some(pass)) => Ok(Some(Credentials::new(user, pass))),
        (None, None) => Ok(None),
        (Some(_), None) => anyhow::bail!("REGISTRY_USERNAME is set but REGISTRY_PASSWORD is not"),
        (None, Some(_)) => anyhow::bail!("REGISTRY_PASSWORD is set but REGISTRY_USERNAME is not"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docker_failure(code: Option<i32>) -> anyhow::Error {
        let err = DockerError::CommandFailed {
            args: vec!["buildx".to_owned(), "build".to_owned()],
            stderr: String::new(),
            code,
        };
        anyhow::Error::new(err).context("build + push failed")
    }

    #[test]
    fn exit_code_propagates_docker_status() {
        assert_eq!(exit_code(&docker_failure(Some(42))), 42);
    }

    #[test]
    fn exit_code_defaults_to_one() {
        assert_eq!(exit_code(&anyhow::anyhow!("bad config")), 1);
        assert_eq!(exit_code(&docker_failure(None)), 1);
        assert_eq!(exit_code(&docker_failure(Some(0))), 1);
        assert_eq!(exit_code(&docker_failure(Some(300))), 1);
    }

    #[test]
    fn exit_code_for_missing_docker_is_127() {
        let err = DockerError::NotFound {
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no docker"),
        };
        assert_eq!(exit_code(&anyhow::Error::new(err)), 127);
    }

    #[test]
    fn credentials_require_both_halves() {
        assert!(credentials(None, None).unwrap().is_none());
        assert!(
            credentials(Some("u".to_owned()), Some("p".to_owned()))
                .unwrap()
                .is_some()
        );
        assert!(credentials(Some("u".to_owned()), None).is_err());
        assert!(credentials(None, Some("p".to_owned())).is_err());
    }
}
