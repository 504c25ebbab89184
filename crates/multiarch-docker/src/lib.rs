pub mod client;
pub mod docker;
pub mod executor;

pub use client::{
    BuildError, BuildRequest, BuilderError, BuilderStatus, CheckResult, Credentials,
    DockerClient, DoctorReport, InspectError, LoginError, PreflightError, PreflightReport,
    VerifyError,
};
pub use docker::DockerError;
pub use executor::{DockerExecutor, RealExecutor};
