use core::error::Error;

/// Errors that can occur while bootstrapping or running a watch session.
///
/// Steady-state watch handlers never surface these; only session creation
/// (client construction, identity resolution) fails loudly.
#[derive(Debug, derive_more::Display)]
pub enum TelemetryError {
    #[display("failed to connect to cluster API: {message}")]
    ConnectionFailed { message: String },
    #[display("failed to resolve cluster identity: {message}")]
    IdentityResolutionFailed { message: String },
}

impl Error for TelemetryError {}
