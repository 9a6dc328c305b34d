use crate::announce::AnnounceError;
use crate::artifact::ArtifactError;
use ota_kernel::config::ConfigError;
use ota_kernel::net::NetError;
use ota_logger::LoggerError;
use std::io;

/// Fatal errors of the trigger. Every startup failure class maps to its own
/// process exit code so a supervisor can tell them apart.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Logging could not be initialized.
    #[error(transparent)]
    Logger(#[from] LoggerError),

    /// Required configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// The firmware image is missing or unreadable.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// No address a device could reach this host at.
    #[error(transparent)]
    Address(#[from] NetError),

    /// The MQTT broker could not be reached.
    #[error(transparent)]
    Broker(#[from] AnnounceError),

    /// The server port is unavailable.
    #[error("failed to bind TCP port {port}: {source}")]
    PortBind { port: u16, source: io::Error },

    /// The accept/serve loop failed after startup.
    #[error("HTTP server failed: {0}")]
    Serve(#[source] io::Error),
}

impl ServerError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Artifact(_) => 3,
            Self::Address(_) => 4,
            Self::Broker(_) => 5,
            Self::PortBind { .. } => 6,
            Self::Logger(_) | Self::Serve(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn startup_failure_classes_have_distinct_exit_codes() {
        let artifact =
            ServerError::from(ArtifactError::NotFound { path: PathBuf::from("firmware.bin") });
        let address = ServerError::from(NetError::NoRoutableAddress);
        let bind = ServerError::PortBind {
            port: 3333,
            source: io::Error::from(io::ErrorKind::AddrInUse),
        };

        let codes = [artifact.exit_code(), address.exit_code(), bind.exit_code()];
        assert_eq!(codes, [3, 4, 6]);
    }
}
