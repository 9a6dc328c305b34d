//! # OTA trigger server
//!
//! Serves one firmware image over HTTP, announces its download URL over
//! MQTT, and exits once the image has been fetched.
//!
//! The flow: verify the image on disk, bind the listener, connect to the
//! broker, publish `http://<address>:<port>/firmware.bin` to the update
//! topic as soon as the listener is accepting connections, serve the one
//! download, shut down.
//!
//! ## Example
//! ```no_run
//! use ota_kernel::config::load_config;
//! use ota_server::{OtaConfig, Server, ServerError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ServerError> {
//!     let cfg: OtaConfig = load_config()?;
//!     Server::builder(cfg).build().await?.run().await
//! }
//! ```

mod announce;
mod artifact;
mod config;
mod error;
mod lifecycle;
mod oneshot;
mod router;

pub use crate::announce::{AnnounceError, UpdateAnnouncer, download_url};
pub use crate::artifact::{ArtifactError, ArtifactSource};
pub use crate::config::OtaConfig;
pub use crate::error::ServerError;
pub use crate::lifecycle::{Lifecycle, ShutdownCoordinator, Stage, wait_until_running};
pub use crate::oneshot::OneShotFileServer;
pub use crate::router::DOWNLOAD_PATH;

use ota_kernel::config::load_config;
use ota_kernel::net::detect_address;
use ota_logger::Logger;
use std::io;
use tokio::signal;
use tracing::{debug, error, info, warn};

/// Runs the trigger end to end: logging, configuration, build, serve.
///
/// # Errors
/// Returns the startup error when any stage of the dependency chain fails;
/// each stage aborts before the next resource is touched.
pub async fn run() -> Result<(), ServerError> {
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).init()?;

    let cfg: OtaConfig = load_config()?;

    Server::builder(cfg).build().await?.run().await
}

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug)]
pub struct ServerBuilder {
    cfg: OtaConfig,
}

impl ServerBuilder {
    /// Overrides the listener port (0 picks a free one).
    pub const fn port(mut self, port: u16) -> Self {
        self.cfg.port = port;
        self
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Verifies the firmware image exists on disk
    /// 2. Resolves the address to advertise (override or auto-detection)
    /// 3. Binds the listener port
    /// 4. Connects to the MQTT broker and awaits its acknowledgment
    ///
    /// Each step is a startup gate: its failure aborts before the next
    /// resource is touched, and nothing is retried.
    ///
    /// # Errors
    /// Returns an error if:
    /// * The firmware image is missing (unrecoverable, nothing is bound)
    /// * No routable IPv4 address exists and no override was given
    /// * The port is already in use
    /// * The broker is unreachable or never acknowledges
    pub async fn build(self) -> Result<Server, ServerError> {
        let artifact = ArtifactSource::new(&self.cfg.firmware);
        artifact.verify()?;
        info!(path = %artifact.path().display(), "Firmware image verified");

        let address = match &self.cfg.address {
            Some(address) => {
                debug!(%address, "Using address override");
                address.clone()
            }
            None => detect_address()?.to_string(),
        };

        let server = OneShotFileServer::bind(artifact, self.cfg.port)?;

        let announcer = UpdateAnnouncer::connect(&self.cfg.mqtt_address).await?;

        Ok(Server { server, announcer, address, topic: self.cfg.topic })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    server: OneShotFileServer,
    announcer: UpdateAnnouncer,
    address: String,
    topic: String,
}

impl Server {
    /// Returns a new [`ServerBuilder`] for the given configuration.
    pub const fn builder(cfg: OtaConfig) -> ServerBuilder {
        ServerBuilder { cfg }
    }

    /// Serves the firmware image and announces its URL, returning once the
    /// image has been fetched or an interrupt arrived.
    ///
    /// # Errors
    /// Returns an error if the accept/serve loop fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let lifecycle = self.server.lifecycle();
        let coordinator = self.server.coordinator();

        // Operator interrupt is the second termination trigger besides the
        // served request; both funnel into the same coordinator.
        tokio::spawn(async move {
            if let Err(err) = shutdown_signal().await {
                error!(error = %err, "Failed to listen for shutdown signals");
                return;
            }
            info!("Interrupt received");
            coordinator.shutdown();
        });

        // Announce the URL once the listener is actually reachable.
        let url = download_url(&self.address, self.server.local_addr().port());
        let topic = self.topic;
        let announcer = self.announcer;
        tokio::spawn(async move {
            if !wait_until_running(&lifecycle).await {
                warn!("Listener went down before it was ready, skipping announcement");
                return;
            }
            info!(%url, %topic, "Sending OTA URL");
            if let Err(err) = announcer.publish(&topic, &url).await {
                error!(error = %err, "Failed to publish update URL");
            }
        });

        let outcome = self.server.serve().await;
        info!("Server shutdown complete");
        outcome
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?.recv().await;
        Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<io::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
