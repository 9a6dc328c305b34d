use crate::artifact::ArtifactSource;
use crate::error::ServerError;
use crate::lifecycle::{Lifecycle, ShutdownCoordinator};
use crate::router::{self, AppState};
use axum_server::Handle;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use tracing::info;

/// HTTP server that serves the firmware image once, then terminates.
///
/// The listener is bound eagerly in [`OneShotFileServer::bind`] so a port
/// conflict fails startup before anything is announced. Serving a firmware
/// request advances the lifecycle to Stopping; the response in flight is
/// allowed to complete before the listener closes.
#[derive(Debug)]
pub struct OneShotFileServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    artifact: ArtifactSource,
    lifecycle: Arc<Lifecycle>,
    handle: Handle<SocketAddr>,
}

impl OneShotFileServer {
    /// Binds the listener on all interfaces at `port`.
    ///
    /// # Errors
    /// Returns [`ServerError::PortBind`] when the port is already in use.
    pub fn bind(artifact: ArtifactSource, port: u16) -> Result<Self, ServerError> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = TcpListener::bind(addr)
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            })
            .map_err(|source| ServerError::PortBind { port, source })?;
        let local_addr =
            listener.local_addr().map_err(|source| ServerError::PortBind { port, source })?;

        Ok(Self {
            listener,
            local_addr,
            artifact,
            lifecycle: Arc::new(Lifecycle::new()),
            handle: Handle::new(),
        })
    }

    /// Address the listener is bound to (relevant when `port` was 0).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared lifecycle cell for readiness observers.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<Lifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Coordinator both termination triggers funnel through.
    #[must_use]
    pub fn coordinator(&self) -> ShutdownCoordinator {
        ShutdownCoordinator::new(Arc::clone(&self.lifecycle), self.handle.clone())
    }

    /// Runs the accept/serve loop until shutdown completes.
    ///
    /// The lifecycle advances to Running once the listener reports itself
    /// live, and to the terminal Stopped once the loop has exited.
    ///
    /// # Errors
    /// Returns [`ServerError::Serve`] when the accept loop fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let Self { listener, local_addr, artifact, lifecycle, handle } = self;

        let app = router::init(AppState {
            artifact,
            coordinator: ShutdownCoordinator::new(Arc::clone(&lifecycle), handle.clone()),
        });

        // Advance to Running only once axum-server reports the listener live.
        let readiness = handle.clone();
        let observer = Arc::clone(&lifecycle);
        tokio::spawn(async move {
            if readiness.listening().await.is_some() && observer.mark_running() {
                info!(stage = %observer.stage(), "Listener accepting connections");
            }
        });

        info!(address = %local_addr, "Starting one-shot firmware server");
        let outcome = match axum_server::from_tcp(listener) {
            Ok(server) => server.handle(handle).serve(app.into_make_service()).await,
            Err(err) => Err(err),
        };

        lifecycle.mark_stopped();
        info!(stage = %lifecycle.stage(), "Listener closed");
        outcome.map_err(ServerError::Serve)
    }
}
