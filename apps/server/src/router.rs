use crate::artifact::ArtifactSource;
use crate::lifecycle::ShutdownCoordinator;
use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Route the device downloads the firmware image from.
pub const DOWNLOAD_PATH: &str = "/firmware.bin";

/// State shared with the firmware handler.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) artifact: ArtifactSource,
    pub(crate) coordinator: ShutdownCoordinator,
}

pub(crate) fn init(state: AppState) -> Router {
    Router::new()
        .route(DOWNLOAD_PATH, get(firmware_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the firmware image, then requests shutdown.
///
/// Shutdown is requested right after the response is composed; the graceful
/// shutdown lets this very response finish before the listener closes. A
/// failed read is answered with a 500 and still triggers shutdown; the
/// image is served at most once per process.
async fn firmware_handler(State(state): State<AppState>) -> Response {
    let response = match state.artifact.read_all().await {
        Ok(bytes) => {
            info!(bytes = bytes.len(), "Serving firmware image");
            ([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response()
        }
        Err(err) => {
            error!(error = %err, "Failed to read firmware image");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };

    state.coordinator.shutdown();
    response
}
