use ota_server::ServerError;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    match ota_server::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging failures are the one class the subscriber cannot report.
            if matches!(err, ServerError::Logger(_)) {
                eprintln!("{err}");
            } else {
                error!(error = %err, "Aborting");
            }
            ExitCode::from(err.exit_code())
        }
    }
}
