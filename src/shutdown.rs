use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a handler for SIGINT and SIGTERM.
///
/// Returns a token cancelled when either signal arrives. The result wait
/// watches it; jobs already handed to the worker pool are left to reach
/// their own terminal state.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handle = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "SIGINT handler failed");
                    return;
                }
                tracing::info!("interrupt received, abandoning the result wait");
            }
            _ = sigterm() => {
                tracing::info!("SIGTERM received, abandoning the result wait");
            }
        }
        handle.cancel();
    });

    token
}

async fn sigterm() {
    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}
