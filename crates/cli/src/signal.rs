//! Shutdown signal handling.

use application::CancellationToken;
use tokio::task::JoinHandle;
use tracing::warn;

/// Cancel `shutdown` on the first SIGINT/SIGTERM
///
/// Later signals do not start a second shutdown; they are only logged while
/// the drain finishes.
pub fn spawn_shutdown_listener(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut received = 0u32;
        loop {
            if let Err(e) = wait_for_signal().await {
                warn!(error = %e, "Failed to install signal handler");
                return;
            }
            received += 1;

            if received == 1 {
                warn!("Received shutdown signal, draining in-flight messages...");
                shutdown.cancel();
            } else {
                warn!(
                    signals = received,
                    "Shutdown already in progress, waiting for in-flight deliveries"
                );
            }
        }
    })
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
