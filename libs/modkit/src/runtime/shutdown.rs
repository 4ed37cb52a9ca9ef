use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Resolves on the first SIGTERM / SIGINT (Ctrl+C on non-unix targets).
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => tracing::info!("shutdown: SIGTERM received"),
            _ = sigint.recv()  => tracing::info!("shutdown: SIGINT received"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown: Ctrl+C received");
        Ok(())
    }
}

/// Cancel `token` once a shutdown signal arrives. Returns the watcher task.
pub fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown() => {
                if let Err(e) = res {
                    tracing::error!(error = %e, "shutdown: signal handler failed; cancelling");
                }
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
