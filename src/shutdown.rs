use tokio_util::sync::CancellationToken;

/// Cancellation driven by SIGINT/SIGTERM.
///
/// The first signal fires `cancel`: the lifecycle monitor requests
/// termination of the remote job and keeps polling for its final status.
/// A second signal fires `force`, which ends that grace window at once.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    pub cancel: CancellationToken,
    pub force: CancellationToken,
}

impl Shutdown {
    /// Installs the signal handler and returns the tokens it drives.
    pub fn install() -> Self {
        let shutdown = Self::default();
        let tokens = shutdown.clone();

        tokio::spawn(async move {
            let mut signals = match Signals::new() {
                Ok(signals) => signals,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install signal handler");
                    return;
                }
            };

            let name = signals.recv().await;
            tracing::info!("Received {name}, canceling supervised job");
            tokens.cancel.cancel();

            let name = signals.recv().await;
            tracing::warn!("Received {name} again, no longer waiting for the job to stop");
            tokens.force.cancel();
        });

        shutdown
    }
}

#[cfg(unix)]
struct Signals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}
