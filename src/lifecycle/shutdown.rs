//! Cooperative shutdown.
//!
//! [`ShutdownSignal`] is the write side, held by whoever reacts to process
//! signals. [`ShutdownToken`] is the read side, passed explicitly into every
//! loop that must stop early. The flag goes from `false` to `true` once and
//! never back.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

#[derive(Clone, Debug)]
pub struct ShutdownToken {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> (Self, ShutdownToken) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                sender: Arc::new(sender),
            },
            ShutdownToken { receiver },
        )
    }

    /// Another token observing this signal.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            receiver: self.sender.subscribe(),
        }
    }

    /// Request shutdown. Returns `true` only for the call that flipped the flag.
    pub fn request(&self) -> bool {
        self.sender.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        })
    }

    pub fn is_requested(&self) -> bool {
        *self.sender.borrow()
    }
}

impl ShutdownToken {
    pub fn is_requested(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been requested. Never resolves if every
    /// [`ShutdownSignal`] is dropped first.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|requested| *requested).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wait for SIGINT or SIGTERM and request shutdown. Performs no cleanup.
pub async fn listen_for_signals(signal: ShutdownSignal) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, requesting shutdown"),
        _ = terminate => info!("Received terminate signal, requesting shutdown"),
    }
    signal.request();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_flips_once() {
        let (signal, token) = ShutdownSignal::new();
        assert!(!token.is_requested());
        assert!(signal.request());
        assert!(!signal.request());
        assert!(token.is_requested());
        assert!(signal.token().is_requested());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_request() {
        let (signal, token) = ShutdownSignal::new();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        tokio::task::yield_now().await;
        signal.request();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("token did not observe the request")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dropped_signal_never_cancels() {
        let (signal, token) = ShutdownSignal::new();
        drop(signal);
        let outcome = tokio::time::timeout(Duration::from_millis(50), token.cancelled()).await;
        assert!(outcome.is_err());
    }
}
