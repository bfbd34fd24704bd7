//! Cancellation tied to a consumer's lifetime

use tokio::sync::watch;

/// Owned by a consumer. Cancelling or dropping it abandons every request
/// started through a store bound to it.
#[derive(Debug)]
pub struct Scope {
    tx: watch::Sender<bool>,
}

impl Scope {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> ScopeToken {
        ScopeToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a [`Scope`]
#[derive(Debug, Clone)]
pub struct ScopeToken {
    rx: watch::Receiver<bool>,
}

impl ScopeToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the scope is cancelled or dropped
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
