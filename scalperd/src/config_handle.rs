//! Shared, atomically patchable scalping configuration.
//!
//! The admin API writes through [`ConfigHandle::apply`]; the monitor reads a
//! full copy once per tick with [`ConfigHandle::current`], so an update lands
//! strictly between two ticks' evaluations.

use std::sync::Arc;

use scalper_domain::{DomainError, ScalpingConfig, ScalpingConfigPatch};
use tokio::sync::watch;
use tracing::info;

/// Cloneable handle to the live [`ScalpingConfig`].
#[derive(Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<ScalpingConfig>>,
}

impl ConfigHandle {
    /// Create a handle holding `initial`.
    pub fn new(initial: ScalpingConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current configuration.
    pub fn current(&self) -> ScalpingConfig {
        self.tx.borrow().clone()
    }

    /// Apply a partial update.
    ///
    /// Patch and validation run under the channel's write lock. A rejected
    /// patch leaves the configuration unchanged.
    pub fn apply(&self, patch: &ScalpingConfigPatch) -> Result<ScalpingConfig, DomainError> {
        let mut outcome = None;

        self.tx.send_if_modified(|current| match current.patched(patch) {
            Ok(next) => {
                let changed = next != *current;
                *current = next.clone();
                outcome = Some(Ok(next));
                changed
            }
            Err(e) => {
                outcome = Some(Err(e));
                false
            }
        });

        let next = outcome.unwrap_or_else(|| Ok(self.current()))?;
        info!(?patch, "Scalping config updated");
        Ok(next)
    }

    /// Receiver notified on every effective change.
    pub fn subscribe(&self) -> watch::Receiver<ScalpingConfig> {
        self.tx.subscribe()
    }
}
