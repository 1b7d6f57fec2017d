// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! First-message serialization gate.
//!
//! Until the server confirms the session is active, only one message may be
//! in flight: the first sender passes and closes the gate, later senders
//! park until the gate is released. The gate is re-armed on every connect
//! and released after a short grace period once an init handshake reports
//! an active status or once the first send succeeds; it is released
//! immediately when the first send fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Default)]
struct GateInner {
    slot: Mutex<Option<Arc<Mutex<()>>>>,
    held: Mutex<Option<OwnedMutexGuard<()>>>,
}

pub struct FirstMessageGate {
    inner: Arc<GateInner>,
}

impl Default for FirstMessageGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FirstMessageGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
        }
    }

    /// Arms a fresh gate, releasing anything held by a previous connection.
    pub async fn arm(&self) {
        *self.inner.held.lock().await = None;
        *self.inner.slot.lock().await = Some(Arc::new(Mutex::new(())));
        trace!("first-message gate armed");
    }

    /// Called before every send. The first caller claims the gate and
    /// proceeds; subsequent callers wait here until release.
    pub async fn pass(&self) {
        let gate = self.inner.slot.lock().await.clone();
        let Some(gate) = gate else { return };
        match Arc::clone(&gate).try_lock_owned() {
            Ok(guard) => {
                trace!("first message in flight, gate closed");
                *self.inner.held.lock().await = Some(guard);
            }
            Err(_) => {
                trace!("waiting on first-message gate");
                drop(gate.lock().await);
            }
        }
    }

    /// Disarms the gate and wakes parked senders once `delay` elapses.
    /// Senders keep parking during the grace window.
    pub async fn release_after(&self, delay: Duration) {
        if self.inner.slot.lock().await.is_none() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            *inner.slot.lock().await = None;
            *inner.held.lock().await = None;
            trace!("first-message gate released");
        });
    }

    /// Disarms the gate immediately. Used when the first send fails, so a
    /// retry is not deadlocked behind its own guard.
    pub async fn release_now(&self) {
        *self.inner.slot.lock().await = None;
        *self.inner.held.lock().await = None;
    }
}
