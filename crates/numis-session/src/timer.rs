// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session Timer: one sleeping task per active session.
//!
//! Cancellation is advisory. An expiry that fires after the session was ended
//! explicitly loses the compare-and-swap and does nothing.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use numis_core::types::RequestId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::retry::millis;

struct ArmedTimer {
    generation: u64,
    token: CancellationToken,
}

pub struct SessionTimer {
    armed: Arc<DashMap<RequestId, ArmedTimer>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self {
            armed: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    /// Run `on_expire` at `deadline`. A deadline in the past fires immediately.
    /// Re-arming a session replaces its previous timer.
    pub fn arm<F, Fut>(&self, request_id: RequestId, deadline: DateTime<Utc>, on_expire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();

        let previous = self.armed.insert(
            request_id.clone(),
            ArmedTimer {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        debug!(request_id = %request_id, remaining_ms = millis(remaining), "session timer armed");

        let armed = Arc::clone(&self.armed);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(request_id = %request_id, "session timer cancelled");
                }
                _ = tokio::time::sleep(remaining) => {
                    armed.remove_if(&request_id, |_, t| t.generation == generation);
                    debug!(request_id = %request_id, "session timer fired");
                    on_expire().await;
                }
            }
        });
    }

    /// Cancel the pending timer of a session, if any.
    pub fn cancel(&self, request_id: &RequestId) -> bool {
        match self.armed.remove(request_id) {
            Some((_, timer)) => {
                timer.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, request_id: &RequestId) -> bool {
        self.armed.contains_key(request_id)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    /// Cancel every pending timer. Used on process shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.armed.clear();
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}
