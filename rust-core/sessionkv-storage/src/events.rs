// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection state tracking for sessionkv backends.
//
// A backend reports reachability changes through a `ConnectionMonitor`. The
// monitor keeps the current state in a tokio `watch` channel (for status
// queries) and fans transitions out over a `broadcast` channel (for hosts
// that want to be notified). Only transitions are published: a burst of
// failures while already disconnected produces a single event.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::error::StorageError;

/// Capacity of the per-monitor event channel. Slow subscribers that fall
/// further behind than this observe `RecvError::Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// A reachability transition reported by a backend.
///
/// These are informational: hosts may log them or surface them in health
/// checks, but should not drive request handling from them.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The backend became reachable.
    Connected,
    /// The backend became unreachable; carries the error that revealed it.
    Disconnected(Arc<StorageError>),
}

/// The most recently observed reachability of a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No command has succeeded or failed yet.
    Connecting,
    /// The backend is reachable.
    Connected,
    /// The backend is unreachable.
    Disconnected {
        /// Rendered form of the error that caused the transition.
        reason: String,
    },
}

impl ConnectionState {
    /// True if the backend is currently considered reachable.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Tracks connection state and publishes transitions.
#[derive(Debug)]
pub struct ConnectionMonitor {
    /// Backend name, attached to every log line.
    backend: String,
    events: broadcast::Sender<ConnectionEvent>,
    state: watch::Sender<ConnectionState>,
}

impl ConnectionMonitor {
    /// Create a monitor for the backend called `backend`, starting in
    /// `initial` state.
    pub fn new(backend: impl Into<String>, initial: ConnectionState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(initial);
        Self {
            backend: backend.into(),
            events,
            state,
        }
    }

    /// Subscribe to future transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Watch the current state; the receiver always holds the latest value.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Record that the backend is reachable.
    ///
    /// Returns `true` if this was a transition (and an event was published).
    pub fn mark_connected(&self) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.is_connected() {
                false
            } else {
                *state = ConnectionState::Connected;
                true
            }
        });

        if changed {
            info!(backend = %self.backend, "backend connected");
            // No subscribers is fine; the state channel still records it.
            let _ = self.events.send(ConnectionEvent::Connected);
        }
        changed
    }

    /// Record that the backend became unreachable because of `error`.
    ///
    /// Returns `true` if this was a transition (and an event was published).
    pub fn mark_disconnected(&self, error: StorageError) -> bool {
        let reason = error.to_string();
        let changed = self.state.send_if_modified(|state| {
            if matches!(state, ConnectionState::Disconnected { .. }) {
                false
            } else {
                *state = ConnectionState::Disconnected {
                    reason: reason.clone(),
                };
                true
            }
        });

        if changed {
            warn!(backend = %self.backend, error = %reason, "backend disconnected");
            let _ = self
                .events
                .send(ConnectionEvent::Disconnected(Arc::new(error)));
        }
        changed
    }
}
