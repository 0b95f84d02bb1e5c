// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Storage error types for the sessionkv backend abstraction.
//
// Everything a key-value client can report (lost connections, protocol
// violations, timeouts, local I/O) collapses into `StorageError`. The session
// adapter never inspects these beyond logging; they are surfaced verbatim.

use thiserror::Error;

/// Errors that can occur when issuing a command to a key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend is not reachable (e.g., connection lost or refused).
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend replied with something the client could not interpret,
    /// or rejected the command.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The client gave up waiting for a reply.
    #[error("backend timed out: {0}")]
    Timeout(String),
}
