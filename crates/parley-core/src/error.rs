// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley chat engine.

use thiserror::Error;

/// The primary error type used across the Parley seam traits and engine.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// A send was attempted while the socket transport is not connected.
    /// Raised synchronously to the caller.
    #[error("transport is not connected")]
    Disconnected,

    /// The server rejected the session token. Handled internally by
    /// re-issuing the init handshake; surfaced only if re-init fails too.
    #[error("session token rejected by server")]
    TokenRejected,

    /// Socket transport errors (connection failure, frame write failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// HTTP fallback errors (file upload, offline form, form endpoints).
    #[error("http error: {message}")]
    Http {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Durable cache store errors (database open, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// File caching and upload I/O failures.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed wire payload. Isolated to the offending message; never
    /// aborts a whole batch.
    #[error("malformed wire payload: {0}")]
    Protocol(String),

    /// A configuration or token lookup found nothing.
    #[error("data not found: {0}")]
    DataNotFound(String),

    /// Invalid caller-supplied configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for an http error without an underlying source.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            source: None,
        }
    }

    /// Clones the error for fan-out to the exception stream. Boxed sources
    /// are flattened to their message.
    pub fn replicate(&self) -> Self {
        match self {
            Self::Disconnected => Self::Disconnected,
            Self::TokenRejected => Self::TokenRejected,
            Self::Transport { message, .. } => Self::transport(message.clone()),
            Self::Http { message, .. } => Self::http(message.clone()),
            Self::Storage { source } => Self::Storage {
                source: source.to_string().into(),
            },
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Protocol(m) => Self::Protocol(m.clone()),
            Self::DataNotFound(m) => Self::DataNotFound(m.clone()),
            Self::Config(m) => Self::Config(m.clone()),
            Self::Internal(m) => Self::Internal(m.clone()),
        }
    }
}
