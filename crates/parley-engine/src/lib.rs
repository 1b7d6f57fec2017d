// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Parley chat session engine.
//!
//! Ties the transport adapter and cache store together into a session
//! state machine with event fan-out: connection lifecycle with automatic
//! reconnect and token recovery, ordered and deduplicated message state,
//! offline caching of unsent messages, dynamic forms, and drafts.

pub mod events;
pub mod gate;
pub mod session;

pub use events::{ChatObserver, EventHub};
pub use session::ChatSession;
