// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket and HTTP transport adapter for the Parley chat engine.
//!
//! Implements [`parley_core::ChatApi`] over a persistent WebSocket with
//! JSON frames, plus a REST fallback for uploads, forms, pagination, and
//! chat creation. Reconnection policy is the engine's job; this crate
//! only reports `Disconnected` and stops.

pub mod api;
pub mod frames;
pub mod http;
pub mod socket;

pub use api::ServerApi;
