// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seam trait definitions for the Parley engine.
//!
//! Both traits use `#[async_trait]` for dynamic dispatch compatibility and
//! are held as `Arc<dyn Trait>` by the session engine.

pub mod api;
pub mod store;

pub use api::{ChatApi, TransportEvent};
pub use store::CacheStore;
