// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides mock implementations of the engine's seam traits for fast,
//! deterministic, CI-runnable tests without a real backend.
//!
//! # Components
//!
//! - [`MockChatApi`] - Mock transport with event injection and traffic capture
//! - [`MemoryCacheStore`] - In-memory cache store

pub mod memory_store;
pub mod mock_api;

pub use memory_store::MemoryCacheStore;
pub use mock_api::MockChatApi;
