// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Parley chat engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed
//! operations for the offline cache: unsent message shadow copies,
//! drafts, saved form values, per-identity configurations, and a local
//! attachment cache.

pub mod adapter;
pub mod database;
pub mod files;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteCacheStore;
pub use database::Database;
pub use files::FileCache;
