// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the offline cache store tables.

pub mod configs;
pub mod counters;
pub mod drafts;
pub mod forms;
pub mod not_sent;
