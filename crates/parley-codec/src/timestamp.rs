// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire timestamp parsing with a millisecond-precision fallback.

use chrono::{DateTime, NaiveDateTime, Utc};

use parley_core::ParleyError;

const PRIMARY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Parses a wire timestamp, trying the whole-second format first and the
/// millisecond variant on failure.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ParleyError> {
    NaiveDateTime::parse_from_str(raw, PRIMARY_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, MILLIS_FORMAT))
        .map(|naive| naive.and_utc())
        .map_err(|e| ParleyError::Protocol(format!("bad timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_whole_second_format() {
        let ts = parse_timestamp("2024-03-01T12:30:45Z").unwrap();
        assert_eq!(ts.second(), 45);
    }

    #[test]
    fn falls_back_to_millisecond_format() {
        let ts = parse_timestamp("2024-03-01T12:30:45.123Z").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
