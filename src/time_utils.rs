// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

/// Largest UTC offset accepted from clients (±14h, the real-world maximum).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a client-supplied workout date.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC), a bare
/// `YYYY-MM-DD` (midnight UTC) or Unix milliseconds. Returns `None` for
/// anything else.
pub fn parse_client_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
    }

    None
}

/// Build a fixed offset from a client's UTC offset in minutes.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return None;
    }
    minutes.checked_mul(60).and_then(FixedOffset::east_opt)
}

/// Calendar date of a UTC instant as seen at the given offset.
pub fn local_date(date: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    date.with_timezone(&offset).date_naive()
}

/// UTC instant of local midnight starting `date` at the given offset.
pub fn local_midnight_utc(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    (local - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}
