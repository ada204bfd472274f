// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar periods.
//!
//! All periods are computed in UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// Output is fixed width, so stored strings sort chronologically.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp (any offset) into UTC.
pub fn parse_rfc3339_utc(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter storing timestamps through [`format_utc_rfc3339`].
pub mod rfc3339_secs {
    use super::{format_utc_rfc3339, parse_rfc3339_utc};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_utc_rfc3339(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse_rfc3339_utc(&raw).map_err(serde::de::Error::custom)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Monday 00:00 of the week containing `date`.
pub fn week_start(date: DateTime<Utc>) -> DateTime<Utc> {
    let day = date.date_naive();
    let offset = day.weekday().num_days_from_monday() as i64;
    midnight(day - Duration::days(offset))
}

/// First day 00:00 of the month containing `date`.
pub fn month_start(date: DateTime<Utc>) -> DateTime<Utc> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .unwrap_or_else(|| date.date_naive());
    midnight(first)
}

/// January 1st 00:00 of the year containing `date`.
pub fn year_start(date: DateTime<Utc>) -> DateTime<Utc> {
    let first =
        NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or_else(|| date.date_naive());
    midnight(first)
}

/// Start of the month after the one starting at `start`.
pub fn next_month_start(start: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if start.month() == 12 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).map_or(start + Duration::days(31), midnight)
}

/// Start of the month before the one starting at `start`.
pub fn previous_month_start(start: DateTime<Utc>) -> DateTime<Utc> {
    month_start(start - Duration::days(1))
}

/// Start of the year after the one starting at `start`.
pub fn next_year_start(start: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).map_or(start + Duration::days(366), midnight)
}

/// Start of the year before the one starting at `start`.
pub fn previous_year_start(start: DateTime<Utc>) -> DateTime<Utc> {
    year_start(start - Duration::days(1))
}
