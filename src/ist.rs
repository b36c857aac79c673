//! India Standard Time helpers.
//!
//! IST is a fixed UTC+05:30 offset with no daylight saving, so a plain
//! `UtcOffset` is enough and no tz database is needed. Timestamps are stored
//! as `TIMESTAMPTZ` and only converted to IST for display and for computing
//! calendar-day windows.

use time::format_description::well_known::Rfc3339;
use time::macros::{format_description, offset};
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const IST: UtcOffset = offset!(+5:30);
pub const IST_ZONE_NAME: &str = "Asia/Kolkata";

/// 15-minute reminders go out for workshops starting in `[now+10m, now+20m]`.
pub const SOON_WINDOW_START_MINUTES: i64 = 10;
pub const SOON_WINDOW_END_MINUTES: i64 = 20;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid datetime: {0}")]
pub struct DateTimeParseError(pub String);

#[must_use]
pub fn now_ist() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(IST)
}

#[must_use]
pub fn to_ist(dt: OffsetDateTime) -> OffsetDateTime {
    dt.to_offset(IST)
}

/// Parse a client-supplied timestamp.
///
/// RFC 3339 values keep their offset. Naive values (`2027-03-05T14:30`,
/// `2027-03-05 14:30:00`, `2027-03-05`) are interpreted as IST.
pub fn parse_datetime(raw: &str) -> Result<OffsetDateTime, DateTimeParseError> {
    let raw = raw.trim();
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt);
    }

    let normalized = raw.replacen(' ', "T", 1);
    let naive = PrimitiveDateTime::parse(
        &normalized,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    )
    .or_else(|_| PrimitiveDateTime::parse(&normalized, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]")))
    .or_else(|_| PrimitiveDateTime::parse(&normalized, format_description!("[year]-[month]-[day]T[hour]:[minute]")))
    .or_else(|_| {
        time::Date::parse(&normalized, format_description!("[year]-[month]-[day]")).map(time::Date::midnight)
    })
    .map_err(|_| DateTimeParseError(raw.to_owned()))?;

    Ok(naive.assume_offset(IST))
}

/// `05 March 2027, 02:30 PM IST`
#[must_use]
pub fn format_ist(dt: OffsetDateTime) -> String {
    to_ist(dt)
        .format(format_description!("[day] [month repr:long] [year], [hour repr:12]:[minute] [period] IST"))
        .unwrap_or_else(|_| dt.to_string())
}

/// `05 March 2027, 02:30:15 PM IST`
#[must_use]
pub fn format_ist_seconds(dt: OffsetDateTime) -> String {
    to_ist(dt)
        .format(format_description!(
            "[day] [month repr:long] [year], [hour repr:12]:[minute]:[second] [period] IST"
        ))
        .unwrap_or_else(|_| dt.to_string())
}

/// `05 March 2027, 09:00:15 AM UTC`
#[must_use]
pub fn format_utc_seconds(dt: OffsetDateTime) -> String {
    dt.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[day] [month repr:long] [year], [hour repr:12]:[minute]:[second] [period] UTC"
        ))
        .unwrap_or_else(|_| dt.to_string())
}

/// Human-readable countdown used in workshop listings.
#[must_use]
pub fn time_until(scheduled: OffsetDateTime, now: OffsetDateTime) -> String {
    let diff = scheduled - now;
    if diff <= Duration::ZERO {
        return "Past".to_owned();
    }

    let total = diff.whole_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    if days > 0 {
        format!("{days} days, {hours} hours")
    } else if hours > 0 {
        format!("{hours} hours, {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

/// The whole of tomorrow's IST calendar day, inclusive on both ends.
#[must_use]
pub fn tomorrow_window(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let today = to_ist(now).date();
    let tomorrow = today.next_day().unwrap_or(today);
    let start = tomorrow.midnight().assume_offset(IST);
    let end = start + Duration::days(1) - Duration::microseconds(1);
    (start, end)
}

/// Start-time window for the 15-minute reminder.
#[must_use]
pub fn soon_window(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    (
        now + Duration::minutes(SOON_WINDOW_START_MINUTES),
        now + Duration::minutes(SOON_WINDOW_END_MINUTES),
    )
}

/// `#[serde(serialize_with = ...)]` helpers that render timestamps as RFC 3339
/// in the IST offset, e.g. `2027-03-05T14:30:00+05:30`.
pub mod serde_ist {
    use serde::Serializer;
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(&super::to_ist(*dt), serializer)
    }

    pub mod option {
        use serde::Serializer;
        use time::OffsetDateTime;

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(dt: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
            time::serde::rfc3339::option::serialize(&dt.map(super::super::to_ist), serializer)
        }
    }
}

#[cfg(test)]
#[path = "ist_test.rs"]
mod tests;
