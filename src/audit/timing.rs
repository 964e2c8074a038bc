//! Timestamp parsing, deadline construction and duration rendering.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use thiserror::Error;

const NANOS_DIGITS: usize = 9;

/// A message timestamp that could not be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("malformed timestamp {0:?}")]
    Malformed(String),

    #[error("timestamp {0:?} is out of range")]
    OutOfRange(String),
}

/// Parse a decimal epoch string such as `"1512085950.000216"`.
///
/// The integer part is taken as whole seconds and the fractional digits are
/// scaled to nanoseconds. Digits past nanosecond resolution are truncated.
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>, TimestampError> {
    let malformed = || TimestampError::Malformed(ts.to_string());

    let (secs, frac) = ts.split_once('.').unwrap_or((ts, ""));
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let seconds: i64 = secs
        .parse()
        .map_err(|_| TimestampError::OutOfRange(ts.to_string()))?;

    let digits = &frac[..frac.len().min(NANOS_DIGITS)];
    let nanos = if digits.is_empty() {
        0
    } else {
        let value: u32 = digits.parse().map_err(|_| malformed())?;
        value * 10u32.pow((NANOS_DIGITS - digits.len()) as u32)
    };

    DateTime::from_timestamp(seconds, nanos)
        .ok_or_else(|| TimestampError::OutOfRange(ts.to_string()))
}

/// The deadline instant at `time_of_day` on `now`'s calendar day.
///
/// The wall-clock time is resolved in `now`'s timezone, so the offset is the
/// one in force at the deadline, not at `now`. An ambiguous time takes the
/// earlier instant; a time skipped by a forward transition is read with the
/// offset from before the transition.
pub fn deadline_for<Tz: TimeZone>(
    now: &DateTime<Tz>,
    time_of_day: NaiveTime,
) -> DateTime<FixedOffset> {
    let tz = now.timezone();
    let local = now.date_naive().and_time(time_of_day);

    match tz.from_local_datetime(&local).earliest() {
        Some(deadline) => deadline.fixed_offset(),
        None => {
            let before = tz
                .offset_from_utc_datetime(&(local - Duration::days(1)))
                .fix();
            let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
            tz.from_utc_datetime(&utc).fixed_offset()
        }
    }
}

/// Render a duration compactly: `2h1m`, `1h29m`, `45s`, `59.999s`.
///
/// Zero components are dropped; precision stops at milliseconds, and a
/// non-zero duration shorter than that renders as `0.001s`.
pub fn format_duration(d: Duration) -> String {
    let sign = if d < Duration::zero() { "-" } else { "" };
    let mut ms = d.num_milliseconds().unsigned_abs();
    if ms == 0 && d != Duration::zero() {
        ms = 1;
    }

    let hours = ms / 3_600_000;
    let minutes = (ms / 60_000) % 60;
    let sec_ms = ms % 60_000;

    let mut out = String::from(sign);
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if sec_ms > 0 || out.len() == sign.len() {
        if sec_ms % 1000 == 0 {
            out.push_str(&format!("{}s", sec_ms / 1000));
        } else {
            let fraction = format!("{:03}", sec_ms % 1000);
            out.push_str(&format!(
                "{}.{}s",
                sec_ms / 1000,
                fraction.trim_end_matches('0')
            ));
        }
    }

    out
}
