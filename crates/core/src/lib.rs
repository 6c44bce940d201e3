//! Core units, constants, and shared primitives for the Orbit Engine workspace.

/// Physical constants expressed in SI units (unless stated otherwise).
pub mod constants {
    /// Metres per astronomical unit.
    pub const AU_M: f64 = 1.495_978_707e11;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
}

/// Basic unit conversion helpers.
pub mod units {
    use super::constants::AU_M;

    /// Convert kilometres to metres.
    #[inline]
    pub fn km_to_m(v: f64) -> f64 {
        v * 1_000.0
    }

    /// Convert metres to kilometres.
    #[inline]
    pub fn m_to_km(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert metres per second to kilometres per second.
    #[inline]
    pub fn ms_to_kms(v: f64) -> f64 {
        v / 1_000.0
    }

    /// Convert metres to astronomical units.
    #[inline]
    pub fn m_to_au(v: f64) -> f64 {
        v / AU_M
    }
}

/// Time utilities shared across crates.
///
/// Internal time is a bare `f64` of seconds since epoch J2000.0
/// (2000-01-01T12:00:00 UTC); calendar representations exist only at the
/// external boundary and every conversion goes through this module.
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
    use thiserror::Error;

    use super::constants::SECONDS_PER_DAY;

    /// Unix timestamp of the J2000.0 epoch.
    const EPOCH_UNIX_SECONDS: i64 = 946_728_000;

    /// ISO-8601 rendering of the epoch, for journal metadata and diagnostics.
    pub const EPOCH_ISO: &str = "2000-01-01T12:00:00Z";

    /// Errors surfaced while converting boundary timestamps.
    #[derive(Debug, Error)]
    pub enum TimeError {
        #[error("unrecognized timestamp `{0}` (expected ISO-8601)")]
        Unparseable(String),
        #[error("timestamp out of representable range: {0} s since epoch")]
        OutOfRange(f64),
    }

    /// Convert days to seconds.
    #[inline]
    pub fn days_to_seconds(days: f64) -> f64 {
        days * SECONDS_PER_DAY
    }

    /// Convert seconds to days.
    #[inline]
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    /// Seconds since J2000 for a calendar instant.
    pub fn seconds_since_epoch(instant: DateTime<Utc>) -> f64 {
        let whole = (instant.timestamp() - EPOCH_UNIX_SECONDS) as f64;
        whole + f64::from(instant.timestamp_subsec_nanos()) * 1e-9
    }

    /// Parse an ISO-8601 instant (date-only accepted as midnight UTC) into
    /// seconds since J2000.
    pub fn parse_epoch(value: &str) -> Result<f64, TimeError> {
        if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
            return Ok(seconds_since_epoch(instant.with_timezone(&Utc)));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
            return Ok(seconds_since_epoch(naive.and_utc()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            let midnight = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| TimeError::Unparseable(value.to_string()))?;
            return Ok(seconds_since_epoch(midnight.and_utc()));
        }
        Err(TimeError::Unparseable(value.to_string()))
    }

    /// Format seconds since J2000 as an ISO-8601 UTC string.
    pub fn format_epoch(seconds: f64) -> Result<String, TimeError> {
        if !seconds.is_finite() {
            return Err(TimeError::OutOfRange(seconds));
        }
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round() as u32;
        let instant = DateTime::<Utc>::from_timestamp(
            EPOCH_UNIX_SECONDS + whole as i64,
            nanos.min(999_999_999),
        )
        .ok_or(TimeError::OutOfRange(seconds))?;
        Ok(instant.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Current wall-clock instant as an ISO-8601 UTC string.
    pub fn now_iso() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Current wall-clock instant as seconds since J2000.
    pub fn now_seconds() -> f64 {
        seconds_since_epoch(Utc::now())
    }

}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector; metres or m/s depending on context.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product of two vectors.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }
}
