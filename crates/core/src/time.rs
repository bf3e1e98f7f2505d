//! Timestamp normalization into the reference timezone.
//!
//! The catalog reports UTC instants, sometimes without an explicit offset.
//! Local filesystem times are naive wall-clock readings that are taken to
//! already be in the reference zone. Both are brought into the same aware
//! zone before any comparison.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::debug;

/// Reference timezone used when none is configured.
pub const DEFAULT_REFERENCE_TIMEZONE: &str = "Europe/Berlin";

/// Sentinel the catalog tooling uses for an absent timestamp.
const MISSING_SENTINEL: &str = "N/A";

/// An aware timestamp in the reference timezone.
pub type ReferenceTime = DateTime<Tz>;

#[derive(Debug, Error)]
pub enum TimeError {
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// The fixed zone every timestamp is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone {
    tz: Tz,
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self { tz: Tz::Europe__Berlin }
    }
}

impl ReferenceZone {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Look up a zone by IANA name.
    pub fn from_name(name: &str) -> Result<Self, TimeError> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Parse a catalog timestamp and convert it into the reference zone.
    ///
    /// Returns `None` for absent, empty, `"N/A"` or unparseable input.
    /// Strings without an offset are read as UTC.
    pub fn to_reference_time(&self, raw: Option<&str>) -> Option<ReferenceTime> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        if raw == MISSING_SENTINEL {
            return None;
        }

        match parse_utc(raw) {
            Some(utc) => Some(self.convert_utc(utc)),
            None => {
                debug!(raw = %raw, "Ignoring unparseable catalog timestamp");
                None
            }
        }
    }

    /// Convert an aware UTC instant into the reference zone.
    pub fn convert_utc(&self, utc: DateTime<Utc>) -> ReferenceTime {
        utc.with_timezone(&self.tz)
    }

    /// Attach the reference zone to a naive wall-clock time without shifting it.
    ///
    /// Ambiguous times (autumn fold) resolve to the earlier instant, times that
    /// fall into the spring gap move forward by one hour.
    pub fn localize(&self, naive: NaiveDateTime) -> Option<ReferenceTime> {
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
    }
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
