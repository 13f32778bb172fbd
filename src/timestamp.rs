//! Capture time resolution.
//!
//! A photo can carry its capture time in several places. The resolver picks
//! the first one available, in this order:
//!
//! 1. GPS date and time stamp (always UTC)
//! 2. EXIF `DateTimeOriginal`
//! 3. EXIF `DateTimeDigitized`
//! 4. TIFF `DateTime`
//! 5. the file's last modification time
//!
//! Sources 2–5 are only consulted when fallback is enabled. EXIF date/time
//! strings carry no zone and are read in the local time zone unless UTC
//! interpretation is requested. A malformed string is logged and skipped.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use log::warn;

/// The raw capture time sources of one photo.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimestampCandidates {
    /// GPS date stamp, `"YYYY:MM:DD"`
    pub gps_date: Option<String>,
    /// GPS time stamp as hour, minute and (fractional) second
    pub gps_time: Option<[f64; 3]>,
    /// EXIF `DateTimeOriginal`, `"YYYY:MM:DD HH:MM:SS"`
    pub date_time_original: Option<String>,
    /// EXIF `DateTimeDigitized`
    pub date_time_digitized: Option<String>,
    /// TIFF `DateTime`
    pub date_time: Option<String>,
    /// Last modification time of the file
    pub modified: DateTime<Utc>,
}

impl TimestampCandidates {
    /// Candidates holding only a file modification time.
    pub fn from_modified(modified: DateTime<Utc>) -> Self {
        Self { modified, ..Self::default() }
    }
}

/// Where a resolved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampSource {
    Gps,
    DateTimeOriginal,
    DateTimeDigitized,
    DateTime,
    Modified,
}

/// A capture instant together with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub instant: DateTime<Utc>,
    pub source: TimestampSource,
}

/// A date/time text that could not be turned into an instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date/time `{value}`: {reason}")]
pub struct InvalidTimestamp {
    pub value: String,
    pub reason: &'static str,
}

impl InvalidTimestamp {
    fn new(value: &str, reason: &'static str) -> Self {
        Self { value: value.to_string(), reason }
    }
}

/// Resolves and compares capture times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampResolver {
    /// Fall back to EXIF date/time fields and the file modification time
    pub fallback: bool,
    /// Read EXIF date/time fields as UTC instead of local time
    pub utc: bool,
}

impl TimestampResolver {
    pub fn new(fallback: bool, utc: bool) -> Self {
        Self { fallback, utc }
    }

    /// Resolve the first available source.
    ///
    /// Returns `None` only when fallback is disabled and no usable GPS time
    /// stamp exists; with fallback the modification time always resolves.
    pub fn resolve(&self, candidates: &TimestampCandidates) -> Option<ResolvedTimestamp> {
        if let Some(date) = &candidates.gps_date {
            match parse_gps_datetime(date, candidates.gps_time) {
                Ok(instant) => return Some(ResolvedTimestamp { instant, source: TimestampSource::Gps }),
                Err(e) => warn!("Ignoring GPS time stamp: {}", e),
            }
        }

        if !self.fallback {
            return None;
        }

        let exif_fields = [
            (&candidates.date_time_original, TimestampSource::DateTimeOriginal),
            (&candidates.date_time_digitized, TimestampSource::DateTimeDigitized),
            (&candidates.date_time, TimestampSource::DateTime),
        ];
        for (field, source) in exif_fields {
            let Some(text) = field else { continue };
            match parse_exif_datetime(text, self.utc) {
                Ok(instant) => return Some(ResolvedTimestamp { instant, source }),
                Err(e) => warn!("Ignoring {:?} time stamp: {}", source, e),
            }
        }

        Some(ResolvedTimestamp { instant: candidates.modified, source: TimestampSource::Modified })
    }

    /// Resolved instant, if any.
    pub fn instant(&self, candidates: &TimestampCandidates) -> Option<DateTime<Utc>> {
        self.resolve(candidates).map(|r| r.instant)
    }

    /// Order two photos by capture time. Photos without a resolvable time sort first.
    pub fn compare(&self, a: &TimestampCandidates, b: &TimestampCandidates) -> Ordering {
        self.instant(a).cmp(&self.instant(b))
    }
}

/// The Unix epoch, used for photos whose metadata cannot be read.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

/// Parse an EXIF date/time string such as `"2016:05:21 14:03:07"`.
///
/// Fields are separated by colons or whitespace and may omit leading zeros.
pub fn parse_exif_datetime(text: &str, utc: bool) -> Result<DateTime<Utc>, InvalidTimestamp> {
    let fields = split_numbers(text, 6)?;
    let naive = NaiveDate::from_ymd_opt(year(text, fields[0])?, fields[1], fields[2])
        .and_then(|date| date.and_hms_opt(fields[3], fields[4], fields[5]))
        .ok_or_else(|| InvalidTimestamp::new(text, "not a calendar date and time"))?;

    if utc {
        Ok(Utc.from_utc_datetime(&naive))
    } else {
        local_to_utc(&naive).ok_or_else(|| InvalidTimestamp::new(text, "does not exist in the local time zone"))
    }
}

/// Parse a GPS date stamp (`"YYYY:MM:DD"`) and optional time stamp into a UTC instant.
///
/// A missing time stamp means midnight. Seconds keep millisecond precision.
pub fn parse_gps_datetime(date: &str, time: Option<[f64; 3]>) -> Result<DateTime<Utc>, InvalidTimestamp> {
    let fields = split_numbers(date, 3)?;
    let midnight = NaiveDate::from_ymd_opt(year(date, fields[0])?, fields[1], fields[2])
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| InvalidTimestamp::new(date, "not a calendar date"))?;

    let offset = match time {
        Some([hour, minute, second]) => {
            if ![hour, minute, second].iter().all(|v| v.is_finite() && *v >= 0.0) {
                return Err(InvalidTimestamp::new(date, "GPS time stamp is negative or not a number"));
            }
            let millis = ((hour * 3600.0 + minute * 60.0 + second) * 1000.0).round();
            // one day plus a leap second
            if millis > 86_401_000.0 {
                return Err(InvalidTimestamp::new(date, "GPS time stamp exceeds one day"));
            }
            Duration::milliseconds(millis as i64)
        }
        None => Duration::zero(),
    };

    midnight
        .checked_add_signed(offset)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| InvalidTimestamp::new(date, "date out of range"))
}

/// GPS date stamp text (`"YYYY:MM:DD"`, UTC) for an instant.
pub fn gps_date_stamp(instant: &DateTime<Utc>) -> String {
    instant.format("%Y:%m:%d").to_string()
}

/// GPS time stamp (hour, minute, second with milliseconds, UTC) for an instant.
pub fn gps_time_stamp(instant: &DateTime<Utc>) -> [f64; 3] {
    [
        f64::from(instant.hour()),
        f64::from(instant.minute()),
        f64::from(instant.second()) + f64::from(instant.timestamp_subsec_millis() % 1000) / 1000.0,
    ]
}

fn local_to_utc(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn year(text: &str, value: u32) -> Result<i32, InvalidTimestamp> {
    i32::try_from(value).map_err(|_| InvalidTimestamp::new(text, "year out of range"))
}

fn split_numbers(text: &str, expected: usize) -> Result<Vec<u32>, InvalidTimestamp> {
    let fields: Vec<&str> = text
        .trim()
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();

    if fields.len() != expected {
        return Err(InvalidTimestamp::new(text, "unexpected number of fields"));
    }

    fields
        .iter()
        .map(|f| {
            f.parse::<u32>()
                .map_err(|_| InvalidTimestamp::new(text, "field is not a number in range"))
        })
        .collect()
}
