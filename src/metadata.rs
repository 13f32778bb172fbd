//! Boundary with the image metadata reader and writer.
//!
//! The engine never touches files itself. A [`MetadataSource`] hands over the
//! GPS and time stamp fields of a photo, a [`MetadataSink`] persists the
//! finished [`SequenceRecord`]. Both are implemented by the caller.

use chrono::{DateTime, Utc};
use log::warn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Speed;
use crate::error::MetadataError;
use crate::pipeline::SequenceRecord;
use crate::timestamp::{epoch, TimestampCandidates, TimestampResolver};
use crate::GeoPoint;

/// GPS related fields read from one photo.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawMetadata {
    /// Position, if the photo is geotagged
    pub point: Option<GeoPoint>,
    /// Altitude in meters, negative below sea level
    pub altitude: Option<f64>,
    pub speed: Option<Speed>,
    /// Image direction in degrees
    pub bearing: Option<f64>,
    pub timestamps: TimestampCandidates,
}

/// Reads photo metadata by identifier.
pub trait MetadataSource: Sync {
    fn read(&self, id: &str) -> Result<RawMetadata, MetadataError>;
}

/// Persists finished records.
pub trait MetadataSink {
    /// Write the record's fields into the metadata of the photo it was read from.
    fn write(&mut self, record: &SequenceRecord) -> Result<(), MetadataError>;

    /// Set the modification time of the written photo. Only called when the
    /// configuration asks to preserve modification times.
    fn preserve_modified(&mut self, id: &str, modified: DateTime<Utc>) -> Result<(), MetadataError> {
        let _ = (id, modified);
        Ok(())
    }
}

impl MetadataSink for Vec<SequenceRecord> {
    fn write(&mut self, record: &SequenceRecord) -> Result<(), MetadataError> {
        self.push(record.clone());
        Ok(())
    }
}

/// The outcome of reading one photo.
#[derive(Debug)]
pub struct SourceEntry {
    pub id: String,
    pub metadata: Result<RawMetadata, MetadataError>,
}

/// Read the metadata of every identifier, keeping input order.
pub fn read_sequence<S: MetadataSource>(ids: &[String], source: &S) -> Vec<SourceEntry> {
    let read = |id: &String| SourceEntry { id: id.clone(), metadata: source.read(id) };

    #[cfg(feature = "parallel")]
    let entries: Vec<SourceEntry> = ids.par_iter().map(read).collect();

    #[cfg(not(feature = "parallel"))]
    let entries: Vec<SourceEntry> = ids.iter().map(read).collect();

    entries
}

/// Sort entries into capture order.
///
/// Uses the full fallback chain of [`TimestampResolver`]. Photos whose
/// metadata could not be read sort as the Unix epoch; the error itself is
/// kept in the entry. Equal times keep their input order.
pub fn order_sequence(mut entries: Vec<SourceEntry>, utc: bool) -> Vec<SourceEntry> {
    let resolver = TimestampResolver::new(true, utc);
    entries.sort_by_cached_key(|entry| match &entry.metadata {
        Ok(metadata) => resolver.instant(&metadata.timestamps).unwrap_or_else(epoch),
        Err(e) => {
            warn!("Cannot read time stamps of {}, ordering it first: {}", entry.id, e);
            epoch()
        }
    });
    entries
}
