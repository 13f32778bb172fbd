//! # Sequence Pipeline
//!
//! Turns an ordered photo sequence into corrected records, one pass from
//! first to last photo.
//!
//! ## Per-photo stages
//!
//! Each stage runs only when its option is set, always in this order:
//!
//! 1. **Smoothing** - the position becomes the centroid of its
//!    [smoothing window](crate::window::select) over the original positions
//! 2. **Linear interpolation** - the position is spaced evenly between the
//!    original first and last position
//! 3. **Bearing normalization** - the previous photo is pointed at this one
//! 4. **Altitude** - kept (missing ones filled in) or removed
//! 5. **Time stamp** - a missing GPS time stamp is synthesized, or replaced by
//!    the file modification time
//! 6. **Speed** - a fixed speed is written
//! 7. **Area information** - a fixed text is written
//!
//! A photo's heading is only known once the next position is, so every record
//! waits in a one-slot pending buffer until its successor has been processed.
//! The last photo has no successor: it takes over the heading of the one
//! before it and both are emitted in the same step.
//!
//! ## Centering
//!
//! Centering replaces the stages above. Every photo gets the centroid of all
//! positions and headings are spread evenly over the full circle, as for a
//! panorama taken from a single spot.

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, info, warn};

use crate::config::{DirectionRef, Speed, SpeedUnit, TransformationConfig};
use crate::error::{MetadataError, Result, SequenceError};
use crate::geo_utils::{self, Increment};
use crate::metadata::{order_sequence, read_sequence, MetadataSink, MetadataSource, RawMetadata};
use crate::timestamp::{epoch, parse_gps_datetime, TimestampCandidates, TimestampResolver};
use crate::window;
use crate::GeoPoint;

// ============================================================================
// Records
// ============================================================================

/// One photo of the sequence, as it moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceRecord {
    /// Identifier of the source photo
    pub id: String,
    /// Position and altitude. Photos without GPS data start at (0, 0).
    pub point: GeoPoint,
    /// Capture instant used for ordering
    pub sequenced_at: DateTime<Utc>,
    /// GPS time stamp to write
    pub gps_timestamp: Option<DateTime<Utc>>,
    /// Raw time sources, kept for time stamp synthesis
    pub timestamps: TimestampCandidates,
    pub speed: Option<Speed>,
    /// Image direction in degrees
    pub bearing: Option<f64>,
    pub direction_ref: DirectionRef,
    pub area_information: Option<String>,
}

impl SequenceRecord {
    /// A bare record with only an identifier and a position.
    pub fn new(id: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            point,
            sequenced_at: epoch(),
            gps_timestamp: None,
            timestamps: TimestampCandidates::default(),
            speed: None,
            bearing: None,
            direction_ref: DirectionRef::TrueNorth,
            area_information: None,
        }
    }

    /// Build a record from the metadata of one photo.
    ///
    /// Fails with [`SequenceError::MetadataRead`] when the position is not a
    /// finite latitude/longitude within range.
    pub fn from_metadata(id: impl Into<String>, metadata: RawMetadata, resolver: &TimestampResolver) -> Result<Self> {
        let id = id.into();
        let mut point = match metadata.point {
            Some(point) if !point.is_valid() => {
                let message = format!("invalid GPS position {}, {}", point.latitude, point.longitude);
                return Err(SequenceError::metadata_read(id, MetadataError::new(message)));
            }
            Some(point) => point,
            None => {
                debug!("{} has no GPS position, using 0, 0", id);
                GeoPoint::zero()
            }
        };
        point.altitude = metadata.altitude.or(point.altitude);

        let gps_timestamp = metadata.timestamps.gps_date.as_deref().and_then(|date| {
            parse_gps_datetime(date, metadata.timestamps.gps_time)
                .map_err(|e| warn!("{}: {}", id, e))
                .ok()
        });
        let sequenced_at = resolver.instant(&metadata.timestamps).unwrap_or_else(epoch);

        Ok(Self {
            id,
            point,
            sequenced_at,
            gps_timestamp,
            timestamps: metadata.timestamps,
            speed: metadata.speed,
            bearing: metadata.bearing,
            direction_ref: DirectionRef::TrueNorth,
            area_information: None,
        })
    }
}

/// How a run laid out the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Path,
    Centered,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of records handed to the sink
    pub records: usize,
    pub mode: Mode,
    /// Great-circle length of the emitted positions in meters
    pub path_length: f64,
}

// ============================================================================
// Sequencer
// ============================================================================

/// Runs the pipeline for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Sequencer<'a> {
    config: &'a TransformationConfig,
}

impl<'a> Sequencer<'a> {
    pub fn new(config: &'a TransformationConfig) -> Self {
        Self { config }
    }

    /// Read, order, transform and write a whole sequence.
    ///
    /// Aborts on the first photo whose metadata cannot be read or written.
    /// Photos written before a failure stay written.
    pub fn run<S, K>(&self, ids: &[String], source: &S, sink: &mut K) -> Result<RunSummary>
    where
        S: MetadataSource,
        K: MetadataSink,
    {
        self.config.validate()?;
        info!("Sequencing {} photos", ids.len());

        let resolver = TimestampResolver::new(true, self.config.utc);
        let records = order_sequence(read_sequence(ids, source), self.config.utc)
            .into_iter()
            .map(|entry| match entry.metadata {
                Ok(metadata) => SequenceRecord::from_metadata(entry.id, metadata, &resolver),
                Err(e) => Err(SequenceError::metadata_read(entry.id, e)),
            })
            .collect::<Result<Vec<_>>>()?;

        let preserve = self.config.preserve_modification_time;
        let summary = self.process(records, |record| {
            sink.write(&record)
                .map_err(|e| SequenceError::metadata_write(&record.id, e))?;
            if preserve {
                sink.preserve_modified(&record.id, record.timestamps.modified)
                    .map_err(|e| SequenceError::metadata_write(&record.id, e))?;
            }
            Ok(())
        })?;

        info!(
            "Wrote {} photos ({:?}), path length {:.0}m",
            summary.records, summary.mode, summary.path_length
        );
        Ok(summary)
    }

    /// Transform records that are already in sequence order, handing each
    /// finished record to `emit` in order.
    pub fn process<F>(&self, records: Vec<SequenceRecord>, mut emit: F) -> Result<RunSummary>
    where
        F: FnMut(SequenceRecord) -> Result<()>,
    {
        let mode = if self.config.center { Mode::Centered } else { Mode::Path };
        let mut emitted: Vec<GeoPoint> = Vec::with_capacity(records.len());
        let mut forward = |record: SequenceRecord| {
            debug!(
                "{}: {:.6}, {:.6} altitude {:?} bearing {:?} time {:?}",
                record.id,
                record.point.latitude,
                record.point.longitude,
                record.point.altitude,
                record.bearing,
                record.gps_timestamp
            );
            emitted.push(record.point);
            emit(record)
        };

        if !records.is_empty() {
            match mode {
                Mode::Centered => self.center(records, &mut forward)?,
                Mode::Path => self.process_path(records, &mut forward)?,
            }
        }

        Ok(RunSummary {
            records: emitted.len(),
            mode,
            path_length: geo_utils::polyline_length(&emitted),
        })
    }

    fn process_path<F>(&self, records: Vec<SequenceRecord>, emit: &mut F) -> Result<()>
    where
        F: FnMut(SequenceRecord) -> Result<()>,
    {
        let config = self.config;
        let snapshot = Snapshot::of(&records);
        let n = records.len();

        let window = config.effective_window(n);
        if window.is_some() && config.smooth_harmonic {
            warn!("Harmonic smoothing is not available, using the arithmetic mean");
        }

        let increment = if config.interpolate_linear {
            Some(geo_utils::linear_increment(&snapshot.points[0], &snapshot.points[n - 1], n)?)
        } else {
            None
        };

        let resolver = TimestampResolver::new(true, config.utc);
        let mut pending: Option<SequenceRecord> = None;

        for (i, mut record) in records.into_iter().enumerate() {
            let is_last = i + 1 == n;

            if let Some(window) = window {
                self.smooth(&mut record, &snapshot, window::select(n, i, window));
            }

            if let Some(increment) = &increment {
                interpolate(&mut record, &snapshot.points[0], increment, i);
            }

            if config.normalize_bearing {
                record.bearing = None;
                record.direction_ref = DirectionRef::TrueNorth;
            }

            if let Some(previous) = pending.take() {
                emit(self.release(previous, &mut record, is_last))?;
            }

            self.apply_altitude(&mut record);
            self.apply_timestamp(&mut record, &resolver);
            if let Some(speed) = config.speed {
                record.speed = Some(speed);
            }
            if let Some(text) = &config.area_information {
                record.area_information = Some(text.clone());
            }

            if is_last {
                emit(record)?;
            } else {
                pending = Some(record);
            }
        }

        Ok(())
    }

    /// Finish the pending record now that its successor's position is known.
    fn release(&self, mut previous: SequenceRecord, current: &mut SequenceRecord, is_last: bool) -> SequenceRecord {
        if self.config.normalize_bearing {
            let bearing = geo_utils::bearing(&previous.point, &current.point);
            previous.bearing = Some(bearing);
            if is_last {
                current.bearing = Some(bearing);
            }
        }
        previous
    }

    fn smooth(&self, record: &mut SequenceRecord, snapshot: &Snapshot, range: std::ops::Range<usize>) {
        let config = self.config;
        let neighbors = &snapshot.points[range.clone()];

        let altitude = if config.smooth_altitude {
            geo_utils::centroid_altitude(neighbors)
        } else {
            record.point.altitude
        };
        record.point = GeoPoint { altitude, ..geo_utils::centroid(neighbors) };

        if config.smooth_speed {
            let kmh = geo_utils::mean(snapshot.speeds[range.clone()].iter().flatten().map(Speed::kmh));
            record.speed = kmh.map(|v| Speed::new(v, SpeedUnit::KilometersPerHour));
        }

        if config.smooth_time {
            record.gps_timestamp = mean_instant(&snapshot.instants[range]);
        }
    }

    fn apply_altitude(&self, record: &mut SequenceRecord) {
        if self.config.keep_altitude {
            if record.point.altitude.is_none() {
                record.point.altitude = Some(self.config.altitude);
            }
        } else {
            record.point.altitude = None;
        }
    }

    fn apply_timestamp(&self, record: &mut SequenceRecord, resolver: &TimestampResolver) {
        if !self.config.timestamp {
            return;
        }
        if record.gps_timestamp.is_none() {
            record.gps_timestamp = resolver.instant(&record.timestamps);
        }
        if self.config.timestamp_overwrite {
            record.gps_timestamp = Some(record.timestamps.modified);
        }
    }

    fn center<F>(&self, records: Vec<SequenceRecord>, emit: &mut F) -> Result<()>
    where
        F: FnMut(SequenceRecord) -> Result<()>,
    {
        let points: Vec<GeoPoint> = records.iter().map(|r| r.point).collect();
        let center = geo_utils::centroid(&points).without_altitude();
        let slice = 360.0 / records.len() as f64;
        info!("Centering {} photos on {:.6}, {:.6}", records.len(), center.latitude, center.longitude);

        for (i, mut record) in records.into_iter().enumerate() {
            record.point = center;
            record.bearing = Some(geo_utils::normalize_degrees(self.config.center_bearing + slice * i as f64));
            record.direction_ref = self.config.direction_ref;
            emit(record)?;
        }

        Ok(())
    }
}

/// Transform records that are already in sequence order and collect the result.
///
/// # Example
/// ```
/// use photo_sequencer::{transform, GeoPoint, SequenceRecord, TransformationConfig};
///
/// let records = vec![
///     SequenceRecord::new("a", GeoPoint::new(0.0, 0.0)),
///     SequenceRecord::new("b", GeoPoint::new(0.0, 5.0)),
///     SequenceRecord::new("c", GeoPoint::new(0.0, 20.0)),
/// ];
/// let config = TransformationConfig::builder().interpolate_linear(true).build().unwrap();
///
/// let output = transform(records, &config).unwrap();
/// assert!((output[1].point.longitude - 10.0).abs() < 1e-9);
/// ```
pub fn transform(records: Vec<SequenceRecord>, config: &TransformationConfig) -> Result<Vec<SequenceRecord>> {
    config.validate()?;
    let mut output = Vec::with_capacity(records.len());
    Sequencer::new(config).process(records, |record| {
        output.push(record);
        Ok(())
    })?;
    Ok(output)
}

// ============================================================================
// Helpers
// ============================================================================

/// Values of the sequence before any stage ran.
struct Snapshot {
    points: Vec<GeoPoint>,
    speeds: Vec<Option<Speed>>,
    instants: Vec<DateTime<Utc>>,
}

impl Snapshot {
    fn of(records: &[SequenceRecord]) -> Self {
        Self {
            points: records.iter().map(|r| r.point).collect(),
            speeds: records.iter().map(|r| r.speed).collect(),
            instants: records.iter().map(|r| r.sequenced_at).collect(),
        }
    }
}

fn interpolate(record: &mut SequenceRecord, start: &GeoPoint, increment: &Increment, index: usize) {
    let altitude = record.point.altitude;
    record.point = GeoPoint { altitude, ..increment.apply(start, index) };
}

fn mean_instant(instants: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    if instants.is_empty() {
        return None;
    }
    let sum: i128 = instants.iter().map(|t| i128::from(t.timestamp_millis())).sum();
    let mean = sum / instants.len() as i128;
    Utc.timestamp_millis_opt(i64::try_from(mean).ok()?).single()
}

// ============================================================================
// Tests
// ============================================================================
