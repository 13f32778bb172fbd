//! # Photo Sequencer
//!
//! Geodetic and temporal correction of geotagged photo sequences for map-based
//! publishing.
//!
//! This library provides:
//! - Timestamp resolution and ordering of capture sequences
//! - Windowed smoothing and linear interpolation of GPS positions
//! - Heading (bearing) normalization along the path
//! - Panorama centering (one position, headings fanned over 360°)
//!
//! Reading and writing image metadata is left to the caller through the
//! [`MetadataSource`] and [`MetadataSink`] traits.
//!
//! ## Features
//!
//! - **`parallel`** - Read sequence metadata in parallel with rayon
//! - **`serde`** - Serialize configuration and records
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use photo_sequencer::{transform, GeoPoint, SequenceRecord, TransformationConfig};
//!
//! let records: Vec<SequenceRecord> = [0.0, 10.0, 20.0]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, lng)| SequenceRecord::new(format!("IMG_{i}.jpg"), GeoPoint::new(0.0, *lng)))
//!     .collect();
//!
//! let config = TransformationConfig::builder()
//!     .normalize_bearing(true)
//!     .build()
//!     .unwrap();
//!
//! let output = transform(records, &config).unwrap();
//! for record in &output {
//!     println!("{} -> {:?}", record.id, record.bearing);
//! }
//! ```

pub mod config;
pub mod error;
pub mod geo_utils;
pub mod metadata;
pub mod pipeline;
pub mod timestamp;
pub mod window;

pub use config::{
    DirectionRef, Flag, Speed, SpeedUnit, TransformationConfig, TransformationConfigBuilder,
};
pub use error::{ConfigError, MetadataError, Result, SequenceError};
pub use metadata::{order_sequence, MetadataSink, MetadataSource, RawMetadata};
pub use pipeline::{transform, Mode, RunSummary, SequenceRecord, Sequencer};
pub use timestamp::{TimestampCandidates, TimestampResolver};

// ============================================================================
// Core Types
// ============================================================================

/// A geographic position in signed decimal degrees with an optional altitude.
///
/// Latitude is positive north, longitude positive east. Altitude is in meters,
/// negative below the reference level.
///
/// # Example
/// ```
/// use photo_sequencer::GeoPoint;
/// let point = GeoPoint::new(59.3293, 18.0686).with_altitude(28.0); // Stockholm
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl GeoPoint {
    /// Create a new point without altitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, altitude: None }
    }

    /// The point synthesized for photos that carry no GPS data.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Return a copy of this point with the given altitude.
    pub fn with_altitude(self, altitude: f64) -> Self {
        Self { altitude: Some(altitude), ..self }
    }

    /// Return a copy of this point without altitude.
    pub fn without_altitude(self) -> Self {
        Self { altitude: None, ..self }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Latitude as degrees, minutes and seconds.
    pub fn latitude_dms(&self) -> Dms {
        let hemisphere = if self.latitude >= 0.0 { Hemisphere::North } else { Hemisphere::South };
        Dms::from_degrees(self.latitude, hemisphere)
    }

    /// Longitude as degrees, minutes and seconds.
    pub fn longitude_dms(&self) -> Dms {
        let hemisphere = if self.longitude >= 0.0 { Hemisphere::East } else { Hemisphere::West };
        Dms::from_degrees(self.longitude, hemisphere)
    }

    /// Build a point from degrees-minutes-seconds components.
    ///
    /// ```
    /// use photo_sequencer::GeoPoint;
    ///
    /// let point = GeoPoint::new(-33.8688, 151.2093);
    /// let back = GeoPoint::from_dms(point.latitude_dms(), point.longitude_dms());
    /// assert!((back.latitude - point.latitude).abs() < 1e-9);
    /// assert!((back.longitude - point.longitude).abs() < 1e-9);
    /// ```
    pub fn from_dms(latitude: Dms, longitude: Dms) -> Self {
        Self::new(latitude.to_degrees(), longitude.to_degrees())
    }
}

/// Hemisphere reference of a [`Dms`] value, as written in EXIF GPS reference tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// The single-letter EXIF reference value.
    pub fn as_ref_char(&self) -> char {
        match self {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
            Hemisphere::East => 'E',
            Hemisphere::West => 'W',
        }
    }

    fn sign(&self) -> f64 {
        match self {
            Hemisphere::North | Hemisphere::East => 1.0,
            Hemisphere::South | Hemisphere::West => -1.0,
        }
    }
}

/// An unsigned angle split into whole degrees, whole minutes and fractional seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl Dms {
    fn from_degrees(value: f64, hemisphere: Hemisphere) -> Self {
        let value = value.abs();
        let degrees = value.floor();
        let minutes_exact = (value - degrees) * 60.0;
        let minutes = minutes_exact.floor();
        let seconds = (minutes_exact - minutes) * 60.0;
        Self { degrees, minutes, seconds, hemisphere }
    }

    /// Signed decimal degrees.
    pub fn to_degrees(&self) -> f64 {
        self.hemisphere.sign() * (self.degrees + self.minutes / 60.0 + self.seconds / 3600.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
