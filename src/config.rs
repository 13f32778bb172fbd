//! Transformation settings for a sequencing run.
//!
//! Settings are validated as a whole when built: conflicting or incomplete
//! flag combinations are rejected before any photo is touched. The checks are
//! driven by two rule tables, [`EXCLUSIVE_FLAGS`] and [`REQUIRED_FLAGS`].

use std::fmt;

use log::warn;

use crate::error::ConfigError;

/// A named transformation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Smooth,
    SmoothAltitude,
    SmoothHarmonic,
    SmoothSpeed,
    SmoothTime,
    InterpolateLinear,
    Center,
    NormalizeBearing,
    KeepAltitude,
    Timestamp,
    TimestampOverwrite,
    Utc,
    PreserveModificationTime,
    Speed,
    AreaInformation,
}

impl Flag {
    pub fn name(&self) -> &'static str {
        match self {
            Flag::Smooth => "smooth",
            Flag::SmoothAltitude => "smooth-altitude",
            Flag::SmoothHarmonic => "smooth-harmonic",
            Flag::SmoothSpeed => "smooth-speed",
            Flag::SmoothTime => "smooth-time",
            Flag::InterpolateLinear => "interpolate-linear",
            Flag::Center => "center",
            Flag::NormalizeBearing => "normalize-bearing",
            Flag::KeepAltitude => "keep-altitude",
            Flag::Timestamp => "timestamp",
            Flag::TimestampOverwrite => "timestamp-overwrite",
            Flag::Utc => "utc",
            Flag::PreserveModificationTime => "preserve-modification-time",
            Flag::Speed => "speed",
            Flag::AreaInformation => "area-information",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pairs of flags that may not be set together.
pub const EXCLUSIVE_FLAGS: &[(Flag, Flag)] = &[
    (Flag::Center, Flag::InterpolateLinear),
    (Flag::Center, Flag::Smooth),
    (Flag::InterpolateLinear, Flag::Smooth),
];

/// `(flag, prerequisite)`: the first flag is only meaningful with the second.
pub const REQUIRED_FLAGS: &[(Flag, Flag)] = &[
    (Flag::SmoothAltitude, Flag::Smooth),
    (Flag::SmoothHarmonic, Flag::Smooth),
    (Flag::SmoothSpeed, Flag::Smooth),
    (Flag::SmoothTime, Flag::Smooth),
    (Flag::TimestampOverwrite, Flag::Timestamp),
];

/// Unit of a GPS speed value, as written in the EXIF `GPSSpeedRef` tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedUnit {
    #[default]
    KilometersPerHour,
    MilesPerHour,
    Knots,
}

impl SpeedUnit {
    pub fn from_ref_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'K' => Some(SpeedUnit::KilometersPerHour),
            'M' => Some(SpeedUnit::MilesPerHour),
            'N' => Some(SpeedUnit::Knots),
            _ => None,
        }
    }

    pub fn as_ref_char(&self) -> char {
        match self {
            SpeedUnit::KilometersPerHour => 'K',
            SpeedUnit::MilesPerHour => 'M',
            SpeedUnit::Knots => 'N',
        }
    }

    /// Convert a value in this unit to km/h.
    pub fn to_kmh(&self, value: f64) -> f64 {
        match self {
            SpeedUnit::KilometersPerHour => value,
            SpeedUnit::MilesPerHour => value * 1.609_344,
            SpeedUnit::Knots => value * 1.852,
        }
    }
}

/// A speed value with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Speed {
    pub value: f64,
    pub unit: SpeedUnit,
}

impl Speed {
    pub fn new(value: f64, unit: SpeedUnit) -> Self {
        Self { value, unit }
    }

    pub fn kmh(&self) -> f64 {
        self.unit.to_kmh(self.value)
    }
}

/// Reference of an image direction, as written in the EXIF `GPSImgDirectionRef` tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DirectionRef {
    #[default]
    TrueNorth,
    MagneticNorth,
}

impl DirectionRef {
    pub fn from_ref_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'T' => Some(DirectionRef::TrueNorth),
            'M' => Some(DirectionRef::MagneticNorth),
            _ => None,
        }
    }

    pub fn as_ref_char(&self) -> char {
        match self {
            DirectionRef::TrueNorth => 'T',
            DirectionRef::MagneticNorth => 'M',
        }
    }
}

/// Configuration of one sequencing run.
///
/// Build it with [`TransformationConfig::builder`] so flag combinations are
/// validated. [`Default`] gives the plain-invocation behaviour: smoothing over
/// the whole sequence followed by bearing normalization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransformationConfig {
    /// Replace each position with the mean of its smoothing window.
    /// Default: true
    pub smooth: bool,

    /// Also average altitudes over the smoothing window.
    pub smooth_altitude: bool,

    /// Request harmonic averaging. Accepted for compatibility; the arithmetic
    /// mean is used.
    pub smooth_harmonic: bool,

    /// Also average speeds over the smoothing window.
    pub smooth_speed: bool,

    /// Also average capture times over the smoothing window.
    pub smooth_time: bool,

    /// Smoothing window size. 0 means the whole sequence, values below 2
    /// disable smoothing, values above the sequence length are clamped.
    /// Default: 0
    pub nodes: i64,

    /// Space all positions evenly between the first and last photo.
    pub interpolate_linear: bool,

    /// Collapse all positions to their centroid and fan the headings out.
    pub center: bool,

    /// Heading of the first photo when centering, in degrees.
    /// Default: 0.0
    pub center_bearing: f64,

    /// Reference of the centering headings. Default: true north
    pub direction_ref: DirectionRef,

    /// Point every photo towards the next one. Default: true
    pub normalize_bearing: bool,

    /// Keep altitudes, filling missing ones with [`altitude`](Self::altitude).
    /// When false all altitudes are removed.
    pub keep_altitude: bool,

    /// Altitude in meters for photos without one. Negative is below sea level.
    /// Default: 0.0
    pub altitude: f64,

    /// Add a GPS time stamp where missing.
    pub timestamp: bool,

    /// Replace GPS time stamps with the file modification time.
    pub timestamp_overwrite: bool,

    /// Read EXIF date/time fields as UTC instead of local time.
    pub utc: bool,

    /// Ask the sink to keep the source modification time on written files.
    pub preserve_modification_time: bool,

    /// Fixed speed written to every photo.
    pub speed: Option<Speed>,

    /// Text written to the GPS area information field of every photo.
    pub area_information: Option<String>,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            smooth: true,
            normalize_bearing: true,
            ..Self::cleared()
        }
    }
}

impl TransformationConfig {
    /// Start building a configuration with every transformation switched off.
    pub fn builder() -> TransformationConfigBuilder {
        TransformationConfigBuilder { config: Self::cleared() }
    }

    fn cleared() -> Self {
        Self {
            smooth: false,
            smooth_altitude: false,
            smooth_harmonic: false,
            smooth_speed: false,
            smooth_time: false,
            nodes: 0,
            interpolate_linear: false,
            center: false,
            center_bearing: 0.0,
            direction_ref: DirectionRef::TrueNorth,
            normalize_bearing: false,
            keep_altitude: false,
            altitude: 0.0,
            timestamp: false,
            timestamp_overwrite: false,
            utc: false,
            preserve_modification_time: false,
            speed: None,
            area_information: None,
        }
    }

    /// Whether `flag` is switched on.
    pub fn is_set(&self, flag: Flag) -> bool {
        match flag {
            Flag::Smooth => self.smooth,
            Flag::SmoothAltitude => self.smooth_altitude,
            Flag::SmoothHarmonic => self.smooth_harmonic,
            Flag::SmoothSpeed => self.smooth_speed,
            Flag::SmoothTime => self.smooth_time,
            Flag::InterpolateLinear => self.interpolate_linear,
            Flag::Center => self.center,
            Flag::NormalizeBearing => self.normalize_bearing,
            Flag::KeepAltitude => self.keep_altitude,
            Flag::Timestamp => self.timestamp,
            Flag::TimestampOverwrite => self.timestamp_overwrite,
            Flag::Utc => self.utc,
            Flag::PreserveModificationTime => self.preserve_modification_time,
            Flag::Speed => self.speed.is_some(),
            Flag::AreaInformation => self.area_information.is_some(),
        }
    }

    /// Check the flag rule tables and numeric settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (first, second) in EXCLUSIVE_FLAGS {
            if self.is_set(*first) && self.is_set(*second) {
                return Err(ConfigError::MutuallyExclusive {
                    first: first.name(),
                    second: second.name(),
                });
            }
        }

        for (flag, requires) in REQUIRED_FLAGS {
            if self.is_set(*flag) && !self.is_set(*requires) {
                return Err(ConfigError::MissingRequirement {
                    flag: flag.name(),
                    requires: requires.name(),
                });
            }
        }

        if !self.altitude.is_finite() {
            return Err(ConfigError::invalid_argument(
                Flag::KeepAltitude.name(),
                self.altitude.to_string(),
                "altitude must be a finite number",
            ));
        }
        if !self.center_bearing.is_finite() {
            return Err(ConfigError::invalid_argument(
                Flag::Center.name(),
                self.center_bearing.to_string(),
                "bearing must be a finite number",
            ));
        }
        if let Some(speed) = &self.speed {
            if !speed.value.is_finite() || speed.value < 0.0 {
                return Err(ConfigError::invalid_argument(
                    Flag::Speed.name(),
                    speed.value.to_string(),
                    "speed must be a non-negative number",
                ));
            }
        }

        Ok(())
    }

    /// Smoothing window for a sequence of `len` photos, or `None` if smoothing
    /// is off or effectively disabled by a window below 2.
    pub fn effective_window(&self, len: usize) -> Option<usize> {
        if !self.smooth {
            return None;
        }

        let nodes = match self.nodes {
            0 => return Some(len),
            n if n < 0 => {
                warn!("Smoothing window {} is negative, using 0", n);
                0
            }
            n => n,
        };

        if nodes < 2 {
            warn!("Smoothing window {} is below 2, smoothing disabled", nodes);
            return None;
        }

        let nodes = usize::try_from(nodes).unwrap_or(usize::MAX);
        if nodes > len {
            warn!("Smoothing window {} exceeds sequence length, using {}", nodes, len);
            return Some(len);
        }

        Some(nodes)
    }
}

/// Builder for a validated [`TransformationConfig`].
///
/// # Example
/// ```
/// use photo_sequencer::{ConfigError, TransformationConfig};
///
/// let config = TransformationConfig::builder()
///     .smooth(5)
///     .normalize_bearing(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.nodes, 5);
///
/// let conflict = TransformationConfig::builder().smooth(5).interpolate_linear(true).build();
/// assert!(matches!(conflict, Err(ConfigError::MutuallyExclusive { .. })));
/// ```
#[derive(Debug, Clone)]
pub struct TransformationConfigBuilder {
    config: TransformationConfig,
}

impl TransformationConfigBuilder {
    /// Enable smoothing with the given window size (0 = whole sequence).
    pub fn smooth(mut self, nodes: i64) -> Self {
        self.config.smooth = true;
        self.config.nodes = nodes;
        self
    }

    pub fn smooth_altitude(mut self, on: bool) -> Self {
        self.config.smooth_altitude = on;
        self
    }

    pub fn smooth_harmonic(mut self, on: bool) -> Self {
        self.config.smooth_harmonic = on;
        self
    }

    pub fn smooth_speed(mut self, on: bool) -> Self {
        self.config.smooth_speed = on;
        self
    }

    pub fn smooth_time(mut self, on: bool) -> Self {
        self.config.smooth_time = on;
        self
    }

    pub fn interpolate_linear(mut self, on: bool) -> Self {
        self.config.interpolate_linear = on;
        self
    }

    /// Enable centering with the heading of the first photo.
    pub fn center(mut self, bearing: f64, direction_ref: DirectionRef) -> Self {
        self.config.center = true;
        self.config.center_bearing = bearing;
        self.config.direction_ref = direction_ref;
        self
    }

    pub fn normalize_bearing(mut self, on: bool) -> Self {
        self.config.normalize_bearing = on;
        self
    }

    /// Keep altitudes, filling missing ones with `altitude` meters.
    pub fn keep_altitude(mut self, altitude: f64) -> Self {
        self.config.keep_altitude = true;
        self.config.altitude = altitude;
        self
    }

    pub fn timestamp(mut self, on: bool) -> Self {
        self.config.timestamp = on;
        self
    }

    pub fn timestamp_overwrite(mut self, on: bool) -> Self {
        self.config.timestamp_overwrite = on;
        self
    }

    pub fn utc(mut self, on: bool) -> Self {
        self.config.utc = on;
        self
    }

    pub fn preserve_modification_time(mut self, on: bool) -> Self {
        self.config.preserve_modification_time = on;
        self
    }

    pub fn speed(mut self, speed: Speed) -> Self {
        self.config.speed = Some(speed);
        self
    }

    pub fn area_information(mut self, text: impl Into<String>) -> Self {
        self.config.area_information = Some(text.into());
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<TransformationConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Argument Parsing
// ============================================================================

/// Parse a smoothing window size.
pub fn parse_window(text: &str) -> Result<i64, ConfigError> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| ConfigError::invalid_argument(Flag::Smooth.name(), text, e))
}

/// Parse an altitude in meters.
pub fn parse_altitude(text: &str) -> Result<f64, ConfigError> {
    parse_number(Flag::KeepAltitude, text, text.trim())
}

/// Parse a centering heading with an optional `T` (true) or `M` (magnetic) suffix.
///
/// ```
/// use photo_sequencer::config::parse_bearing;
/// use photo_sequencer::DirectionRef;
///
/// assert_eq!(parse_bearing("45").unwrap(), (45.0, DirectionRef::TrueNorth));
/// assert_eq!(parse_bearing("12.5M").unwrap(), (12.5, DirectionRef::MagneticNorth));
/// assert!(parse_bearing("12X").is_err());
/// ```
pub fn parse_bearing(text: &str) -> Result<(f64, DirectionRef), ConfigError> {
    let (number, suffix) = split_unit_suffix(text);
    let direction_ref = match suffix {
        Some(c) => DirectionRef::from_ref_char(c).ok_or_else(|| {
            ConfigError::invalid_argument(Flag::Center.name(), text, "unknown direction reference, expected T or M")
        })?,
        None => DirectionRef::TrueNorth,
    };
    Ok((parse_number(Flag::Center, text, number)?, direction_ref))
}

/// Parse a speed with an optional `K` (km/h), `M` (mph) or `N` (knots) suffix.
///
/// ```
/// use photo_sequencer::config::parse_speed;
/// use photo_sequencer::SpeedUnit;
///
/// let speed = parse_speed("30N").unwrap();
/// assert_eq!(speed.unit, SpeedUnit::Knots);
/// assert_eq!(speed.value, 30.0);
/// ```
pub fn parse_speed(text: &str) -> Result<Speed, ConfigError> {
    let (number, suffix) = split_unit_suffix(text);
    let unit = match suffix {
        Some(c) => SpeedUnit::from_ref_char(c).ok_or_else(|| {
            ConfigError::invalid_argument(Flag::Speed.name(), text, "unknown speed unit, expected K, M or N")
        })?,
        None => SpeedUnit::KilometersPerHour,
    };
    let value = parse_number(Flag::Speed, text, number)?;
    if value < 0.0 {
        return Err(ConfigError::invalid_argument(Flag::Speed.name(), text, "speed cannot be negative"));
    }
    Ok(Speed::new(value, unit))
}

fn split_unit_suffix(text: &str) -> (&str, Option<char>) {
    let trimmed = text.trim();
    match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (trimmed[..trimmed.len() - 1].trim_end(), Some(c)),
        _ => (trimmed, None),
    }
}

fn parse_number(flag: Flag, raw: &str, number: &str) -> Result<f64, ConfigError> {
    let value = number
        .parse::<f64>()
        .map_err(|e| ConfigError::invalid_argument(flag.name(), raw, e))?;
    if !value.is_finite() {
        return Err(ConfigError::invalid_argument(flag.name(), raw, "not a finite number"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_smooths_and_normalizes() {
        let config = TransformationConfig::default();
        assert!(config.smooth);
        assert!(config.normalize_bearing);
        assert!(!config.center);
        assert_eq!(config.nodes, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_starts_cleared() {
        let config = TransformationConfig::builder().build().unwrap();
        assert!(!config.smooth);
        assert!(!config.normalize_bearing);
    }

    #[test]
    fn test_every_exclusive_pair_is_rejected() {
        let center = || TransformationConfig::builder().center(0.0, DirectionRef::TrueNorth);
        let cases = [
            center().interpolate_linear(true).build(),
            center().smooth(3).build(),
            TransformationConfig::builder().interpolate_linear(true).smooth(3).build(),
        ];
        for result in cases {
            assert!(matches!(result, Err(ConfigError::MutuallyExclusive { .. })));
        }
    }

    #[test]
    fn test_exclusive_error_names_both_flags() {
        let err = TransformationConfig::builder()
            .smooth(3)
            .center(0.0, DirectionRef::TrueNorth)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MutuallyExclusive { first: "center", second: "smooth" });
    }

    #[test]
    fn test_sub_options_require_parent() {
        let err = TransformationConfig::builder().smooth_altitude(true).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingRequirement { flag: "smooth-altitude", requires: "smooth" });

        let err = TransformationConfig::builder().timestamp_overwrite(true).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingRequirement { flag: "timestamp-overwrite", requires: "timestamp" });

        assert!(TransformationConfig::builder().smooth(3).smooth_time(true).build().is_ok());
    }

    #[test]
    fn test_negative_speed_rejected_at_build() {
        let result = TransformationConfig::builder()
            .speed(Speed::new(-5.0, SpeedUnit::Knots))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidArgument { flag: "speed", .. })));
    }

    #[test]
    fn test_effective_window() {
        let with_nodes = |nodes| TransformationConfig::builder().smooth(nodes).build().unwrap();
        assert_eq!(with_nodes(0).effective_window(7), Some(7));
        assert_eq!(with_nodes(3).effective_window(7), Some(3));
        assert_eq!(with_nodes(9).effective_window(7), Some(7));
        assert_eq!(with_nodes(1).effective_window(7), None);
        assert_eq!(with_nodes(-4).effective_window(7), None);
        assert_eq!(TransformationConfig::builder().build().unwrap().effective_window(7), None);
    }

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window(" 5 ").unwrap(), 5);
        assert_eq!(parse_window("-2").unwrap(), -2);
        let err = parse_window("five").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument { flag: "smooth", ref value, .. } if value == "five"));
    }

    #[test]
    fn test_parse_altitude() {
        assert_eq!(parse_altitude("-12.5").unwrap(), -12.5);
        assert!(parse_altitude("sea level").is_err());
        assert!(parse_altitude("inf").is_err());
    }

    #[test]
    fn test_parse_bearing() {
        assert_eq!(parse_bearing("90").unwrap(), (90.0, DirectionRef::TrueNorth));
        assert_eq!(parse_bearing("90t").unwrap(), (90.0, DirectionRef::TrueNorth));
        assert_eq!(parse_bearing(" 270 M ").unwrap(), (270.0, DirectionRef::MagneticNorth));
        let err = parse_bearing("north").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument { flag: "center", .. }));
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("12").unwrap(), Speed::new(12.0, SpeedUnit::KilometersPerHour));
        assert_eq!(parse_speed("12m").unwrap(), Speed::new(12.0, SpeedUnit::MilesPerHour));
        assert!(parse_speed("12Q").is_err());
        assert!(parse_speed("-3K").is_err());
        assert!(parse_speed("K").is_err());
    }

    #[test]
    fn test_speed_conversion() {
        assert!((Speed::new(10.0, SpeedUnit::Knots).kmh() - 18.52).abs() < 1e-9);
        assert!((Speed::new(10.0, SpeedUnit::MilesPerHour).kmh() - 16.09344).abs() < 1e-9);
        assert_eq!(Speed::new(10.0, SpeedUnit::KilometersPerHour).kmh(), 10.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_from_partial_json() {
        let config: TransformationConfig =
            serde_json::from_str(r#"{ "smooth": false, "interpolate_linear": true }"#).unwrap();
        assert!(config.interpolate_linear);
        assert!(config.normalize_bearing);
        assert!(config.validate().is_ok());
    }
}
