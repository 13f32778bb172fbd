use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use photo_sequencer::{
    DirectionRef, GeoPoint, MetadataError, MetadataSink, MetadataSource, Mode, RawMetadata, SequenceError,
    SequenceRecord, Sequencer, TimestampCandidates, TransformationConfig,
};

struct MemorySource {
    photos: HashMap<String, RawMetadata>,
}

impl MemorySource {
    fn new(photos: &[(&str, u32, (f64, f64))]) -> Self {
        let photos = photos
            .iter()
            .map(|(id, second, (lat, lng))| {
                let metadata = RawMetadata {
                    point: Some(GeoPoint::new(*lat, *lng)),
                    altitude: Some(250.0),
                    timestamps: TimestampCandidates {
                        date_time_original: Some(format!("2016:05:21 10:00:{:02}", second)),
                        modified: modified_at(*second),
                        ..TimestampCandidates::default()
                    },
                    ..RawMetadata::default()
                };
                (id.to_string(), metadata)
            })
            .collect();
        Self { photos }
    }
}

impl MetadataSource for MemorySource {
    fn read(&self, id: &str) -> Result<RawMetadata, MetadataError> {
        self.photos
            .get(id)
            .cloned()
            .ok_or_else(|| MetadataError::new("unsupported file format"))
    }
}

#[derive(Default)]
struct RecordingSink {
    written: Vec<SequenceRecord>,
    preserved: Vec<(String, DateTime<Utc>)>,
    fail_on: Option<String>,
    calls: usize,
}

impl MetadataSink for RecordingSink {
    fn write(&mut self, record: &SequenceRecord) -> Result<(), MetadataError> {
        self.calls += 1;
        if self.fail_on.as_deref() == Some(record.id.as_str()) {
            return Err(MetadataError::new("read-only file system"));
        }
        self.written.push(record.clone());
        Ok(())
    }

    fn preserve_modified(&mut self, id: &str, modified: DateTime<Utc>) -> Result<(), MetadataError> {
        self.preserved.push((id.to_string(), modified));
        Ok(())
    }
}

fn modified_at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 6, 1, 12, 0, second).unwrap()
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn due_east() -> MemorySource {
    MemorySource::new(&[("a.jpg", 0, (0.0, 0.0)), ("b.jpg", 10, (0.0, 10.0)), ("c.jpg", 20, (0.0, 20.0))])
}

fn bearing_config() -> TransformationConfig {
    TransformationConfig::builder()
        .normalize_bearing(true)
        .utc(true)
        .build()
        .unwrap()
}

#[test]
fn run_orders_by_capture_time_and_points_along_path() {
    let mut sink = RecordingSink::default();
    let summary = Sequencer::new(&bearing_config())
        .run(&ids(&["c.jpg", "a.jpg", "b.jpg"]), &due_east(), &mut sink)
        .unwrap();

    let order: Vec<&str> = sink.written.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(order, vec!["a.jpg", "b.jpg", "c.jpg"]);

    for record in &sink.written {
        let bearing = record.bearing.unwrap();
        assert!((bearing - 90.0).abs() < 1e-9, "{}: {}", record.id, bearing);
        assert_eq!(record.point.altitude, None);
    }

    assert_eq!(summary.records, 3);
    assert_eq!(summary.mode, Mode::Path);
    // 20 degrees of longitude along the equator
    assert!(summary.path_length > 2.2e6 && summary.path_length < 2.25e6);
    assert!(sink.preserved.is_empty());
}

#[test]
fn run_with_default_config_smooths_whole_sequence() {
    let mut sink = RecordingSink::default();
    let config = TransformationConfig {
        utc: true,
        ..TransformationConfig::default()
    };
    Sequencer::new(&config)
        .run(&ids(&["a.jpg", "b.jpg", "c.jpg"]), &due_east(), &mut sink)
        .unwrap();

    let lngs: Vec<f64> = sink.written.iter().map(|r| r.point.longitude).collect();
    assert!((lngs[0] - 0.0).abs() < 1e-9);
    assert!((lngs[1] - 10.0).abs() < 1e-9);
    assert!((lngs[2] - 20.0).abs() < 1e-9);
}

#[test]
fn unreadable_photo_aborts_before_writing() {
    let mut sink = RecordingSink::default();
    let result = Sequencer::new(&bearing_config()).run(&ids(&["a.jpg", "broken.jpg", "b.jpg"]), &due_east(), &mut sink);

    let err = result.unwrap_err();
    assert!(matches!(err, SequenceError::MetadataRead { .. }));
    assert_eq!(err.record_id(), Some("broken.jpg"));
    assert_eq!(sink.calls, 0);
}

#[test]
fn corrupt_position_aborts_before_writing() {
    let mut source = due_east();
    if let Some(metadata) = source.photos.get_mut("b.jpg") {
        metadata.point = Some(GeoPoint::new(f64::NAN, 1.0));
    }
    let config = TransformationConfig {
        utc: true,
        ..TransformationConfig::default()
    };
    let mut sink = RecordingSink::default();
    let result = Sequencer::new(&config).run(&ids(&["a.jpg", "b.jpg", "c.jpg"]), &source, &mut sink);

    let err = result.unwrap_err();
    assert!(matches!(err, SequenceError::MetadataRead { .. }));
    assert_eq!(err.record_id(), Some("b.jpg"));
    assert_eq!(sink.calls, 0);
}

#[test]
fn write_failure_keeps_earlier_photos() {
    let mut sink = RecordingSink {
        fail_on: Some("b.jpg".to_string()),
        ..RecordingSink::default()
    };
    let result = Sequencer::new(&bearing_config()).run(&ids(&["a.jpg", "b.jpg", "c.jpg"]), &due_east(), &mut sink);

    let err = result.unwrap_err();
    assert!(matches!(err, SequenceError::MetadataWrite { .. }));
    assert_eq!(err.record_id(), Some("b.jpg"));
    assert_eq!(sink.written.len(), 1);
    assert_eq!(sink.written[0].id, "a.jpg");
    assert_eq!(sink.calls, 2);
}

#[test]
fn modification_times_are_preserved_when_asked() {
    let config = TransformationConfig::builder()
        .preserve_modification_time(true)
        .utc(true)
        .build()
        .unwrap();
    let mut sink = RecordingSink::default();
    Sequencer::new(&config)
        .run(&ids(&["b.jpg", "a.jpg"]), &due_east(), &mut sink)
        .unwrap();

    assert_eq!(
        sink.preserved,
        vec![("a.jpg".to_string(), modified_at(0)), ("b.jpg".to_string(), modified_at(10))]
    );
}

#[test]
fn timestamps_are_synthesized_from_capture_time() {
    let config = TransformationConfig::builder()
        .timestamp(true)
        .utc(true)
        .keep_altitude(0.0)
        .build()
        .unwrap();
    let mut sink = RecordingSink::default();
    Sequencer::new(&config)
        .run(&ids(&["a.jpg", "b.jpg"]), &due_east(), &mut sink)
        .unwrap();

    let expected = Utc.with_ymd_and_hms(2016, 5, 21, 10, 0, 10).unwrap();
    assert_eq!(sink.written[1].gps_timestamp, Some(expected));
    assert_eq!(sink.written[1].point.altitude, Some(250.0));
}

#[test]
fn centering_builds_panorama() {
    let source = MemorySource::new(&[
        ("n.jpg", 0, (1.0, 0.0)),
        ("e.jpg", 1, (0.0, 1.0)),
        ("s.jpg", 2, (-1.0, 0.0)),
        ("w.jpg", 3, (0.0, -1.0)),
    ]);
    let config = TransformationConfig::builder()
        .center(45.0, DirectionRef::MagneticNorth)
        .utc(true)
        .build()
        .unwrap();
    let mut sink = RecordingSink::default();
    let summary = Sequencer::new(&config)
        .run(&ids(&["w.jpg", "s.jpg", "e.jpg", "n.jpg"]), &source, &mut sink)
        .unwrap();

    assert_eq!(summary.mode, Mode::Centered);
    assert_eq!(summary.path_length, 0.0);
    let bearings: Vec<f64> = sink.written.iter().map(|r| r.bearing.unwrap()).collect();
    assert_eq!(bearings, vec![45.0, 135.0, 225.0, 315.0]);
    for record in &sink.written {
        assert!(record.point.latitude.abs() < 1e-12 && record.point.longitude.abs() < 1e-12);
        assert_eq!(record.direction_ref, DirectionRef::MagneticNorth);
    }
}

#[test]
fn conflicting_config_is_rejected_before_reading() {
    let config = TransformationConfig {
        interpolate_linear: true,
        ..TransformationConfig::default()
    };
    let mut sink = RecordingSink::default();
    let result = Sequencer::new(&config).run(&ids(&["missing.jpg"]), &due_east(), &mut sink);

    assert!(matches!(result, Err(SequenceError::Config(_))));
    assert_eq!(sink.calls, 0);
}
