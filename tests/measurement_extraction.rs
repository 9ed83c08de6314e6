use egui::Pos2;
use proptest::prelude::*;
use spine_measure::measurement::{self, SkippedAnnotation};
use spine_measure::{
    AnnotationError, AnnotationMap, AnnotationRecord, ExportCodec, ExportConfig, ExtractionContext,
    ImageId, LengthUnitPolicy, MeasurementRecord, PixelSpacing, ToolKind, Unit,
};

fn record(kind: ToolKind, points: &[(f32, f32)]) -> AnnotationRecord {
    let points = points.iter().map(|&(x, y)| Pos2::new(x, y)).collect();
    AnnotationRecord::new(ImageId::new(), kind, points)
}

fn mm_context() -> ExtractionContext {
    ExtractionContext {
        spacing: Some(PixelSpacing::isotropic(1.0)),
        length_units: LengthUnitPolicy::Distinct,
    }
}

fn map(records: Vec<AnnotationRecord>) -> AnnotationMap {
    let mut map = AnnotationMap::new();
    for record in records {
        map.entry(record.kind()).or_default().push(record.into());
    }
    map
}

#[test]
fn test_length_is_euclidean_distance() {
    let length = measurement::measure(&record(ToolKind::Length, &[(0.0, 0.0), (3.0, 4.0)]), &mm_context()).unwrap();
    assert_eq!(
        length,
        MeasurementRecord {
            kind: ToolKind::Length,
            value: 5.0,
            unit: Unit::Millimetres
        }
    );
    assert_eq!(length.to_string(), "Length: 5.00 mm");
}

#[test]
fn test_length_applies_pixel_spacing() {
    let ctx = ExtractionContext {
        spacing: Some(PixelSpacing::isotropic(0.25)),
        ..mm_context()
    };
    let length = measurement::measure(&record(ToolKind::Length, &[(0.0, 0.0), (30.0, 40.0)]), &ctx).unwrap();
    assert_eq!(length.value, 12.5);
    assert_eq!(length.unit, Unit::Millimetres);
}

#[test]
fn test_length_without_spacing_unit_policy() {
    let segment = record(ToolKind::Length, &[(0.0, 0.0), (3.0, 4.0)]);

    let distinct = measurement::measure(&segment, &ExtractionContext::default()).unwrap();
    assert_eq!((distinct.value, distinct.unit), (5.0, Unit::Pixels));

    let legacy = ExtractionContext {
        spacing: None,
        length_units: LengthUnitPolicy::LegacyMillimetres,
    };
    let legacy = measurement::measure(&segment, &legacy).unwrap();
    assert_eq!((legacy.value, legacy.unit), (5.0, Unit::Millimetres));
}

#[test]
fn test_right_angle() {
    // arm, vertex, arm
    let angle = record(ToolKind::Angle, &[(1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
    let measured = measurement::measure(&angle, &mm_context()).unwrap();
    assert_eq!(measured.value, 90.0);
    assert_eq!(measured.unit, Unit::Degrees);
    assert_eq!(measured.to_string(), "Angle: 90.00 degrees");
}

#[test]
fn test_angle_is_rounded_to_two_decimals() {
    let angle = record(ToolKind::Angle, &[(1.0, 0.0), (0.0, 0.0), (1.0, 1.0)]);
    assert_eq!(measurement::measure(&angle, &mm_context()).unwrap().value, 45.0);

    let angle = record(ToolKind::Angle, &[(3.0, 0.0), (0.0, 0.0), (1.0, 2.0)]);
    // atan2(2, 1) = 63.4349...
    assert_eq!(measurement::measure(&angle, &mm_context()).unwrap().value, 63.43);
}

#[test]
fn test_cobb_angle_of_parallel_segments_is_zero() {
    let cobb = record(ToolKind::CobbAngle, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]);
    let measured = measurement::measure(&cobb, &mm_context()).unwrap();
    assert_eq!(measured.value, 0.0);
    assert_eq!(measured.unit, Unit::Degrees);
    assert!(measured.value.is_sign_positive());
}

#[test]
fn test_cobb_angle_between_tilted_endplates() {
    let cobb = record(ToolKind::CobbAngle, &[(0.0, 0.0), (10.0, 0.0), (0.0, 50.0), (10.0, 60.0)]);
    assert_eq!(measurement::measure(&cobb, &mm_context()).unwrap().value, 45.0);

    // The same lines drawn in the opposite direction
    let reversed = record(ToolKind::CobbAngle, &[(10.0, 0.0), (0.0, 0.0), (0.0, 50.0), (10.0, 60.0)]);
    assert_eq!(measurement::measure(&reversed, &mm_context()).unwrap().value, 45.0);
}

#[test]
fn test_cobb_angle_of_opposed_parallel_segments_is_zero() {
    let cobb = record(ToolKind::CobbAngle, &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
    assert_eq!(measurement::measure(&cobb, &mm_context()).unwrap().value, 0.0);
}

#[test]
fn test_angles_follow_anisotropic_spacing() {
    let ctx = ExtractionContext {
        spacing: Some(PixelSpacing { row_mm: 1.0, column_mm: 2.0 }),
        ..mm_context()
    };
    // Arms (1, 0) and (1, 1) are (2, 0) and (2, 1) mm; atan(0.5) = 26.565...
    let angle = record(ToolKind::Angle, &[(1.0, 0.0), (0.0, 0.0), (1.0, 1.0)]);
    assert_eq!(measurement::measure(&angle, &ctx).unwrap().value, 26.57);

    let ctx = ExtractionContext {
        spacing: Some(PixelSpacing { row_mm: 2.0, column_mm: 1.0 }),
        ..mm_context()
    };
    // The diagonal becomes (1, 2) mm; atan(2) = 63.434...
    let cobb = record(ToolKind::CobbAngle, &[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0), (1.0, 1.0)]);
    assert_eq!(measurement::measure(&cobb, &ctx).unwrap().value, 63.43);
}

#[test]
fn test_non_finite_geometry_is_skipped_and_export_round_trips() {
    let infinite = record(ToolKind::Length, &[(0.0, 0.0), (f32::INFINITY, 0.0)]);
    let infinite_id = infinite.id();
    let annotations = map(vec![infinite, record(ToolKind::Length, &[(0.0, 0.0), (3.0, 4.0)])]);

    let extraction = measurement::extract(&annotations, &mm_context());

    assert_eq!(extraction.records.len(), 1);
    assert_eq!(extraction.skipped.len(), 1);
    assert_eq!(extraction.skipped[0].record, infinite_id);
    assert!(matches!(
        extraction.skipped[0].error,
        AnnotationError::InvalidGeometry { index: 1, reason: "is not finite", .. }
    ));

    let codec = ExportCodec::new(&ExportConfig {
        kdf_iterations: 16,
        ..ExportConfig::default()
    });
    let payload = codec.export(&extraction.records, "passphrase").unwrap();
    assert_eq!(codec.decode(&payload, "passphrase").unwrap(), extraction.records);
}

#[test]
fn test_overflowing_length_is_rejected() {
    let ctx = ExtractionContext {
        spacing: Some(PixelSpacing::isotropic(1.0e300)),
        ..mm_context()
    };
    let long = record(ToolKind::Length, &[(-f32::MAX, 0.0), (f32::MAX, 0.0)]);
    assert_eq!(
        measurement::measure(&long, &ctx),
        Err(AnnotationError::NonFiniteMeasurement { kind: ToolKind::Length })
    );
}

#[test]
fn test_incomplete_annotation_is_skipped_without_aborting() {
    let short = record(ToolKind::Length, &[(0.0, 0.0)]);
    let short_id = short.id();
    let annotations = map(vec![
        short,
        record(ToolKind::Length, &[(0.0, 0.0), (3.0, 4.0)]),
        record(ToolKind::Angle, &[(1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]),
    ]);

    let extraction = measurement::extract(&annotations, &mm_context());

    assert_eq!(extraction.records.len(), 2);
    assert_eq!(
        extraction.skipped,
        vec![SkippedAnnotation {
            record: short_id,
            error: AnnotationError::IncompleteAnnotation {
                kind: ToolKind::Length,
                expected: 2,
                actual: 1,
            },
        }]
    );
}

#[test]
fn test_too_many_points_is_incomplete() {
    let extra = record(ToolKind::CobbAngle, &[(0.0, 0.0); 5]);
    assert!(matches!(
        measurement::measure(&extra, &mm_context()),
        Err(AnnotationError::IncompleteAnnotation { expected: 4, actual: 5, .. })
    ));
}

#[test]
fn test_degenerate_segment_is_skipped() {
    let annotations = map(vec![
        record(ToolKind::Angle, &[(0.0, 0.0), (0.0, 0.0), (0.0, 1.0)]),
        record(ToolKind::CobbAngle, &[(0.0, 0.0), (1.0, 0.0), (2.0, 2.0), (2.0, 2.0)]),
    ]);

    let extraction = measurement::extract(&annotations, &mm_context());

    assert!(extraction.records.is_empty());
    let errors: Vec<_> = extraction.skipped.iter().map(|s| s.error.clone()).collect();
    assert_eq!(
        errors,
        vec![
            AnnotationError::DegenerateSegment { kind: ToolKind::Angle, segment: 0 },
            AnnotationError::DegenerateSegment { kind: ToolKind::CobbAngle, segment: 1 },
        ]
    );
}

#[test]
fn test_output_is_grouped_by_tool() {
    let annotations = map(vec![
        record(ToolKind::CobbAngle, &[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
        record(ToolKind::Angle, &[(1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]),
        record(ToolKind::Length, &[(0.0, 0.0), (0.0, 2.0)]),
        record(ToolKind::Length, &[(0.0, 0.0), (0.0, 1.0)]),
    ]);

    let kinds: Vec<_> = measurement::extract(&annotations, &mm_context())
        .records
        .iter()
        .map(|r| (r.kind, r.value))
        .collect();

    assert_eq!(
        kinds,
        vec![
            (ToolKind::Length, 2.0),
            (ToolKind::Length, 1.0),
            (ToolKind::Angle, 90.0),
            (ToolKind::CobbAngle, 0.0),
        ]
    );
}

fn arb_point() -> impl Strategy<Value = (f32, f32)> {
    (-1000.0f32..1000.0, -1000.0f32..1000.0)
}

fn arb_record() -> impl Strategy<Value = AnnotationRecord> {
    (0usize..3, proptest::collection::vec(arb_point(), 0..6)).prop_map(|(kind, points)| {
        record(ToolKind::ALL[kind], &points)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: extraction is pure, so repeated passes agree
    #[test]
    fn prop_extract_is_idempotent(records in proptest::collection::vec(arb_record(), 0..12)) {
        let annotations = map(records);
        let first = measurement::extract(&annotations, &mm_context());
        let second = measurement::extract(&annotations, &mm_context());
        prop_assert_eq!(first, second);
    }

    /// Property: every record is either measured or skipped, and values are finite with two decimals
    #[test]
    fn prop_every_record_accounted_for(records in proptest::collection::vec(arb_record(), 0..12)) {
        let total = records.len();
        let extraction = measurement::extract(&map(records), &mm_context());
        prop_assert_eq!(extraction.records.len() + extraction.skipped.len(), total);
        for r in &extraction.records {
            prop_assert!(r.value.is_finite());
            prop_assert!(r.value >= 0.0);
            prop_assert!(((r.value * 100.0).round() - r.value * 100.0).abs() < 1e-6);
            match r.kind {
                ToolKind::Length => {}
                ToolKind::Angle => prop_assert!(r.value <= 180.0),
                ToolKind::CobbAngle => prop_assert!(r.value <= 90.0),
            }
        }
    }
}
