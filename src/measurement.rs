//! Turns raw annotation geometry into clinical measurements.
//!
//! Extraction is a pure read over an [`AnnotationMap`] snapshot: it never touches the
//! store, and running it twice on the same snapshot yields the same records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationRecord;
use crate::config::LengthUnitPolicy;
use crate::document::AnnotationMap;
use crate::error::AnnotationError;
use crate::geometry::{
    self, Bounds, acute_angle_between, angle_between, direction, distance, round2,
};
use crate::image::PixelSpacing;
use crate::tools::ToolKind;

/// Unit attached to a measurement value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "mm")]
    Millimetres,
    #[serde(rename = "px")]
    Pixels,
    #[serde(rename = "degrees")]
    Degrees,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Millimetres => "mm",
            Self::Pixels => "px",
            Self::Degrees => "degrees",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A derived measurement value, rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    #[serde(rename = "type")]
    pub kind: ToolKind,
    #[serde(with = "fixed2")]
    pub value: f64,
    pub unit: Unit,
}

impl fmt::Display for MeasurementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2} {}", self.kind, self.value, self.unit)
    }
}

/// Values travel as fixed two-decimal strings ("5.00"), the format existing exports use
mod fixed2 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:.2}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let text = String::deserialize(deserializer)?;
        let value: f64 = text.parse().map_err(de::Error::custom)?;
        if !value.is_finite() {
            return Err(de::Error::custom(format!("non-finite measurement value {text:?}")));
        }
        Ok(value)
    }
}

/// Inputs extraction takes from the image context and session config
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionContext {
    pub spacing: Option<PixelSpacing>,
    pub length_units: LengthUnitPolicy,
}

/// A record left out of the output, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAnnotation {
    pub record: uuid::Uuid,
    pub error: AnnotationError,
}

/// Result of one extraction pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<MeasurementRecord>,
    pub skipped: Vec<SkippedAnnotation>,
}

/// Convert every complete annotation into a measurement.
///
/// Records are emitted tool by tool (Length, Angle, Cobb angle), each in store order.
/// Incomplete or degenerate annotations are reported in `skipped` and never abort the pass.
pub fn extract(annotations: &AnnotationMap, ctx: &ExtractionContext) -> Extraction {
    let mut extraction = Extraction::default();

    for kind in ToolKind::ALL {
        let Some(records) = annotations.get(&kind) else {
            continue;
        };
        for record in records {
            match measure(record, ctx) {
                Ok(measurement) => extraction.records.push(measurement),
                Err(error) => {
                    log::warn!("Skipping annotation {}: {}", record.id(), error);
                    extraction.skipped.push(SkippedAnnotation {
                        record: record.id(),
                        error,
                    });
                }
            }
        }
    }

    extraction
}

/// Measure a single annotation
pub fn measure(
    record: &AnnotationRecord,
    ctx: &ExtractionContext,
) -> Result<MeasurementRecord, AnnotationError> {
    let kind = record.kind();
    // Records built outside the store have not been range-checked
    geometry::validate_points(record.points(), Bounds::Limit(f32::MAX))?;

    let segment_direction = |from, to, segment| {
        direction(from, to, ctx.spacing)
            .ok_or(AnnotationError::DegenerateSegment { kind, segment })
    };

    let (value, unit) = match kind {
        ToolKind::Length => {
            let [a, b] = record.complete_points::<2>()?;
            let unit = match (ctx.spacing, ctx.length_units) {
                (Some(_), _) | (None, LengthUnitPolicy::LegacyMillimetres) => Unit::Millimetres,
                (None, LengthUnitPolicy::Distinct) => Unit::Pixels,
            };
            (distance(a, b, ctx.spacing), unit)
        }
        ToolKind::Angle => {
            let [start, vertex, end] = record.complete_points::<3>()?;
            let u = segment_direction(vertex, start, 0)?;
            let v = segment_direction(vertex, end, 1)?;
            (angle_between(u, v), Unit::Degrees)
        }
        ToolKind::CobbAngle => {
            // Endplate lines are undirected, so the drawing direction must not matter
            let [a0, a1, b0, b1] = record.complete_points::<4>()?;
            let u = segment_direction(a0, a1, 0)?;
            let v = segment_direction(b0, b1, 1)?;
            (acute_angle_between(u, v), Unit::Degrees)
        }
    };

    let value = round2(value);
    if !value.is_finite() {
        return Err(AnnotationError::NonFiniteMeasurement { kind });
    }

    Ok(MeasurementRecord {
        kind,
        value,
        unit,
    })
}
