use std::fmt;
use std::str::FromStr;

use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// The closed set of measurement tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolKind {
    Length,
    Angle,
    #[serde(rename = "Cobb Angle")]
    CobbAngle,
}

impl ToolKind {
    /// All tools, in the order measurements are reported
    pub const ALL: [ToolKind; 3] = [ToolKind::Length, ToolKind::Angle, ToolKind::CobbAngle];

    /// Name the capture library registers the tool under
    pub fn name(self) -> &'static str {
        match self {
            Self::Length => "Length",
            Self::Angle => "Angle",
            Self::CobbAngle => "CobbAngle",
        }
    }

    /// Human-readable label, also used as the exported `type` field
    pub fn label(self) -> &'static str {
        match self {
            Self::Length => "Length",
            Self::Angle => "Angle",
            Self::CobbAngle => "Cobb Angle",
        }
    }

    /// Number of points a complete annotation of this kind holds.
    ///
    /// Angle annotations are `[arm_end, vertex, arm_end]`; Cobb annotations are two
    /// independent segments `[a0, a1, b0, b1]`.
    pub fn arity(self) -> usize {
        match self {
            Self::Length => 2,
            Self::Angle => 3,
            Self::CobbAngle => 4,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ToolKind {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Length" => Ok(Self::Length),
            "Angle" => Ok(Self::Angle),
            "CobbAngle" | "Cobb Angle" => Ok(Self::CobbAngle),
            other => Err(ToolError::UnknownTool(other.to_owned())),
        }
    }
}

/// Boundary to the external annotation capture library.
///
/// The library owns gesture handling and handle rendering; this crate only tells it
/// which tools exist, which one receives gestures, and reads back raw geometry.
pub trait AnnotationCapture {
    /// Make the given tools available for capture
    fn register_tools(&mut self, tools: &[ToolKind]);

    /// Route subsequent primary-button gestures to `tool`
    fn route_gestures_to(&mut self, tool: ToolKind);

    /// Stop routing gestures to `tool`
    fn release(&mut self, _tool: ToolKind) {
        // default: the library switches tools implicitly
    }

    /// Raw point sets currently captured for `tool`, one entry per drawn annotation
    fn captured(&self, tool: ToolKind) -> Vec<Vec<Pos2>>;
}
