use egui::Pos2;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AnnotationError;
use crate::image::ImageId;
use crate::tools::ToolKind;

/// Raw geometry of one drawn annotation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    id: Uuid,
    image: ImageId,
    kind: ToolKind,
    points: Vec<Pos2>,
}

// Records are shared between the store and extraction snapshots
pub type AnnotationRef = Arc<AnnotationRecord>;

impl AnnotationRecord {
    pub fn new(image: ImageId, kind: ToolKind, points: Vec<Pos2>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            kind,
            points,
        }
    }

    pub fn new_ref(image: ImageId, kind: ToolKind, points: Vec<Pos2>) -> AnnotationRef {
        Arc::new(Self::new(image, kind, points))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn image(&self) -> ImageId {
        self.image
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn is_complete(&self) -> bool {
        self.points.len() == self.kind.arity()
    }

    /// The points as a fixed-size array, if the arity matches
    pub(crate) fn complete_points<const N: usize>(&self) -> Result<[Pos2; N], AnnotationError> {
        <[Pos2; N]>::try_from(self.points.as_slice()).map_err(|_| {
            AnnotationError::IncompleteAnnotation {
                kind: self.kind,
                expected: self.kind.arity(),
                actual: self.points.len(),
            }
        })
    }
}
