use std::fmt;

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Bounds;

/// Opaque identifier of a loaded image; pixel data is owned by the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Physical size of one pixel, in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelSpacing {
    /// Distance between adjacent rows (vertical)
    pub row_mm: f64,
    /// Distance between adjacent columns (horizontal)
    pub column_mm: f64,
}

impl PixelSpacing {
    pub fn isotropic(mm: f64) -> Self {
        Self { row_mm: mm, column_mm: mm }
    }

    pub fn is_valid(&self) -> bool {
        self.row_mm.is_finite() && self.column_mm.is_finite() && self.row_mm > 0.0 && self.column_mm > 0.0
    }
}

/// How the image bytes reached the viewer
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Medical image container, handed to the external container parser
    Dicom { bytes_len: usize },
    /// Generic raster image embedded as a base64 data reference
    Raster {
        format: image::ImageFormat,
        data_url: String,
    },
}

/// What the measurement core knows about the active image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageContext {
    id: ImageId,
    source: ImageSource,
    size: Option<Vec2>,
    spacing: Option<PixelSpacing>,
}

impl ImageContext {
    pub fn new(id: ImageId, source: ImageSource) -> Self {
        Self {
            id,
            source,
            size: None,
            spacing: None,
        }
    }

    /// Pixel dimensions reported by the viewer once decoded
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some(Vec2::new(width, height));
        self
    }

    /// Ignored unless both spacings are positive and finite
    pub fn with_spacing(mut self, spacing: PixelSpacing) -> Self {
        if spacing.is_valid() {
            self.spacing = Some(spacing);
        } else {
            log::warn!("Ignoring invalid pixel spacing {:?} for image {}", spacing, self.id);
        }
        self
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn size(&self) -> Option<Vec2> {
        self.size
    }

    pub fn spacing(&self) -> Option<PixelSpacing> {
        self.spacing
    }

    pub fn rect(&self) -> Option<Rect> {
        self.size.map(|size| Rect::from_min_size(Pos2::ZERO, size))
    }

    pub(crate) fn bounds(&self, coordinate_limit: f32) -> Bounds {
        self.rect().map_or(Bounds::Limit(coordinate_limit), Bounds::Image)
    }
}
