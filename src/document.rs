use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use egui::Pos2;
use parking_lot::RwLock;

use crate::annotation::{AnnotationRecord, AnnotationRef};
use crate::error::AnnotationError;
use crate::geometry::{self, DEFAULT_COORDINATE_LIMIT};
use crate::image::{ImageContext, ImageId};
use crate::tools::ToolKind;

/// Annotation snapshot handed to the extractor
pub type AnnotationMap = BTreeMap<ToolKind, Vec<AnnotationRef>>;

#[derive(Debug, Default)]
struct ImageAnnotations {
    records: AnnotationMap,
}

/// Raw annotation geometry, retained per image.
///
/// Switching the active image never drops data; `clear_image` is the only way
/// annotations are discarded.
#[derive(Debug)]
pub struct AnnotationStore {
    images: HashMap<ImageId, ImageAnnotations>,
    active: Option<ImageContext>,
    coordinate_limit: f32,
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new(DEFAULT_COORDINATE_LIMIT)
    }
}

impl AnnotationStore {
    pub fn new(coordinate_limit: f32) -> Self {
        Self {
            images: HashMap::new(),
            active: None,
            coordinate_limit,
        }
    }

    /// Make `image` the context for subsequent reads and writes
    pub fn set_active_image(&mut self, image: ImageContext) {
        log::debug!("Active image set to {}", image.id());
        self.images.entry(image.id()).or_default();
        self.active = Some(image);
    }

    pub fn active_image(&self) -> Option<&ImageContext> {
        self.active.as_ref()
    }

    /// Append an annotation for `kind` under the active image
    pub fn record_annotation(
        &mut self,
        kind: ToolKind,
        points: Vec<Pos2>,
    ) -> Result<AnnotationRef, AnnotationError> {
        let image = self.active.as_ref().ok_or(AnnotationError::NoActiveImage)?;
        geometry::validate_points(&points, image.bounds(self.coordinate_limit))?;

        let id = image.id();
        let record = AnnotationRecord::new_ref(id, kind, points);
        self.images
            .entry(id)
            .or_default()
            .records
            .entry(kind)
            .or_default()
            .push(Arc::clone(&record));

        log::debug!("Recorded {} annotation {} on image {}", kind, record.id(), id);
        Ok(record)
    }

    /// Overwrite every annotation for `kind` under the active image.
    ///
    /// All point sets are validated first; on error the store is unchanged.
    pub fn replace_annotations(
        &mut self,
        kind: ToolKind,
        point_sets: Vec<Vec<Pos2>>,
    ) -> Result<usize, AnnotationError> {
        let image = self.active.as_ref().ok_or(AnnotationError::NoActiveImage)?;
        let bounds = image.bounds(self.coordinate_limit);
        for points in &point_sets {
            geometry::validate_points(points, bounds)?;
        }

        let id = image.id();
        let records: Vec<_> = point_sets
            .into_iter()
            .map(|points| AnnotationRecord::new_ref(id, kind, points))
            .collect();
        let count = records.len();
        self.images.entry(id).or_default().records.insert(kind, records);

        log::debug!("Replaced {} annotations on image {} ({} records)", kind, id, count);
        Ok(count)
    }

    /// Validate points against the active image without storing them
    pub fn check_points(&self, points: &[Pos2]) -> Result<(), AnnotationError> {
        let image = self.active.as_ref().ok_or(AnnotationError::NoActiveImage)?;
        geometry::validate_points(points, image.bounds(self.coordinate_limit))
    }

    /// Annotations for `kind` under the active image, in insertion order
    pub fn get_annotations(&self, kind: ToolKind) -> Vec<AnnotationRef> {
        self.active_records()
            .and_then(|records| records.get(&kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Every annotation under the active image, keyed by tool
    pub fn snapshot(&self) -> AnnotationMap {
        self.active_records().cloned().unwrap_or_default()
    }

    /// Discard all annotations captured on `image`
    pub fn clear_image(&mut self, image: ImageId) -> usize {
        let removed = self
            .images
            .get_mut(&image)
            .map(|entry| {
                let count = entry.records.values().map(Vec::len).sum();
                entry.records.clear();
                count
            })
            .unwrap_or(0);
        log::debug!("Cleared {} annotations from image {}", removed, image);
        removed
    }

    /// Number of images with retained annotation sets
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    fn active_records(&self) -> Option<&AnnotationMap> {
        let active = self.active.as_ref()?;
        self.images.get(&active.id()).map(|entry| &entry.records)
    }
}

/// Store handle for callers that touch annotations from more than one thread
pub type SharedAnnotationStore = Arc<RwLock<AnnotationStore>>;

pub fn shared(store: AnnotationStore) -> SharedAnnotationStore {
    Arc::new(RwLock::new(store))
}
