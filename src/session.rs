//! A measurement session: one user, one viewer, one active image at a time.
//!
//! The session owns the components the measuring workflow needs and drives them
//! in response to user events:
//! - `activate_tool` / `activate_tool_named`: pick the capture tool
//! - `load`: acquire an image and make it active
//! - `record_annotation` / `sync_from_capture`: collect raw geometry
//! - `save_measurements`: extract measurements from the active image
//! - `export`: encrypt the saved measurements and hand them to a sink
//!
//! Measurements are derived state; the session keeps the last extraction for
//! display and export but never persists it in plaintext.
use std::future::Future;
use std::io;

use egui::Pos2;

use crate::annotation::AnnotationRef;
use crate::config::SessionConfig;
use crate::document::{self, AnnotationStore, SharedAnnotationStore};
use crate::error::{AnnotationError, ConfigError, DecodeError, ExportError, LoadError, ToolError};
use crate::export::{ByteSink, ExportCodec, ExportPayload};
use crate::file_handler::{ImageLoader, PickedFile};
use crate::image::{ImageContext, ImageId};
use crate::measurement::{self, Extraction, ExtractionContext, MeasurementRecord};
use crate::state::ToolActivationController;
use crate::tools::{AnnotationCapture, ToolKind};

#[derive(Debug)]
pub struct MeasurementSession {
    config: SessionConfig,
    tools: ToolActivationController,
    store: SharedAnnotationStore,
    loader: ImageLoader,
    codec: ExportCodec,
    measurements: Vec<MeasurementRecord>,
}

impl MeasurementSession {
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            tools: ToolActivationController::new(),
            store: document::shared(AnnotationStore::new(config.coordinate_limit)),
            loader: ImageLoader::new(),
            codec: ExportCodec::new(&config.export),
            measurements: Vec::new(),
            config,
        })
    }

    /// Register every tool with the capture library and start on Length
    pub fn attach(&mut self, capture: &mut dyn AnnotationCapture) {
        capture.register_tools(&ToolKind::ALL);
        self.tools.activate(ToolKind::Length, capture);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolActivationController {
        &self.tools
    }

    pub fn store(&self) -> &SharedAnnotationStore {
        &self.store
    }

    pub fn activate_tool(&mut self, tool: ToolKind, capture: &mut dyn AnnotationCapture) {
        self.tools.activate(tool, capture);
    }

    pub fn activate_tool_named(
        &mut self,
        name: &str,
        capture: &mut dyn AnnotationCapture,
    ) -> Result<ToolKind, ToolError> {
        self.tools.activate_named(name, capture)
    }

    /// Load `file` and make it the active image once its bytes arrive.
    ///
    /// A later call supersedes an earlier one still reading; the superseded call
    /// fails with [`LoadError::Superseded`] and leaves the active image alone.
    pub async fn load<F>(&self, file: PickedFile, read: F) -> Result<ImageId, LoadError>
    where
        F: Future<Output = io::Result<Vec<u8>>>,
    {
        let image = self.loader.load(file, read).await?;
        let id = image.id();
        self.store.write().set_active_image(image);
        Ok(id)
    }

    /// Make `image` active, or refresh its size and spacing if it already is
    pub fn set_active_image(&self, image: ImageContext) {
        self.store.write().set_active_image(image);
    }

    pub fn active_image(&self) -> Option<ImageContext> {
        self.store.read().active_image().cloned()
    }

    pub fn record_annotation(
        &self,
        kind: ToolKind,
        points: Vec<Pos2>,
    ) -> Result<AnnotationRef, AnnotationError> {
        self.store.write().record_annotation(kind, points)
    }

    /// Replace the stored geometry with what the capture library currently holds.
    ///
    /// Point sets with invalid geometry are dropped and logged; returns the number kept.
    pub fn sync_from_capture(&self, capture: &dyn AnnotationCapture) -> Result<usize, AnnotationError> {
        let mut store = self.store.write();
        if store.active_image().is_none() {
            return Err(AnnotationError::NoActiveImage);
        }
        let mut kept = 0;
        for kind in ToolKind::ALL {
            let sets: Vec<_> = capture
                .captured(kind)
                .into_iter()
                .filter(|points| match store.check_points(points) {
                    Ok(()) => true,
                    Err(err) => {
                        log::warn!("Dropping captured {} annotation: {}", kind, err);
                        false
                    }
                })
                .collect();
            kept += store.replace_annotations(kind, sets)?;
        }
        Ok(kept)
    }

    /// Extract measurements from the active image and keep them for display and export
    pub fn save_measurements(&mut self) -> Extraction {
        let (snapshot, spacing) = {
            let store = self.store.read();
            (store.snapshot(), store.active_image().and_then(ImageContext::spacing))
        };
        let ctx = ExtractionContext {
            spacing,
            length_units: self.config.length_units,
        };

        let extraction = measurement::extract(&snapshot, &ctx);
        log::info!(
            "Saved {} measurements ({} annotations skipped)",
            extraction.records.len(),
            extraction.skipped.len()
        );
        self.measurements = extraction.records.clone();
        extraction
    }

    pub fn measurements(&self) -> &[MeasurementRecord] {
        &self.measurements
    }

    /// Encrypt the saved measurements and emit them under the configured artifact name
    pub fn export(&self, passphrase: &str, sink: &mut dyn ByteSink) -> Result<ExportPayload, ExportError> {
        let payload = self.codec.export(&self.measurements, passphrase)?;
        let name = &self.config.export.artifact_name;
        sink.emit(name, payload.as_str().as_bytes())?;
        log::info!("Exported {} measurements as {}", self.measurements.len(), name);
        Ok(payload)
    }

    pub fn decode(&self, payload: &ExportPayload, passphrase: &str) -> Result<Vec<MeasurementRecord>, DecodeError> {
        self.codec.decode(payload, passphrase)
    }
}
