#![warn(clippy::all, rust_2018_idioms)]

pub mod annotation;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod file_handler;
pub mod geometry;
pub mod image;
pub mod measurement;
pub mod session;
pub mod state;
pub mod tools;

pub use annotation::{AnnotationRecord, AnnotationRef};
pub use config::{ExportConfig, LengthUnitPolicy, SessionConfig};
pub use document::{AnnotationMap, AnnotationStore, SharedAnnotationStore};
pub use error::{AnnotationError, ConfigError, DecodeError, ExportError, LoadError, SinkError, ToolError};
pub use export::{ByteSink, ExportCodec, ExportPayload, FileSink, MemorySink};
pub use file_handler::{ImageLoader, PickedFile};
pub use crate::image::{ImageContext, ImageId, ImageSource, PixelSpacing};
pub use measurement::{Extraction, ExtractionContext, MeasurementRecord, Unit};
pub use session::MeasurementSession;
pub use state::{ToolActivationController, ToolState};
pub use tools::{AnnotationCapture, ToolKind};
