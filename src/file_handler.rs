use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::{AbortHandle, Abortable, Aborted};
use image::ImageFormat;
use parking_lot::Mutex;

use crate::error::LoadError;
use crate::image::{ImageContext, ImageId, ImageSource};

pub const DICOM_CONTENT_TYPE: &str = "application/dicom";
const DICOM_PREAMBLE_LEN: usize = 128;
const DICOM_MAGIC: &[u8; 4] = b"DICM";

/// A file chosen by the user, before its bytes are read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedFile {
    pub name: String,
    /// Declared content type, e.g. `image/png` or `application/dicom`
    pub content_type: String,
}

impl PickedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
        }
    }
}

/// Decide how the viewer should receive `bytes`, based on the declared content type
pub fn classify(content_type: &str, bytes: &[u8]) -> Result<ImageSource, LoadError> {
    let content_type = content_type.trim().to_ascii_lowercase();

    if content_type == DICOM_CONTENT_TYPE {
        return classify_dicom(bytes);
    }

    if !content_type.starts_with("image/") {
        return Err(LoadError::UnsupportedFileType(content_type));
    }
    let declared = ImageFormat::from_mime_type(&content_type)
        .ok_or_else(|| LoadError::UnsupportedFileType(content_type.clone()))?;

    let format = image::guess_format(bytes)
        .map_err(|err| LoadError::ParseError(format!("unrecognised {content_type} data: {err}")))?;
    if format != declared {
        log::warn!("Declared {:?} but content looks like {:?}", declared, format);
    }

    let data_url = format!("data:{};base64,{}", format.to_mime_type(), STANDARD.encode(bytes));
    Ok(ImageSource::Raster { format, data_url })
}

fn classify_dicom(bytes: &[u8]) -> Result<ImageSource, LoadError> {
    let magic = bytes.get(DICOM_PREAMBLE_LEN..DICOM_PREAMBLE_LEN + DICOM_MAGIC.len());
    if magic != Some(DICOM_MAGIC.as_slice()) {
        return Err(LoadError::ParseError(format!(
            "missing DICM marker after {DICOM_PREAMBLE_LEN}-byte preamble ({} bytes read)",
            bytes.len()
        )));
    }
    Ok(ImageSource::Dicom { bytes_len: bytes.len() })
}

/// Runs image loads, letting each new request supersede the one in flight
#[derive(Debug, Default)]
pub struct ImageLoader {
    in_flight: Mutex<Option<AbortHandle>>,
    generation: AtomicU64,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a load is still waiting on its read
    pub fn is_loading(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Read and classify `file`.
    ///
    /// Starting another load aborts this one, which then resolves to
    /// [`LoadError::Superseded`] and must not become the active image.
    pub async fn load<F>(&self, file: PickedFile, read: F) -> Result<ImageContext, LoadError>
    where
        F: Future<Output = io::Result<Vec<u8>>>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (handle, registration) = AbortHandle::new_pair();
        if let Some(previous) = self.in_flight.lock().replace(handle) {
            log::warn!("Superseding in-flight image load for {}", file.name);
            previous.abort();
        }

        let outcome = Abortable::new(read, registration).await;

        // Only the newest load may clear the slot, whatever its read returned.
        // A read can also finish just as a newer load begins
        {
            let mut in_flight = self.in_flight.lock();
            if self.generation.load(Ordering::SeqCst) != generation {
                return Err(LoadError::Superseded);
            }
            in_flight.take();
        }

        let bytes = match outcome {
            Ok(bytes) => bytes?,
            Err(Aborted) => return Err(LoadError::Superseded),
        };

        log::info!("Loaded {} ({} bytes, {})", file.name, bytes.len(), file.content_type);
        let source = classify(&file.content_type, &bytes).inspect_err(|err| {
            log::error!("Failed to load {}: {}", file.name, err);
        })?;

        Ok(ImageContext::new(ImageId::new(), source))
    }
}
