use thiserror::Error;

use crate::tools::ToolKind;

/// Errors raised while acquiring an image from the input boundary
#[derive(Debug, Error)]
pub enum LoadError {
    /// The declared content type is neither a medical container nor a raster format
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The byte stream did not match the declared container or format
    #[error("Failed to parse image data: {0}")]
    ParseError(String),

    /// A newer load request replaced this one before it completed
    #[error("Image load superseded by a newer request")]
    Superseded,

    #[error("Failed to read image bytes: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors tied to a single annotation record
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    /// A point was non-finite or outside the permitted coordinate range
    #[error("Invalid geometry: point #{index} ({x}, {y}) {reason}")]
    InvalidGeometry {
        index: usize,
        x: f32,
        y: f32,
        reason: &'static str,
    },

    /// Point count does not match the tool's arity
    #[error("Incomplete {kind} annotation: expected {expected} points, got {actual}")]
    IncompleteAnnotation {
        kind: ToolKind,
        expected: usize,
        actual: usize,
    },

    /// A segment's two end points coincide, so it has no direction
    #[error("Degenerate {kind} annotation: segment {segment} has zero length")]
    DegenerateSegment { kind: ToolKind, segment: usize },

    /// The geometry produced a value too large to represent
    #[error("{kind} measurement is not a finite number")]
    NonFiniteMeasurement { kind: ToolKind },

    #[error("No active image to attach annotations to")]
    NoActiveImage,
}

/// Errors from tool activation requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0:?}")]
    UnknownTool(String),
}

/// Errors from decoding an export payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Payload truncated: {0} bytes")]
    Truncated(usize),

    #[error("Unsupported payload version {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid payload header: {0}")]
    InvalidHeader(String),

    /// Wrong passphrase or tampered ciphertext
    #[error("Payload failed authentication")]
    Authentication,

    #[error("Decrypted payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors writing an artifact to a byte sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write artifact {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact name: {0:?}")]
    InvalidName(String),
}

/// Errors from producing an export artifact
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize measurements: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Encryption failed")]
    Encryption,

    #[error("Export passphrase must not be empty")]
    EmptyPassphrase,

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Errors reading or validating a session configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
