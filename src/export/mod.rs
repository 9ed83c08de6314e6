//! Measurement export: deterministic serialization, encryption, and delivery to a sink.

mod codec;
mod sink;

pub use codec::{ExportCodec, ExportPayload, MAX_KDF_ITERATIONS, serialize};
pub use sink::{ByteSink, FileSink, MemorySink};
