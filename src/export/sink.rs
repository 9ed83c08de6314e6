use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SinkError;

/// Destination for export artifacts (file download, disk, test harness)
pub trait ByteSink {
    fn emit(&mut self, name: &str, bytes: &[u8]) -> Result<(), SinkError>;
}

/// Writes artifacts as files inside a directory
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ByteSink for FileSink {
    fn emit(&mut self, name: &str, bytes: &[u8]) -> Result<(), SinkError> {
        // Only plain file names; never escape the target directory
        let file_name = Path::new(name);
        if name.is_empty() || file_name.file_name() != Some(file_name.as_os_str()) {
            return Err(SinkError::InvalidName(name.to_owned()));
        }

        let write = || -> std::io::Result<PathBuf> {
            fs::create_dir_all(&self.dir)?;
            let path = self.dir.join(file_name);
            fs::write(&path, bytes)?;
            Ok(path)
        };

        let path = write().map_err(|source| SinkError::Write {
            name: name.to_owned(),
            source,
        })?;
        log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// Keeps emitted artifacts in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    artifacts: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> &[(String, Vec<u8>)] {
        &self.artifacts
    }

    /// Most recent artifact emitted under `name`
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.artifacts
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }
}

impl ByteSink for MemorySink {
    fn emit(&mut self, name: &str, bytes: &[u8]) -> Result<(), SinkError> {
        self.artifacts.push((name.to_owned(), bytes.to_vec()));
        Ok(())
    }
}
