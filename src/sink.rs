//! Handoff of a decoded message to the desktop app.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::host::{DecodedMessage, NmError, Result};

/// Receives the one message a host invocation decodes. Takes ownership of it.
pub trait Sink {
    fn forward(&mut self, message: DecodedMessage) -> Result<()>;
}

/// Writes the raw payload bytes to a file the desktop app watches, replacing
/// whatever was there.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn forward(&mut self, message: DecodedMessage) -> Result<()> {
        let raw = message.into_raw();
        fs::write(&self.path, &raw).map_err(|source| NmError::Forward {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(path = %self.path.display(), bytes = raw.len(), "forwarded message");
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn forward(&mut self, message: DecodedMessage) -> Result<()> {
        (**self).forward(message)
    }
}
