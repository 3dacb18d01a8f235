//! Writable attachments that are logged when closed.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;

/// Callback run once when an auxiliary file is closed.
pub(crate) type Finalizer = Box<dyn FnOnce(&Path) -> Result<()> + Send>;

/// A file whose contents are attached to a log record.
///
/// Write to it like any file. [`close`](Self::close) flushes the content and
/// logs the record that references it; dropping an open file does the same.
/// Writes after close fail with `EBADF`.
pub struct AuxiliaryFile {
    file: Option<File>,
    path: PathBuf,
    finalize: Option<Finalizer>,
}

impl AuxiliaryFile {
    pub(crate) fn new(file: File, path: PathBuf, finalize: Finalizer) -> Self {
        Self {
            file: Some(file),
            path,
            finalize: Some(finalize),
        }
    }

    /// Returns the location of the content on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once the file has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Flushes the content and logs the record. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be synced or the record cannot
    /// be logged.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush()?;
        file.sync_all()?;
        drop(file);

        match self.finalize.take() {
            Some(finalize) => finalize(&self.path),
            None => Ok(()),
        }
    }
}

fn closed() -> io::Error {
    io::Error::from_raw_os_error(libc::EBADF)
}

impl Write for AuxiliaryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.as_mut().ok_or_else(closed)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.as_mut().ok_or_else(closed)?.flush()
    }
}

impl fmt::Debug for AuxiliaryFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxiliaryFile")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for AuxiliaryFile {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(path = %self.path.display(), %error, "failed to finalize auxiliary file");
        }
    }
}
