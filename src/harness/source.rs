//! Scoped temporary source files.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;
use tracing::warn;

/// A candidate source materialized on disk for the lifetime of one evaluation.
///
/// The file is removed when the value is dropped, whichever way the
/// evaluation ends (success, toolchain failure, timeout, panic, or the
/// evaluation future being cancelled). The write handle is closed before
/// the path is handed out, so toolchains see a complete file.
#[derive(Debug)]
pub struct ScopedSource {
    path: TempPath,
}

impl ScopedSource {
    /// Writes `contents` to a new uniquely named file ending in `extension`.
    pub fn create(contents: &str, extension: &str, dir: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("lisp-harness-").suffix(extension);

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file now, logging instead of failing if removal errors.
    pub fn close(self) {
        let shown = self.path.display().to_string();
        if let Err(e) = self.path.close() {
            warn!(path = %shown, error = %e, "Failed to remove temporary source");
        }
    }
}
