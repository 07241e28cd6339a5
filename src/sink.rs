//! Writing finished streams to their destination.
//!
//! The encoder hands over a complete buffer, so a sink either writes all of it or fails.
use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes `bytes` to the file at `path`, replacing it.
///
/// The data goes to a temporary file in the same directory first and is then renamed over
/// `path`, so a failure never leaves a truncated file behind.
///
/// # Errors
/// Returns an error if the directory is not writable or the data cannot be written.
pub fn write_file(path: impl AsRef<Path>, bytes: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut file = NamedTempFile::new_in(&dir)?;
    write_to(&mut file, bytes)?;
    file.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(())
}

/// Writes `bytes` to any writer and flushes it.
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_to<W: Write>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(bytes)?;
    writer.flush()
}
