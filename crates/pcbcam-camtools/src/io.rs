//! File I/O
//!
//! Reading tolerates a UTF-8 byte order mark and stray non UTF-8 bytes
//! (some CAD exporters write Latin-1 comments). Writing goes through a
//! temporary file in the destination directory so a failed export never
//! leaves a truncated file behind.

use crate::error::{CamToolError, CamToolResult};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Read a text file.
pub fn read_text(path: impl AsRef<Path>) -> CamToolResult<String> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| CamToolError::io(path, e))?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("{} is not valid UTF-8, decoding lossily", path.display());
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    Ok(text)
}

/// Replace `path` with `text` atomically.
pub fn write_atomic(path: impl AsRef<Path>, text: &str) -> CamToolResult<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CamToolError::io(path, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| CamToolError::io(path, e))?;
    tmp.persist(path).map_err(|e| CamToolError::io(path, e.error))?;
    debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}
