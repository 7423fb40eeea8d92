//! Atomic I/O operations with file locking

use crate::{Error, NormalizedPath, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
/// Acquires an advisory lock on the temp file while it is being filled.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(&temp_path, e))?;
    temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))?;

    tracing::trace!(path = %path, bytes = content.len(), "wrote file atomically");
    Ok(())
}

/// Read text content while holding a shared lock on the file.
///
/// Reads through the locked handle so a concurrent [`write_atomic`] cannot
/// interleave with the read.
pub fn read_locked(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    let file = File::open(&native_path).map_err(|e| Error::io(&native_path, e))?;
    file.lock_shared().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    let mut content = String::new();
    (&file)
        .read_to_string(&mut content)
        .map_err(|e| Error::io(&native_path, e))?;

    // Lock released when file is dropped
    Ok(content)
}
