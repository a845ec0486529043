//! Atomic file copies.

use std::fs::File;
use std::io;
use std::path::Path;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

const TEMP_PREFIX: &str = ".stockpile-";
const TEMP_SUFFIX: &str = ".partial";

/// Copy `src` to `dest` byte-for-byte, never exposing a truncated `dest`.
///
/// The contents are written into a hidden temporary file inside the
/// destination directory which is renamed over `dest` once complete. If
/// anything fails the temporary file is removed and `dest` is left exactly
/// as it was. The source's modification time and permission bits are carried
/// over where the platform allows it.
///
/// Returns the number of bytes copied.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// # fn example() -> stockpile_storage::error::Result<()> {
/// let bytes = stockpile_storage::copy_atomic(
///     Path::new("/data/inventory.db"),
///     Path::new("/backups/inventory_backup_20240101_120000.db"),
/// )?;
/// println!("copied {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[instrument(level = "debug", skip_all, fields(src = %src.display(), dest = %dest.display()))]
pub fn copy_atomic(src: &Path, dest: &Path) -> Result<u64> {
    let mut source = File::open(src).map_err(|e| ErrorKind::from_io(e, src))?;
    let metadata = source.metadata().map_err(|e| ErrorKind::from_io(e, src))?;

    let directory = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(directory)
        .map_err(|e| ErrorKind::from_io(e, directory))?;

    // From here on, any early return drops `temp` which deletes it.
    let bytes = io::copy(&mut source, temp.as_file_mut()).map_err(|e| ErrorKind::from_io(e, src))?;
    if let Ok(modified) = metadata.modified()
        && let Err(err) = temp.as_file().set_modified(modified)
    {
        tracing::debug!(error = %err, "Could not preserve modification time");
    }
    temp.as_file().sync_all().map_err(|e| ErrorKind::from_io(e, temp.path()))?;
    if let Err(err) = temp.as_file().set_permissions(metadata.permissions()) {
        tracing::debug!(error = %err, "Could not preserve permissions");
    }

    temp.persist(dest).map_err(|e| ErrorKind::from_io(e.error, dest))?;
    tracing::debug!(bytes, "Copy complete");
    Ok(bytes)
}
