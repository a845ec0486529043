//! Snapshot file naming.
//!
//! Every snapshot is named `<base>_backup_<YYYYMMDD_HHMMSS>.<ext>`. The
//! timestamp fields are zero-padded, so for a fixed base and extension the
//! lexical order of names is the chronological order of their capture.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Separates the base name from the encoded timestamp.
pub const MARKER: &str = "_backup_";

const STAMP: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]_[hour][minute][second]");

/// Build the file name for a snapshot captured at `at`.
///
/// The wall-clock fields of `at` are used as-is, whatever its offset.
///
/// ```
/// use stockpile_storage::naming::snapshot_name;
/// use time::macros::datetime;
///
/// let name = snapshot_name("inventory", "db", datetime!(2024-03-09 07:05:01 +1));
/// assert_eq!(name, "inventory_backup_20240309_070501.db");
/// ```
pub fn snapshot_name(base: &str, ext: &str, at: OffsetDateTime) -> String {
    format!(
        "{base}{MARKER}{:04}{:02}{:02}_{:02}{:02}{:02}.{ext}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
    )
}

/// Equivalent of the glob `<base>_backup_*.<ext>`.
pub fn matches(base: &str, ext: &str, file_name: &str) -> bool {
    file_name
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix(MARKER))
        .and_then(|rest| rest.strip_suffix(ext))
        .is_some_and(|rest| rest.ends_with('.'))
}

/// Recover the capture timestamp encoded in a snapshot file name.
///
/// Returns `None` for names that were not produced by [`snapshot_name`]
/// (renamed or hand-made files), in which case callers fall back on the
/// modification time.
pub fn parse_stamp(file_name: &str) -> Option<PrimitiveDateTime> {
    let (_, rest) = file_name.rsplit_once(MARKER)?;
    let (stamp, _ext) = rest.split_once('.')?;
    PrimitiveDateTime::parse(stamp, STAMP).ok()
}
