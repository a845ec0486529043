//! Snapshot records.

use serde::{Serialize, Serializer};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::{ErrorKind, Result};
use crate::naming;

const DISPLAY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// A snapshot file as seen by the store at listing time.
///
/// Records are never mutated: listing again produces fresh records. The
/// serialized form (`fileName`, `sizeBytes`, `createdAt`, `path`) is what
/// gets handed to operator-facing listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub file_name: String,
    /// File size in whole bytes
    pub size_bytes: u64,
    /// Filesystem modification time, in the local offset where it can be
    /// determined. This is what retention measures age against.
    #[serde(serialize_with = "serialize_created_at")]
    pub created_at: OffsetDateTime,
    /// Timestamp encoded in the file name, if it has one.
    #[serde(skip)]
    pub captured_at: Option<PrimitiveDateTime>,
    /// Absolute location of the snapshot
    pub path: PathBuf,
}
impl SnapshotRecord {
    /// Create a record for the file at `path`.
    ///
    /// The file name and encoded timestamp are derived from `path`.
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64, created_at: OffsetDateTime) -> Self {
        let path = path.into();
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let captured_at = naming::parse_stamp(&file_name);
        Self { file_name, size_bytes, created_at, captured_at, path }
    }

    pub(crate) fn from_metadata(path: &Path, metadata: &Metadata) -> Result<Self> {
        let modified = metadata.modified().map_err(|e| ErrorKind::from_io(e, path))?;
        let created_at = OffsetDateTime::from(modified).to_offset(local_offset());
        Ok(Self::new(path, metadata.len(), created_at))
    }

    /// `createdAt` as shown to operators: `YYYY-MM-DD HH:MM:SS`.
    pub fn created_at_display(&self) -> String {
        self.created_at.format(DISPLAY).unwrap_or_else(|_| self.created_at.to_string())
    }
}

fn serialize_created_at<S: Serializer>(at: &OffsetDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let formatted = at.format(DISPLAY).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

/// Local offset, or UTC when the platform refuses to tell us (the `time`
/// crate declines on multi-threaded Unix processes).
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}
