//! Backup Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Storage and configuration errors are
//! raised into these kinds so the whole tree is kept.
//!
//! A missing live database is deliberately *not* an error:
//! [`create_backup`](crate::BackupManager::create_backup) reports it as
//! `Ok(None)`.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A backup error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for backup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a backup or restore failure.
///
/// ### Caller Errors
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::InvalidName`]
///
/// ### Operational Errors
/// - [`ErrorKind::Paths`]
/// - [`ErrorKind::Backup`]
/// - [`ErrorKind::List`]
/// - [`ErrorKind::Prune`] - only ever returned as a warning alongside a
///   successful backup.
/// - [`ErrorKind::SafetySnapshot`]
/// - [`ErrorKind::Restore`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The requested snapshot is not in the backup directory.
    #[display("backup not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The requested snapshot name is not a plain file name.
    #[display("invalid backup name: {_0:?}")]
    InvalidName(#[error(not(source))] String),
    /// The live database or backup directory could not be resolved.
    #[display("could not resolve database or backup locations")]
    Paths,
    /// Copying the live database into the backup directory failed.
    #[display("backup failed")]
    Backup,
    /// The backup directory could not be listed.
    #[display("could not list backups")]
    List,
    /// An expired snapshot could not be removed.
    #[display("could not remove expired backup: {}", _0.display())]
    Prune(#[error(not(source))] PathBuf),
    /// The current database could not be preserved before a restore; the
    /// live database was not touched.
    #[display("could not snapshot the current database before restoring")]
    SafetySnapshot,
    /// Copying the snapshot over the live database failed; the live database
    /// was not touched.
    #[display("restore failed")]
    Restore,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound(_) | Self::InvalidName(_))
    }
}
