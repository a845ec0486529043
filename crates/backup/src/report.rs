//! Outcome reporting.
//!
//! Backups ride alongside the application they protect: most of their
//! failures are warnings for an operator, not errors for the caller. The
//! manager hands every notable outcome to a [`Reporter`] it was constructed
//! with, instead of logging through a global.

use crate::error::Error;
use crate::manager::Restored;
use stockpile_storage::SnapshotRecord;
use std::path::Path;

/// Something worth telling an operator about.
#[derive(Debug)]
pub enum Event<'a> {
    /// Backup requested but there is no live database yet (first run).
    NoSourceDatabase { database: &'a Path },
    /// A snapshot of the live database was written.
    BackupCreated { record: &'a SnapshotRecord },
    /// Creating a snapshot failed; nothing was pruned.
    BackupFailed { error: &'a Error },
    /// An expired snapshot was removed by the retention sweep.
    Pruned { record: &'a SnapshotRecord, age_days: i64 },
    /// An expired snapshot could not be removed. The backup itself stands.
    PruneFailed { record: &'a SnapshotRecord, error: &'a Error },
    /// The backup directory could not be listed.
    ListFailed { error: &'a Error },
    /// The live database was preserved ahead of a restore.
    SafetySnapshot { path: &'a Path },
    /// A snapshot is now the live database.
    Restored { restored: &'a Restored },
    /// A restore was abandoned; the live database is as it was.
    RestoreFailed { file_name: &'a str, error: &'a Error },
}

/// Receives every [`Event`] a [`BackupManager`](crate::BackupManager) produces.
///
/// Called synchronously from the operation that produced the event.
pub trait Reporter {
    fn report(&self, event: Event<'_>);
}

/// Forwards events to [`tracing`]: successes at `info`, everything the
/// caller can shrug off at `warn` and restore failures at `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::NoSourceDatabase { database } => {
                tracing::warn!(database = %database.display(), "Database file not found, skipping backup");
            },
            Event::BackupCreated { record } => {
                tracing::info!(path = %record.path.display(), bytes = record.size_bytes, "Backup created");
            },
            Event::BackupFailed { error } => tracing::warn!(error = ?error, "Failed to create backup"),
            Event::Pruned { record, age_days } => {
                tracing::info!(file = %record.file_name, age_days, "Removed old backup");
            },
            Event::PruneFailed { record, error } => {
                tracing::warn!(file = %record.file_name, error = ?error, "Failed to remove old backup");
            },
            Event::ListFailed { error } => tracing::warn!(error = ?error, "Failed to list backups"),
            Event::SafetySnapshot { path } => {
                tracing::info!(path = %path.display(), "Current database backed up before restore");
            },
            Event::Restored { restored } => {
                tracing::info!(
                    file = %restored.source.file_name,
                    database = %restored.database.display(),
                    "Database restored"
                );
            },
            Event::RestoreFailed { file_name, error } => {
                tracing::error!(file = %file_name, error = ?error, "Failed to restore backup");
            },
        }
    }
}
