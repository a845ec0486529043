//! Backup orchestration.
//!
//! [`BackupManager`] is the only thing the hosting application talks to. It
//! composes the [`PathResolver`], the [`BackupStore`] and the retention policy
//! into three blocking operations:
//!
//! - [`create_backup`](BackupManager::create_backup): live database →
//!   timestamped snapshot → retention sweep.
//! - [`list_backups`](BackupManager::list_backups): newest first.
//! - [`restore_backup`](BackupManager::restore_backup): chosen snapshot →
//!   safety snapshot of the current database → live database.
//!
//! There is no locking in here. Hosts must not run a restore concurrently
//! with another backup or restore of the same database; listing is always
//! safe.

use crate::error::{Error, ErrorKind, Result};
use crate::report::{Event, Reporter, TracingReporter};
use crate::resolver::PathResolver;
use crate::retention::{self, DEFAULT_MAX_AGE_DAYS};
use exn::ResultExt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockpile_storage::error::ErrorKind as StorageErrorKind;
use stockpile_storage::naming::snapshot_name;
use stockpile_storage::{BackupStore, SnapshotRecord, copy_atomic, local_offset};
use time::OffsetDateTime;
use tracing::instrument;

/// Base name of regular snapshots in the backup directory.
pub const BACKUP_BASE: &str = "inventory";
/// Base name of the snapshots taken next to the live database before a restore.
pub const SAFETY_BASE: &str = "before_restore";
/// Used when the live database file has no extension of its own.
pub const DEFAULT_EXTENSION: &str = "db";

pub type ResolverHandle = Arc<dyn PathResolver + Send + Sync>;
pub type ReporterHandle = Arc<dyn Reporter + Send + Sync>;
type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// A snapshot that was just written, plus what the retention sweep did.
#[derive(Debug)]
pub struct CreatedBackup {
    pub record: SnapshotRecord,
    /// Expired snapshots that were removed.
    pub pruned: Vec<SnapshotRecord>,
    /// Retention failures. These never fail the backup itself.
    pub warnings: Vec<Error>,
}

#[derive(Debug, Clone)]
pub struct Restored {
    /// The snapshot that is now the live database.
    pub source: SnapshotRecord,
    /// The live database path that was overwritten.
    pub database: PathBuf,
    /// Copy of the database as it was before the restore, if there was one.
    pub safety_snapshot: Option<PathBuf>,
}

#[derive(Clone)]
pub struct BackupManager {
    paths: ResolverHandle,
    reporter: ReporterHandle,
    retention_days: u32,
    clock: Clock,
}

impl BackupManager {
    /// Manager with a [`TracingReporter`], the default retention of 30 days
    /// and the local wall clock.
    pub fn new(paths: impl PathResolver + Send + Sync + 'static) -> Self {
        Self {
            paths: Arc::new(paths),
            reporter: Arc::new(TracingReporter),
            retention_days: DEFAULT_MAX_AGE_DAYS,
            clock: Arc::new(|| OffsetDateTime::now_utc().to_offset(local_offset())),
        }
    }

    pub fn with_reporter(mut self, reporter: impl Reporter + Send + Sync + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Replace the clock used for snapshot names and retention ages.
    pub fn with_clock(mut self, clock: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Snapshot the live database and prune expired snapshots.
    ///
    /// Returns `Ok(None)` when there is no live database to back up (the
    /// normal state of affairs on first run); nothing is written in that
    /// case. Failures are reported before being returned so callers that only
    /// care about best-effort behaviour (startup hooks) can ignore the result.
    /// Retention failures never fail the backup: they end up in
    /// [`CreatedBackup::warnings`].
    #[instrument(skip(self))]
    pub fn create_backup(&self) -> Result<Option<CreatedBackup>> {
        let result = self.try_create_backup();
        if let Err(error) = &result {
            self.reporter.report(Event::BackupFailed { error });
        }
        result
    }

    fn try_create_backup(&self) -> Result<Option<CreatedBackup>> {
        let database = self.paths.live_database_path()?;
        if !database.try_exists().or_raise(|| ErrorKind::Backup)? {
            self.reporter.report(Event::NoSourceDatabase { database: &database });
            return Ok(None);
        }

        let store = self.store()?;
        let ext = extension_of(&database);
        let now = (self.clock)();
        let file_name = snapshot_name(BACKUP_BASE, ext, now);
        let record = store.store(&database, &file_name).or_raise(|| ErrorKind::Backup)?;
        self.reporter.report(Event::BackupCreated { record: &record });

        let (pruned, warnings) = self.prune(&store, ext, &record, now);
        Ok(Some(CreatedBackup { record, pruned, warnings }))
    }

    /// Delete expired snapshots, collecting failures instead of stopping.
    ///
    /// The snapshot that was just written is never a candidate, even though it
    /// carries the live database's (possibly old) modification time.
    fn prune(
        &self,
        store: &BackupStore,
        ext: &str,
        created: &SnapshotRecord,
        now: OffsetDateTime,
    ) -> (Vec<SnapshotRecord>, Vec<Error>) {
        let records = match store.list(BACKUP_BASE, ext) {
            Ok(records) => records,
            Err(err) => {
                let error = err.raise(ErrorKind::List);
                self.reporter.report(Event::ListFailed { error: &error });
                return (Vec::new(), vec![error]);
            },
        };
        self.sweep(records, created, now, |file_name| store.delete(file_name))
    }

    /// Remove whichever of `records` have expired through `delete`.
    fn sweep(
        &self,
        mut records: Vec<SnapshotRecord>,
        created: &SnapshotRecord,
        now: OffsetDateTime,
        delete: impl Fn(&str) -> stockpile_storage::error::Result<()>,
    ) -> (Vec<SnapshotRecord>, Vec<Error>) {
        records.retain(|record| record.file_name != created.file_name);

        let mut pruned = Vec::new();
        let mut warnings = Vec::new();
        for record in retention::select_expired(&records, self.retention_days, now) {
            match delete(&record.file_name) {
                Ok(()) => {
                    let age_days = retention::age_days(record, now);
                    self.reporter.report(Event::Pruned { record, age_days });
                    pruned.push(record.clone());
                },
                Err(err) => {
                    let error = err.raise(ErrorKind::Prune(record.path.clone()));
                    self.reporter.report(Event::PruneFailed { record, error: &error });
                    warnings.push(error);
                },
            }
        }
        (pruned, warnings)
    }

    /// All snapshots, newest first.
    ///
    /// A directory that can't be read is reported and lists as empty. Use
    /// [`try_list_backups`](Self::try_list_backups) to get at the error.
    pub fn list_backups(&self) -> Vec<SnapshotRecord> {
        self.try_list_backups().unwrap_or_else(|error| {
            self.reporter.report(Event::ListFailed { error: &error });
            Vec::new()
        })
    }

    /// All snapshots, newest first, or why they couldn't be listed.
    ///
    /// Only the backup directory is resolved (and so created if absent); the
    /// live database's directory is left alone.
    pub fn try_list_backups(&self) -> Result<Vec<SnapshotRecord>> {
        let ext = self.paths.database_extension().filter(|ext| !ext.is_empty()).unwrap_or(DEFAULT_EXTENSION);
        let store = self.store()?;
        store.list(BACKUP_BASE, ext).or_raise(|| ErrorKind::List)
    }

    /// Replace the live database with the snapshot called `file_name`.
    ///
    /// If a live database exists it is first copied next to itself as
    /// `before_restore_backup_<timestamp>.<ext>`; if that copy fails the
    /// restore is abandoned. The final copy goes through a temporary file, so
    /// whatever the outcome the live database is either the snapshot or
    /// exactly what it was before the call. Failures are reported *and*
    /// returned.
    #[instrument(skip(self))]
    pub fn restore_backup(&self, file_name: &str) -> Result<Restored> {
        let result = self.try_restore_backup(file_name);
        match &result {
            Ok(restored) => self.reporter.report(Event::Restored { restored }),
            Err(error) => self.reporter.report(Event::RestoreFailed { file_name, error }),
        }
        result
    }

    fn try_restore_backup(&self, file_name: &str) -> Result<Restored> {
        let store = self.store()?;
        let source = match store.stat(file_name) {
            Ok(record) => record,
            Err(err) => {
                let kind = match err.deref() {
                    StorageErrorKind::NotFound(_) => ErrorKind::NotFound(file_name.to_string()),
                    StorageErrorKind::InvalidName(_) => ErrorKind::InvalidName(file_name.to_string()),
                    _ => ErrorKind::Restore,
                };
                return Err(err.raise(kind));
            },
        };

        let database = self.paths.live_database_path()?;
        let safety_snapshot = match database.try_exists().or_raise(|| ErrorKind::SafetySnapshot)? {
            true => Some(self.safety_snapshot(&database)?),
            false => None,
        };

        copy_atomic(&source.path, &database).or_raise(|| ErrorKind::Restore)?;
        Ok(Restored { source, database, safety_snapshot })
    }

    fn safety_snapshot(&self, database: &Path) -> Result<PathBuf> {
        let file_name = snapshot_name(SAFETY_BASE, extension_of(database), (self.clock)());
        let path = database.with_file_name(file_name);
        copy_atomic(database, &path).or_raise(|| ErrorKind::SafetySnapshot)?;
        self.reporter.report(Event::SafetySnapshot { path: &path });
        Ok(path)
    }

    fn store(&self) -> Result<BackupStore> {
        let directory = self.paths.backup_directory()?;
        BackupStore::new(directory).or_raise(|| ErrorKind::Paths)
    }
}

fn extension_of(database: &Path) -> &str {
    database.extension().and_then(|ext| ext.to_str()).filter(|ext| !ext.is_empty()).unwrap_or(DEFAULT_EXTENSION)
}
