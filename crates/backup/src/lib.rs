//! Backup & restore for the inventory database.
//!
//! Takes timestamped snapshots of the single-file database, keeps them for a
//! configurable number of days, and restores any of them without ever
//! overwriting the live database unprotected.
//!
//! ```no_run
//! use stockpile_backup::BackupManager;
//! use stockpile_config::Config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(None).map_err(|e| format!("{e:?}"))?;
//! let manager = BackupManager::new(config);
//! if let Ok(Some(created)) = manager.create_backup() {
//!     println!("backed up to {}", created.record.path.display());
//! }
//! for record in manager.list_backups() {
//!     println!("{} {}", record.file_name, record.created_at_display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
mod manager;
mod report;
mod resolver;
pub mod retention;

pub use crate::manager::{
    BACKUP_BASE, BackupManager, CreatedBackup, DEFAULT_EXTENSION, ReporterHandle, ResolverHandle, Restored,
    SAFETY_BASE,
};
pub use crate::report::{Event, Reporter, TracingReporter};
pub use crate::resolver::PathResolver;
pub use stockpile_storage::SnapshotRecord;
pub use stockpile_storage::naming::snapshot_name;
