use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use stockpile_config::Config;
use std::path::PathBuf;

/// Supplies the two locations the manager works with.
///
/// Implementations own the create-if-absent semantics: the parent directory
/// of the live database and the backup directory itself should exist once
/// the respective method returns. The live database file itself is never
/// created.
pub trait PathResolver {
    fn live_database_path(&self) -> Result<PathBuf>;
    fn backup_directory(&self) -> Result<PathBuf>;
    /// Extension of the live database file, without touching the filesystem.
    fn database_extension(&self) -> Option<&str>;
}

impl PathResolver for Config {
    fn live_database_path(&self) -> Result<PathBuf> {
        self.database_path().or_raise(|| ErrorKind::Paths)
    }

    fn backup_directory(&self) -> Result<PathBuf> {
        Config::backup_directory(self).or_raise(|| ErrorKind::Paths)
    }

    fn database_extension(&self) -> Option<&str> {
        self.database.extension().and_then(|ext| ext.to_str())
    }
}
