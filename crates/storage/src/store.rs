//! Snapshot directory.
//!
//! [`BackupStore`] is the only thing that touches snapshot files on disk. All
//! operations are blocking; snapshots are local single-file databases and a
//! copy is expected to take moments, not minutes.

use std::fs::{self, create_dir_all};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::copy::copy_atomic;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_name;
use crate::{SnapshotRecord, naming};

/// A directory of snapshot files.
///
/// All file names handed to the store are validated to be plain file names
/// inside the root directory.
///
/// # Examples
///
/// ```no_run
/// use stockpile_storage::BackupStore;
///
/// # fn example() -> stockpile_storage::error::Result<()> {
/// let store = BackupStore::new("/home/me/Desktop/Stockpile_Backups")?;
/// for record in store.list("inventory", "db")? {
///     println!("{} ({} bytes)", record.file_name, record.size_bytes);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}
impl BackupStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidName`](ErrorKind::InvalidName) if the path is not
    /// absolute or exists but is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidName(root.display().to_string()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidName(root.display().to_string()));
            }
        } else {
            create_dir_all(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a snapshot file name.
    pub fn path_of(&self, file_name: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_name(file_name)?))
    }

    /// List snapshots named `<base>_backup_*.<ext>`, newest first.
    ///
    /// Ordering is by the timestamp encoded in the name, then by file name;
    /// files whose stamp doesn't parse sort after all others. The filesystem
    /// gives no ordering guarantees so this always sorts.
    ///
    /// A missing directory lists as empty. Files removed between the
    /// directory read and their `stat` are skipped.
    #[instrument(level = "debug", skip(self), fields(root = %self.root.display()))]
    pub fn list(&self, base: &str, ext: &str) -> Result<Vec<SnapshotRecord>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => exn::bail!(ErrorKind::from_io(err, &self.root)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ErrorKind::from_io(e, &self.root))?;
            let file_name = entry.file_name();
            // Non-UTF8 names can't have been produced by the namer.
            let Some(file_name) = file_name.to_str() else { continue };
            if !naming::matches(base, ext, file_name) {
                continue;
            }
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == IoErrorKind::NotFound => continue,
                Err(err) => exn::bail!(ErrorKind::from_io(err, &path)),
            };
            // Note: silently drop directories and (most likely broken) symlinks.
            if metadata.is_file() {
                records.push(SnapshotRecord::from_metadata(&path, &metadata)?);
            }
        }

        records.sort_by(|a, b| b.captured_at.cmp(&a.captured_at).then_with(|| b.file_name.cmp(&a.file_name)));
        tracing::debug!(count = records.len(), "Listed snapshots");
        Ok(records)
    }

    pub fn exists(&self, file_name: &str) -> Result<bool> {
        let path = self.path_of(file_name)?;
        Ok(path.try_exists().map_err(|e| ErrorKind::from_io(e, &path))?)
    }

    /// Metadata for a single snapshot.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if there is no regular file
    /// by that name.
    pub fn stat(&self, file_name: &str) -> Result<SnapshotRecord> {
        let path = self.path_of(file_name)?;
        let metadata = fs::metadata(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(path));
        }
        SnapshotRecord::from_metadata(&path, &metadata)
    }

    /// Copy `src` into the store as `file_name`.
    #[instrument(level = "debug", skip(self, src), fields(src = %src.display()))]
    pub fn store(&self, src: &Path, file_name: &str) -> Result<SnapshotRecord> {
        let dest = self.path_of(file_name)?;
        copy_atomic(src, &dest)?;
        self.stat(file_name)
    }

    /// Remove a snapshot. Removing a snapshot that isn't there succeeds.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&self, file_name: &str) -> Result<()> {
        let path = self.path_of(file_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Snapshot already gone");
                Ok(())
            },
            Err(err) => exn::bail!(ErrorKind::from_io(err, &path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    fn setup() -> (tempfile::TempDir, BackupStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(temp_dir.path().join("backups")).unwrap();
        (temp_dir, store)
    }

    fn touch(store: &BackupStore, name: &str, data: &[u8]) -> PathBuf {
        let path = store.root().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(BackupStore::new(temp_dir.path()).is_ok());
        assert!(BackupStore::new("relative/path").is_err());
        let file = temp_dir.path().join("file");
        fs::write(&file, b"").unwrap();
        assert!(BackupStore::new(&file).is_err());
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("a/b/backups");
        BackupStore::new(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_path_of_rejects_traversal() {
        let (_temp_dir, store) = setup();
        assert_eq!(store.path_of("x.db").unwrap(), store.root().join("x.db"));
        assert!(store.path_of("../x.db").is_err());
        assert!(store.exists("../../etc/passwd").is_err());
        assert!(store.delete("../inventory.db").is_err());
    }

    #[test]
    fn test_list_empty_and_missing_directory() {
        let (_temp_dir, store) = setup();
        assert!(store.list("inventory", "db").unwrap().is_empty());
        fs::remove_dir(store.root()).unwrap();
        assert!(store.list("inventory", "db").unwrap().is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let (_temp_dir, store) = setup();
        touch(&store, "inventory_backup_20240102_000000.db", b"b");
        touch(&store, "inventory_backup_20231231_235959.db", b"a");
        touch(&store, "inventory_backup_renamed.db", b"?");
        touch(&store, "inventory_backup_20240215_081500.db", b"c");
        let names: Vec<_> = store.list("inventory", "db").unwrap().into_iter().map(|r| r.file_name).collect();
        assert_eq!(
            names,
            vec![
                "inventory_backup_20240215_081500.db",
                "inventory_backup_20240102_000000.db",
                "inventory_backup_20231231_235959.db",
                "inventory_backup_renamed.db",
            ]
        );
    }

    #[test]
    fn test_list_filters_by_pattern() {
        let (_temp_dir, store) = setup();
        touch(&store, "inventory_backup_20240101_000000.db", b"data");
        touch(&store, "before_restore_backup_20240101_000000.db", b"data");
        touch(&store, "inventory_backup_20240101_000000.sqlite", b"data");
        touch(&store, ".stockpile-abc123.partial", b"half");
        touch(&store, "notes.txt", b"data");
        fs::create_dir(store.root().join("inventory_backup_20240101_000001.db")).unwrap();

        let records = store.list("inventory", "db").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "inventory_backup_20240101_000000.db");
        assert_eq!(records[0].size_bytes, 4);
        assert_eq!(records[0].path, store.root().join("inventory_backup_20240101_000000.db"));
    }

    #[test]
    fn test_list_uses_modification_time() {
        let (_temp_dir, store) = setup();
        let path = touch(&store, "inventory_backup_20240101_000000.db", b"data");
        let mtime = SystemTime::now() - Duration::from_secs(10 * 86_400);
        File::options().write(true).open(&path).unwrap().set_modified(mtime).unwrap();
        let record = store.list("inventory", "db").unwrap().pop().unwrap();
        assert_eq!(SystemTime::from(record.created_at), mtime);
    }

    #[test]
    fn test_exists_and_stat() {
        let (_temp_dir, store) = setup();
        assert!(!store.exists("inventory_backup_20240101_000000.db").unwrap());
        touch(&store, "inventory_backup_20240101_000000.db", b"12345");
        assert!(store.exists("inventory_backup_20240101_000000.db").unwrap());
        let record = store.stat("inventory_backup_20240101_000000.db").unwrap();
        assert_eq!(record.size_bytes, 5);

        let err = store.stat("missing_file.db").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
        fs::create_dir(store.root().join("directory.db")).unwrap();
        let err = store.stat("directory.db").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_store_copies_into_root() {
        let (temp_dir, store) = setup();
        let src = temp_dir.path().join("inventory.db");
        fs::write(&src, b"live database").unwrap();
        let record = store.store(&src, "inventory_backup_20240101_000000.db").unwrap();
        assert_eq!(record.size_bytes, 13);
        assert_eq!(fs::read(&record.path).unwrap(), b"live database");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_temp_dir, store) = setup();
        touch(&store, "inventory_backup_20240101_000000.db", b"data");
        store.delete("inventory_backup_20240101_000000.db").unwrap();
        assert!(!store.exists("inventory_backup_20240101_000000.db").unwrap());
        store.delete("inventory_backup_20240101_000000.db").unwrap();
        store.delete("never_existed.db").unwrap();
    }
}
