//! Configuration loading and path resolution.
//!
//! Configuration is layered, later layers winning:
//! 1. built-in defaults (platform data directory for the database, the
//!    user's desktop for backups so they're easy to find),
//! 2. a configuration file (`config.toml`, `config.yaml`/`.yml` or
//!    `config.json` in the platform config directory, or an explicit path),
//! 3. environment variables prefixed with `STOCKPILE_`
//!    (`STOCKPILE_DATABASE`, `STOCKPILE_BACKUPS`, `STOCKPILE_RETENTION_DAYS`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::{ProjectDirs, UserDirs};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::fs::create_dir_all;
use std::path::{Path, PathBuf, absolute};

const APPLICATION: &str = "Stockpile";
const DATABASE_FILE: &str = "inventory.db";
const BACKUP_DIRECTORY: &str = "Stockpile_Backups";
const ENV_PREFIX: &str = "STOCKPILE_";
const CONFIG_STEMS: [&str; 4] = ["config.toml", "config.yaml", "config.yml", "config.json"];

/// Snapshots older than this many days are pruned after each backup.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The live database file.
    pub database: PathBuf,
    /// Directory holding `inventory_backup_*` snapshots.
    pub backups: PathBuf,
    /// Maximum snapshot age, in whole days, before it is pruned.
    pub retention_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data = ProjectDirs::from("", "", APPLICATION)
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(APPLICATION));
        let backups = UserDirs::new()
            .and_then(|dirs| dirs.desktop_dir().map(|desktop| desktop.join(BACKUP_DIRECTORY)))
            .unwrap_or_else(|| data.join("backups"));
        Self {
            database: data.join(DATABASE_FILE),
            backups,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a file and the environment.
    ///
    /// When `file` is `None` the platform config directory is searched; a
    /// missing file there is not an error. An explicit `file` must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file)?)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                for path in default_files() {
                    tracing::debug!(path = %path.display(), "Loading configuration file");
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        Ok(figment.extract::<Self>().map_err(|e| ErrorKind::Load(e.to_string()))?)
    }

    /// Absolute path of the live database, creating its parent directory.
    pub fn database_path(&self) -> Result<PathBuf> {
        let path = absolute(&self.database).or_raise(|| ErrorKind::InvalidPath(self.database.clone()))?;
        if let Some(parent) = path.parent() {
            create_dir_all(parent).or_raise(|| ErrorKind::CreateDirectory(parent.to_path_buf()))?;
        }
        Ok(path)
    }

    /// Absolute path of the backup directory, creating it if necessary.
    pub fn backup_directory(&self) -> Result<PathBuf> {
        let path = absolute(&self.backups).or_raise(|| ErrorKind::InvalidPath(self.backups.clone()))?;
        create_dir_all(&path).or_raise(|| ErrorKind::CreateDirectory(path.clone()))?;
        Ok(path)
    }
}

fn default_files() -> Vec<PathBuf> {
    let Some(dirs) = ProjectDirs::from("", "", APPLICATION) else {
        return Vec::new();
    };
    CONFIG_STEMS.iter().map(|name| dirs.config_dir().join(name)).filter(|path| path.is_file()).collect()
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load(file: Option<&Path>) -> std::result::Result<Config, figment::Error> {
        Config::load(file).map_err(|e| figment::Error::from(format!("{e:?}")))
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
        assert!(config.database.ends_with(DATABASE_FILE));
    }

    #[rstest]
    #[case("stockpile.toml", "database = \"/srv/inventory/inventory.db\"\nretention_days = 14\n")]
    #[case("stockpile.yaml", "database: /srv/inventory/inventory.db\nretention_days: 14\n")]
    #[case("stockpile.json", r#"{"database": "/srv/inventory/inventory.db", "retention_days": 14}"#)]
    fn test_file_overrides_defaults(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = load(Some(Path::new(name)))?;
            assert_eq!(config.database, PathBuf::from("/srv/inventory/inventory.db"));
            assert_eq!(config.retention_days, 14);
            assert_eq!(config.backups, Config::default().backups);
            Ok(())
        });
    }

    #[test]
    fn test_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("stockpile.toml", "retention_days = 14\nbackups = \"/mnt/usb/backups\"\n")?;
            jail.set_env("STOCKPILE_RETENTION_DAYS", "7");
            jail.set_env("STOCKPILE_DATABASE", "/tmp/elsewhere.db");
            let config = load(Some(Path::new("stockpile.toml")))?;
            assert_eq!(config.retention_days, 7);
            assert_eq!(config.database, PathBuf::from("/tmp/elsewhere.db"));
            assert_eq!(config.backups, PathBuf::from("/mnt/usb/backups"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::MissingFile(_)));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_format() {
        Jail::expect_with(|jail| {
            jail.create_file("stockpile.ini", "retention_days=1")?;
            let err = Config::load(Some(Path::new("stockpile.ini"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value() {
        Jail::expect_with(|jail| {
            jail.create_file("stockpile.toml", "retention_days = \"forever\"\n")?;
            let err = Config::load(Some(Path::new("stockpile.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load(_)));
            Ok(())
        });
    }

    #[test]
    fn test_path_resolution_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config {
            database: temp_dir.path().join("appdata/Stockpile/inventory.db"),
            backups: temp_dir.path().join("Desktop/Stockpile_Backups"),
            retention_days: 30,
        };
        let database = config.database_path().unwrap();
        assert_eq!(database, config.database);
        assert!(database.parent().unwrap().is_dir());
        assert!(!database.exists());

        let backups = config.backup_directory().unwrap();
        assert!(backups.is_dir());
    }
}
