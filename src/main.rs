//! Stockpile
//!
//! Command-line host for the inventory database backups:
//!
//!   stockpile startup            # best-effort backup at application start
//!   stockpile backup             # operator "back up now"
//!   stockpile list [--json]
//!   stockpile restore <FILE_NAME>
//!
//! Each invocation runs a single operation, so backups and restores of the
//! same database never overlap within one process.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use comfy_table::{Cell, CellAlignment, Table};
use stockpile_backup::{BackupManager, SnapshotRecord};
use stockpile_config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_filter().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref()).map_err(diagnose)?;
    tracing::debug!(
        database = %config.database.display(),
        backups = %config.backups.display(),
        retention_days = config.retention_days,
        "Configuration loaded"
    );
    let manager = BackupManager::new(config.clone()).with_retention_days(config.retention_days);

    match cli.command {
        Command::Backup => backup(&manager),
        Command::Startup => {
            startup(&manager);
            Ok(())
        },
        Command::List { json } => list(&manager, json),
        Command::Restore { file_name } => restore(&manager, &file_name),
    }
}

fn backup(manager: &BackupManager) -> miette::Result<()> {
    match manager.create_backup().map_err(diagnose)? {
        Some(created) => {
            println!("Backup created: {}", created.record.path.display());
            for record in &created.pruned {
                println!("Removed old backup: {}", record.file_name);
            }
            for warning in &created.warnings {
                eprintln!("warning: {}", &**warning);
            }
        },
        None => println!("No backup created (database does not exist yet)"),
    }
    Ok(())
}

/// Failures have already been reported by the manager; startup carries on.
fn startup(manager: &BackupManager) {
    tracing::info!("Application starting up");
    match manager.create_backup() {
        Ok(Some(created)) => tracing::info!(path = %created.record.path.display(), "Automatic backup created"),
        Ok(None) => tracing::info!("No backup created (database may not exist yet)"),
        Err(_) => {},
    }
}

fn list(manager: &BackupManager, json: bool) -> miette::Result<()> {
    let records = manager.list_backups();
    if json {
        let rendered = serde_json::to_string_pretty(&records).map_err(|e| miette::miette!("{e}"))?;
        println!("{rendered}");
        return Ok(());
    }
    if records.is_empty() {
        println!("No backups found");
        return Ok(());
    }
    println!("{}", backup_table(&records));
    Ok(())
}

fn backup_table(records: &[SnapshotRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["File", "Size (KB)", "Created"]);
    for record in records {
        let kilobytes = record.size_bytes as f64 / 1024.0;
        table.add_row(vec![
            Cell::new(&record.file_name),
            Cell::new(format!("{kilobytes:.2}")).set_alignment(CellAlignment::Right),
            Cell::new(record.created_at_display()),
        ]);
    }
    table
}

fn restore(manager: &BackupManager, file_name: &str) -> miette::Result<()> {
    let restored = manager.restore_backup(file_name).map_err(diagnose)?;
    if let Some(safety) = &restored.safety_snapshot {
        println!("Current database backed up to: {}", safety.display());
    }
    println!("Database restored from: {}", restored.source.file_name);
    Ok(())
}

/// Surface the top-level error; the full tree (with locations) goes to the
/// debug log.
fn diagnose<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    tracing::debug!(error = ?err, "Error tree");
    miette::miette!("{}", &*err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn record(name: &str, size_bytes: u64) -> SnapshotRecord {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_718_452_800);
        SnapshotRecord::new(format!("/backups/{name}"), size_bytes, modified.into())
    }

    #[test]
    fn test_backup_table() {
        let records = [
            record("inventory_backup_20240615_120000.db", 1536),
            record("inventory_backup_20240614_120000.db", 0),
        ];
        let table = backup_table(&records);
        assert_eq!(table.row_iter().count(), 2);

        let rendered = table.to_string();
        let lines: Vec<_> = rendered.lines().collect();
        let header = lines.iter().position(|line| line.contains("File")).unwrap();
        assert!(lines[header].contains("Size (KB)"));
        assert!(lines[header].contains("Created"));
        let newest = lines.iter().position(|line| line.contains("inventory_backup_20240615_120000.db")).unwrap();
        let oldest = lines.iter().position(|line| line.contains("inventory_backup_20240614_120000.db")).unwrap();
        assert!(header < newest && newest < oldest);
        assert!(lines[newest].contains("1.50"));
        assert!(lines[oldest].contains("0.00"));
    }
}
