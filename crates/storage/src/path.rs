//! File name validation.
//!
//! Snapshot names arrive from operators (restore requests) and must never be
//! able to address anything outside the store's directory.

use std::path::{Component, Path};

use crate::error::{ErrorKind, Result};

/// Validates that `name` is a single, visible file name.
///
/// Rejects anything with separators, parent/current directory references,
/// null bytes, or a leading dot (temporary files written by
/// [`copy_atomic`](crate::copy_atomic) are hidden and must stay unaddressable).
///
/// # Examples
///
/// ```
/// use stockpile_storage::validate_file_name;
/// assert!(validate_file_name("inventory_backup_20240101_120000.db").is_ok());
/// assert!(validate_file_name("../inventory.db").is_err());
/// assert!(validate_file_name("nested/inventory.db").is_err());
/// assert!(validate_file_name(".stockpile-x1y2z3.partial").is_err());
/// ```
pub fn validate(name: &str) -> Result<&str> {
    if name.is_empty() || name.starts_with('.') || name.contains('\0') {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == name => Ok(name),
        _ => exn::bail!(ErrorKind::InvalidName(name.to_string())),
    }
}
