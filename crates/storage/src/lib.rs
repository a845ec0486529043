//! On-disk snapshot storage.
//!
//! Owns everything that touches snapshot files: naming, listing, atomic
//! copies and idempotent deletes. Knows nothing about where the live database
//! lives or how long snapshots should be kept.

mod copy;
pub mod error;
pub mod naming;
mod path;
mod record;
mod store;

pub use crate::copy::copy_atomic;
pub use crate::path::validate as validate_file_name;
pub use crate::record::{SnapshotRecord, local_offset};
pub use crate::store::BackupStore;
