//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`consolelog`] - Log a line to the console facility
//! - [`sendlog`] - Send a record built from key/value pairs
//! - [`query`] - Search the log

use std::path::Path;

use asl_client::{LocalFacility, LocalFacilityConfig, LocalStoreConfig};
use tracing::debug;

use crate::error::CliError;

pub mod consolelog;
pub mod query;
pub mod sendlog;

pub use consolelog::ConsolelogCommand;
pub use query::QueryCommand;
pub use sendlog::SendlogCommand;

/// Opens the facility the commands run against.
///
/// With a journal path the store is persistent; otherwise it is in memory.
///
/// # Errors
///
/// Returns [`CliError::Config`] if the journal cannot be opened.
pub fn open_facility(store: Option<&Path>) -> Result<LocalFacility, CliError> {
    let Some(path) = store else {
        debug!("no store configured, using an in-memory log");
        return Ok(LocalFacility::in_memory());
    };
    debug!(journal = %path.display(), "opening log store");
    let config = LocalFacilityConfig::default().with_store(LocalStoreConfig::persistent(path));
    LocalFacility::new(config)
        .map_err(|e| CliError::Config(format!("cannot open store {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_facility_without_store_is_in_memory() {
        let facility = open_facility(None).expect("should open");
        assert!(facility.store().is_empty());
        assert!(facility.store().config().journal.is_none());
    }

    #[test]
    fn open_facility_with_store_creates_journal_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("asl.jsonl");
        let facility = open_facility(Some(&path)).expect("should open");
        assert_eq!(facility.store().config().journal.as_deref(), Some(path.as_path()));
        assert!(path.parent().is_some_and(Path::exists));
    }
}
