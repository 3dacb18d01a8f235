//! Record storage behind the local facility.
//!
//! This module provides:
//! - [`LocalStore`]: thread-safe record storage with retention and ids
//! - [`LocalStoreConfig`]: limits and the optional on-disk journal
//!
//! With a journal configured, every record is appended to a JSON-lines file
//! and read back when the store is reopened. Each line carries the record's
//! id and insertion time next to its attributes:
//! `{"id":7,"inserted_at":"2026-10-19T08:00:00Z","record":{..}}`.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attributes::AttributeMap;
use crate::constants::keys;
use crate::error::Result;
use crate::query::CompiledQuery;
use crate::types::Direction;

/// Configuration for the record store.
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    /// Maximum number of records to keep.
    pub max_entries: usize,
    /// How long to retain records.
    pub retention: Duration,
    /// JSON-lines file that persists records across reopen.
    pub journal: Option<PathBuf>,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
            retention: Duration::from_secs(24 * 60 * 60), // 24 hours
            journal: None,
        }
    }
}

impl LocalStoreConfig {
    /// Creates a config persisted to `journal`.
    #[must_use]
    pub fn persistent(journal: impl Into<PathBuf>) -> Self {
        Self {
            journal: Some(journal.into()),
            ..Default::default()
        }
    }

    /// Sets the maximum number of records.
    #[must_use]
    pub const fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the retention period.
    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the journal path.
    #[must_use]
    pub fn with_journal(mut self, journal: impl Into<PathBuf>) -> Self {
        self.journal = Some(journal.into());
        self
    }
}

/// Stored record with ordering metadata. Also the journal line format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    id: u64,
    inserted_at: DateTime<Utc>,
    record: AttributeMap,
}

impl StoredRecord {
    fn is_expired(&self, cutoff: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        if cutoff.is_some_and(|cutoff| self.inserted_at < cutoff) {
            return true;
        }
        self.record
            .find(keys::EXPIRE_TIME)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .is_some_and(|expire| expire < now.timestamp())
    }
}

/// Open journal file.
struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Journal {
    fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn append(&mut self, stored: &StoredRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, stored)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Thread-safe record store with retention and optional persistence.
///
/// Records keep insertion order and receive increasing ids, written into
/// each record as `ASLMessageID`.
pub struct LocalStore {
    config: LocalStoreConfig,
    entries: RwLock<VecDeque<StoredRecord>>,
    next_id: AtomicU64,
    journal: Mutex<Option<Journal>>,
}

impl LocalStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            config: LocalStoreConfig::default(),
            entries: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            journal: Mutex::new(None),
        }
    }

    /// Opens a store, replaying its journal if one is configured.
    ///
    /// Malformed journal lines are skipped. A journal holding more than
    /// twice as many lines as live records is rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be read or created.
    pub fn open(config: LocalStoreConfig) -> Result<Self> {
        let mut entries = VecDeque::new();
        let mut lines = 0usize;
        let mut max_id = 0u64;

        if let Some(path) = config.journal.as_deref() {
            if path.exists() {
                lines = Self::replay(path, &mut entries, &mut max_id)?;
            }
        }

        let store = Self {
            config,
            entries: RwLock::new(entries),
            next_id: AtomicU64::new(max_id + 1),
            journal: Mutex::new(None),
        };
        store.trim();

        if let Some(path) = store.config.journal.clone() {
            let live = store.len();
            if lines > live.saturating_mul(2) {
                debug!(path = %path.display(), lines, live, "compacting journal");
                Self::write_compacted(&path, &store.entries.read())?;
            }
            *store.journal.lock() = Some(Journal::open(&path)?);
        }

        Ok(store)
    }

    /// Appends a record, assigning it an id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written to the journal.
    #[allow(clippy::significant_drop_tightening)]
    pub fn append(&self, mut record: AttributeMap) -> Result<u64> {
        let mut entries = self.entries.write();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        record.set(keys::MSG_ID, id.to_string())?;

        let stored = StoredRecord {
            id,
            inserted_at: Utc::now(),
            record,
        };
        if let Some(journal) = self.journal.lock().as_mut() {
            journal.append(&stored)?;
        }
        entries.push_back(stored);
        Self::trim_locked(&self.config, &mut entries);

        Ok(id)
    }

    /// Returns the first record after `after` in `direction` that satisfies
    /// `query`, together with its id.
    ///
    /// `after` is the id of the previously returned record, or `None` to
    /// start from the oldest (forward) or newest (reverse) record. Expired
    /// records are skipped.
    #[must_use]
    pub fn next_match(
        &self,
        after: Option<u64>,
        direction: Direction,
        query: &CompiledQuery,
    ) -> Option<(u64, AttributeMap)> {
        let now = Utc::now();
        let cutoff = retention_cutoff(self.config.retention, now);
        let entries = self.entries.read();
        let hit = |stored: &&StoredRecord| {
            !stored.is_expired(cutoff, now) && query.matches(&stored.record)
        };

        let found = match direction {
            Direction::Forward => {
                let start = after.map_or(0, |after| entries.partition_point(|s| s.id <= after));
                entries.range(start..).find(hit)
            }
            Direction::Reverse => {
                let end = after.map_or(entries.len(), |after| {
                    entries.partition_point(|s| s.id < after)
                });
                entries.range(..end).rev().find(hit)
            }
        };

        found.map(|stored| (stored.id, stored.record.clone()))
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes all records and truncates the journal.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be truncated.
    #[allow(clippy::significant_drop_tightening)]
    pub fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write();
        let mut journal = self.journal.lock();
        entries.clear();
        if let Some(current) = journal.as_mut() {
            let path = current.path.clone();
            File::create(&path)?;
            *current = Journal::open(&path)?;
        }
        Ok(())
    }

    /// Rewrites the journal so it holds only live records.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal cannot be rewritten.
    #[allow(clippy::significant_drop_tightening)]
    pub fn compact(&self) -> Result<()> {
        let Some(path) = self.config.journal.clone() else {
            return Ok(());
        };
        let mut entries = self.entries.write();
        Self::trim_locked(&self.config, &mut entries);
        let mut journal = self.journal.lock();
        Self::write_compacted(&path, &entries)?;
        *journal = Some(Journal::open(&path)?);
        Ok(())
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &LocalStoreConfig {
        &self.config
    }

    fn trim(&self) {
        let mut entries = self.entries.write();
        Self::trim_locked(&self.config, &mut entries);
    }

    fn trim_locked(config: &LocalStoreConfig, entries: &mut VecDeque<StoredRecord>) {
        let now = Utc::now();
        let cutoff = retention_cutoff(config.retention, now);
        entries.retain(|stored| !stored.is_expired(cutoff, now));
        while entries.len() > config.max_entries {
            entries.pop_front();
        }
    }

    fn write_compacted(path: &Path, entries: &VecDeque<StoredRecord>) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            for stored in entries {
                serde_json::to_writer(&mut writer, stored)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn replay(path: &Path, entries: &mut VecDeque<StoredRecord>, max_id: &mut u64) -> Result<usize> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = 0usize;

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            lines += 1;

            let stored: StoredRecord = match serde_json::from_str(&line) {
                Ok(stored) => stored,
                Err(error) => {
                    warn!(path = %path.display(), line = lineno + 1, %error, "skipping malformed journal line");
                    continue;
                }
            };

            *max_id = (*max_id).max(stored.id);
            entries.push_back(stored);
        }

        entries.make_contiguous().sort_by_key(|stored| stored.id);
        Ok(lines)
    }
}

fn retention_cutoff(retention: Duration, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(retention)
        .ok()
        .and_then(|retention| now.checked_sub_signed(retention))
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::QueryOperator;
    use crate::query::QueryTerm;
    use tempfile::TempDir;

    fn record(message: &str) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.set(keys::MSG, message).expect("set");
        map
    }

    fn everything() -> CompiledQuery {
        CompiledQuery::new(&[]).expect("compile")
    }

    fn collect(store: &LocalStore, direction: Direction, query: &CompiledQuery) -> Vec<String> {
        let mut out = Vec::new();
        let mut after = None;
        while let Some((id, rec)) = store.next_match(after, direction, query) {
            out.push(rec.find(keys::MSG).unwrap_or_default().to_string());
            after = Some(id);
        }
        out
    }

    fn make_temp_store() -> (LocalStore, TempDir) {
        let dir = TempDir::new().expect("tempdir");
        let config = LocalStoreConfig::persistent(dir.path().join("journal.jsonl"));
        let store = LocalStore::open(config).expect("open");
        (store, dir)
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let store = LocalStore::in_memory();
        let a = store.append(record("a")).expect("append");
        let b = store.append(record("b")).expect("append");
        assert!(b > a);
        assert_eq!(store.len(), 2);

        let (_, rec) = store.next_match(None, Direction::Forward, &everything()).expect("match");
        assert_eq!(rec.find(keys::MSG_ID), Some(a.to_string().as_str()));
    }

    #[test]
    fn forward_and_reverse_order() {
        let store = LocalStore::in_memory();
        for m in ["one", "two", "three"] {
            store.append(record(m)).expect("append");
        }
        assert_eq!(collect(&store, Direction::Forward, &everything()), ["one", "two", "three"]);
        assert_eq!(collect(&store, Direction::Reverse, &everything()), ["three", "two", "one"]);
    }

    #[test]
    fn next_match_applies_query() {
        let store = LocalStore::in_memory();
        for m in ["alpha", "beta", "alphabet"] {
            store.append(record(m)).expect("append");
        }
        let query = CompiledQuery::new(&[QueryTerm::new(
            keys::MSG,
            "alpha",
            "startswith".parse::<QueryOperator>().expect("op"),
        )])
        .expect("compile");
        assert_eq!(collect(&store, Direction::Forward, &query), ["alpha", "alphabet"]);
    }

    #[test]
    fn max_entries_drops_oldest() {
        let store = LocalStore::open(LocalStoreConfig::default().with_max_entries(2)).expect("open");
        for m in ["1", "2", "3"] {
            store.append(record(m)).expect("append");
        }
        assert_eq!(collect(&store, Direction::Forward, &everything()), ["2", "3"]);
    }

    #[test]
    fn expire_time_hides_record() {
        let store = LocalStore::in_memory();
        let mut expired = record("old");
        expired.set(keys::EXPIRE_TIME, "1").expect("set");
        store.append(expired).expect("append");
        store.append(record("fresh")).expect("append");

        assert_eq!(collect(&store, Direction::Forward, &everything()), ["fresh"]);
        // appending trims what has expired
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn zero_retention_drops_everything() {
        let store = LocalStore::open(LocalStoreConfig::default().with_retention(Duration::ZERO))
            .expect("open");
        store.append(record("gone")).expect("append");
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.next_match(None, Direction::Forward, &everything()).is_none());
    }

    #[test]
    fn journal_persists_across_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("journal.jsonl");
        {
            let store = LocalStore::open(LocalStoreConfig::persistent(&path)).expect("open");
            store.append(record("kept")).expect("append");
            store.append(record("also kept")).expect("append");
        }
        let store = LocalStore::open(LocalStoreConfig::persistent(&path)).expect("reopen");
        assert_eq!(collect(&store, Direction::Forward, &everything()), ["kept", "also kept"]);

        let id = store.append(record("new")).expect("append");
        assert_eq!(id, 3);
    }

    #[test]
    fn journal_skips_malformed_lines() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("journal.jsonl");
        let now = Utc::now().to_rfc3339();
        fs::write(
            &path,
            format!(
                "{{\"id\":1,\"inserted_at\":\"{now}\",\"record\":{{\"Message\":\"ok\"}}}}\n\
                 not json\n\
                 {{\"Message\":\"bare record\"}}\n"
            ),
        )
        .expect("write");

        let store = LocalStore::open(LocalStoreConfig::persistent(&path)).expect("open");
        assert_eq!(collect(&store, Direction::Forward, &everything()), ["ok"]);
    }

    #[test]
    fn caller_time_does_not_expire_record_on_reopen() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("journal.jsonl");
        {
            let store = LocalStore::open(LocalStoreConfig::persistent(&path)).expect("open");
            let mut old = record("caller time");
            old.set(keys::TIME, "100").expect("set");
            store.append(old).expect("append");
        }

        let store = LocalStore::open(LocalStoreConfig::persistent(&path)).expect("reopen");
        assert_eq!(collect(&store, Direction::Forward, &everything()), ["caller time"]);
        drop(store);

        let journal = fs::read_to_string(&path).expect("read");
        assert_eq!(journal.lines().count(), 1);
        assert!(journal.contains("\"Time\":\"100\""));
    }

    #[test]
    fn reopen_compacts_bloated_journal() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("journal.jsonl");
        {
            let config = LocalStoreConfig::persistent(&path).with_max_entries(1);
            let store = LocalStore::open(config).expect("open");
            for m in ["a", "b", "c", "d"] {
                store.append(record(m)).expect("append");
            }
        }
        let config = LocalStoreConfig::persistent(&path).with_max_entries(1);
        let store = LocalStore::open(config).expect("reopen");
        assert_eq!(store.len(), 1);

        let lines = fs::read_to_string(&path).expect("read").lines().count();
        assert_eq!(lines, 1);
    }

    #[test]
    fn clear_truncates_journal() {
        let (store, dir) = make_temp_store();
        store.append(record("x")).expect("append");
        store.clear().expect("clear");
        assert!(store.is_empty());

        let content = fs::read_to_string(dir.path().join("journal.jsonl")).expect("read");
        assert!(content.is_empty());
    }

    #[test]
    fn config_defaults() {
        let config = LocalStoreConfig::default();
        assert_eq!(config.max_entries, 100_000);
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert!(config.journal.is_none());
    }
}
