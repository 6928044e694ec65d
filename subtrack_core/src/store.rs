//! Subscription record stores.
//!
//! The query layer only needs [`SubscriptionStore`]; two implementations are
//! provided:
//! - [`MemoryStore`] for embedding and tests
//! - [`JsonFileStore`], a single JSON document with file locking and atomic
//!   replacement

use crate::{Error, Result, SubscriptionRecord};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// CRUD access to persisted subscription records
pub trait SubscriptionStore {
    /// Every stored record, unfiltered
    fn list_all(&self) -> Result<Vec<SubscriptionRecord>>;

    /// Create (no id) or replace (id present) a record, returning its id
    fn save(&mut self, record: SubscriptionRecord) -> Result<i64>;

    /// Delete a record; `false` if no record had that id
    fn delete_by_id(&mut self, id: i64) -> Result<bool>;

    fn get_by_id(&self, id: i64) -> Result<Option<SubscriptionRecord>>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Store backed by an ordered map; ids start at 1
#[derive(Clone, Debug)]
pub struct MemoryStore {
    records: BTreeMap<i64, SubscriptionRecord>,
    next_id: i64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with records, saved in order
    pub fn with_records(records: impl IntoIterator<Item = SubscriptionRecord>) -> Result<Self> {
        let mut store = Self::new();
        for record in records {
            store.save(record)?;
        }
        Ok(store)
    }
}

impl SubscriptionStore for MemoryStore {
    fn list_all(&self) -> Result<Vec<SubscriptionRecord>> {
        Ok(self.records.values().cloned().collect())
    }

    fn save(&mut self, mut record: SubscriptionRecord) -> Result<i64> {
        let id = match record.id {
            Some(id) if self.records.contains_key(&id) => id,
            Some(id) => return Err(Error::NotFound(id)),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        record.id = Some(id);
        self.records.insert(id, record);
        Ok(id)
    }

    fn delete_by_id(&mut self, id: i64) -> Result<bool> {
        Ok(self.records.remove(&id).is_some())
    }

    fn get_by_id(&self, id: i64) -> Result<Option<SubscriptionRecord>> {
        Ok(self.records.get(&id).cloned())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// On-disk document.
///
/// Entries are kept as raw JSON so that one unreadable entry neither blocks
/// the others nor gets dropped when the file is rewritten.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreDocument {
    #[serde(default = "first_id")]
    next_id: i64,
    #[serde(default)]
    subscriptions: Vec<Value>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            next_id: first_id(),
            subscriptions: Vec::new(),
        }
    }
}

fn first_id() -> i64 {
    1
}

fn id_space_exhausted() -> Error {
    Error::Store("id space exhausted".into())
}

fn entry_id(entry: &Value) -> Option<i64> {
    entry.get("id").and_then(Value::as_i64)
}

/// Store persisted as a single JSON document.
///
/// Readers take a shared lock on the document. Writers hold an exclusive lock
/// on a sibling `.lock` file for the whole read-modify-write, then replace the
/// document atomically via a temp file in the same directory.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Missing file reads as an empty store. A file that isn't a store
    /// document is an error: it is never silently replaced.
    fn load(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        if contents.trim().is_empty() {
            return Ok(StoreDocument::default());
        }

        let document: StoreDocument = serde_json::from_str(&contents)?;
        tracing::debug!(
            "Loaded {} subscription entries from {:?}",
            document.subscriptions.len(),
            self.path
        );
        Ok(document)
    }

    fn write(&self, document: &StoreDocument) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("store path {:?} has no parent", self.path)))?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Load, modify and write back under the writer lock
    fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreDocument) -> Result<T>,
    {
        self.ensure_parent_dir()?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let outcome = self.load().and_then(|mut document| {
            let value = f(&mut document)?;
            self.write(&document)?;
            Ok(value)
        });

        lock.unlock()?;
        outcome
    }
}

impl SubscriptionStore for JsonFileStore {
    fn list_all(&self) -> Result<Vec<SubscriptionRecord>> {
        let document = self.load()?;
        let mut records = Vec::with_capacity(document.subscriptions.len());

        for (index, entry) in document.subscriptions.into_iter().enumerate() {
            match serde_json::from_value::<SubscriptionRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable store entry {}: {}", index, e);
                }
            }
        }

        Ok(records)
    }

    fn save(&mut self, mut record: SubscriptionRecord) -> Result<i64> {
        self.update(|document| {
            let highest = document.subscriptions.iter().filter_map(entry_id).max();

            let (id, slot) = match record.id {
                Some(id) => {
                    let slot = document
                        .subscriptions
                        .iter()
                        .position(|entry| entry_id(entry) == Some(id))
                        .ok_or(Error::NotFound(id))?;
                    (id, Some(slot))
                }
                None => {
                    let after_highest = match highest {
                        Some(h) => h.checked_add(1).ok_or_else(id_space_exhausted)?,
                        None => 1,
                    };
                    let id = document.next_id.max(after_highest);
                    document.next_id = id.checked_add(1).ok_or_else(id_space_exhausted)?;
                    (id, None)
                }
            };

            record.id = Some(id);
            let entry = serde_json::to_value(&record)?;
            match slot {
                Some(slot) => document.subscriptions[slot] = entry,
                None => document.subscriptions.push(entry),
            }

            tracing::debug!("Saved subscription {} ({})", id, record.unique_key);
            Ok(id)
        })
    }

    fn delete_by_id(&mut self, id: i64) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        self.update(|document| {
            let before = document.subscriptions.len();
            document.subscriptions.retain(|entry| entry_id(entry) != Some(id));
            let removed = document.subscriptions.len() != before;
            if removed {
                tracing::debug!("Deleted subscription {}", id);
            }
            Ok(removed)
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<SubscriptionRecord>> {
        Ok(self.list_all()?.into_iter().find(|record| record.id == Some(id)))
    }
}
