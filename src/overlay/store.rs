use super::backend::KeyValueStore;
use crate::core::{AdminError, Record, Result};
use std::sync::Arc;
use tracing::{Level, event, info_span};

/// Locally owned records of one kind, persisted as one JSON array.
///
/// Loaded once when opened. Every mutation builds the next sequence, writes
/// it in full, and only then replaces the in-memory copy, so a failed write
/// leaves memory and storage in agreement. No locking: concurrent writers
/// race and the last one wins.
pub struct OverlayStore<T> {
    storage: Arc<dyn KeyValueStore>,
    key: String,
    records: Vec<T>,
}

impl<T: Record> OverlayStore<T> {
    /// Opens the overlay under the record kind's default key.
    pub fn open(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_key(storage, T::OVERLAY_KEY)
    }

    pub fn with_key(storage: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Result<Self> {
        let mut store = Self {
            storage,
            key: key.into(),
            records: Vec::new(),
        };
        store.records = store.load()?;
        Ok(store)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the persisted sequence. An absent key is an empty overlay; a
    /// blob that does not parse is a persistence error.
    pub fn load(&self) -> Result<Vec<T>> {
        match self.storage.get(&self.key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|err| {
                event!(Level::ERROR, key = %self.key, error = %err, "overlay blob is malformed");
                AdminError::Persistence(format!(
                    "Overlay '{}' is not a valid {} list: {}",
                    self.key,
                    T::LABEL,
                    err
                ))
            }),
        }
    }

    /// Serializes the full sequence and overwrites the persisted blob.
    pub fn save(&self, records: &[T]) -> Result<()> {
        let raw = serde_json::to_string(records).map_err(|err| {
            AdminError::Persistence(format!("Failed to serialize overlay '{}': {}", self.key, err))
        })?;
        self.storage.set(&self.key, &raw)?;
        event!(Level::DEBUG, key = %self.key, records = records.len(), "overlay saved");
        Ok(())
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record. Its id must not already be in the overlay.
    pub fn create(&mut self, record: T) -> Result<()> {
        let span = info_span!("overlay.create", key = %self.key, id = record.id());
        let _enter = span.enter();

        if self.contains(record.id()) {
            return Err(AdminError::Validation(format!(
                "{} {} already exists locally",
                T::LABEL,
                record.id()
            )));
        }
        let mut next = self.records.clone();
        next.push(record);
        self.commit(next)
    }

    /// Replaces the record with the same id.
    pub fn update(&mut self, record: T) -> Result<()> {
        let span = info_span!("overlay.update", key = %self.key, id = record.id());
        let _enter = span.enter();

        let id = record.id();
        if !self.contains(id) {
            return Err(AdminError::NotFound(id));
        }
        let next = self
            .records
            .iter()
            .map(|existing| {
                if existing.id() == id {
                    record.clone()
                } else {
                    existing.clone()
                }
            })
            .collect();
        self.commit(next)
    }

    /// Removes and returns the record with `id`.
    pub fn delete(&mut self, id: u64) -> Result<T> {
        let span = info_span!("overlay.delete", key = %self.key, id = id);
        let _enter = span.enter();

        let removed = self.get(id).cloned().ok_or(AdminError::NotFound(id))?;
        let next = self
            .records
            .iter()
            .filter(|existing| existing.id() != id)
            .cloned()
            .collect();
        self.commit(next)?;
        Ok(removed)
    }

    fn commit(&mut self, next: Vec<T>) -> Result<()> {
        if let Err(err) = self.save(&next) {
            event!(Level::ERROR, error = %err, "overlay write failed");
            return Err(err);
        }
        self.records = next;
        Ok(())
    }
}
