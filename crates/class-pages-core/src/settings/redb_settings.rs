//! # redb-backed Settings Storage
//!
//! A disk-backed settings store using the redb embedded database.
//!
//! One table maps the namespaced key to the JSON-encoded value. Every
//! `write`/`write_batch` is a single write transaction, so a batch either
//! lands entirely or not at all.

use super::{SettingKey, SettingsStore};
use crate::types::ClassPagesError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;
use std::path::Path;

/// Table for settings: namespaced key -> JSON bytes
const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

fn io_error(e: impl std::fmt::Display) -> ClassPagesError {
    ClassPagesError::IoError(e.to_string())
}

/// A disk-backed settings store.
pub struct RedbSettings {
    db: Database,
}

impl std::fmt::Debug for RedbSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSettings").finish_non_exhaustive()
    }
}

impl RedbSettings {
    /// Open or create a settings database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClassPagesError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Create the table so reads on a fresh database succeed.
        {
            let write_txn = db.begin_write().map_err(io_error)?;
            let _ = write_txn.open_table(SETTINGS).map_err(io_error)?;
            write_txn.commit().map_err(io_error)?;
        }

        Ok(Self { db })
    }

    /// Every stored key, in key order.
    pub fn keys(&self) -> Result<Vec<SettingKey>, ClassPagesError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(SETTINGS).map_err(io_error)?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(io_error)? {
            let (key, _) = entry.map_err(io_error)?;
            keys.push(key.value().parse()?);
        }
        Ok(keys)
    }
}

impl SettingsStore for RedbSettings {
    fn read(&self, key: SettingKey) -> Result<Option<Value>, ClassPagesError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(SETTINGS).map_err(io_error)?;
        let Some(bytes) = table.get(key.namespaced().as_str()).map_err(io_error)? else {
            return Ok(None);
        };
        serde_json::from_slice(bytes.value())
            .map(Some)
            .map_err(|e| ClassPagesError::DeserializationError(e.to_string()))
    }

    fn write(&mut self, key: SettingKey, value: Value) -> Result<(), ClassPagesError> {
        self.write_batch(vec![(key, value)])
    }

    fn write_batch(&mut self, entries: Vec<(SettingKey, Value)>) -> Result<(), ClassPagesError> {
        // Encode everything before the transaction opens.
        let encoded = entries
            .into_iter()
            .map(|(key, value)| {
                serde_json::to_vec(&value)
                    .map(|bytes| (key.namespaced(), bytes))
                    .map_err(|e| ClassPagesError::SerializationError(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(io_error)?;
            for (key, bytes) in &encoded {
                table
                    .insert(key.as_str(), bytes.as_slice())
                    .map_err(io_error)?;
            }
        }
        write_txn.commit().map_err(io_error)?;
        Ok(())
    }
}
