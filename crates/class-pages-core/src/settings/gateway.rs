//! # Settings Gateway
//!
//! Typed read/write/import/export boundary over a settings store.
//!
//! Reads are pure: a missing or `null` value reads as the type's default.
//! Writes never trigger recomputation; the next aggregation pass picks them
//! up. Every mutating operation takes the caller and fails with `Forbidden`
//! before touching the store unless the caller is privileged.

use super::{MemorySettings, RedbSettings, SettingKey, SettingsStore};
use crate::overlay::{
    ExportDocument, ImportMode, OverrideEdit, Overrides, SpellListAssignment, export_document,
    import_document, normalize_keys,
};
use crate::types::{Caller, ClassPagesError, RecordType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Storage backend for the gateway.
#[derive(Debug)]
pub enum SettingsBackend {
    /// Volatile settings.
    InMemory(MemorySettings),
    /// Disk-backed settings using redb.
    Persistent(RedbSettings),
}

impl Default for SettingsBackend {
    fn default() -> Self {
        Self::InMemory(MemorySettings::new())
    }
}

impl SettingsBackend {
    fn store(&self) -> &dyn SettingsStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }

    fn store_mut(&mut self) -> &mut dyn SettingsStore {
        match self {
            Self::InMemory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

/// Typed access to the settings keyspace.
#[derive(Debug, Default)]
pub struct SettingsGateway {
    backend: SettingsBackend,
}

impl SettingsGateway {
    /// A gateway over volatile settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_backend(backend: SettingsBackend) -> Self {
        Self { backend }
    }

    /// A gateway over a redb database at the given path.
    pub fn open_persistent(path: impl AsRef<Path>) -> Result<Self, ClassPagesError> {
        Ok(Self::with_backend(SettingsBackend::Persistent(
            RedbSettings::open(path)?,
        )))
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, SettingsBackend::Persistent(_))
    }

    // =========================================================================
    // RAW ACCESS
    // =========================================================================

    /// Read a key, falling back to the default when unset.
    pub fn get<T: DeserializeOwned + Default>(&self, key: SettingKey) -> Result<T, ClassPagesError> {
        match self.backend.store().read(key)? {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ClassPagesError::DeserializationError(format!("{}: {}", key.namespaced(), e))
            }),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: SettingKey, value: &T) -> Result<(), ClassPagesError> {
        let value = to_value(value)?;
        self.backend.store_mut().write(key, value)
    }

    // =========================================================================
    // SOURCES
    // =========================================================================

    /// Ordered source keys for a record family.
    pub fn sources(&self, record_type: RecordType) -> Result<Vec<String>, ClassPagesError> {
        self.get(record_type.sources_key())
    }

    /// Every family's sources, keyed by family.
    pub fn all_sources(&self) -> Result<BTreeMap<RecordType, Vec<String>>, ClassPagesError> {
        RecordType::ALL
            .into_iter()
            .map(|t| self.sources(t).map(|s| (t, s)))
            .collect()
    }

    /// Replace a family's sources. Keys are trimmed, blanks dropped and
    /// repeats collapsed; the stored list is returned.
    pub fn set_sources(
        &mut self,
        caller: Caller,
        record_type: RecordType,
        sources: Vec<String>,
    ) -> Result<Vec<String>, ClassPagesError> {
        caller.require_privileged()?;
        let sources = normalize_keys(sources);
        self.set(record_type.sources_key(), &sources)?;
        Ok(sources)
    }

    // =========================================================================
    // SPELL LISTS
    // =========================================================================

    pub fn spell_lists(&self) -> Result<SpellListAssignment, ClassPagesError> {
        self.get(SettingKey::SpellLists)
    }

    /// Import a document. A malformed document fails before any write.
    pub fn import_assignments(
        &mut self,
        caller: Caller,
        document: &str,
        mode: ImportMode,
    ) -> Result<SpellListAssignment, ClassPagesError> {
        caller.require_privileged()?;
        let current = self.spell_lists()?;
        let result = import_document(&current, document, mode)?;
        self.set(SettingKey::SpellLists, &result)?;
        Ok(result)
    }

    /// Export the persisted assignment, named after `epoch_millis`.
    pub fn export_assignments(&self, epoch_millis: u128) -> Result<ExportDocument, ClassPagesError> {
        export_document(&self.spell_lists()?, epoch_millis)
    }

    /// Replace one class's list.
    pub fn set_spell_list(
        &mut self,
        caller: Caller,
        class_identifier: &str,
        uuids: Vec<String>,
    ) -> Result<SpellListAssignment, ClassPagesError> {
        caller.require_privileged()?;
        let mut lists = self.spell_lists()?;
        lists.set_list(class_identifier, uuids);
        self.set(SettingKey::SpellLists, &lists)?;
        Ok(lists)
    }

    /// Add or remove one spell on one class's list.
    pub fn toggle_spell(
        &mut self,
        caller: Caller,
        class_identifier: &str,
        uuid: &str,
        member: bool,
    ) -> Result<SpellListAssignment, ClassPagesError> {
        caller.require_privileged()?;
        let mut lists = self.spell_lists()?;
        lists.toggle(class_identifier, uuid, member);
        self.set(SettingKey::SpellLists, &lists)?;
        Ok(lists)
    }

    // =========================================================================
    // OVERRIDES
    // =========================================================================

    pub fn overrides(&self) -> Result<Overrides, ClassPagesError> {
        Ok(Overrides {
            labels: self.get(SettingKey::SubclassLabels)?,
            backdrops: self.get(SettingKey::ClassBackdrops)?,
        })
    }

    /// Apply an override edit. Both override keys are written in one batch.
    pub fn set_override(
        &mut self,
        caller: Caller,
        class_identifier: &str,
        edit: OverrideEdit,
    ) -> Result<Overrides, ClassPagesError> {
        caller.require_privileged()?;
        let mut overrides = self.overrides()?;
        overrides.apply_edit(class_identifier, edit);
        let batch = vec![
            (SettingKey::SubclassLabels, to_value(&overrides.labels)?),
            (SettingKey::ClassBackdrops, to_value(&overrides.backdrops)?),
        ];
        self.backend.store_mut().write_batch(batch)?;
        Ok(overrides)
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ClassPagesError> {
    serde_json::to_value(value).map_err(|e| ClassPagesError::SerializationError(e.to_string()))
}
