//! # Settings
//!
//! The persisted key-value configuration and its stores.
//!
//! ## Keyspace
//!
//! All keys live under the `class-pages.` namespace and hold JSON values:
//! - `classes-sources`, `subclasses-sources`, `spells-sources`: ordered source keys
//! - `spell-lists`: class identifier -> spell uuids
//! - `subclass-labels`, `class-backdrops`: class identifier -> override
//!
//! ## Stores
//!
//! - `MemorySettings`: volatile, for tests and throwaway hosts
//! - `RedbSettings`: disk-backed, one ACID transaction per write

mod gateway;
mod redb_settings;

pub use gateway::{SettingsBackend, SettingsGateway};
pub use redb_settings::RedbSettings;

use crate::primitives::SETTINGS_NAMESPACE;
use crate::types::ClassPagesError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A key of the settings keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    ClassesSources,
    SubclassesSources,
    SpellsSources,
    SpellLists,
    SubclassLabels,
    ClassBackdrops,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::ClassesSources,
        SettingKey::SubclassesSources,
        SettingKey::SpellsSources,
        SettingKey::SpellLists,
        SettingKey::SubclassLabels,
        SettingKey::ClassBackdrops,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ClassesSources => "classes-sources",
            SettingKey::SubclassesSources => "subclasses-sources",
            SettingKey::SpellsSources => "spells-sources",
            SettingKey::SpellLists => "spell-lists",
            SettingKey::SubclassLabels => "subclass-labels",
            SettingKey::ClassBackdrops => "class-backdrops",
        }
    }

    /// The full key as stored, e.g. `class-pages.spell-lists`.
    #[must_use]
    pub fn namespaced(&self) -> String {
        format!("{}.{}", SETTINGS_NAMESPACE, self.as_str())
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ClassPagesError;

    /// Accepts the bare or the namespaced key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bare = s
            .strip_prefix(SETTINGS_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(s);
        SettingKey::ALL
            .into_iter()
            .find(|k| k.as_str() == bare)
            .ok_or_else(|| ClassPagesError::DeserializationError(format!("unknown setting key: {}", s)))
    }
}

/// Raw JSON access to a settings store.
pub trait SettingsStore {
    /// `None` when the key was never written.
    fn read(&self, key: SettingKey) -> Result<Option<Value>, ClassPagesError>;

    fn write(&mut self, key: SettingKey, value: Value) -> Result<(), ClassPagesError>;

    /// Write several keys. Stores with transactions apply them atomically.
    fn write_batch(&mut self, entries: Vec<(SettingKey, Value)>) -> Result<(), ClassPagesError> {
        for (key, value) in entries {
            self.write(key, value)?;
        }
        Ok(())
    }
}

/// Volatile settings store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySettings {
    values: BTreeMap<SettingKey, Value>,
}

impl MemorySettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn read(&self, key: SettingKey) -> Result<Option<Value>, ClassPagesError> {
        Ok(self.values.get(&key).cloned())
    }

    fn write(&mut self, key: SettingKey, value: Value) -> Result<(), ClassPagesError> {
        self.values.insert(key, value);
        Ok(())
    }
}
