//! # Catalog Records
//!
//! Raw catalog entries and the canonical record shapes they normalize into.
//!
//! Raw entries may carry their fields under the current `system` object or
//! the legacy `data` object. [`RawEntry::field`] is the only place that
//! knows about both; everything downstream reads canonical records.

use crate::types::RecordType;
use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

// =============================================================================
// RAW ENTRY
// =============================================================================

/// One entry of a catalog index, as delivered by the catalog collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub uuid: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RawEntry {
    /// Whether this entry declares the given record type.
    #[must_use]
    pub fn is(&self, record_type: RecordType) -> bool {
        self.entry_type == record_type.as_str()
    }

    /// Read a field by dotted path, preferring `system` over legacy `data`.
    /// `null` counts as absent.
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&Value> {
        self.system
            .as_ref()
            .and_then(|v| lookup(v, path))
            .or_else(|| self.data.as_ref().and_then(|v| lookup(v, path)))
    }

    /// Read a non-blank string field, trimmed.
    #[must_use]
    pub fn text_field(&self, path: &str) -> Option<String> {
        self.field(path)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Read an integer field. Numeric strings are accepted.
    #[must_use]
    pub fn integer_field(&self, path: &str) -> Option<i64> {
        match self.field(path)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Keep only the projected `system.*` / `data.*` fields.
    ///
    /// Top-level metadata (`uuid`, `_id`, `type`, `name`, `img`) is always
    /// kept. Paths that do not exist are skipped.
    #[must_use]
    pub fn project(&self, fields: &[String]) -> RawEntry {
        let mut system = Map::new();
        let mut data = Map::new();

        for field in fields {
            let (root, target, path) = if let Some(path) = field.strip_prefix("system.") {
                (self.system.as_ref(), &mut system, path)
            } else if let Some(path) = field.strip_prefix("data.") {
                (self.data.as_ref(), &mut data, path)
            } else {
                continue;
            };
            if let Some(value) = root.and_then(|v| lookup(v, path)) {
                insert_path(target, path, value.clone());
            }
        }

        RawEntry {
            uuid: self.uuid.clone(),
            id: self.id.clone(),
            entry_type: self.entry_type.clone(),
            name: self.name.clone(),
            img: self.img.clone(),
            system: self.system.as_ref().map(|_| Value::Object(system)),
            data: self.data.as_ref().map(|_| Value::Object(data)),
        }
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |value, segment| value.get(segment))
        .filter(|value| !value.is_null())
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

// =============================================================================
// CANONICAL RECORDS
// =============================================================================

/// Metadata every canonical record carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    pub uuid: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    /// Catalog source key this entry was loaded from.
    pub source: String,
}

impl EntryRef {
    pub(crate) fn from_raw(raw: &RawEntry, source: &str) -> Self {
        Self {
            uuid: raw.uuid.clone(),
            id: raw.id.clone(),
            name: raw.name.clone(),
            img: raw.img.clone(),
            source: source.to_string(),
        }
    }
}

/// A class. `identifier` is unique across one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    #[serde(flatten)]
    pub entry: EntryRef,
    pub identifier: String,
    pub description: String,
}

/// A subclass, linked to its class through `class_identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubclassRecord {
    #[serde(flatten)]
    pub entry: EntryRef,
    pub identifier: Option<String>,
    pub class_identifier: Option<String>,
    pub description: String,
}

/// A spell. Level and school are kept raw here and validated when the
/// spell is partitioned onto a class page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellRecord {
    #[serde(flatten)]
    pub entry: EntryRef,
    pub level: Option<i64>,
    pub school: Option<String>,
    pub description: String,
}

/// Common access to the canonical record shapes.
pub trait CatalogRecord {
    const RECORD_TYPE: RecordType;

    fn entry(&self) -> &EntryRef;

    /// Raw (unrendered) description text.
    fn description(&self) -> &str;

    fn name(&self) -> &str {
        &self.entry().name
    }

    fn uuid(&self) -> &str {
        &self.entry().uuid
    }
}

impl CatalogRecord for ClassRecord {
    const RECORD_TYPE: RecordType = RecordType::Class;

    fn entry(&self) -> &EntryRef {
        &self.entry
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl CatalogRecord for SubclassRecord {
    const RECORD_TYPE: RecordType = RecordType::Subclass;

    fn entry(&self) -> &EntryRef {
        &self.entry
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl CatalogRecord for SpellRecord {
    const RECORD_TYPE: RecordType = RecordType::Spell;

    fn entry(&self) -> &EntryRef {
        &self.entry
    }

    fn description(&self) -> &str {
        &self.description
    }
}

// =============================================================================
// NAME ORDERING
// =============================================================================

thread_local! {
    /// Root-locale collator at secondary strength: accents count, case does
    /// not.
    static NAME_COLLATOR: Option<CollatorBorrowed<'static>> = {
        let mut options = CollatorOptions::default();
        options.strength = Some(Strength::Secondary);
        Collator::try_new(Default::default(), options).ok()
    };
}

/// Case-insensitive locale name comparison.
///
/// `Éclair` sorts before `Fireball`. Names the collator treats as equal
/// fall back to their lowercased code points.
#[must_use]
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let collated = NAME_COLLATOR.with(|collator| match collator {
        Some(collator) => collator.compare(a, b),
        None => Ordering::Equal,
    });
    collated.then_with(|| {
        a.chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase))
    })
}

/// Sort records by name. Stable: equal names keep their source order.
pub fn sort_by_name<T: CatalogRecord>(records: &mut [T]) {
    records.sort_by(|a, b| compare_names(a.name(), b.name()));
}

// =============================================================================
// TESTS
// =============================================================================
