//! # Index Normalization
//!
//! The synchronous half of index loading: turns per-source batches of raw
//! catalog entries into canonical records.
//!
//! - Concatenate batches in source order
//! - Keep only entries declaring the requested record type
//! - Normalize legacy/current field paths (once, here)
//! - Deduplicate classes by identifier, first seen wins
//!
//! Fetching the batches is the host's job; see the app crate's loader.

use crate::primitives::DESCRIPTION_FIELD;
use crate::record::{ClassRecord, EntryRef, RawEntry, SpellRecord, SubclassRecord};
use crate::types::{RecordType, Report};
use std::collections::BTreeSet;

/// Raw entries fetched from one catalog source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    pub source: String,
    pub entries: Vec<RawEntry>,
}

impl SourceBatch {
    pub fn new(source: impl Into<String>, entries: Vec<RawEntry>) -> Self {
        Self {
            source: source.into(),
            entries,
        }
    }
}

/// Normalized records plus whatever was excluded on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub reports: Vec<Report>,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            reports: Vec::new(),
        }
    }
}

/// Conversion from a raw entry into a canonical record.
pub trait Normalize: Sized {
    const RECORD_TYPE: RecordType;

    /// Returns a report instead of a record when the entry cannot be used.
    fn normalize(raw: &RawEntry, source: &str) -> Result<Self, Report>;
}

impl Normalize for ClassRecord {
    const RECORD_TYPE: RecordType = RecordType::Class;

    fn normalize(raw: &RawEntry, source: &str) -> Result<Self, Report> {
        let identifier = raw
            .text_field("identifier")
            .ok_or_else(|| Report::DuplicateClass {
                name: raw.name.clone(),
                uuid: raw.uuid.clone(),
                identifier: None,
            })?;
        Ok(Self {
            entry: EntryRef::from_raw(raw, source),
            identifier,
            description: description_of(raw),
        })
    }
}

impl Normalize for SubclassRecord {
    const RECORD_TYPE: RecordType = RecordType::Subclass;

    fn normalize(raw: &RawEntry, source: &str) -> Result<Self, Report> {
        Ok(Self {
            entry: EntryRef::from_raw(raw, source),
            identifier: raw.text_field("identifier"),
            class_identifier: raw.text_field("classIdentifier"),
            description: description_of(raw),
        })
    }
}

impl Normalize for SpellRecord {
    const RECORD_TYPE: RecordType = RecordType::Spell;

    fn normalize(raw: &RawEntry, source: &str) -> Result<Self, Report> {
        Ok(Self {
            entry: EntryRef::from_raw(raw, source),
            level: raw.integer_field("level"),
            school: raw.text_field("school"),
            description: description_of(raw),
        })
    }
}

fn description_of(raw: &RawEntry) -> String {
    raw.field(DESCRIPTION_FIELD)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Normalize every entry of the record's type, in source order.
pub fn normalize_batches<T: Normalize>(batches: &[SourceBatch]) -> Loaded<T> {
    let mut loaded = Loaded::default();
    for batch in batches {
        for raw in batch.entries.iter().filter(|e| e.is(T::RECORD_TYPE)) {
            match T::normalize(raw, &batch.source) {
                Ok(record) => loaded.records.push(record),
                Err(report) => loaded.reports.push(report),
            }
        }
    }
    loaded
}

/// Load classes: normalize, then drop later duplicates of an identifier.
pub fn load_classes(batches: &[SourceBatch]) -> Loaded<ClassRecord> {
    let normalized = normalize_batches::<ClassRecord>(batches);
    let mut seen = BTreeSet::new();
    let mut loaded = Loaded {
        records: Vec::with_capacity(normalized.records.len()),
        reports: normalized.reports,
    };

    for class in normalized.records {
        if seen.insert(class.identifier.clone()) {
            loaded.records.push(class);
        } else {
            loaded.reports.push(Report::DuplicateClass {
                name: class.entry.name,
                uuid: class.entry.uuid,
                identifier: Some(class.identifier),
            });
        }
    }
    loaded
}

pub fn load_subclasses(batches: &[SourceBatch]) -> Loaded<SubclassRecord> {
    normalize_batches(batches)
}

pub fn load_spells(batches: &[SourceBatch]) -> Loaded<SpellRecord> {
    normalize_batches(batches)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn class(uuid: &str, name: &str, identifier: Option<&str>) -> RawEntry {
        let system = match identifier {
            Some(id) => json!({"identifier": id}),
            None => json!({}),
        };
        RawEntry {
            uuid: uuid.to_string(),
            id: uuid.to_string(),
            entry_type: "class".to_string(),
            name: name.to_string(),
            system: Some(system),
            ..RawEntry::default()
        }
    }

    #[test]
    fn duplicate_identifier_keeps_first_source() {
        let batches = vec![
            SourceBatch::new("a", vec![class("a.w", "Wizard", Some("wizard"))]),
            SourceBatch::new("b", vec![class("b.w", "Wizard (Homebrew)", Some("wizard"))]),
        ];

        let loaded = load_classes(&batches);

        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].entry.uuid, "a.w");
        assert_eq!(loaded.reports.len(), 1);
        assert!(matches!(
            &loaded.reports[0],
            Report::DuplicateClass { uuid, identifier: Some(id), .. } if uuid == "b.w" && id == "wizard"
        ));
    }

    #[test]
    fn missing_identifier_reported_as_duplicate() {
        let batches = vec![SourceBatch::new(
            "a",
            vec![class("a.x", "Nameless", None), class("a.f", "Fighter", Some("fighter"))],
        )];

        let loaded = load_classes(&batches);

        assert_eq!(loaded.records.len(), 1);
        assert!(matches!(
            &loaded.reports[0],
            Report::DuplicateClass { identifier: None, .. }
        ));
    }

    #[test]
    fn other_types_are_filtered_out() {
        let mut feat = class("a.feat", "Alert", Some("alert"));
        feat.entry_type = "feat".to_string();
        let batches = vec![SourceBatch::new("a", vec![feat])];

        let loaded = load_classes(&batches);
        assert!(loaded.records.is_empty());
        assert!(loaded.reports.is_empty());
    }

    #[test]
    fn spells_normalize_legacy_fields() {
        let raw = RawEntry {
            uuid: "s1".to_string(),
            entry_type: "spell".to_string(),
            name: "Shield".to_string(),
            data: Some(json!({"level": 1, "school": "abj"})),
            ..RawEntry::default()
        };
        let loaded = load_spells(&[SourceBatch::new("spells", vec![raw])]);
        let spell = &loaded.records[0];
        assert_eq!(spell.level, Some(1));
        assert_eq!(spell.school.as_deref(), Some("abj"));
        assert_eq!(spell.entry.source, "spells");
    }

    #[test]
    fn empty_batches_load_nothing() {
        let loaded = load_subclasses(&[]);
        assert!(loaded.records.is_empty());
        assert!(loaded.reports.is_empty());
    }
}
