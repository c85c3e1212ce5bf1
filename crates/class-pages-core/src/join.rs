//! # Relational Joiner
//!
//! Links subclasses to their class and partitions spell list assignments
//! into level buckets.
//!
//! Both operations exclude what they cannot place and say so through
//! `Report`s; neither fails.

use crate::record::{ClassRecord, SpellRecord, SubclassRecord, sort_by_name};
use crate::types::Report;
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SUBCLASS JOIN
// =============================================================================

/// Subclasses grouped by class identifier.
///
/// Every given class has an entry, possibly empty. Groups are name-sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubclassJoin {
    pub groups: BTreeMap<String, Vec<SubclassRecord>>,
    pub reports: Vec<Report>,
}

/// Group subclasses under their class; orphans are excluded and reported.
pub fn join_subclasses(classes: &[ClassRecord], subclasses: Vec<SubclassRecord>) -> SubclassJoin {
    let mut groups: BTreeMap<String, Vec<SubclassRecord>> = classes
        .iter()
        .map(|c| (c.identifier.clone(), Vec::new()))
        .collect();
    let mut reports = Vec::new();

    for subclass in subclasses {
        let group = subclass
            .class_identifier
            .as_ref()
            .and_then(|key| groups.get_mut(key));
        match group {
            Some(group) => group.push(subclass),
            None => reports.push(Report::OrphanSubclass {
                name: subclass.entry.name,
                uuid: subclass.entry.uuid,
                class_identifier: subclass.class_identifier,
            }),
        }
    }

    for group in groups.values_mut() {
        sort_by_name(group);
    }

    SubclassJoin { groups, reports }
}

// =============================================================================
// SPELL INDEX
// =============================================================================

/// Spells addressable by uuid. The first record loaded for a uuid wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpellIndex {
    by_uuid: BTreeMap<String, SpellRecord>,
}

impl SpellIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spell: SpellRecord) {
        self.by_uuid.entry(spell.entry.uuid.clone()).or_insert(spell);
    }

    #[must_use]
    pub fn get(&self, uuid: &str) -> Option<&SpellRecord> {
        self.by_uuid.get(uuid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }

    /// Spells in uuid order.
    pub fn spells(&self) -> impl Iterator<Item = &SpellRecord> {
        self.by_uuid.values()
    }
}

impl FromIterator<SpellRecord> for SpellIndex {
    fn from_iter<I: IntoIterator<Item = SpellRecord>>(iter: I) -> Self {
        let mut index = Self::new();
        for spell in iter {
            index.insert(spell);
        }
        index
    }
}

// =============================================================================
// SPELL PARTITION
// =============================================================================

/// The spells of one level on one class page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellBucket {
    pub level: u8,
    pub label: String,
    pub spells: Vec<SpellRecord>,
}

/// Level buckets plus exclusions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpellPartition {
    pub buckets: Vec<SpellBucket>,
    pub reports: Vec<Report>,
}

/// Partition one class's assigned uuids into level buckets.
///
/// One bucket exists per vocabulary level, in ascending order, even when
/// empty. A uuid is placed only if it resolves and its level and school
/// are both valid. Repeated uuids are placed or reported once.
pub fn partition_spells(
    class_identifier: &str,
    assignment: &[String],
    index: &SpellIndex,
    vocabulary: &Vocabulary,
) -> SpellPartition {
    let mut buckets: BTreeMap<u8, SpellBucket> = vocabulary
        .levels()
        .map(|(level, label)| {
            (
                level,
                SpellBucket {
                    level,
                    label: label.to_string(),
                    spells: Vec::new(),
                },
            )
        })
        .collect();
    let mut reports = Vec::new();
    let mut seen = BTreeSet::new();

    for uuid in assignment {
        if !seen.insert(uuid.as_str()) {
            continue;
        }
        let Some(spell) = index.get(uuid) else {
            reports.push(Report::UnresolvedSpell {
                class_identifier: class_identifier.to_string(),
                uuid: uuid.clone(),
            });
            continue;
        };

        let level = spell.level.and_then(|raw| vocabulary.level(raw));
        let Some(bucket) = level.and_then(|level| buckets.get_mut(&level)) else {
            reports.push(Report::InvalidSpellLevel {
                class_identifier: class_identifier.to_string(),
                uuid: uuid.clone(),
                name: spell.entry.name.clone(),
                level: spell.level,
            });
            continue;
        };

        if !spell.school.as_deref().is_some_and(|s| vocabulary.is_school(s)) {
            reports.push(Report::InvalidSpellSchool {
                class_identifier: class_identifier.to_string(),
                uuid: uuid.clone(),
                name: spell.entry.name.clone(),
                school: spell.school.clone(),
            });
            continue;
        }

        bucket.spells.push(spell.clone());
    }

    let buckets = buckets
        .into_values()
        .map(|mut bucket| {
            sort_by_name(&mut bucket.spells);
            bucket
        })
        .collect();

    SpellPartition { buckets, reports }
}

// =============================================================================
// TESTS
// =============================================================================
