//! # Hierarchy
//!
//! One aggregation pass minus I/O: joins loaded records, partitions spell
//! lists and overlays persisted configuration. The result is the class tree
//! navigation and views are derived from.

use crate::index::Loaded;
use crate::join::{SpellBucket, SpellIndex, join_subclasses, partition_spells};
use crate::overlay::{Overrides, SpellListAssignment, apply_label_and_backdrop};
use crate::record::{ClassRecord, SpellRecord, SubclassRecord, sort_by_name};
use crate::types::Report;
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};

/// A class with everything derived for it in this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub class: ClassRecord,
    pub subclasses: Vec<SubclassRecord>,
    pub spell_lists: Vec<SpellBucket>,
    /// Subclass tab label: override or the host default.
    pub label: String,
    pub backdrop: Option<String>,
}

impl ClassNode {
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.class.identifier
    }

    /// Levels with at least one spell, ascending.
    pub fn populated_levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.spell_lists
            .iter()
            .filter(|b| !b.spells.is_empty())
            .map(|b| b.level)
    }
}

/// Classes in name order, plus everything excluded while building them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub classes: Vec<ClassNode>,
    pub reports: Vec<Report>,
}

impl Hierarchy {
    #[must_use]
    pub fn class(&self, identifier: &str) -> Option<&ClassNode> {
        self.classes.iter().find(|c| c.identifier() == identifier)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Persisted configuration a pass overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay<'a> {
    pub assignment: &'a SpellListAssignment,
    pub overrides: &'a Overrides,
    pub default_label: &'a str,
}

/// Join, partition and overlay. Reports from loading are carried over
/// first, in load order.
#[must_use]
pub fn build_hierarchy(
    classes: Loaded<ClassRecord>,
    subclasses: Loaded<SubclassRecord>,
    spells: Loaded<SpellRecord>,
    overlay: Overlay<'_>,
    vocabulary: &Vocabulary,
) -> Hierarchy {
    let mut reports = classes.reports;
    reports.extend(subclasses.reports);
    reports.extend(spells.reports);

    let mut class_records = classes.records;
    sort_by_name(&mut class_records);

    let mut join = join_subclasses(&class_records, subclasses.records);
    reports.append(&mut join.reports);

    let index: SpellIndex = spells.records.into_iter().collect();

    let classes = class_records
        .into_iter()
        .map(|class| {
            let partition = partition_spells(
                &class.identifier,
                overlay.assignment.list(&class.identifier),
                &index,
                vocabulary,
            );
            reports.extend(partition.reports);
            let presentation =
                apply_label_and_backdrop(&class, overlay.overrides, overlay.default_label);
            ClassNode {
                subclasses: join.groups.remove(&class.identifier).unwrap_or_default(),
                spell_lists: partition.buckets,
                label: presentation.label,
                backdrop: presentation.backdrop,
                class,
            }
        })
        .collect();

    Hierarchy { classes, reports }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EntryRef;

    fn entry(uuid: &str, name: &str) -> EntryRef {
        EntryRef {
            uuid: uuid.to_string(),
            id: uuid.to_string(),
            name: name.to_string(),
            img: None,
            source: "test".to_string(),
        }
    }

    fn loaded<T>(records: Vec<T>) -> Loaded<T> {
        Loaded {
            records,
            reports: Vec::new(),
        }
    }

    fn class(identifier: &str, name: &str) -> ClassRecord {
        ClassRecord {
            entry: entry(identifier, name),
            identifier: identifier.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn classes_sorted_and_overlaid() {
        let assignment: SpellListAssignment =
            [("wizard".to_string(), vec!["s1".to_string()])].into_iter().collect();
        let mut overrides = Overrides::default();
        overrides
            .labels
            .insert("wizard".to_string(), Some("Arcane Tradition".to_string()));

        let spell = SpellRecord {
            entry: entry("s1", "Magic Missile"),
            level: Some(1),
            school: Some("evo".to_string()),
            description: String::new(),
        };

        let hierarchy = build_hierarchy(
            loaded(vec![class("wizard", "Wizard"), class("bard", "bard")]),
            loaded(Vec::new()),
            loaded(vec![spell]),
            Overlay {
                assignment: &assignment,
                overrides: &overrides,
                default_label: "Subclass",
            },
            &Vocabulary::default(),
        );

        let names: Vec<_> = hierarchy.classes.iter().map(|c| c.identifier()).collect();
        assert_eq!(names, vec!["bard", "wizard"]);
        let wizard = hierarchy.class("wizard").expect("wizard");
        assert_eq!(wizard.label, "Arcane Tradition");
        assert_eq!(wizard.populated_levels().collect::<Vec<_>>(), vec![1]);
        let bard = hierarchy.class("bard").expect("bard");
        assert_eq!(bard.label, "Subclass");
        assert_eq!(bard.spell_lists.len(), 10);
        assert!(hierarchy.reports.is_empty());
    }

    #[test]
    fn no_classes_is_empty() {
        let hierarchy = build_hierarchy(
            Loaded::default(),
            Loaded::default(),
            Loaded::default(),
            Overlay {
                assignment: &SpellListAssignment::new(),
                overrides: &Overrides::default(),
                default_label: "Subclass",
            },
            &Vocabulary::default(),
        );
        assert!(hierarchy.is_empty());
    }
}
