//! # Configuration Tables
//!
//! Read models for the configuration surfaces: the spell list matrix
//! (every spell against every class) and the per-class override table.

use crate::filter::SpellFilter;
use crate::overlay::{Overrides, SpellListAssignment};
use crate::record::{ClassRecord, SpellRecord, sort_by_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One spell and the classes whose list contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellListRow {
    pub uuid: String,
    pub name: String,
    pub level: Option<i64>,
    pub school: Option<String>,
    pub source: String,
    /// Class identifier -> membership.
    pub classes: BTreeMap<String, bool>,
}

/// The list editor: name-sorted spells, one membership flag per class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellListMatrix {
    /// Class identifier -> class name, for column headers.
    pub classes: BTreeMap<String, String>,
    pub rows: Vec<SpellListRow>,
}

/// Build the list editor matrix.
///
/// Unlike page views, spells are not validated against the vocabulary here:
/// a spell with a bad level can still be assigned or unassigned.
#[must_use]
pub fn spell_list_matrix(
    classes: &[ClassRecord],
    mut spells: Vec<SpellRecord>,
    assignment: &SpellListAssignment,
    filter: &SpellFilter,
) -> SpellListMatrix {
    sort_by_name(&mut spells);
    let rows = spells
        .into_iter()
        .filter(|spell| filter.matches(spell))
        .map(|spell| SpellListRow {
            classes: classes
                .iter()
                .map(|c| {
                    (
                        c.identifier.clone(),
                        assignment.contains(&c.identifier, &spell.entry.uuid),
                    )
                })
                .collect(),
            uuid: spell.entry.uuid,
            name: spell.entry.name,
            level: spell.level,
            school: spell.school,
            source: spell.entry.source,
        })
        .collect();

    SpellListMatrix {
        classes: classes
            .iter()
            .map(|c| (c.identifier.clone(), c.entry.name.clone()))
            .collect(),
        rows,
    }
}

/// One class's current overrides, blank values shown as unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRow {
    pub identifier: String,
    pub name: String,
    pub label: Option<String>,
    pub backdrop: Option<String>,
}

#[must_use]
pub fn override_table(classes: &[ClassRecord], overrides: &Overrides) -> Vec<OverrideRow> {
    classes
        .iter()
        .map(|c| OverrideRow {
            identifier: c.identifier.clone(),
            name: c.entry.name.clone(),
            label: overrides.label(&c.identifier).map(str::to_string),
            backdrop: overrides.backdrop(&c.identifier).map(str::to_string),
        })
        .collect()
}
