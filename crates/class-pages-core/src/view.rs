//! # View Model
//!
//! The presentation-ready output of one aggregation pass: the active class,
//! its subclasses and spell buckets (each enriched), the class gallery and
//! the navigation state.

use crate::filter::SpellFilter;
use crate::hierarchy::ClassNode;
use crate::navigation::{NavigationState, Selection};
use crate::record::{CatalogRecord, ClassRecord, SpellRecord, SubclassRecord};
use crate::types::Report;
use serde::{Deserialize, Serialize};

/// Derive the pack key of a catalog uuid: segments 1 and 2 joined by `.`.
///
/// `Compendium.dnd5e.classes.Item.abc` -> `dnd5e.classes`.
#[must_use]
pub fn pack_of(uuid: &str) -> Option<String> {
    let mut segments = uuid.split('.').skip(1);
    match (segments.next(), segments.next()) {
        (Some(scope), Some(key)) => Some(format!("{}.{}", scope, key)),
        _ => None,
    }
}

/// A record plus what enrichment adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord<T> {
    #[serde(flatten)]
    pub record: T,
    /// Document id, copied out of the entry metadata.
    pub id: String,
    pub pack: Option<String>,
    /// Rendered description. `None` when the description was not requested.
    pub description_markup: Option<String>,
}

impl<T: CatalogRecord> EnrichedRecord<T> {
    pub fn new(record: T, description_markup: Option<String>) -> Self {
        Self {
            id: record.entry().id.clone(),
            pack: pack_of(record.uuid()),
            record,
            description_markup,
        }
    }
}

/// A level bucket of enriched spells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedBucket {
    pub level: u8,
    pub label: String,
    pub spells: Vec<EnrichedRecord<SpellRecord>>,
}

/// One entry of the class gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub identifier: String,
    pub name: String,
    pub uuid: String,
    pub img: Option<String>,
}

impl From<&ClassRecord> for ClassSummary {
    fn from(class: &ClassRecord) -> Self {
        Self {
            identifier: class.identifier.clone(),
            name: class.entry.name.clone(),
            uuid: class.entry.uuid.clone(),
            img: class.entry.img.clone(),
        }
    }
}

impl From<&ClassNode> for ClassSummary {
    fn from(node: &ClassNode) -> Self {
        Self::from(&node.class)
    }
}

/// Everything a presentation layer needs to draw one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    /// Pass number. A result with a lower generation than one already shown
    /// is stale.
    pub generation: u64,
    /// Active class identifier; `None` when no class is loaded.
    pub identifier: Option<String>,
    pub class: Option<EnrichedRecord<ClassRecord>>,
    pub subclass_label: String,
    pub backdrop: Option<String>,
    pub subclasses: Vec<EnrichedRecord<SubclassRecord>>,
    pub spells: Vec<EnrichedBucket>,
    pub classes: Vec<ClassSummary>,
    pub selection: Selection,
    pub navigation: NavigationState,
    /// Whether the caller may open the configuration surfaces.
    pub can_configure: bool,
    pub reports: Vec<Report>,
}

impl ViewModel {
    /// The view of a pass that loaded no classes.
    #[must_use]
    pub fn empty(generation: u64, default_label: &str, can_configure: bool, reports: Vec<Report>) -> Self {
        Self {
            generation,
            identifier: None,
            class: None,
            subclass_label: default_label.to_string(),
            backdrop: None,
            subclasses: Vec::new(),
            spells: Vec::new(),
            classes: Vec::new(),
            selection: Selection::default(),
            navigation: NavigationState::default(),
            can_configure,
            reports,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.class.is_none()
    }

    /// Keep only the spells matching `filter`. Buckets stay, possibly empty.
    pub fn filter_spells(&mut self, filter: &SpellFilter) {
        for bucket in &mut self.spells {
            bucket.spells.retain(|spell| filter.matches(&spell.record));
        }
    }
}
