//! # Vocabulary
//!
//! The fixed enumerations a spell must fall inside to appear on a page:
//! spell levels (with bucket labels) and schools of magic.

use crate::primitives::{SPELL_LEVELS, SPELL_SCHOOLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Valid spell levels and schools.
///
/// Levels iterate in ascending order, which is the bucket order of every
/// partitioned spell list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    levels: BTreeMap<u8, String>,
    schools: BTreeMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            SPELL_LEVELS.iter().map(|(l, s)| (*l, (*s).to_string())),
            SPELL_SCHOOLS
                .iter()
                .map(|(k, s)| ((*k).to_string(), (*s).to_string())),
        )
    }
}

impl Vocabulary {
    /// Build a vocabulary from explicit tables.
    pub fn new(
        levels: impl IntoIterator<Item = (u8, String)>,
        schools: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            schools: schools.into_iter().collect(),
        }
    }

    /// Levels and labels in ascending level order.
    pub fn levels(&self) -> impl Iterator<Item = (u8, &str)> {
        self.levels.iter().map(|(l, s)| (*l, s.as_str()))
    }

    /// Schools and labels in key order.
    pub fn schools(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schools.iter().map(|(k, s)| (k.as_str(), s.as_str()))
    }

    /// Resolve a raw level to an enumerated one.
    #[must_use]
    pub fn level(&self, raw: i64) -> Option<u8> {
        u8::try_from(raw)
            .ok()
            .filter(|level| self.levels.contains_key(level))
    }

    #[must_use]
    pub fn level_label(&self, level: u8) -> Option<&str> {
        self.levels.get(&level).map(String::as_str)
    }

    #[must_use]
    pub fn is_school(&self, school: &str) -> bool {
        self.schools.contains_key(school)
    }

    #[must_use]
    pub fn school_label(&self, school: &str) -> Option<&str> {
        self.schools.get(school).map(String::as_str)
    }
}
