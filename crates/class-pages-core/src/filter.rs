//! # Spell Filter
//!
//! The search query used by the list editor and the spells view.
//!
//! `level:<digits>` and `school:<letters>` tokens are extracted; whatever
//! text remains is matched case-insensitively against the spell name.

use crate::record::SpellRecord;
use serde::{Deserialize, Serialize};

/// A parsed filter query. An empty filter matches every spell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellFilter {
    pub level: Option<i64>,
    pub school: Option<String>,
    /// Lowercased name fragment.
    pub text: Option<String>,
}

impl SpellFilter {
    /// Parse a query such as `"level:3 school:evo fire ball"`.
    ///
    /// Malformed tokens (`level:x`, `school:4`) are treated as name text.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut filter = SpellFilter::default();
        let mut words = Vec::new();

        for token in query.split_whitespace() {
            let lowered = token.to_lowercase();
            if let Some(level) = lowered
                .strip_prefix("level:")
                .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|d| d.parse().ok())
            {
                filter.level = Some(level);
            } else if let Some(school) = lowered
                .strip_prefix("school:")
                .filter(|s| !s.is_empty() && s.chars().all(char::is_alphabetic))
            {
                filter.school = Some(school.to_string());
            } else {
                words.push(lowered);
            }
        }

        if !words.is_empty() {
            filter.text = Some(words.join(" "));
        }
        filter
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.school.is_none() && self.text.is_none()
    }

    #[must_use]
    pub fn matches(&self, spell: &SpellRecord) -> bool {
        if self.level.is_some_and(|level| spell.level != Some(level)) {
            return false;
        }
        let school_matches = match &self.school {
            Some(school) => spell
                .school
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(school)),
            None => true,
        };
        if !school_matches {
            return false;
        }
        match &self.text {
            Some(text) => spell.entry.name.to_lowercase().contains(text.as_str()),
            None => true,
        }
    }
}
