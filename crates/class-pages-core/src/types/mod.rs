//! # Core Type Definitions
//!
//! This module contains the small vocabulary types shared by every stage of
//! the aggregation pass:
//! - Record families (`RecordType`)
//! - Caller privilege (`Caller`)
//! - Non-fatal diagnostics (`Report`)
//! - Error types (`ClassPagesError`)
//!
//! ## Reporting vs. Failing
//!
//! A pass never aborts because of one bad record or one unreachable source.
//! Those cases become `Report` values carried next to the output. Only
//! input validation (import documents, unknown names, privilege) produces a
//! `ClassPagesError`.

use crate::primitives::DESCRIPTION_FIELD;
use crate::settings::SettingKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// RECORD TYPE
// =============================================================================

/// The three record families read from catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Class,
    Subclass,
    Spell,
}

impl RecordType {
    /// All record families, in load order.
    pub const ALL: [RecordType; 3] = [RecordType::Class, RecordType::Subclass, RecordType::Spell];

    /// The `type` value catalog entries declare for this family.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Class => "class",
            RecordType::Subclass => "subclass",
            RecordType::Spell => "spell",
        }
    }

    /// The setting holding the ordered source keys for this family.
    #[must_use]
    pub fn sources_key(&self) -> SettingKey {
        match self {
            RecordType::Class => SettingKey::ClassesSources,
            RecordType::Subclass => SettingKey::SubclassesSources,
            RecordType::Spell => SettingKey::SpellsSources,
        }
    }

    /// Field projection requested from catalogs.
    ///
    /// Each field is listed under both the current (`system.`) and the
    /// legacy (`data.`) path; the description field is always included.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let own: &[&str] = match self {
            RecordType::Class => &["identifier"],
            RecordType::Subclass => &["classIdentifier"],
            RecordType::Spell => &["school", "level"],
        };
        own.iter()
            .copied()
            .chain(std::iter::once(DESCRIPTION_FIELD))
            .flat_map(|field| [format!("system.{}", field), format!("data.{}", field)])
            .collect()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = ClassPagesError;

    /// Accepts the singular type name or the plural used by setting keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" | "classes" => Ok(RecordType::Class),
            "subclass" | "subclasses" => Ok(RecordType::Subclass),
            "spell" | "spells" => Ok(RecordType::Spell),
            other => Err(ClassPagesError::UnknownRecordType(other.to_string())),
        }
    }
}

// =============================================================================
// CALLER
// =============================================================================

/// Privilege of whoever issues an operation. Supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Caller {
    /// May change sources, overrides and spell lists.
    Privileged,
    /// May only read views.
    #[default]
    Standard,
}

impl Caller {
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        matches!(self, Caller::Privileged)
    }

    /// Fail with `Forbidden` unless privileged.
    pub fn require_privileged(&self) -> Result<(), ClassPagesError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(ClassPagesError::Forbidden)
        }
    }
}

// =============================================================================
// REPORTS
// =============================================================================

/// A non-fatal exclusion observed during an aggregation pass.
///
/// Reports are data: the CORE returns them, the host decides how to log or
/// display them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    /// A class entry without an identifier, or whose identifier was already
    /// taken by an earlier entry.
    DuplicateClass {
        name: String,
        uuid: String,
        identifier: Option<String>,
    },
    /// A subclass whose class identifier matches no loaded class.
    OrphanSubclass {
        name: String,
        uuid: String,
        class_identifier: Option<String>,
    },
    /// An assigned uuid that resolves to no loaded spell.
    UnresolvedSpell {
        class_identifier: String,
        uuid: String,
    },
    /// A spell whose level is missing or outside the level enumeration.
    InvalidSpellLevel {
        class_identifier: String,
        uuid: String,
        name: String,
        level: Option<i64>,
    },
    /// A spell whose school is missing or outside the school enumeration.
    InvalidSpellSchool {
        class_identifier: String,
        uuid: String,
        name: String,
        school: Option<String>,
    },
    /// A catalog source that could not be read. It contributed nothing.
    SourceUnavailable { source: String, reason: String },
    /// A record whose description could not be rendered. Empty markup was
    /// substituted.
    EnrichmentFailed { uuid: String, reason: String },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::DuplicateClass { name, uuid, .. } => write!(
                f,
                "Missing or duplicate class identifier found. The class '{}' with uuid '{}' was skipped.",
                name, uuid
            ),
            Report::OrphanSubclass {
                name,
                uuid,
                class_identifier,
            } => write!(
                f,
                "Subclass '{}' with uuid '{}' references unknown class '{}' and was skipped.",
                name,
                uuid,
                class_identifier.as_deref().unwrap_or("")
            ),
            Report::UnresolvedSpell {
                class_identifier,
                uuid,
            } => write!(
                f,
                "Spell list of '{}' references unknown spell '{}'.",
                class_identifier, uuid
            ),
            Report::InvalidSpellLevel {
                class_identifier,
                name,
                level,
                ..
            } => match level {
                Some(level) => write!(
                    f,
                    "Spell '{}' on the list of '{}' has invalid level {}.",
                    name, class_identifier, level
                ),
                None => write!(
                    f,
                    "Spell '{}' on the list of '{}' has no level.",
                    name, class_identifier
                ),
            },
            Report::InvalidSpellSchool {
                class_identifier,
                name,
                school,
                ..
            } => write!(
                f,
                "Spell '{}' on the list of '{}' has invalid school '{}'.",
                name,
                class_identifier,
                school.as_deref().unwrap_or("")
            ),
            Report::SourceUnavailable { source, reason } => {
                write!(f, "Catalog source '{}' unavailable: {}", source, reason)
            }
            Report::EnrichmentFailed { uuid, reason } => {
                write!(f, "Could not enrich '{}': {}", uuid, reason)
            }
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in class-pages.
///
/// - No silent failures
/// - Use `Result<T, ClassPagesError>` for fallible operations
/// - Per-record problems are `Report`s, not errors
#[derive(Debug, Error)]
pub enum ClassPagesError {
    /// An import document could not be parsed. Nothing was written.
    #[error("Invalid import document: {0}")]
    InvalidImport(String),

    /// A record type name that is not class, subclass or spell.
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    /// An import mode name that is not override or merge.
    #[error("Unknown import mode: {0}")]
    UnknownImportMode(String),

    /// A navigation scope that does not exist in the current state.
    #[error("Unknown navigation scope: {0}")]
    UnknownScope(String),

    /// A navigation member that is not part of its scope.
    #[error("Unknown member '{member}' in scope {scope}")]
    UnknownMember { scope: String, member: String },

    /// The caller is not allowed to change configuration.
    #[error("Operation requires a privileged caller")]
    Forbidden,

    /// A catalog could not be read.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// A description could not be rendered.
    #[error("Render error: {0}")]
    RenderError(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
