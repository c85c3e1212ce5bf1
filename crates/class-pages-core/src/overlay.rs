//! # Configuration Overlay
//!
//! Persisted per-class configuration and the rules for applying and
//! changing it:
//! - spell list assignments (class identifier -> spell uuids)
//! - subclass label and backdrop overrides
//! - the override/merge import protocol and the JSON export
//!
//! Every function here is pure. Reading and writing the persisted values is
//! the settings gateway's job.

use crate::primitives::{EXPORT_CONTENT_TYPE, EXPORT_NAME_PREFIX, MAX_IMPORT_DOCUMENT_SIZE};
use crate::record::ClassRecord;
use crate::types::ClassPagesError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SPELL LIST ASSIGNMENT
// =============================================================================

/// Class identifier -> ordered spell uuids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellListAssignment(BTreeMap<String, Vec<String>>);

impl SpellListAssignment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The uuids assigned to a class, empty when the class has no list.
    #[must_use]
    pub fn list(&self, class_identifier: &str) -> &[String] {
        self.0.get(class_identifier).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn contains(&self, class_identifier: &str, uuid: &str) -> bool {
        self.list(class_identifier).iter().any(|u| u == uuid)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replace one class's list. Blank uuids are dropped and repeats
    /// collapsed.
    pub fn set_list(&mut self, class_identifier: &str, uuids: Vec<String>) {
        self.0
            .insert(class_identifier.to_string(), normalize_keys(uuids));
    }

    /// Add or remove one uuid on one class's list.
    ///
    /// Removing from a class without a list leaves it untracked.
    pub fn toggle(&mut self, class_identifier: &str, uuid: &str, member: bool) {
        let uuid = uuid.trim();
        if uuid.is_empty() {
            return;
        }
        if member {
            let list = self.0.entry(class_identifier.to_string()).or_default();
            if !list.iter().any(|u| u == uuid) {
                list.push(uuid.to_string());
            }
        } else if let Some(list) = self.0.get_mut(class_identifier) {
            list.retain(|u| u != uuid);
        }
    }
}

impl FromIterator<(String, Vec<String>)> for SpellListAssignment {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Trim, drop blanks, collapse repeats keeping the first occurrence.
#[must_use]
pub fn normalize_keys(keys: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    keys.into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

// =============================================================================
// IMPORT PROTOCOL
// =============================================================================

/// How an imported document combines with the persisted assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// The document replaces the persisted assignment entirely.
    Override,
    /// Lists of already-tracked classes gain the document's uuids.
    Merge,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Override => f.write_str("override"),
            ImportMode::Merge => f.write_str("merge"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = ClassPagesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "override" => Ok(ImportMode::Override),
            "merge" => Ok(ImportMode::Merge),
            other => Err(ClassPagesError::UnknownImportMode(other.to_string())),
        }
    }
}

/// Parse an import document of shape `{classIdentifier: [uuid, ...], ...}`.
///
/// Blank uuids are dropped. Any other shape is rejected as a whole.
pub fn parse_import_document(document: &str) -> Result<SpellListAssignment, ClassPagesError> {
    if document.len() > MAX_IMPORT_DOCUMENT_SIZE {
        return Err(ClassPagesError::InvalidImport(format!(
            "document size {} bytes exceeds maximum {} bytes",
            document.len(),
            MAX_IMPORT_DOCUMENT_SIZE
        )));
    }

    let value: Value = serde_json::from_str(document)
        .map_err(|e| ClassPagesError::InvalidImport(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ClassPagesError::InvalidImport(
            "top level must be an object".to_string(),
        ));
    };

    let mut assignment = BTreeMap::new();
    for (class_identifier, list) in map {
        let Value::Array(items) = list else {
            return Err(ClassPagesError::InvalidImport(format!(
                "value for '{}' must be an array",
                class_identifier
            )));
        };
        let mut uuids = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(uuid) if uuid.trim().is_empty() => {}
                Value::String(uuid) => uuids.push(uuid),
                _ => {
                    return Err(ClassPagesError::InvalidImport(format!(
                        "list for '{}' must contain only strings",
                        class_identifier
                    )));
                }
            }
        }
        assignment.insert(class_identifier, uuids);
    }

    Ok(SpellListAssignment(assignment))
}

/// Combine the persisted assignment with a parsed document.
///
/// - `Override`: the result is `incoming`.
/// - `Merge`: every class of `current` gets the union of both lists,
///   current entries first. Classes only present in `incoming` are not
///   added.
#[must_use]
pub fn apply_import(
    current: &SpellListAssignment,
    incoming: SpellListAssignment,
    mode: ImportMode,
) -> SpellListAssignment {
    match mode {
        ImportMode::Override => incoming,
        ImportMode::Merge => current
            .iter()
            .map(|(class_identifier, list)| {
                let mut merged = list.to_vec();
                let mut seen: BTreeSet<String> = merged.iter().cloned().collect();
                for uuid in incoming.list(class_identifier) {
                    if seen.insert(uuid.clone()) {
                        merged.push(uuid.clone());
                    }
                }
                (class_identifier.to_string(), merged)
            })
            .collect(),
    }
}

/// Parse then apply. Fails before producing anything if the document is
/// malformed, so callers can persist the result unconditionally.
pub fn import_document(
    current: &SpellListAssignment,
    document: &str,
    mode: ImportMode,
) -> Result<SpellListAssignment, ClassPagesError> {
    let incoming = parse_import_document(document)?;
    Ok(apply_import(current, incoming, mode))
}

// =============================================================================
// EXPORT
// =============================================================================

/// A downloadable backup of the spell list assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// `spell-list-backup-<unix-epoch-millis>`
    pub name: String,
    pub content_type: String,
    pub body: String,
}

/// Serialize the full assignment, named after the given timestamp.
pub fn export_document(
    assignment: &SpellListAssignment,
    epoch_millis: u128,
) -> Result<ExportDocument, ClassPagesError> {
    let body = serde_json::to_string(assignment)
        .map_err(|e| ClassPagesError::SerializationError(e.to_string()))?;
    Ok(ExportDocument {
        name: format!("{}{}", EXPORT_NAME_PREFIX, epoch_millis),
        content_type: EXPORT_CONTENT_TYPE.to_string(),
        body,
    })
}

// =============================================================================
// LABEL & BACKDROP OVERRIDES
// =============================================================================

/// Persisted label and backdrop overrides, keyed by class identifier.
///
/// `None` values are stored explicitly when an override is reverted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    pub labels: BTreeMap<String, Option<String>>,
    pub backdrops: BTreeMap<String, Option<String>>,
}

/// A requested change to one class's overrides.
///
/// An omitted field is left as is; a blank field reverts to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideEdit {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub backdrop: Option<String>,
}

impl Overrides {
    /// The effective label override, if set and not blank.
    #[must_use]
    pub fn label(&self, class_identifier: &str) -> Option<&str> {
        non_blank(self.labels.get(class_identifier))
    }

    /// The effective backdrop override, if set and not blank.
    #[must_use]
    pub fn backdrop(&self, class_identifier: &str) -> Option<&str> {
        non_blank(self.backdrops.get(class_identifier))
    }

    pub fn apply_edit(&mut self, class_identifier: &str, edit: OverrideEdit) {
        if let Some(label) = edit.label {
            self.labels
                .insert(class_identifier.to_string(), trimmed_or_unset(label));
        }
        if let Some(backdrop) = edit.backdrop {
            self.backdrops
                .insert(class_identifier.to_string(), trimmed_or_unset(backdrop));
        }
    }
}

fn non_blank(value: Option<&Option<String>>) -> Option<&str> {
    value
        .and_then(Option::as_deref)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn trimmed_or_unset(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Label and backdrop a class is displayed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub label: String,
    pub backdrop: Option<String>,
}

/// Resolve a class's label and backdrop: override first, then the host's
/// default label; backdrop has no default.
#[must_use]
pub fn apply_label_and_backdrop(
    class: &ClassRecord,
    overrides: &Overrides,
    default_label: &str,
) -> Presentation {
    Presentation {
        label: overrides
            .label(&class.identifier)
            .unwrap_or(default_label)
            .to_string(),
        backdrop: overrides.backdrop(&class.identifier).map(str::to_string),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EntryRef;

    fn assignment(pairs: &[(&str, &[&str])]) -> SpellListAssignment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    fn wizard() -> ClassRecord {
        ClassRecord {
            entry: EntryRef {
                uuid: "c.w".to_string(),
                id: "w".to_string(),
                name: "Wizard".to_string(),
                img: None,
                source: "classes".to_string(),
            },
            identifier: "wizard".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn override_replaces_lists() {
        let current = assignment(&[("A", &["y", "z"])]);
        let result = import_document(&current, r#"{"A": ["x"]}"#, ImportMode::Override)
            .expect("import");
        assert_eq!(result.list("A"), ["x".to_string()]);
    }

    #[test]
    fn override_drops_absent_classes() {
        let current = assignment(&[("A", &["y"]), ("B", &["q"])]);
        let result = import_document(&current, r#"{"A": ["x"]}"#, ImportMode::Override)
            .expect("import");
        assert!(result.list("B").is_empty());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn merge_unions_lists() {
        let current = assignment(&[("A", &["y"])]);
        let result =
            import_document(&current, r#"{"A": ["x", "y"]}"#, ImportMode::Merge).expect("import");
        assert_eq!(result.list("A"), ["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn merge_ignores_untracked_classes() {
        let current = assignment(&[("A", &["y"])]);
        let result =
            import_document(&current, r#"{"B": ["x"]}"#, ImportMode::Merge).expect("import");
        assert_eq!(result.len(), 1);
        assert!(result.list("B").is_empty());
        assert_eq!(result.list("A"), ["y".to_string()]);
    }

    #[test]
    fn malformed_documents_rejected() {
        for document in [
            "not json",
            "[]",
            r#"{"A": "x"}"#,
            r#"{"A": [1, 2]}"#,
            r#"{"A": [null]}"#,
        ] {
            assert!(
                matches!(
                    parse_import_document(document),
                    Err(ClassPagesError::InvalidImport(_))
                ),
                "accepted {}",
                document
            );
        }
    }

    #[test]
    fn blank_uuids_dropped_on_import() {
        let parsed = parse_import_document(r#"{"A": ["x", "", "  "]}"#).expect("parse");
        assert_eq!(parsed.list("A"), ["x".to_string()]);
    }

    #[test]
    fn export_is_named_after_timestamp() {
        let doc = export_document(&assignment(&[("A", &["x"])]), 1_700_000_000_123).expect("export");
        assert_eq!(doc.name, "spell-list-backup-1700000000123");
        assert_eq!(doc.content_type, "application/json");
        assert_eq!(doc.body, r#"{"A":["x"]}"#);
    }

    #[test]
    fn export_round_trips_through_override_import() {
        let original = assignment(&[("A", &["x", "y"]), ("B", &[])]);
        let doc = export_document(&original, 1).expect("export");
        let restored = import_document(&SpellListAssignment::new(), &doc.body, ImportMode::Override)
            .expect("import");
        assert_eq!(restored, original);
    }

    #[test]
    fn toggle_adds_and_removes() {
        let mut lists = SpellListAssignment::new();
        lists.toggle("A", "x", true);
        lists.toggle("A", "x", true);
        lists.toggle("A", "y", true);
        assert_eq!(lists.list("A"), ["x".to_string(), "y".to_string()]);
        lists.toggle("A", "x", false);
        assert_eq!(lists.list("A"), ["y".to_string()]);
    }

    #[test]
    fn removing_from_untracked_class_keeps_it_untracked() {
        let mut lists = SpellListAssignment::new();
        lists.toggle("B", "x", false);
        assert!(lists.is_empty());

        let merged = import_document(&lists, r#"{"B": ["y"]}"#, ImportMode::Merge)
            .expect("merge");
        assert!(merged.is_empty());
        assert!(merged.list("B").is_empty());
    }

    #[test]
    fn set_list_normalizes() {
        let mut lists = SpellListAssignment::new();
        lists.set_list(
            "A",
            vec![" x ".to_string(), String::new(), "y".to_string(), "x".to_string()],
        );
        assert_eq!(lists.list("A"), ["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn label_falls_back_to_default() {
        let overrides = Overrides::default();
        let presentation = apply_label_and_backdrop(&wizard(), &overrides, "Subclass");
        assert_eq!(presentation.label, "Subclass");
        assert_eq!(presentation.backdrop, None);
    }

    #[test]
    fn blank_edit_reverts_to_default() {
        let mut overrides = Overrides::default();
        overrides.apply_edit(
            "wizard",
            OverrideEdit {
                label: Some("  Arcane Tradition ".to_string()),
                backdrop: Some("art/wizard.webp".to_string()),
            },
        );
        let presentation = apply_label_and_backdrop(&wizard(), &overrides, "Subclass");
        assert_eq!(presentation.label, "Arcane Tradition");
        assert_eq!(presentation.backdrop.as_deref(), Some("art/wizard.webp"));

        overrides.apply_edit(
            "wizard",
            OverrideEdit {
                label: None,
                backdrop: Some("   ".to_string()),
            },
        );
        let presentation = apply_label_and_backdrop(&wizard(), &overrides, "Subclass");
        assert_eq!(presentation.label, "Arcane Tradition");
        assert_eq!(presentation.backdrop, None);
        assert_eq!(overrides.backdrops.get("wizard"), Some(&None));
    }

    #[test]
    fn import_mode_parses() {
        assert_eq!("Merge".parse::<ImportMode>().ok(), Some(ImportMode::Merge));
        assert!("replace".parse::<ImportMode>().is_err());
    }
}
