//! # Fixed Primitives
//!
//! Compiled-in constants for the class-pages CORE.
//!
//! The level and school tables are the default vocabulary. A host may
//! replace them (see [`crate::Vocabulary`]), but the keyspace, the subtab
//! set and the export naming are fixed.

/// Namespace prefix for every persisted setting key.
pub const SETTINGS_NAMESPACE: &str = "class-pages";

/// Default spell levels: level number -> display label.
///
/// Every class page carries exactly one bucket per entry in this table.
pub const SPELL_LEVELS: [(u8, &str); 10] = [
    (0, "Cantrip"),
    (1, "1st Level"),
    (2, "2nd Level"),
    (3, "3rd Level"),
    (4, "4th Level"),
    (5, "5th Level"),
    (6, "6th Level"),
    (7, "7th Level"),
    (8, "8th Level"),
    (9, "9th Level"),
];

/// Default schools of magic: school key -> display label.
pub const SPELL_SCHOOLS: [(&str, &str); 8] = [
    ("abj", "Abjuration"),
    ("con", "Conjuration"),
    ("div", "Divination"),
    ("enc", "Enchantment"),
    ("evo", "Evocation"),
    ("ill", "Illusion"),
    ("nec", "Necromancy"),
    ("trs", "Transmutation"),
];

/// Label used for the subclass tab when neither an override nor a host
/// default exists.
pub const DEFAULT_SUBCLASS_LABEL: &str = "Subclass";

/// Prefix of exported spell list documents. The full name is
/// `spell-list-backup-<unix-epoch-millis>`.
pub const EXPORT_NAME_PREFIX: &str = "spell-list-backup-";

/// Content type of exported spell list documents.
pub const EXPORT_CONTENT_TYPE: &str = "application/json";

/// Upper bound on an import document, checked before parsing.
pub const MAX_IMPORT_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Description field path (relative to `system`/`data`), always projected.
pub const DESCRIPTION_FIELD: &str = "description.value";
