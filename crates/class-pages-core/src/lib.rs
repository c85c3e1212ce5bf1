//! # class-pages-core
//!
//! The deterministic aggregation engine for class-pages - THE LOGIC.
//!
//! This crate turns catalog records into navigable class pages:
//! normalization and deduplication of loaded records, the relational join
//! of subclasses and spell lists, the persisted configuration overlay with
//! its import/export protocol, and the cyclic navigation state machine.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Uses `BTreeMap` everywhere so output is deterministic
//! - Never logs; exclusions are returned as `Report` values
//! - Never reaches for catalogs or renderers itself; the host fetches and
//!   enriches, the core computes

// =============================================================================
// MODULES
// =============================================================================

pub mod editor;
pub mod filter;
pub mod hierarchy;
pub mod index;
pub mod join;
pub mod navigation;
pub mod overlay;
pub mod primitives;
pub mod record;
pub mod settings;
pub mod types;
pub mod view;
pub mod vocabulary;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Caller, ClassPagesError, RecordType, Report};

// =============================================================================
// RE-EXPORTS: Records & Loading
// =============================================================================

pub use index::{Loaded, Normalize, SourceBatch, load_classes, load_spells, load_subclasses};
pub use record::{
    CatalogRecord, ClassRecord, EntryRef, RawEntry, SpellRecord, SubclassRecord, compare_names,
    sort_by_name,
};
pub use vocabulary::Vocabulary;

// =============================================================================
// RE-EXPORTS: Aggregation
// =============================================================================

pub use editor::{OverrideRow, SpellListMatrix, SpellListRow, override_table, spell_list_matrix};
pub use filter::SpellFilter;
pub use hierarchy::{ClassNode, Hierarchy, Overlay, build_hierarchy};
pub use join::{
    SpellBucket, SpellIndex, SpellPartition, SubclassJoin, join_subclasses, partition_spells,
};
pub use overlay::{
    ExportDocument, ImportMode, OverrideEdit, Overrides, Presentation, SpellListAssignment,
    apply_import, apply_label_and_backdrop, export_document, import_document,
    parse_import_document,
};
pub use view::{ClassSummary, EnrichedBucket, EnrichedRecord, ViewModel, pack_of};

// =============================================================================
// RE-EXPORTS: Navigation
// =============================================================================

pub use navigation::{
    Component, Direction, NavAction, NavigationState, ScopeId, Selection, Stimulus, Subtab,
};

// =============================================================================
// RE-EXPORTS: Settings
// =============================================================================

pub use settings::{
    MemorySettings, RedbSettings, SettingKey, SettingsBackend, SettingsGateway, SettingsStore,
};
