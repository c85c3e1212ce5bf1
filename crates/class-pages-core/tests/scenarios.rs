//! # Scenario Tests (S0-S3)
//!
//! End-to-end behavior of one aggregation pass, driven through the public
//! API only.
//!
//! ## Tiers
//! - S0: Loading (dedupe, normalization)
//! - S1: Joining (subclasses, spell partition, name order)
//! - S2: Overlay (import, export, overrides)
//! - S3: Navigation

use class_pages_core::{
    Caller, ClassPagesError, Hierarchy, ImportMode, Loaded, NavAction, NavigationState, Overlay,
    OverrideEdit, Overrides, RawEntry, Report, ScopeId, SettingsGateway, SourceBatch,
    SpellListAssignment, Vocabulary, build_hierarchy, load_classes, load_spells, load_subclasses,
};
use serde_json::json;

// =============================================================================
// FIXTURES
// =============================================================================

fn raw(value: serde_json::Value) -> RawEntry {
    serde_json::from_value(value).expect("raw entry")
}

fn class(uuid: &str, name: &str, identifier: &str) -> RawEntry {
    raw(json!({
        "uuid": uuid, "_id": uuid, "type": "class", "name": name,
        "system": {"identifier": identifier, "description": {"value": format!("<p>{}</p>", name)}}
    }))
}

fn subclass(uuid: &str, name: &str, class_identifier: &str) -> RawEntry {
    raw(json!({
        "uuid": uuid, "_id": uuid, "type": "subclass", "name": name,
        "system": {"classIdentifier": class_identifier}
    }))
}

fn spell(uuid: &str, name: &str, level: i64, school: &str) -> RawEntry {
    raw(json!({
        "uuid": uuid, "_id": uuid, "type": "spell", "name": name,
        "system": {"level": level, "school": school}
    }))
}

fn pass(
    classes: Vec<SourceBatch>,
    subclasses: Vec<SourceBatch>,
    spells: Vec<SourceBatch>,
    assignment: &SpellListAssignment,
) -> Hierarchy {
    build_hierarchy(
        load_classes(&classes),
        load_subclasses(&subclasses),
        load_spells(&spells),
        Overlay {
            assignment,
            overrides: &Overrides::default(),
            default_label: "Subclass",
        },
        &Vocabulary::default(),
    )
}

// =============================================================================
// TIER S0: LOADING
// =============================================================================

mod s0_loading {
    use super::*;

    /// S0.1: The first class with an identifier wins; the later one is reported.
    #[test]
    fn duplicate_wizard_keeps_first_source() {
        let loaded = load_classes(&[
            SourceBatch::new("srd.classes", vec![class("srd.w", "Wizard", "wizard")]),
            SourceBatch::new("homebrew.classes", vec![class("hb.w", "Wizard", "wizard")]),
        ]);

        let wizards: Vec<_> = loaded
            .records
            .iter()
            .filter(|c| c.identifier == "wizard")
            .collect();
        assert_eq!(wizards.len(), 1);
        assert_eq!(wizards[0].entry.source, "srd.classes");
        assert_eq!(loaded.reports.len(), 1);
        assert!(matches!(loaded.reports[0], Report::DuplicateClass { .. }));
    }

    /// S0.2: Legacy `data` fields load the same as current `system` fields.
    #[test]
    fn legacy_entries_load() {
        let legacy = raw(json!({
            "uuid": "old.f", "_id": "f", "type": "class", "name": "Fighter",
            "data": {"identifier": "fighter"}
        }));
        let loaded = load_classes(&[SourceBatch::new("old", vec![legacy])]);
        assert_eq!(loaded.records[0].identifier, "fighter");
    }

    /// S0.3: An empty source list loads nothing and reports nothing.
    #[test]
    fn no_sources_loads_nothing() {
        let hierarchy = pass(Vec::new(), Vec::new(), Vec::new(), &SpellListAssignment::new());
        assert!(hierarchy.is_empty());
        assert!(hierarchy.reports.is_empty());
    }
}

// =============================================================================
// TIER S1: JOINING
// =============================================================================

mod s1_joining {
    use super::*;

    /// S1.1: Orphan S2 is excluded from A and reported.
    #[test]
    fn orphan_subclass_excluded() {
        let hierarchy = pass(
            vec![SourceBatch::new("c", vec![class("c.a", "A", "A")])],
            vec![SourceBatch::new(
                "s",
                vec![subclass("s1", "S1", "A"), subclass("s2", "S2", "Z")],
            )],
            Vec::new(),
            &SpellListAssignment::new(),
        );

        let a = hierarchy.class("A").expect("class A");
        let names: Vec<_> = a.subclasses.iter().map(|s| s.entry.name.as_str()).collect();
        assert_eq!(names, vec!["S1"]);
        let orphans: Vec<_> = hierarchy
            .reports
            .iter()
            .filter(|r| matches!(r, Report::OrphanSubclass { .. }))
            .collect();
        assert_eq!(orphans.len(), 1);
    }

    /// S1.2: Invalid level 11 is dropped; every other bucket exists and is empty.
    #[test]
    fn invalid_level_dropped() {
        let assignment: SpellListAssignment =
            [("A".to_string(), vec!["u1".to_string(), "u2".to_string()])]
                .into_iter()
                .collect();
        let hierarchy = pass(
            vec![SourceBatch::new("c", vec![class("c.a", "A", "A")])],
            Vec::new(),
            vec![SourceBatch::new(
                "sp",
                vec![spell("u1", "Fireball", 3, "evo"), spell("u2", "Overload", 11, "evo")],
            )],
            &assignment,
        );

        let a = hierarchy.class("A").expect("class A");
        assert_eq!(a.spell_lists.len(), 10);
        for bucket in &a.spell_lists {
            if bucket.level == 3 {
                let uuids: Vec<_> = bucket.spells.iter().map(|s| s.entry.uuid.as_str()).collect();
                assert_eq!(uuids, vec!["u1"]);
            } else {
                assert!(bucket.spells.is_empty(), "level {} not empty", bucket.level);
            }
        }
        assert_eq!(hierarchy.reports.len(), 1);
        assert!(matches!(
            hierarchy.reports[0],
            Report::InvalidSpellLevel { level: Some(11), .. }
        ));
    }

    /// S1.3: Spells of other types in a spell source are ignored.
    #[test]
    fn non_spell_entries_ignored() {
        let assignment: SpellListAssignment =
            [("A".to_string(), vec!["f1".to_string()])].into_iter().collect();
        let mut feat = spell("f1", "Alert", 1, "evo");
        feat.entry_type = "feat".to_string();
        let hierarchy = pass(
            vec![SourceBatch::new("c", vec![class("c.a", "A", "A")])],
            Vec::new(),
            vec![SourceBatch::new("sp", vec![feat])],
            &assignment,
        );
        assert!(matches!(
            hierarchy.reports[0],
            Report::UnresolvedSpell { .. }
        ));
    }

    /// S1.4: Accented names sort with their base letter, not after `Z`.
    #[test]
    fn accented_names_follow_locale_order() {
        let assignment: SpellListAssignment = [(
            "bard".to_string(),
            vec!["u1".to_string(), "u2".to_string(), "u3".to_string()],
        )]
        .into_iter()
        .collect();
        let hierarchy = pass(
            vec![SourceBatch::new(
                "c",
                vec![
                    class("c.z", "Zealot", "zealot"),
                    class("c.e", "Éclaireur", "eclaireur"),
                    class("c.b", "bard", "bard"),
                ],
            )],
            vec![SourceBatch::new(
                "s",
                vec![
                    subclass("s1", "Lore", "bard"),
                    subclass("s2", "Éloquence", "bard"),
                    subclass("s3", "Valor", "bard"),
                ],
            )],
            vec![SourceBatch::new(
                "sp",
                vec![
                    spell("u1", "Fireball", 3, "evo"),
                    spell("u2", "Éclat", 3, "evo"),
                    spell("u3", "acid arrow", 3, "evo"),
                ],
            )],
            &assignment,
        );

        let classes: Vec<_> = hierarchy.classes.iter().map(|c| c.identifier()).collect();
        assert_eq!(classes, vec!["bard", "eclaireur", "zealot"]);

        let bard = hierarchy.class("bard").expect("class bard");
        let subclasses: Vec<_> = bard.subclasses.iter().map(|s| s.entry.name.as_str()).collect();
        assert_eq!(subclasses, vec!["Éloquence", "Lore", "Valor"]);

        let third = bard.spell_lists.iter().find(|b| b.level == 3).expect("level 3");
        let spells: Vec<_> = third.spells.iter().map(|s| s.entry.name.as_str()).collect();
        assert_eq!(spells, vec!["acid arrow", "Éclat", "Fireball"]);
    }
}

// =============================================================================
// TIER S2: OVERLAY
// =============================================================================

mod s2_overlay {
    use super::*;

    fn gateway_with(lists: &[(&str, &[&str])]) -> SettingsGateway {
        let mut gateway = SettingsGateway::new();
        for (class, uuids) in lists {
            gateway
                .set_spell_list(
                    Caller::Privileged,
                    class,
                    uuids.iter().map(|u| u.to_string()).collect(),
                )
                .expect("seed");
        }
        gateway
    }

    /// S2.1: Override-import replaces the list exactly.
    #[test]
    fn override_import_replaces() {
        let mut gateway = gateway_with(&[("A", &["y", "z"])]);
        gateway
            .import_assignments(Caller::Privileged, r#"{"A": ["x"]}"#, ImportMode::Override)
            .expect("import");
        let lists = gateway.spell_lists().expect("lists");
        assert_eq!(lists.list("A"), ["x".to_string()]);
    }

    /// S2.2: Merge-import unions into tracked classes.
    #[test]
    fn merge_import_unions() {
        let mut gateway = gateway_with(&[("A", &["y"])]);
        gateway
            .import_assignments(Caller::Privileged, r#"{"A": ["x"]}"#, ImportMode::Merge)
            .expect("import");
        let lists = gateway.spell_lists().expect("lists");
        let mut members = lists.list("A").to_vec();
        members.sort();
        assert_eq!(members, vec!["x".to_string(), "y".to_string()]);
    }

    /// S2.3: Neither mode partially applies a malformed document.
    #[test]
    fn malformed_import_is_atomic() {
        for mode in [ImportMode::Override, ImportMode::Merge] {
            let mut gateway = gateway_with(&[("A", &["y"])]);
            let result =
                gateway.import_assignments(Caller::Privileged, r#"{"A": ["x", 3]}"#, mode);
            assert!(matches!(result, Err(ClassPagesError::InvalidImport(_))));
            assert_eq!(
                gateway.spell_lists().expect("lists").list("A"),
                ["y".to_string()]
            );
        }
    }

    /// S2.4: An override label shows up on the next pass; reverting restores the default.
    #[test]
    fn override_label_applies_on_next_pass() {
        let mut gateway = SettingsGateway::new();
        gateway
            .set_override(
                Caller::Privileged,
                "A",
                OverrideEdit {
                    label: Some("Tradition".to_string()),
                    backdrop: None,
                },
            )
            .expect("override");

        let overrides = gateway.overrides().expect("overrides");
        let hierarchy = build_hierarchy(
            load_classes(&[SourceBatch::new("c", vec![class("c.a", "A", "A")])]),
            Loaded::default(),
            Loaded::default(),
            Overlay {
                assignment: &SpellListAssignment::new(),
                overrides: &overrides,
                default_label: "Subclass",
            },
            &Vocabulary::default(),
        );
        assert_eq!(hierarchy.classes[0].label, "Tradition");

        let overrides = gateway
            .set_override(
                Caller::Privileged,
                "A",
                OverrideEdit {
                    label: Some(String::new()),
                    backdrop: None,
                },
            )
            .expect("revert");
        assert_eq!(overrides.label("A"), None);
    }
}

// =============================================================================
// TIER S3: NAVIGATION
// =============================================================================

mod s3_navigation {
    use super::*;

    fn abc() -> Hierarchy {
        pass(
            vec![SourceBatch::new(
                "c",
                vec![class("c.b", "B", "B"), class("c.c", "C", "C"), class("c.a", "A", "A")],
            )],
            Vec::new(),
            Vec::new(),
            &SpellListAssignment::new(),
        )
    }

    /// S3.1: next from the last member wraps to the first and back.
    #[test]
    fn page_scope_wraps() {
        let state = NavigationState::build(&abc(), Some("C"), None);
        assert_eq!(
            state.members(&ScopeId::Page),
            ["A".to_string(), "B".to_string(), "C".to_string()]
        );

        let state = state
            .apply(&NavAction::Next {
                scope: ScopeId::Page,
            })
            .expect("next");
        assert_eq!(state.active_class(), Some("A"));

        let state = state
            .apply(&NavAction::Previous {
                scope: ScopeId::Page,
            })
            .expect("previous");
        assert_eq!(state.active_class(), Some("C"));
    }

    /// S3.2: The page defaults to the alphabetically first class.
    #[test]
    fn page_defaults_to_first_class() {
        let state = NavigationState::build(&abc(), None, None);
        assert_eq!(state.active_class(), Some("A"));
    }
}
