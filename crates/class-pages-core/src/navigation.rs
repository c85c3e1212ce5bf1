//! # Navigation State Machine
//!
//! Cyclic tab selection over a [`Hierarchy`].
//!
//! Three nested scopes:
//! - `page`: the active class
//! - `subpage:<class>`: `class`, `subclasses` or `spells`, per class
//! - `spells:<class>`: the active spell level, per class
//!
//! Every scope holds exactly one active member. Scopes are keyed by class
//! identifier, so switching class never disturbs another class's subpage.
//! Transitions are pure: `apply` returns a new state or an error, and the
//! input state is never modified.

use crate::hierarchy::{ClassNode, Hierarchy};
use crate::types::ClassPagesError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// SCOPES & SUBTABS
// =============================================================================

/// A navigation scope. Serialized as `page`, `subpage:<class>` or
/// `spells:<class>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeId {
    #[default]
    Page,
    Subpage(String),
    Spells(String),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Page => f.write_str("page"),
            ScopeId::Subpage(class) => write!(f, "subpage:{}", class),
            ScopeId::Spells(class) => write!(f, "spells:{}", class),
        }
    }
}

impl FromStr for ScopeId {
    type Err = ClassPagesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if s == "page" => Ok(ScopeId::Page),
            Some(("subpage", class)) if !class.is_empty() => Ok(ScopeId::Subpage(class.to_string())),
            Some(("spells", class)) if !class.is_empty() => Ok(ScopeId::Spells(class.to_string())),
            _ => Err(ClassPagesError::UnknownScope(s.to_string())),
        }
    }
}

impl Serialize for ScopeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The per-class subpages, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtab {
    #[default]
    Class,
    Subclasses,
    Spells,
}

impl Subtab {
    pub const ALL: [Subtab; 3] = [Subtab::Class, Subtab::Subclasses, Subtab::Spells];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Subtab::Class => "class",
            Subtab::Subclasses => "subclasses",
            Subtab::Spells => "spells",
        }
    }
}

impl fmt::Display for Subtab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subtab {
    type Err = ClassPagesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subtab::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ClassPagesError::UnknownMember {
                scope: "subpage".to_string(),
                member: s.to_string(),
            })
    }
}

// =============================================================================
// ACTIONS & STIMULI
// =============================================================================

/// A state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavAction {
    Next { scope: ScopeId },
    Previous { scope: ScopeId },
    Jump { scope: ScopeId, member: String },
    Focus { scope: ScopeId },
}

impl NavAction {
    #[must_use]
    pub fn scope(&self) -> &ScopeId {
        match self {
            NavAction::Next { scope }
            | NavAction::Previous { scope }
            | NavAction::Jump { scope, .. }
            | NavAction::Focus { scope } => scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// Raw user input, before it is resolved to a [`NavAction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum Stimulus {
    Click { scope: ScopeId, member: String },
    /// Vertical wheel delta; only its sign matters.
    Wheel { scope: ScopeId, delta_y: i64 },
    Button { scope: ScopeId, direction: Direction },
}

impl Stimulus {
    /// A zero wheel delta resolves to nothing.
    #[must_use]
    pub fn resolve(self) -> Option<NavAction> {
        match self {
            Stimulus::Click { scope, member } => Some(NavAction::Jump { scope, member }),
            Stimulus::Wheel { scope, delta_y } => match delta_y.signum() {
                1 => Some(NavAction::Next { scope }),
                -1 => Some(NavAction::Previous { scope }),
                _ => None,
            },
            Stimulus::Button { scope, direction } => Some(match direction {
                Direction::Left => NavAction::Previous { scope },
                Direction::Right => NavAction::Next { scope },
            }),
        }
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// A presentable piece of state driven by actions.
pub trait Component {
    type ViewModel;
    type Action;

    fn view_model(&self) -> Self::ViewModel;

    /// Apply an action. On error the component is left unchanged.
    fn handle_action(&mut self, action: Self::Action) -> Result<(), ClassPagesError>;
}

// =============================================================================
// NAVIGATION STATE
// =============================================================================

/// The complete selection state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub active_scope: ScopeId,
    pub members_by_scope: BTreeMap<ScopeId, Vec<String>>,
    pub active_member_by_scope: BTreeMap<ScopeId, String>,
}

/// What is currently selected, flattened for presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub active_scope: ScopeId,
    pub class: Option<String>,
    pub subtab: Option<Subtab>,
    pub spell_level: Option<u8>,
}

impl NavigationState {
    /// Derive the initial state.
    ///
    /// The page starts on `initial_class` if it names a loaded class, else on
    /// the first class. That class's subpage starts on `initial_subtab` if
    /// valid, else `class`; every other class starts on `class`.
    #[must_use]
    pub fn build(hierarchy: &Hierarchy, initial_class: Option<&str>, initial_subtab: Option<&str>) -> Self {
        let mut state = NavigationState::default();
        let Some(first) = hierarchy.classes.first() else {
            return state;
        };

        let active_class = initial_class
            .and_then(|id| hierarchy.class(id))
            .unwrap_or(first)
            .identifier()
            .to_string();
        let subtab = initial_subtab
            .and_then(|s| s.parse::<Subtab>().ok())
            .unwrap_or_default();

        state.members_by_scope.insert(
            ScopeId::Page,
            hierarchy.classes.iter().map(|c| c.identifier().to_string()).collect(),
        );
        state
            .active_member_by_scope
            .insert(ScopeId::Page, active_class.clone());

        for node in &hierarchy.classes {
            let tab = if node.identifier() == active_class {
                subtab
            } else {
                Subtab::default()
            };
            state.insert_class_scopes(node, tab);
        }
        state
    }

    fn insert_class_scopes(&mut self, node: &ClassNode, subtab: Subtab) {
        let id = node.identifier().to_string();

        let subpage = ScopeId::Subpage(id.clone());
        self.members_by_scope.insert(
            subpage.clone(),
            Subtab::ALL.iter().map(|t| t.as_str().to_string()).collect(),
        );
        self.active_member_by_scope
            .insert(subpage, subtab.as_str().to_string());

        let mut levels: Vec<String> = node.populated_levels().map(|l| l.to_string()).collect();
        if levels.is_empty() {
            levels = node.spell_lists.iter().map(|b| b.level.to_string()).collect();
        }
        if let Some(first) = levels.first().cloned() {
            let spells = ScopeId::Spells(id);
            self.members_by_scope.insert(spells.clone(), levels);
            self.active_member_by_scope.insert(spells, first);
        }
    }

    /// Keep the previous selection wherever it is still valid.
    ///
    /// Used after a rebuild: a member that disappeared falls back to this
    /// state's default for its scope.
    pub fn carry_over(&mut self, previous: &NavigationState) {
        for (scope, member) in &previous.active_member_by_scope {
            let valid = self
                .members_by_scope
                .get(scope)
                .is_some_and(|members| members.contains(member));
            if valid {
                self.active_member_by_scope
                    .insert(scope.clone(), member.clone());
            }
        }
        if self.members_by_scope.contains_key(&previous.active_scope) {
            self.active_scope = previous.active_scope.clone();
        }
    }

    /// Apply one action, returning the new state.
    pub fn apply(&self, action: &NavAction) -> Result<Self, ClassPagesError> {
        let scope = action.scope();
        let members = self
            .members_by_scope
            .get(scope)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ClassPagesError::UnknownScope(scope.to_string()))?;
        let current = self
            .active_member_by_scope
            .get(scope)
            .and_then(|m| members.iter().position(|x| x == m))
            .unwrap_or(0);

        let target = match action {
            NavAction::Next { .. } => (current + 1) % members.len(),
            NavAction::Previous { .. } => (current + members.len() - 1) % members.len(),
            NavAction::Jump { member, .. } => members
                .iter()
                .position(|m| m == member)
                .ok_or_else(|| ClassPagesError::UnknownMember {
                    scope: scope.to_string(),
                    member: member.clone(),
                })?,
            NavAction::Focus { .. } => current,
        };

        let mut next = self.clone();
        next.active_scope = scope.clone();
        next.active_member_by_scope
            .insert(scope.clone(), members[target].clone());
        Ok(next)
    }

    #[must_use]
    pub fn active_member(&self, scope: &ScopeId) -> Option<&str> {
        self.active_member_by_scope.get(scope).map(String::as_str)
    }

    #[must_use]
    pub fn members(&self, scope: &ScopeId) -> &[String] {
        self.members_by_scope
            .get(scope)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn active_class(&self) -> Option<&str> {
        self.active_member(&ScopeId::Page)
    }

    #[must_use]
    pub fn active_subtab(&self) -> Option<Subtab> {
        let class = self.active_class()?;
        self.active_member(&ScopeId::Subpage(class.to_string()))?
            .parse()
            .ok()
    }

    #[must_use]
    pub fn active_spell_level(&self) -> Option<u8> {
        let class = self.active_class()?;
        self.active_member(&ScopeId::Spells(class.to_string()))?
            .parse()
            .ok()
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        Selection {
            active_scope: self.active_scope.clone(),
            class: self.active_class().map(str::to_string),
            subtab: self.active_subtab(),
            spell_level: self.active_spell_level(),
        }
    }
}

impl Component for NavigationState {
    type ViewModel = Selection;
    type Action = NavAction;

    fn view_model(&self) -> Selection {
        self.selection()
    }

    fn handle_action(&mut self, action: NavAction) -> Result<(), ClassPagesError> {
        *self = self.apply(&action)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
