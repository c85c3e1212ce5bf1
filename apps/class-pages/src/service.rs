//! # Class Pages Service
//!
//! One aggregation pass per view:
//!
//! ```text
//! settings ──► IndexLoader (per source, concurrent)
//!                   │
//!                   ▼
//!          build_hierarchy (core: join, partition, overlay)
//!                   │
//!                   ▼
//!          NavigationState ──► enrich displayed subset ──► ViewModel
//! ```
//!
//! Passes are neither serialized nor deduplicated. Each one takes a
//! generation number when it starts; a presentation layer drops any view
//! older than the one it already shows.
//!
//! Configuration writes go through the settings gateway and are picked up
//! by the next pass.

use crate::catalog::{Catalog, FileCatalog};
use crate::config::AppConfig;
use crate::enrich::enrich_all;
use crate::loader::IndexLoader;
use crate::render::{MarkupRenderer, Renderer};
use class_pages_core::primitives::DEFAULT_SUBCLASS_LABEL;
use class_pages_core::{
    Caller, ClassNode, ClassPagesError, ClassSummary, EnrichedBucket, ExportDocument, Hierarchy,
    ImportMode, NavAction, NavigationState, Overlay, OverrideEdit, OverrideRow, Overrides,
    RecordType, Report, SettingsGateway, SpellBucket, SpellFilter, SpellListAssignment,
    SpellListMatrix, ViewModel, Vocabulary, build_hierarchy, override_table, sort_by_name,
    spell_list_matrix,
};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub struct ClassPagesService {
    catalog: Arc<dyn Catalog>,
    loader: IndexLoader,
    renderer: Arc<dyn Renderer>,
    settings: RwLock<SettingsGateway>,
    vocabulary: Vocabulary,
    default_label: String,
    generation: AtomicU64,
}

impl ClassPagesService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        renderer: Arc<dyn Renderer>,
        settings: SettingsGateway,
    ) -> Self {
        Self {
            loader: IndexLoader::new(Arc::clone(&catalog)),
            catalog,
            renderer,
            settings: RwLock::new(settings),
            vocabulary: Vocabulary::default(),
            default_label: DEFAULT_SUBCLASS_LABEL.to_string(),
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    #[must_use]
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    /// The production wiring: file catalog, markup renderer and a redb
    /// settings database.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClassPagesError> {
        let catalog = Arc::new(FileCatalog::new(&config.catalog_dir));
        let renderer = Arc::new(MarkupRenderer::new()?);
        let settings = SettingsGateway::open_persistent(&config.database)?;
        Ok(Self::new(catalog, renderer, settings)
            .with_vocabulary(config.vocabulary.resolve()?)
            .with_default_label(config.default_subclass_label.clone()))
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    // =========================================================================
    // AGGREGATION PASS
    // =========================================================================

    /// Load, join, partition and overlay.
    async fn aggregate(&self) -> Result<Hierarchy, ClassPagesError> {
        let (sources, assignment, overrides) = {
            let settings = self.settings.read().await;
            (
                settings.all_sources()?,
                settings.spell_lists()?,
                settings.overrides()?,
            )
        };
        let keys = |t: RecordType| sources.get(&t).map(Vec::as_slice).unwrap_or(&[]);

        let (classes, subclasses, spells) = futures::join!(
            self.loader.classes(keys(RecordType::Class)),
            self.loader.subclasses(keys(RecordType::Subclass)),
            self.loader.spells(keys(RecordType::Spell)),
        );

        Ok(build_hierarchy(
            classes,
            subclasses,
            spells,
            Overlay {
                assignment: &assignment,
                overrides: &overrides,
                default_label: &self.default_label,
            },
            &self.vocabulary,
        ))
    }

    /// Build the view for a fresh page.
    ///
    /// An unknown `class` or `subtab` falls back to the default.
    pub async fn build_view(
        &self,
        caller: Caller,
        class: Option<&str>,
        subtab: Option<&str>,
    ) -> Result<ViewModel, ClassPagesError> {
        let generation = self.next_generation();
        let hierarchy = self.aggregate().await?;
        let navigation = NavigationState::build(&hierarchy, class, subtab);
        Ok(self.present(generation, caller, hierarchy, navigation).await)
    }

    /// Rebuild, keep `previous` wherever it is still valid, then apply
    /// `action`.
    ///
    /// An invalid action fails the call; no view is produced.
    pub async fn navigate(
        &self,
        caller: Caller,
        previous: Option<&NavigationState>,
        action: Option<&NavAction>,
    ) -> Result<ViewModel, ClassPagesError> {
        let generation = self.next_generation();
        let hierarchy = self.aggregate().await?;

        let mut navigation = NavigationState::build(&hierarchy, None, None);
        if let Some(previous) = previous {
            navigation.carry_over(previous);
        }
        if let Some(action) = action {
            navigation = navigation.apply(action)?;
        }
        Ok(self.present(generation, caller, hierarchy, navigation).await)
    }

    /// Enrich the displayed subset and assemble the view model.
    async fn present(
        &self,
        generation: u64,
        caller: Caller,
        hierarchy: Hierarchy,
        navigation: NavigationState,
    ) -> ViewModel {
        let Hierarchy {
            classes,
            mut reports,
        } = hierarchy;
        let gallery: Vec<ClassSummary> = classes.iter().map(ClassSummary::from).collect();

        let active = navigation
            .active_class()
            .and_then(|id| classes.into_iter().find(|c| c.identifier() == id));
        let Some(node) = active else {
            log_reports(&reports);
            return ViewModel::empty(
                generation,
                &self.default_label,
                caller.is_privileged(),
                reports,
            );
        };

        let ClassNode {
            class,
            subclasses,
            spell_lists,
            label,
            backdrop,
        } = node;
        let identifier = class.identifier.clone();

        let renderer = self.renderer.as_ref();
        let ((class, class_reports), (subclasses, subclass_reports), (spells, spell_reports)) = futures::join!(
            enrich_all(renderer, vec![class], true),
            enrich_all(renderer, subclasses, true),
            enrich_buckets(renderer, spell_lists),
        );
        reports.extend(class_reports);
        reports.extend(subclass_reports);
        reports.extend(spell_reports);
        log_reports(&reports);

        ViewModel {
            generation,
            identifier: Some(identifier),
            class: class.into_iter().next(),
            subclass_label: label,
            backdrop,
            subclasses,
            spells,
            classes: gallery,
            selection: navigation.selection(),
            navigation,
            can_configure: caller.is_privileged(),
            reports,
        }
    }

    // =========================================================================
    // READ MODELS
    // =========================================================================

    // Configuration views share the privilege gate of the mutations.

    /// The spell list editor matrix.
    pub async fn lists(
        &self,
        caller: Caller,
        filter: &SpellFilter,
    ) -> Result<SpellListMatrix, ClassPagesError> {
        caller.require_privileged()?;
        let (class_sources, spell_sources, assignment) = {
            let settings = self.settings.read().await;
            (
                settings.sources(RecordType::Class)?,
                settings.sources(RecordType::Spell)?,
                settings.spell_lists()?,
            )
        };
        let (mut classes, spells) = futures::join!(
            self.loader.classes(&class_sources),
            self.loader.spells(&spell_sources),
        );
        log_reports(&classes.reports);
        log_reports(&spells.reports);

        sort_by_name(&mut classes.records);
        Ok(spell_list_matrix(
            &classes.records,
            spells.records,
            &assignment,
            filter,
        ))
    }

    /// Current overrides for every loaded class, name-sorted.
    pub async fn overrides_table(
        &self,
        caller: Caller,
    ) -> Result<Vec<OverrideRow>, ClassPagesError> {
        caller.require_privileged()?;
        let (class_sources, overrides) = {
            let settings = self.settings.read().await;
            (settings.sources(RecordType::Class)?, settings.overrides()?)
        };
        let mut classes = self.loader.classes(&class_sources).await;
        log_reports(&classes.reports);

        sort_by_name(&mut classes.records);
        Ok(override_table(&classes.records, &overrides))
    }

    pub async fn sources(
        &self,
        caller: Caller,
    ) -> Result<BTreeMap<RecordType, Vec<String>>, ClassPagesError> {
        caller.require_privileged()?;
        self.settings.read().await.all_sources()
    }

    /// Source keys the catalog knows about.
    pub async fn available_sources(&self, caller: Caller) -> Result<Vec<String>, ClassPagesError> {
        caller.require_privileged()?;
        self.catalog.available_sources().await
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    pub async fn set_sources(
        &self,
        caller: Caller,
        record_type: RecordType,
        sources: Vec<String>,
    ) -> Result<Vec<String>, ClassPagesError> {
        let stored = self
            .settings
            .write()
            .await
            .set_sources(caller, record_type, sources)?;
        tracing::info!(record_type = %record_type, count = stored.len(), "Sources updated");
        Ok(stored)
    }

    pub async fn import(
        &self,
        caller: Caller,
        document: &str,
        mode: ImportMode,
    ) -> Result<SpellListAssignment, ClassPagesError> {
        let result = self
            .settings
            .write()
            .await
            .import_assignments(caller, document, mode);
        match &result {
            Ok(lists) => tracing::info!(mode = %mode, classes = lists.len(), "Spell lists imported"),
            Err(e) => tracing::warn!(mode = %mode, "Import rejected: {}", e),
        }
        result
    }

    /// Export the assignment, named after the current time.
    pub async fn export(&self, caller: Caller) -> Result<ExportDocument, ClassPagesError> {
        caller.require_privileged()?;
        let epoch_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClassPagesError::IoError(e.to_string()))?
            .as_millis();
        self.settings.read().await.export_assignments(epoch_millis)
    }

    pub async fn set_override(
        &self,
        caller: Caller,
        class_identifier: &str,
        edit: OverrideEdit,
    ) -> Result<Overrides, ClassPagesError> {
        let overrides = self
            .settings
            .write()
            .await
            .set_override(caller, class_identifier, edit)?;
        tracing::info!(class = class_identifier, "Override updated");
        Ok(overrides)
    }

    pub async fn set_spell_list(
        &self,
        caller: Caller,
        class_identifier: &str,
        uuids: Vec<String>,
    ) -> Result<SpellListAssignment, ClassPagesError> {
        let lists = self
            .settings
            .write()
            .await
            .set_spell_list(caller, class_identifier, uuids)?;
        tracing::info!(
            class = class_identifier,
            spells = lists.list(class_identifier).len(),
            "Spell list replaced"
        );
        Ok(lists)
    }

    pub async fn toggle_spell(
        &self,
        caller: Caller,
        class_identifier: &str,
        uuid: &str,
        member: bool,
    ) -> Result<SpellListAssignment, ClassPagesError> {
        self.settings
            .write()
            .await
            .toggle_spell(caller, class_identifier, uuid, member)
    }
}

/// Spells are shown without descriptions.
async fn enrich_buckets(
    renderer: &dyn Renderer,
    buckets: Vec<SpellBucket>,
) -> (Vec<EnrichedBucket>, Vec<Report>) {
    let enriched = join_all(buckets.into_iter().map(|bucket| async move {
        let (spells, reports) = enrich_all(renderer, bucket.spells, false).await;
        (
            EnrichedBucket {
                level: bucket.level,
                label: bucket.label,
                spells,
            },
            reports,
        )
    }))
    .await;

    let mut reports = Vec::new();
    let buckets = enriched
        .into_iter()
        .map(|(bucket, bucket_reports)| {
            reports.extend(bucket_reports);
            bucket
        })
        .collect();
    (buckets, reports)
}

fn log_reports(reports: &[Report]) {
    for report in reports {
        tracing::warn!("{}", report);
    }
}
