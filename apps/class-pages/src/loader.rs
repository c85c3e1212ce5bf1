//! # Index Loader
//!
//! The async half of index loading. Every configured source of a record
//! family is fetched concurrently; the batches are then handed to the core
//! in source-key order.
//!
//! An unreachable source contributes zero records and a
//! `Report::SourceUnavailable`. It never aborts the other sources.

use crate::catalog::Catalog;
use class_pages_core::{
    ClassRecord, Loaded, RecordType, Report, SourceBatch, SpellRecord, SubclassRecord,
    load_classes, load_spells, load_subclasses,
};
use futures::future::join_all;
use std::sync::Arc;

#[derive(Clone)]
pub struct IndexLoader {
    catalog: Arc<dyn Catalog>,
}

impl IndexLoader {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Fetch every source's projected index. Unregistered sources yield an
    /// empty batch.
    pub async fn fetch(
        &self,
        record_type: RecordType,
        sources: &[String],
    ) -> (Vec<SourceBatch>, Vec<Report>) {
        let fields = record_type.fields();
        let fetches = sources
            .iter()
            .map(|source| self.catalog.load_catalog(source, &fields));
        let results = join_all(fetches).await;

        let mut batches = Vec::with_capacity(sources.len());
        let mut reports = Vec::new();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(entries) => {
                    batches.push(SourceBatch::new(source.clone(), entries.unwrap_or_default()))
                }
                Err(e) => reports.push(Report::SourceUnavailable {
                    source: source.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        (batches, reports)
    }

    pub async fn classes(&self, sources: &[String]) -> Loaded<ClassRecord> {
        let (batches, reports) = self.fetch(RecordType::Class, sources).await;
        with_reports(load_classes(&batches), reports)
    }

    pub async fn subclasses(&self, sources: &[String]) -> Loaded<SubclassRecord> {
        let (batches, reports) = self.fetch(RecordType::Subclass, sources).await;
        with_reports(load_subclasses(&batches), reports)
    }

    pub async fn spells(&self, sources: &[String]) -> Loaded<SpellRecord> {
        let (batches, reports) = self.fetch(RecordType::Spell, sources).await;
        with_reports(load_spells(&batches), reports)
    }
}

/// Source failures come first, then normalization reports.
fn with_reports<T>(mut loaded: Loaded<T>, mut reports: Vec<Report>) -> Loaded<T> {
    reports.append(&mut loaded.reports);
    loaded.reports = reports;
    loaded
}
