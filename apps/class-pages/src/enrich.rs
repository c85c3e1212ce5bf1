//! # Enrichment Pipeline
//!
//! Fans out one render per record and waits for all of them. A failed
//! render does not affect its siblings: the record gets empty markup and a
//! `Report::EnrichmentFailed`.

use crate::render::Renderer;
use class_pages_core::{CatalogRecord, EnrichedRecord, Report};
use futures::future::join_all;

/// Enrich every record, keeping input order.
///
/// With `with_description == false` nothing is rendered and
/// `description_markup` stays `None`.
pub async fn enrich_all<T: CatalogRecord>(
    renderer: &dyn Renderer,
    records: Vec<T>,
    with_description: bool,
) -> (Vec<EnrichedRecord<T>>, Vec<Report>) {
    if !with_description {
        let enriched = records
            .into_iter()
            .map(|record| EnrichedRecord::new(record, None))
            .collect();
        return (enriched, Vec::new());
    }

    let renders = records
        .iter()
        .map(|record| renderer.enrich(record.description()));
    let results = join_all(renders).await;

    let mut reports = Vec::new();
    let enriched = records
        .into_iter()
        .zip(results)
        .map(|(record, result)| {
            let markup = match result {
                Ok(markup) => markup,
                Err(e) => {
                    reports.push(Report::EnrichmentFailed {
                        uuid: record.uuid().to_string(),
                        reason: e.to_string(),
                    });
                    String::new()
                }
            };
            EnrichedRecord::new(record, Some(markup))
        })
        .collect();
    (enriched, reports)
}
