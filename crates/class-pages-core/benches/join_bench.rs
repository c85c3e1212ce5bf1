//! # Join Benchmarks
//!
//! Performance benchmarks for loading, joining and partitioning.
//!
//! Run with: `cargo bench -p class-pages-core`

use class_pages_core::{
    Overlay, Overrides, RawEntry, SourceBatch, SpellIndex, SpellListAssignment, Vocabulary,
    build_hierarchy, load_classes, load_spells, load_subclasses, partition_spells,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;

const SCHOOLS: [&str; 8] = ["abj", "con", "div", "enc", "evo", "ill", "nec", "trs"];

fn raw(entry_type: &str, uuid: String, system: serde_json::Value) -> RawEntry {
    RawEntry {
        name: uuid.clone(),
        id: uuid.clone(),
        uuid,
        entry_type: entry_type.to_string(),
        system: Some(system),
        ..RawEntry::default()
    }
}

/// Spell entries with levels and schools cycling through the vocabulary.
fn spell_batch(size: usize) -> SourceBatch {
    let entries = (0..size)
        .map(|i| {
            raw(
                "spell",
                format!("Compendium.bench.spells.Item.{}", i),
                json!({"level": i % 10, "school": SCHOOLS[i % SCHOOLS.len()]}),
            )
        })
        .collect();
    SourceBatch::new("bench.spells", entries)
}

fn class_batch(size: usize) -> SourceBatch {
    let entries = (0..size)
        .map(|i| raw("class", format!("c{}", i), json!({"identifier": format!("class-{}", i)})))
        .collect();
    SourceBatch::new("bench.classes", entries)
}

fn subclass_batch(classes: usize, per_class: usize) -> SourceBatch {
    let entries = (0..classes * per_class)
        .map(|i| {
            raw(
                "subclass",
                format!("s{}", i),
                json!({"classIdentifier": format!("class-{}", i % classes)}),
            )
        })
        .collect();
    SourceBatch::new("bench.subclasses", entries)
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition_spells");
    let vocabulary = Vocabulary::default();

    for size in [100, 1_000, 10_000] {
        let batch = spell_batch(size);
        let index: SpellIndex = load_spells(&[batch.clone()]).records.into_iter().collect();
        let assignment: Vec<String> = batch.entries.iter().map(|e| e.uuid.clone()).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(partition_spells(
                    "class-0",
                    black_box(&assignment),
                    &index,
                    &vocabulary,
                ))
            });
        });
    }
    group.finish();
}

fn bench_full_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_hierarchy");
    let vocabulary = Vocabulary::default();
    let overrides = Overrides::default();

    for classes in [12, 50] {
        let class_batches = vec![class_batch(classes)];
        let subclass_batches = vec![subclass_batch(classes, 8)];
        let spell_batches = vec![spell_batch(2_000)];
        let assignment: SpellListAssignment = (0..classes)
            .map(|i| {
                let uuids = (0..2_000)
                    .filter(|s| s % classes == i)
                    .map(|s| format!("Compendium.bench.spells.Item.{}", s))
                    .collect();
                (format!("class-{}", i), uuids)
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(classes), &classes, |b, _| {
            b.iter(|| {
                black_box(build_hierarchy(
                    load_classes(&class_batches),
                    load_subclasses(&subclass_batches),
                    load_spells(&spell_batches),
                    Overlay {
                        assignment: &assignment,
                        overrides: &overrides,
                        default_label: "Subclass",
                    },
                    &vocabulary,
                ))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_partition, bench_full_pass);
criterion_main!(benches);
