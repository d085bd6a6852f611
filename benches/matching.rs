use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use agrimatch::storage::sample_entries;
use agrimatch::{EntryId, KnowledgeEntry, MatchConfig, MatchEngine, NewEntry};

const CROPS: [&str; 6] = ["Wheat", "Rice", "Cotton", "Banana", "Coconut", "All"];
const TOPICS: [&str; 8] = [
    "irrigation schedule",
    "aphid control",
    "harvest timing",
    "soil pH testing",
    "market prices",
    "fertilizer dose",
    "seed treatment",
    "weed management",
];

/// Sample entries followed by synthetic ones up to `n`.
fn knowledge_base(n: usize) -> Vec<KnowledgeEntry> {
    let mut entries = sample_entries();
    let mut next = EntryId::new(6);
    for i in entries.len()..n {
        let crop = CROPS[i % CROPS.len()];
        let topic = TOPICS[i % TOPICS.len()];
        let entry = NewEntry::new(
            &format!("What is the recommended {topic} for {crop} in variant {i}?"),
            &format!("For {crop}, follow the local extension guidance on {topic}; batch {i}."),
            Some(crop),
            Some(topic),
        )
        .unwrap()
        .into_entry(next);
        entries.push(entry);
        next = next.next();
    }
    entries
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching/build");
    for n in [100usize, 1_000] {
        let entries = knowledge_base(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &entries, |b, entries| {
            let engine = MatchEngine::new(MatchConfig::default()).unwrap();
            b.iter(|| black_box(engine.build(entries.clone())));
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching/search");
    for n in [100usize, 1_000] {
        let engine = MatchEngine::new(MatchConfig::default()).unwrap();
        engine.build(knowledge_base(n));

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("exact", n), &engine, |b, engine| {
            b.iter(|| black_box(engine.search("water wheat").unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("misspelled", n), &engine, |b, engine| {
            b.iter(|| black_box(engine.search("aphds cottn").unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("no_match", n), &engine, |b, engine| {
            b.iter(|| black_box(engine.search("xyzzy plugh qwerty").unwrap()));
        });
    }
    group.finish();
}

criterion_group!(matching, bench_build, bench_search);
criterion_main!(matching);
