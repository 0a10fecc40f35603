//! Node lookup benchmarks: cache-hit retrieval against store fallback.

use canopy::content::{MemoryStore, StorePolicy, StoreRegistry};
use canopy::detect::ContentTypeRegistry;
use canopy::fs::Filesystem;
use canopy::meta::{MemoryMetadataStore, MetaManager};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn build_fs(cache_capacity: usize) -> (Filesystem, Vec<String>) {
    let mut stores = StoreRegistry::new();
    stores.register("mem", Arc::new(MemoryStore::new()));
    let fs = Filesystem::new(
        MetaManager::new(Arc::new(MemoryMetadataStore::new()), cache_capacity),
        stores,
        StorePolicy::new("mem"),
        ContentTypeRegistry::builtin(),
    )
    .unwrap();

    let root = fs.create_root("root", "bench").unwrap();
    let mut ids = Vec::new();
    for i in 0..512 {
        let file = fs.create_file(&root.id, &format!("file-{i}")).unwrap();
        ids.push(file.id.clone());
    }
    (fs, ids)
}

fn bench_node_lookup(c: &mut Criterion) {
    let (warm, ids) = build_fs(1024);
    c.bench_function("node_lookup_cached", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let id = &ids[i % ids.len()];
            i += 1;
            warm.node(id).unwrap().unwrap()
        })
    });

    let (cold, ids) = build_fs(16);
    c.bench_function("node_lookup_store_fallback", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let id = &ids[i % ids.len()];
            i += 1;
            cold.node(id).unwrap().unwrap()
        })
    });
}

criterion_group!(benches, bench_node_lookup);
criterion_main!(benches);
