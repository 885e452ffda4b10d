use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use knowledge_context::{entity_type, KnowledgeContext};

entity_type! {
    pub struct Place: "http://schema.org/Place" extends ["http://schema.org/Thing"];
}

entity_type! {
    pub struct City: "http://schema.org/City"
        extends ["http://schema.org/Place", "http://schema.org/Thing"];
}

fn populated_context(cities: u32) -> KnowledgeContext {
    let ctx = KnowledgeContext::new();
    let country = Place::with_id(&ctx, "mem://country");
    country.text("name").set("Somewhere");

    // Each city carries a name, a population and a link back to the country.
    for i in 0..cities {
        let city = City::new(&ctx);
        city.text("name").set(format!("City {i}"));
        city.number("population").set(f64::from(i) * 1000.0);
        city.reference::<Place>("containedInPlace").set(&country);
    }
    ctx
}

fn bench_serialize(c: &mut Criterion) {
    let ctx = populated_context(1024);
    let bytes = ctx.serialize().unwrap();

    let mut group = c.benchmark_group("snapshot");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("serialize_1k_entities", |b| {
        b.iter(|| black_box(ctx.serialize().unwrap()));
    });

    group.bench_function("deserialize_1k_entities", |b| {
        b.iter(|| black_box(KnowledgeContext::deserialize(black_box(&bytes)).unwrap()));
    });

    group.bench_function("embed_1k_entities", |b| {
        b.iter(|| black_box(ctx.to_embedded_string().unwrap()));
    });

    group.finish();
}

fn bench_copy(c: &mut Criterion) {
    let ctx = populated_context(256);
    let ids: Vec<String> = ctx.entities().iter().map(|e| e.id().to_string()).collect();

    c.bench_function("snapshot/copy_to_recursive_256", |b| {
        b.iter_batched(
            KnowledgeContext::new,
            |target| {
                for id in &ids {
                    if let Some(entity) = ctx.get_entity_in_memory(id) {
                        entity.copy_to(&target, true);
                    }
                }
                target
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_serialize, bench_copy);
criterion_main!(benches);
