//! Benchmarks for the hot paths: attribute validation, filename parsing and
//! link resolution.

use std::sync::Arc;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use mdm_core::{Ean, TypologyId};
use mdm_dam::ParsedFileKey;
use mdm_events::execute;
use mdm_infra::{
    InMemoryArticleStore, InMemoryProductStore, MdmCore, ProductStore, StoreProductLookup,
};
use mdm_linking::LinkResolver;
use mdm_pim::{CreateProduct, Product, ProductCommand};
use mdm_typology::{
    AttributeDefinition, AttributeKind, AttributeMap, AttributeValue, SchemaValidator,
    TypologyRegistry, TypologySpec, ValidationTarget, attribute_map,
};

fn electronics() -> TypologySpec {
    TypologySpec::new(TypologyId::new("electronics").unwrap(), "Electronics")
        .attribute(AttributeDefinition::new("processeur", AttributeKind::Text).required())
        .attribute(
            AttributeDefinition::new("ram", AttributeKind::Number)
                .required()
                .min(1.0)
                .max(512.0),
        )
        .attribute(AttributeDefinition::new("batterie", AttributeKind::Text))
        .attribute(AttributeDefinition::new("prix", AttributeKind::Number).min(0.0))
}

fn electronics_attrs() -> AttributeMap {
    attribute_map([
        ("processeur", AttributeValue::text("Octa 3.2GHz")),
        ("ram", AttributeValue::number(16.0)),
        ("batterie", AttributeValue::text("4500mAh")),
        ("prix", AttributeValue::number(699.0)),
    ])
}

fn wide_typology(attributes: usize) -> (TypologySpec, AttributeMap) {
    let mut spec = TypologySpec::new(TypologyId::new("wide").unwrap(), "Wide");
    let mut values = AttributeMap::new();
    for n in 0..attributes {
        let name = format!("attr_{n}");
        spec = spec.attribute(
            AttributeDefinition::new(name.clone(), AttributeKind::Number)
                .required()
                .min(0.0),
        );
        values.insert(name, AttributeValue::number(n as f64));
    }
    (spec, values)
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_validation");
    group.sample_size(1000);

    let registry = Arc::new(TypologyRegistry::new());
    registry.publish(electronics()).unwrap();
    let validator = SchemaValidator::new(registry.clone());
    let target = ValidationTarget::Latest(TypologyId::new("electronics").unwrap());
    let attrs = electronics_attrs();

    group.bench_function("electronics_product", |b| {
        b.iter(|| validator.validate(black_box(&target), black_box(&attrs)).unwrap())
    });

    for attributes in [8usize, 32, 128] {
        let registry = Arc::new(TypologyRegistry::new());
        let (spec, values) = wide_typology(attributes);
        registry.publish(spec).unwrap();
        let validator = SchemaValidator::new(registry);
        let target = ValidationTarget::Latest(TypologyId::new("wide").unwrap());

        group.throughput(Throughput::Elements(attributes as u64));
        group.bench_with_input(
            BenchmarkId::new("attributes", attributes),
            &values,
            |b, values| b.iter(|| validator.validate(black_box(&target), black_box(values)).unwrap()),
        );
    }

    group.finish();
}

fn bench_filename_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("filename_parsing");
    group.sample_size(1000);

    group.bench_function("full_key", |b| {
        b.iter(|| ParsedFileKey::parse(black_box("EAN4006381333931_SKU12AB_packshot_front.jpg")))
    });
    group.bench_function("no_tokens", |b| {
        b.iter(|| ParsedFileKey::parse(black_box("banner.jpg")))
    });

    group.finish();
}

fn catalog_with_products(count: usize) -> StoreProductLookup {
    let products = Arc::new(InMemoryProductStore::new());
    for n in 0..count {
        let ean = Ean::new(format!("{:013}", 4_000_000_000_000u64 + n as u64)).unwrap();
        let mut product = Product::empty(ean.clone());
        execute(
            &mut product,
            &ProductCommand::CreateProduct(CreateProduct {
                ean,
                typology: "electronics@1".parse().unwrap(),
                attributes: AttributeMap::new(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        products.insert_new(product).unwrap();
    }
    StoreProductLookup::new(products, Arc::new(InMemoryArticleStore::new()))
}

fn bench_link_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_resolution");
    group.sample_size(1000);

    let resolver = LinkResolver::new(catalog_with_products(1_000));
    let hit = ParsedFileKey::parse("EAN4000000000500_front.jpg");
    let miss = ParsedFileKey::parse("EAN9990000000000_front.jpg");

    group.bench_function("known_product", |b| {
        b.iter(|| resolver.resolve(black_box(&hit)).unwrap())
    });
    group.bench_function("unknown_product", |b| {
        b.iter(|| resolver.resolve(black_box(&miss)).unwrap())
    });

    group.finish();
}

fn bench_ingest_to_link(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_to_link");
    group.sample_size(200);

    let core = MdmCore::default();
    core.publish_typology(electronics()).unwrap();
    core.create_product(
        Ean::new("4006381333931").unwrap(),
        TypologyId::new("electronics").unwrap(),
        None,
        electronics_attrs(),
    )
    .unwrap();

    let mut n = 0u64;
    group.bench_function("ingest_and_resolve", |b| {
        b.iter(|| {
            n += 1;
            let media = core
                .ingest_media("EAN4006381333931_front.jpg", &n.to_le_bytes())
                .unwrap();
            let key = media.key().clone();
            core.handle_event(&mdm_events::MdmEvent::MediaIngested {
                media: media.media_id().clone(),
                filename: media.original_filename().to_string(),
                ean: key.ean,
                sku: key.sku,
                tag: key.tag,
                extension: key.extension,
                occurred_at: Utc::now(),
            })
            .unwrap();
            black_box(media)
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_validation,
    bench_filename_parsing,
    bench_link_resolution,
    bench_ingest_to_link
);
criterion_main!(benches);
