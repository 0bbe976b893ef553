//! Benchmarks for armlet core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use armlet::core::builder::build;
use armlet::core::emit;
use armlet::core::manifest;
use armlet::core::template::Deployment;
use armlet::core::types::Location;
use armlet::resources::storage::{StorageConfig, StorageOp};
use armlet::resources::web::{WebAppConfig, WebAppOp};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const MANIFEST: &str = r#"
location: westeurope
resources:
  - type: storage
    name: mystorage
    sku: premium_lrs
    private_containers: [images, logs]
  - type: sql
    name: orders-srv
    admin_login: orders_admin
    allow_azure_services: true
    databases:
      - name: orders
        sku: s1
        encrypted: true
  - type: web_app
    name: shop
    sku: S1
    runtime: { dotnet_core: "3.1" }
    settings:
      storage_key: { storage_key: mystorage }
    connection_strings:
      orders: { sql_connection_string: { server: orders-srv, database: orders } }
    depends_on: [mystorage, orders-srv]
  - type: functions
    name: shop-jobs
    runtime: node
outputs:
  storageKey: { storage_key: mystorage }
"#;

fn bench_manifest_parse(c: &mut Criterion) {
    c.bench_function("manifest_parse", |b| {
        b.iter(|| {
            let parsed = manifest::parse_manifest(black_box(MANIFEST)).unwrap();
            black_box(parsed);
        });
    });
}

fn deployment(apps: usize) -> Deployment {
    let storage = build::<StorageConfig>([StorageOp::name("shared")]).unwrap();
    let mut deployment = Deployment::new(Location::west_europe()).output("key", storage.key());
    for i in 0..apps {
        let app = build::<WebAppConfig>([
            WebAppOp::name(format!("app{i}")),
            WebAppOp::setting("storage", storage.key()),
            WebAppOp::depends_on(&storage),
        ])
        .unwrap();
        deployment = deployment.add(app);
    }
    deployment.add(storage)
}

fn bench_build_and_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_compile");
    for apps in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(apps), &apps, |b, &apps| {
            b.iter(|| {
                let template = deployment(black_box(apps)).compile();
                black_box(template);
            });
        });
    }
    group.finish();
}

fn bench_lower_manifest(c: &mut Criterion) {
    let parsed = manifest::parse_manifest(MANIFEST).unwrap();
    c.bench_function("manifest_lower_compile", |b| {
        b.iter(|| {
            let template = manifest::lower(black_box(&parsed), None).unwrap().compile();
            black_box(template);
        });
    });
}

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_json");
    for apps in [1, 10, 50] {
        let template = deployment(apps).compile();
        group.bench_with_input(BenchmarkId::from_parameter(apps), &template, |b, template| {
            b.iter(|| {
                let text = emit::to_json(black_box(template), true).unwrap();
                black_box(text);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_manifest_parse,
    bench_build_and_compile,
    bench_lower_manifest,
    bench_emit
);
criterion_main!(benches);
