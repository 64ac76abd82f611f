//! Benchmarks for one relevance probe and one full option resolution.
//!
//! Run with: cargo bench -p chartwire-runtime --bench probe_bench

use chartwire_core::{CapabilityDescriptor, Whitelist};
use chartwire_runtime::{DirectiveConfig, Element, Scope, probe, resolve_options};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

const OPTIONS: &[&str] = &[
    "width",
    "height",
    "dimension",
    "group",
    "radius",
    "innerRadius",
    "colors",
    "xAxisLabel",
    "yAxisLabel",
    "elasticY",
    "renderArea",
    "transitionDuration",
];

/// Host element with `n` attributes reading nested scope data.
fn host(n: usize) -> Element {
    let mut el = Element::new("div").with_attribute("dc-chart", "lineChart");
    for (i, option) in OPTIONS.iter().cycle().take(n).enumerate() {
        let name = format!("dc-{}", kebab(option));
        let expr = match i % 3 {
            0 => format!("data.values[{}] * 2", i % 4),
            1 => format!("data.label + '-{i}'"),
            _ => "data.enabled && data.values.length > 2".to_owned(),
        };
        el = el.with_attribute(name, expr);
    }
    el
}

fn kebab(option: &str) -> String {
    let mut out = String::new();
    for c in option.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn scope() -> Scope {
    let scope = Scope::new();
    scope.set(
        "data",
        serde_json::json!({
            "values": [1, 2, 3, 4],
            "label": "series",
            "enabled": true,
        }),
    );
    scope
}

fn bench_probe(c: &mut Criterion) {
    let mut group = c.benchmark_group("probe");
    let config = DirectiveConfig::default();
    let scope = scope();

    for n in [4usize, 12] {
        let attrs = host(n).declarations();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("tick", n), &attrs, |b, attrs| {
            b.iter(|| black_box(probe(attrs, &scope, &config)));
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_options");
    let config = DirectiveConfig::default();
    let scope = scope();
    let desc = CapabilityDescriptor::new("lineChart", OPTIONS);
    let whitelist = Whitelist::for_descriptor(&desc, &config.naming());

    for n in [4usize, 12] {
        let attrs = host(n).declarations();
        group.bench_with_input(BenchmarkId::new("whitelisted", n), &attrs, |b, attrs| {
            b.iter(|| black_box(resolve_options(attrs, &scope, &whitelist, &config)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_probe, bench_resolve);
criterion_main!(benches);
