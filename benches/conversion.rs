//! Conversion benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xsd_jsonschema::comparison::{is_equivalent_to, EquivalenceOptions};
use xsd_jsonschema::converters::{JsonToXsdConverter, XsdToJsonConverter};
use xsd_jsonschema::json::normalize;
use xsd_jsonschema::xsd::Schema;

const ORDER_XSD: &str = include_str!("../tests/fixtures/order.xsd");
const SERES_XSD: &str = include_str!("../tests/fixtures/seres.xsd");

fn bench_read(c: &mut Criterion) {
    c.bench_function("read order.xsd", |b| b.iter(|| Schema::from_string(black_box(ORDER_XSD)).unwrap()));
}

fn bench_forward(c: &mut Criterion) {
    let schema = Schema::from_string(ORDER_XSD).unwrap();
    let converter = XsdToJsonConverter::default();
    c.bench_function("xsd to json", |b| b.iter(|| converter.convert(black_box(&schema)).unwrap()));
}

fn bench_reverse(c: &mut Criterion) {
    let schema = Schema::from_string(ORDER_XSD).unwrap();
    let json = normalize(&XsdToJsonConverter::default().convert(&schema).unwrap().value).unwrap();
    let converter = JsonToXsdConverter::default();
    c.bench_function("json to xsd", |b| b.iter(|| converter.convert(black_box(&json)).unwrap()));
}

fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round trip");
    for (name, xsd) in [("order", ORDER_XSD), ("seres", SERES_XSD)] {
        let schema = Schema::from_string(xsd).unwrap();
        let options = EquivalenceOptions::default();
        group.bench_function(name, |b| {
            b.iter(|| {
                let json = XsdToJsonConverter::default().convert(&schema).unwrap().value;
                let normalized = normalize(&json).unwrap();
                let back = JsonToXsdConverter::default().convert(&normalized).unwrap().value;
                is_equivalent_to(black_box(&schema), &back, &options).is_ok()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_read, bench_forward, bench_reverse, bench_round_trip);
criterion_main!(benches);
