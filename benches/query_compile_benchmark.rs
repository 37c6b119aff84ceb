use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use entityhub::core::config::YardConfig;
use entityhub::core::types::{Representation, Value};
use entityhub::mapping::FieldMapper;
use entityhub::query::{
    Constraint, FieldQuery, QueryCompiler, RangeConstraint, SelectMode, SimilarityConstraint, TextConstraint,
    ValueConstraint,
};
use entityhub::schema::value_factory::IndexValueFactory;
use entityhub::store::MemoryStore;
use entityhub::yard::{IndexYard, Yard};
use rand::Rng;
use std::sync::Arc;

const LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";
const LEGS: &str = "http://example.org/zoo/legs";
const HABITAT: &str = "http://example.org/zoo/habitat";
const WORDS: [&str; 8] = ["big", "small", "red", "striped", "cat", "tiger", "bird", "fish"];

/// Helper to create a field query with the given number of constraints
fn create_query(constraints: usize) -> FieldQuery {
    let mut rng = rand::thread_rng();
    let mut query = FieldQuery::new();
    for i in 0..constraints {
        let constraint = match i % 3 {
            0 => Constraint::Text(
                TextConstraint::new([WORDS[rng.gen_range(0..WORDS.len())]]).with_languages(["en", "de"]),
            ),
            1 => Constraint::Range(RangeConstraint::new(
                Some(Value::Int(rng.gen_range(0..4))),
                Some(Value::Int(rng.gen_range(4..8))),
                true,
            )),
            _ => Constraint::Value(ValueConstraint::references([format!(
                "http://example.org/zoo/habitat{}",
                rng.gen_range(0..10)
            )])),
        };
        query.set_constraint(format!("{}{}", [LABEL, LEGS, HABITAT][i % 3], i / 3), constraint);
    }
    query
}

/// Benchmark compilation of queries of growing size
fn bench_compile(c: &mut Criterion) {
    let compiler = QueryCompiler::new(Arc::new(FieldMapper::detached()), Arc::new(IndexValueFactory::new()));
    let mut group = c.benchmark_group("compile_query");

    for constraints in [1, 5, 20, 50].iter() {
        let query = create_query(*constraints);
        group.bench_with_input(BenchmarkId::from_parameter(constraints), &query, |b, query| {
            b.iter(|| {
                let mut query = query.clone();
                black_box(compiler.compile(&mut query, SelectMode::Query));
            });
        });
    }

    group.finish();
}

/// Benchmark compilation of a similarity query
fn bench_compile_similarity(c: &mut Criterion) {
    let compiler = QueryCompiler::new(Arc::new(FieldMapper::detached()), Arc::new(IndexValueFactory::new()));
    let mut query = create_query(6);
    query.set_constraint(
        COMMENT,
        Constraint::Similarity(SimilarityConstraint::new("a big striped cat living in the jungle")),
    );

    c.bench_function("compile_similarity_query", |b| {
        b.iter(|| {
            let mut query = query.clone();
            black_box(compiler.compile(&mut query, SelectMode::All));
        });
    });
}

/// Benchmark a full query against a yard backed by the in-memory store
fn bench_yard_find(c: &mut Criterion) {
    let yard = IndexYard::new(YardConfig::new("zoo"), Arc::new(MemoryStore::new())).unwrap();
    let mut rng = rand::thread_rng();
    let animals: Vec<Representation> = (0..500)
        .map(|i| {
            let mut rep = Representation::new(format!("urn:zoo:animal{}", i));
            let label = format!("{} {}", WORDS[rng.gen_range(0..4)], WORDS[rng.gen_range(4..WORDS.len())]);
            rep.add(LABEL, Value::text(label, Some("en")));
            rep.add(LEGS, rng.gen_range(0..8i32));
            rep
        })
        .collect();
    yard.store_all(animals).unwrap();

    let mut query = FieldQuery::new();
    query.set_constraint(LABEL, Constraint::Text(TextConstraint::new(["cat"]).with_languages(["en"])));
    query.set_constraint(LEGS, Constraint::Range(RangeConstraint::new(Some(Value::Int(2)), None, true)));

    c.bench_function("yard_find_references", |b| {
        b.iter(|| black_box(yard.find_references(&query).unwrap()));
    });
}

criterion_group!(benches, bench_compile, bench_compile_similarity, bench_yard_find);
criterion_main!(benches);
