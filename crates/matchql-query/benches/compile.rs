use criterion::{black_box, criterion_group, criterion_main, Criterion};
use matchql_core::CompilerConfig;
use matchql_query::{parse, Compiler};

const CHAIN: &str = "SELECT A.name, D.name FROM Node AS A, Edge AS E1, Node AS B, Edge AS E2, Node AS C, \
                     Edge AS E3, Node AS D MATCH A-[E1]->B-[E2]->C-[E3]->D \
                     WHERE A.age > 30 AND E2.weight < 0.5 AND C.lang = 'java' AND A.name <> D.name";

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_chain", |b| b.iter(|| parse(black_box(CHAIN))));
}

fn bench_compile(c: &mut Criterion) {
    let script = parse(CHAIN).unwrap();
    let compiler = Compiler::new(CompilerConfig::for_document_db(Some("partition")));
    c.bench_function("compile_chain_document", |b| b.iter(|| compiler.compile(black_box(&script))));
}

criterion_group!(benches, bench_parse, bench_compile);
criterion_main!(benches);
