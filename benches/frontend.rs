mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vesper::{lexer, parser};

fn bench_frontend(c: &mut Criterion) {
    for (label, path) in common::workloads() {
        let source = common::load_source(&path);
        let tokens = lexer::tokenize(&source).expect("tokenize");

        c.bench_function(&format!("lexer_{label}"), |b| {
            b.iter(|| black_box(lexer::tokenize(black_box(&source)).expect("tokenize")))
        });

        c.bench_function(&format!("parser_{label}"), |b| {
            b.iter(|| black_box(parser::parse_tokens(black_box(tokens.clone())).expect("parse")))
        });
    }
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
