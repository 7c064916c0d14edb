mod common;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use vesper::config::Config;
use vesper::interpreter::Interpreter;
use vesper::session::Session;

fn bench_interpreter(c: &mut Criterion) {
    for (label, path) in common::workloads() {
        let program = common::load_program(&path);
        let source = common::load_source(&path);

        // A fresh interpreter per iteration so class statics and globals
        // start from the same state every time.
        c.bench_function(&format!("evaluate_{label}"), |b| {
            b.iter_batched(
                || Interpreter::new(Config::default()),
                |mut interpreter| {
                    let values = interpreter.run(black_box(&program)).expect("run");
                    black_box((values, interpreter.take_output()))
                },
                BatchSize::SmallInput,
            )
        });

        c.bench_function(&format!("session_{label}"), |b| {
            b.iter_batched(
                Session::default,
                |mut session| black_box(session.run(black_box(&source))),
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_interpreter);
criterion_main!(benches);
