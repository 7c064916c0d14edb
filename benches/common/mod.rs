#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use test_support::bench_cases;
use vesper::ast::Program;
use vesper::{lexer, parser};

const PROGRAMS_DIR: &str = "tests/programs";

/// Fixture programs marked for benchmarking, labelled by case name.
pub fn workloads() -> Vec<(String, PathBuf)> {
    bench_cases(Path::new(PROGRAMS_DIR))
        .unwrap_or_else(|err| panic!("load bench cases: {err:#}"))
        .into_iter()
        .map(|case| (case.name, case.program_path))
        .collect()
}

pub fn load_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

pub fn load_program(path: &Path) -> Program {
    let source = load_source(path);
    let tokens = lexer::tokenize(&source)
        .unwrap_or_else(|err| panic!("tokenize {}: {err}", path.display()));
    parser::parse_tokens(tokens).unwrap_or_else(|err| panic!("parse {}: {err}", path.display()))
}
