pub mod ast;
pub mod builtins;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod session;
pub mod token;
