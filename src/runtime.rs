//! Runtime object model walked by the interpreter.
//!
//! Values, the ordered dictionary, class templates and instances, the chained
//! symbol tables, evaluation contexts, and the control-flow carrier.
pub mod class;
pub mod context;
pub mod dict;
pub mod error;
pub mod result;
pub mod symbol_table;
pub mod value;
