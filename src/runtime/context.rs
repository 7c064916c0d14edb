//! Evaluation contexts: one per program, function call and loop iteration.
//!
//! `parent` is the caller (or enclosing frame for loops) and drives the
//! traceback; name resolution goes through `symbols`, whose parent chain is
//! lexical.

use std::rc::Rc;

use crate::runtime::class::Class;
use crate::runtime::error::Frame;
use crate::runtime::symbol_table::SymbolTable;
use crate::token::Position;

#[derive(Debug)]
pub struct Context {
    pub display_name: String,
    pub parent: Option<Rc<Context>>,
    /// Where the parent was when it entered this context.
    pub parent_entry_pos: Option<Position>,
    pub symbols: Rc<SymbolTable>,
    /// Class whose method body is executing, used for visibility checks.
    pub class_scope: Option<Rc<Class>>,
}

impl Context {
    pub fn root(display_name: impl Into<String>, symbols: Rc<SymbolTable>) -> Rc<Context> {
        Rc::new(Self {
            display_name: display_name.into(),
            parent: None,
            parent_entry_pos: None,
            symbols,
            class_scope: None,
        })
    }

    pub fn child(
        parent: &Rc<Context>,
        display_name: impl Into<String>,
        entry: Position,
        symbols: Rc<SymbolTable>,
        class_scope: Option<Rc<Class>>,
    ) -> Rc<Context> {
        Rc::new(Self {
            display_name: display_name.into(),
            parent: Some(Rc::clone(parent)),
            parent_entry_pos: Some(entry),
            symbols,
            class_scope,
        })
    }

    /// Nested scope with a fresh symbol table, e.g. one loop iteration.
    pub fn scope(parent: &Rc<Context>, display_name: &str, entry: Position) -> Rc<Context> {
        let symbols = SymbolTable::child(&parent.symbols);
        Self::child(parent, display_name, entry, symbols, parent.class_scope.clone())
    }

    /// Traceback frames ending in this context, outermost first. `position`
    /// is where execution currently is inside `self`.
    pub fn frames(&self, position: Position) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut current = Some(self);
        let mut position = Some(position);
        while let Some(context) = current {
            if let Some(at) = position {
                frames.push(Frame {
                    display_name: context.display_name.clone(),
                    position: at,
                });
            }
            position = context.parent_entry_pos;
            current = context.parent.as_deref();
        }
        frames.reverse();
        frames
    }
}
