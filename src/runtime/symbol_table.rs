//! Chained scopes. Lookups fall back to the parent table; writes either
//! define locally (`set`) or update the nearest table that already holds the
//! name (`modify`).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::runtime::error::RuntimeErrorKind;
use crate::runtime::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    /// Write-once binding created by `define`.
    constant: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    bindings: RefCell<FxHashMap<String, Binding>>,
    parent: Option<Rc<SymbolTable>>,
}

impl SymbolTable {
    pub fn new(parent: Option<Rc<SymbolTable>>) -> Self {
        Self {
            bindings: RefCell::new(FxHashMap::default()),
            parent,
        }
    }

    pub fn child(parent: &Rc<SymbolTable>) -> Rc<SymbolTable> {
        Rc::new(Self::new(Some(Rc::clone(parent))))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref()?.get(name)
    }

    /// Whether the nearest binding of `name` is write-once.
    pub fn is_constant(&self, name: &str) -> bool {
        if let Some(binding) = self.bindings.borrow().get(name) {
            return binding.constant;
        }
        self.parent
            .as_ref()
            .is_some_and(|parent| parent.is_constant(name))
    }

    /// Defines (or redefines) `name` in this table.
    pub fn set(&self, name: &str, value: Value) -> Result<(), RuntimeErrorKind> {
        self.define(name, value, false)
    }

    pub fn define_constant(&self, name: &str, value: Value) -> Result<(), RuntimeErrorKind> {
        self.define(name, value, true)
    }

    fn define(&self, name: &str, value: Value, constant: bool) -> Result<(), RuntimeErrorKind> {
        if self.is_constant(name) {
            return Err(RuntimeErrorKind::ConstantReassignment {
                name: name.to_string(),
            });
        }
        self.bindings
            .borrow_mut()
            .insert(name.to_string(), Binding { value, constant });
        Ok(())
    }

    /// Updates the nearest enclosing binding of `name`.
    pub fn modify(&self, name: &str, value: Value) -> Result<(), RuntimeErrorKind> {
        if let Some(binding) = self.bindings.borrow_mut().get_mut(name) {
            if binding.constant {
                return Err(RuntimeErrorKind::ConstantReassignment {
                    name: name.to_string(),
                });
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.modify(name, value),
            None => Err(RuntimeErrorKind::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }

    /// Removes the nearest enclosing binding of `name`.
    pub fn remove(&self, name: &str) -> Result<Value, RuntimeErrorKind> {
        {
            let mut bindings = self.bindings.borrow_mut();
            if let Some(binding) = bindings.get(name) {
                if binding.constant {
                    return Err(RuntimeErrorKind::ConstantReassignment {
                        name: name.to_string(),
                    });
                }
                if let Some(binding) = bindings.remove(name) {
                    return Ok(binding.value);
                }
            }
        }
        match &self.parent {
            Some(parent) => parent.remove(name),
            None => Err(RuntimeErrorKind::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }
}
