//! Class templates and instances.
//!
//! A class keeps its definition and resolves methods, getters and setters by
//! walking the parent chain, so inherited members are linked rather than
//! copied. Instances only own their property table.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{ClassDef, FunctionDef, MemberFlags, MethodDef, Visibility};
use crate::runtime::context::Context;
use crate::runtime::value::Value;

/// A stored property (or static method) and the class that declared it.
#[derive(Clone)]
pub struct Member {
    pub value: Value,
    pub visibility: Visibility,
    pub owner: Rc<Class>,
}

/// A method-like member found on the class chain.
#[derive(Clone)]
pub struct MethodRef {
    pub function: Rc<FunctionDef>,
    pub flags: MemberFlags,
    pub owner: Rc<Class>,
}

pub struct Class {
    pub name: String,
    pub parent: Option<Rc<Class>>,
    pub def: Rc<ClassDef>,
    /// Context the class was defined in; methods close over it.
    pub closure: Rc<Context>,
    pub statics: RefCell<FxHashMap<String, Member>>,
}

pub struct Instance {
    pub class: Rc<Class>,
    pub members: RefCell<FxHashMap<String, Member>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

impl Class {
    pub fn new(def: Rc<ClassDef>, parent: Option<Rc<Class>>, closure: Rc<Context>) -> Self {
        Self {
            name: def.name.clone(),
            parent,
            def,
            closure,
            statics: RefCell::new(FxHashMap::default()),
        }
    }

    /// The class followed by its ancestors, nearest first.
    pub fn lineage(self: &Rc<Self>) -> Vec<Rc<Class>> {
        let mut lineage = vec![Rc::clone(self)];
        let mut current = self.parent.clone();
        while let Some(class) = current {
            current = class.parent.clone();
            lineage.push(class);
        }
        lineage
    }

    pub fn is_or_inherits(&self, name: &str) -> bool {
        self.name == name
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_or_inherits(name))
    }

    pub fn inherits_from(self: &Rc<Self>, ancestor: &Rc<Class>) -> bool {
        self.lineage().iter().any(|class| Rc::ptr_eq(class, ancestor))
    }

    fn own_members(&self, kind: MethodKind) -> &[MethodDef] {
        match kind {
            MethodKind::Method => &self.def.methods,
            MethodKind::Getter => &self.def.getters,
            MethodKind::Setter => &self.def.setters,
        }
    }

    /// Nearest declaration of a method, getter or setter named `name`.
    pub fn find(
        self: &Rc<Self>,
        kind: MethodKind,
        name: &str,
        is_static: bool,
    ) -> Option<MethodRef> {
        self.lineage().into_iter().find_map(|class| {
            let method = class
                .own_members(kind)
                .iter()
                .find(|method| method.name == name && method.flags.is_static == is_static)?;
            Some(MethodRef {
                function: Rc::clone(&method.function),
                flags: method.flags,
                owner: Rc::clone(&class),
            })
        })
    }

    /// Nearest class on the chain holding the static member `name`.
    pub fn find_static(self: &Rc<Self>, name: &str) -> Option<Member> {
        self.lineage()
            .into_iter()
            .find_map(|class| class.statics.borrow().get(name).cloned())
    }

    /// Whether this class itself declares a member named `name` in the
    /// property/method namespace or among its getters/setters.
    pub fn declares(&self, name: &str, kind: Option<MethodKind>) -> bool {
        match kind {
            Some(kind) => self.own_members(kind).iter().any(|m| m.name == name),
            None => {
                self.def.properties.iter().any(|p| p.name == name)
                    || self.def.methods.iter().any(|m| m.name == name)
            }
        }
    }

    /// Whether any ancestor declares the member.
    pub fn ancestor_declares(&self, name: &str, kind: Option<MethodKind>) -> bool {
        let mut current = self.parent.as_ref();
        while let Some(class) = current {
            if class.declares(name, kind) {
                return true;
            }
            current = class.parent.as_ref();
        }
        false
    }
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            members: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn member(&self, name: &str) -> Option<Member> {
        self.members.borrow().get(name).cloned()
    }
}

/// Whether code running with `scope` as its class may touch a member of
/// `owner` with the given visibility.
pub fn is_accessible(visibility: Visibility, owner: &Rc<Class>, scope: Option<&Rc<Class>>) -> bool {
    match visibility {
        Visibility::Public => true,
        Visibility::Private => scope.is_some_and(|scope| Rc::ptr_eq(scope, owner)),
        Visibility::Protected => scope.is_some_and(|scope| scope.inherits_from(owner)),
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|parent| &parent.name))
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} instance>", self.class.name)
    }
}
