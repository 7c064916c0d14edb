//! Class definition, instantiation and `super` dispatch.

use std::rc::Rc;

use tracing::debug;

use crate::ast::{CONSTRUCTOR, ClassDef, Node};
use crate::runtime::class::{Class, Instance, Member, MethodKind, MethodRef};
use crate::runtime::context::Context;
use crate::runtime::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::result::RuntimeResult;
use crate::runtime::symbol_table::SymbolTable;
use crate::runtime::value::{Function, Value};
use crate::token::Span;

use super::{At, Interpreter};

type Evaluation = Result<RuntimeResult, RuntimeError>;

/// Every member redefining an inherited one must say so with `override`,
/// and `override` must actually replace something. Constructors are exempt.
fn check_overrides(class: &Class) -> Result<(), RuntimeErrorKind> {
    let def = &class.def;
    let members = def
        .properties
        .iter()
        .map(|property| (property.name.as_str(), property.flags, None))
        .chain(def.methods.iter().map(|method| (method.name.as_str(), method.flags, None)))
        .chain(
            def.getters
                .iter()
                .map(|getter| (getter.name.as_str(), getter.flags, Some(MethodKind::Getter))),
        )
        .chain(
            def.setters
                .iter()
                .map(|setter| (setter.name.as_str(), setter.flags, Some(MethodKind::Setter))),
        );

    for (name, flags, kind) in members {
        if name == CONSTRUCTOR {
            continue;
        }
        let inherited = class.ancestor_declares(name, kind);
        let message = match (inherited, flags.is_override) {
            (true, false) => format!(
                "'{name}' in class '{}' redefines an inherited member and must be marked 'override'",
                class.name
            ),
            (false, true) => format!(
                "'{name}' in class '{}' is marked 'override' but no parent class declares it",
                class.name
            ),
            _ => continue,
        };
        return Err(RuntimeErrorKind::InvalidClass { message });
    }
    Ok(())
}

fn invalid_super(message: &str) -> RuntimeErrorKind {
    RuntimeErrorKind::InvalidSuper {
        message: message.to_string(),
    }
}

impl Interpreter {
    pub(super) fn define_class(
        &mut self,
        def: &Rc<ClassDef>,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        let parent = match &def.parent {
            None => None,
            Some(name) => match context.symbols.get(name) {
                Some(Value::Class(class)) => Some(class),
                Some(_) => {
                    return Err(RuntimeErrorKind::NotAClass { name: name.clone() })
                        .at(span, context);
                }
                None => {
                    return Err(RuntimeErrorKind::UndefinedVariable { name: name.clone() })
                        .at(span, context);
                }
            },
        };

        let class = Rc::new(Class::new(Rc::clone(def), parent, Rc::clone(context)));
        check_overrides(&class).at(span, context)?;

        let body = Context::child(
            context,
            format!("<class {}>", class.name),
            span.start,
            SymbolTable::child(&context.symbols),
            Some(Rc::clone(&class)),
        );
        for property in def.properties.iter().filter(|property| property.flags.is_static) {
            let value = match &property.value {
                Some(node) => self.value_of(node, &body)?,
                None => Value::None,
            };
            class.statics.borrow_mut().insert(
                property.name.clone(),
                Member {
                    value,
                    visibility: property.flags.visibility,
                    owner: Rc::clone(&class),
                },
            );
        }
        for method in def.methods.iter().filter(|method| method.flags.is_static) {
            let function = Function {
                def: Rc::clone(&method.function),
                closure: Rc::clone(context),
                receiver: None,
                owner: Some(Rc::clone(&class)),
            };
            class.statics.borrow_mut().insert(
                method.name.clone(),
                Member {
                    value: Value::Function(Rc::new(function)),
                    visibility: method.flags.visibility,
                    owner: Rc::clone(&class),
                },
            );
        }

        debug!(
            class = %class.name,
            parent = class.parent.as_ref().map(|parent| parent.name.as_str()),
            "defined class"
        );
        let value = Value::Class(class);
        context.symbols.set(&def.name, value.clone()).at(span, context)?;
        Ok(value)
    }

    pub(super) fn instantiate(
        &mut self,
        class: &Node,
        args: &[Node],
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let class = match propagate!(self.evaluate(class, context)?) {
            Value::Class(class) => class,
            other => {
                return Err(RuntimeErrorKind::NotAClass {
                    name: other.type_name().to_string(),
                })
                .at(span, context);
            }
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(propagate!(self.evaluate(arg, context)?));
        }

        self.enter(span, context)?;
        let instance = self.construct(&class, values, span, context);
        self.depth -= 1;
        Ok(RuntimeResult::Value(Value::Instance(instance?)))
    }

    /// Seeds properties from the root class down to `class`, then runs the
    /// nearest constructor.
    fn construct(
        &mut self,
        class: &Rc<Class>,
        args: Vec<Value>,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Rc<Instance>, RuntimeError> {
        let instance = Rc::new(Instance::new(Rc::clone(class)));
        let receiver = Value::Instance(Rc::clone(&instance));

        for level in class.lineage().into_iter().rev() {
            let seed = Context::child(
                context,
                format!("<new {}>", level.name),
                span.start,
                SymbolTable::child(&level.closure.symbols),
                Some(Rc::clone(&level)),
            );
            seed.symbols.set("self", receiver.clone()).at(span, context)?;
            for property in level.def.properties.iter().filter(|p| !p.flags.is_static) {
                let value = match &property.value {
                    Some(node) => self.value_of(node, &seed)?,
                    None => Value::None,
                };
                instance.members.borrow_mut().insert(
                    property.name.clone(),
                    Member {
                        value,
                        visibility: property.flags.visibility,
                        owner: Rc::clone(&level),
                    },
                );
            }
        }

        match class.find(MethodKind::Method, CONSTRUCTOR, false) {
            Some(constructor) => {
                let constructor = self.bind(constructor, Some(Rc::clone(&instance)));
                self.call_function(&constructor, args, span, context)?;
            }
            None if !args.is_empty() => {
                return Err(RuntimeErrorKind::ArityMismatch {
                    name: class.name.clone(),
                    expected: "0".to_string(),
                    found: args.len(),
                })
                .at(span, context);
            }
            None => {}
        }
        debug!(class = %class.name, "instantiated");
        Ok(instance)
    }

    /// The parent of the executing method's class and the current `self`.
    fn super_target(
        &self,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<(Rc<Class>, Rc<Instance>), RuntimeError> {
        let scope = context
            .class_scope
            .as_ref()
            .ok_or_else(|| invalid_super("'super' is only valid inside a class method"))
            .at(span, context)?;
        let parent = scope
            .parent
            .clone()
            .ok_or_else(|| invalid_super(&format!("Class '{}' has no parent class", scope.name)))
            .at(span, context)?;
        match context.symbols.get("self") {
            Some(Value::Instance(instance)) => Ok((parent, instance)),
            _ => Err(invalid_super("'super' requires an instance")).at(span, context),
        }
    }

    pub(super) fn super_call(
        &mut self,
        args: &[Node],
        span: Span,
        context: &Rc<Context>,
    ) -> Evaluation {
        let (parent, instance) = self.super_target(span, context)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(propagate!(self.evaluate(arg, context)?));
        }
        match parent.find(MethodKind::Method, CONSTRUCTOR, false) {
            Some(constructor) => {
                let constructor = self.bind(constructor, Some(instance));
                self.call_function(&constructor, values, span, context)?;
            }
            None if !values.is_empty() => {
                return Err(RuntimeErrorKind::ArityMismatch {
                    name: parent.name.clone(),
                    expected: "0".to_string(),
                    found: values.len(),
                })
                .at(span, context);
            }
            None => {}
        }
        Ok(RuntimeResult::none())
    }

    /// `super.name`: the parent's method bound to `self`, or its getter's value.
    pub(super) fn super_property(
        &mut self,
        name: &str,
        span: Span,
        context: &Rc<Context>,
    ) -> Result<Value, RuntimeError> {
        let (parent, instance) = self.super_target(span, context)?;
        if let Some(method) = parent.find(MethodKind::Method, name, false) {
            self.check_access(method.flags.visibility, &method.owner, name, span, context)?;
            return Ok(Value::Function(self.bind(method, Some(instance))));
        }
        if let Some(getter) = parent.find(MethodKind::Getter, name, false) {
            self.check_access(getter.flags.visibility, &getter.owner, name, span, context)?;
            let getter = self.bind(getter, Some(instance));
            return self.call_function(&getter, Vec::new(), span, context);
        }
        Err(RuntimeErrorKind::UnknownMember {
            class: parent.name.clone(),
            member: name.to_string(),
        })
        .at(span, context)
    }

    pub(super) fn bind(&self, method: MethodRef, receiver: Option<Rc<Instance>>) -> Rc<Function> {
        Rc::new(Function {
            def: method.function,
            closure: Rc::clone(&method.owner.closure),
            receiver,
            owner: Some(method.owner),
        })
    }

    pub(super) fn repr_method(&self, instance: &Rc<Instance>) -> Option<Rc<Function>> {
        instance
            .class
            .find(MethodKind::Method, "__repr", false)
            .map(|method| self.bind(method, Some(Rc::clone(instance))))
    }
}
