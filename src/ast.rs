//! Syntax tree produced by the parser and walked by the interpreter.
//!
//! Every node carries the source span it was parsed from. Spans are only used
//! for diagnostics; evaluation never inspects them.

use std::rc::Rc;

use crate::token::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
    Nullish,
    Instanceof,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^^",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Nullish => "??",
            BinaryOp::Instanceof => "instanceof",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitNot,
    Not,
    Typeof,
}

/// Index part of `target[...]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Index {
    Single(Box<Node>),
    /// `target[]`, only valid as an assignment target.
    Push,
    /// `target[start:end]`, either bound may be omitted.
    Slice {
        start: Option<Box<Node>>,
        end: Option<Box<Node>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Declared type name, `None` when unannotated.
    pub type_name: Option<String>,
    pub is_rest: bool,
    pub is_optional: bool,
    pub default: Option<Node>,
    pub span: Span,
}

impl Param {
    pub fn required(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            is_rest: false,
            is_optional: false,
            default: None,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Node,
    /// Expression-bodied (`-> expr`) functions return their body value.
    pub auto_return: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemberFlags {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_override: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub value: Option<Node>,
    pub flags: MemberFlags,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub function: Rc<FunctionDef>,
    pub flags: MemberFlags,
    pub span: Span,
}

/// Name of the method run by `new`.
pub const CONSTRUCTOR: &str = "__init";

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub properties: Vec<PropertyDef>,
    pub methods: Vec<MethodDef>,
    pub getters: Vec<MethodDef>,
    pub setters: Vec<MethodDef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Node),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Node,
    pub body: Node,
    /// Block-bodied branches evaluate to `none`.
    pub discard: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Literals
    Number(f64),
    String(String),
    Template(Vec<TemplatePart>),
    Boolean(bool),
    None,

    // Composites
    List(Vec<Node>),
    Dict(Vec<(String, Node)>),

    // References and assignment
    VarDeclare {
        name: String,
        value: Box<Node>,
    },
    ConstDeclare {
        name: String,
        value: Box<Node>,
    },
    VarAccess(String),
    VarModify {
        name: String,
        value: Box<Node>,
    },
    Delete(Box<Node>),
    IndexAccess {
        target: Box<Node>,
        index: Index,
        optional: bool,
    },
    IndexAssign {
        target: Box<Node>,
        index: Index,
        value: Box<Node>,
    },
    Property {
        target: Box<Node>,
        name: String,
        optional: bool,
    },
    PropertyAssign {
        target: Box<Node>,
        name: String,
        value: Box<Node>,
    },
    StaticProperty {
        target: Box<Node>,
        name: String,
        optional: bool,
    },
    StaticPropertyAssign {
        target: Box<Node>,
        name: String,
        value: Box<Node>,
    },

    // Operators
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },

    // Control flow
    If {
        branches: Vec<Branch>,
        else_body: Option<Box<Node>>,
        else_discard: bool,
    },
    For {
        var: String,
        start: Option<Box<Node>>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        discard: bool,
    },
    Foreach {
        iterable: Box<Node>,
        key: Option<String>,
        value: String,
        body: Box<Node>,
        discard: bool,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
        discard: bool,
    },
    /// Cases are already desugared into `subject == value` conditions.
    Switch {
        cases: Vec<(Node, Node)>,
        default: Option<Box<Node>>,
    },
    Block(Vec<Node>),

    // Callables
    FuncDef(Rc<FunctionDef>),
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
        optional: bool,
    },
    Return(Option<Box<Node>>),
    Continue,
    Break,
    Pass,

    // Classes
    ClassDef(Rc<ClassDef>),
    New {
        class: Box<Node>,
        args: Vec<Node>,
    },
    SuperCall(Vec<Node>),
    SuperProperty(String),
    Enum {
        name: String,
        members: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Node>,
}
