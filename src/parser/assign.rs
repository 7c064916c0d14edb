//! Assignment targets and the parse-time rewriting of compound assignment.
//!
//! `a += b`, `a ??= b` and `a++` all become plain assignments of a binary
//! node, so the interpreter only ever sees the four assignment node kinds.

use crate::ast::{BinaryOp, Index, Node, NodeKind};
use crate::token::Span;

use super::expr::binary;
use super::{ParseResult, Parser, SyntaxError};

impl Parser {
    /// Turns a read node into the matching write node.
    pub(super) fn assign_to(&self, target: Node, value: Node) -> ParseResult<Node> {
        let span = target.span.to(value.span);
        let value = Box::new(value);
        let kind = match target.kind {
            NodeKind::VarAccess(name) => NodeKind::VarModify { name, value },
            NodeKind::IndexAccess {
                target,
                index: index @ (Index::Single(_) | Index::Push),
                optional: false,
            } => NodeKind::IndexAssign {
                target,
                index,
                value,
            },
            NodeKind::Property {
                target,
                name,
                optional: false,
            } => NodeKind::PropertyAssign {
                target,
                name,
                value,
            },
            NodeKind::StaticProperty {
                target,
                name,
                optional: false,
            } => NodeKind::StaticPropertyAssign {
                target,
                name,
                value,
            },
            _ => return Err(SyntaxError::new(target.span, "Invalid assignment target")),
        };
        Ok(Node::new(kind, span))
    }

    /// `target <op>= value` → `target = target <op> value`. The cursor sits on
    /// the compound operator.
    pub(super) fn compound(&mut self, target: Node, op: BinaryOp) -> ParseResult<Node> {
        self.advance();
        let value = self.expr()?;
        let combined = binary(op, target.clone(), value);
        self.assign_to(target, combined)
    }

    /// `target++`, `--target` and runs like `a++++` → `target = target + delta`.
    pub(super) fn increment(&self, target: Node, delta: f64, span: Span) -> ParseResult<Node> {
        let step = Node::new(NodeKind::Number(delta), span);
        let combined = binary(BinaryOp::Add, target.clone(), step);
        let mut node = self.assign_to(target, combined)?;
        node.span = node.span.to(span);
        Ok(node)
    }
}
