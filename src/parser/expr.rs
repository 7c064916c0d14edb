//! Expression grammar, one method per precedence level, loosest first:
//! `expr → cond_expr → comp_expr → bin_op → arith_expr → term → power →
//! factor → prop → call → atom`.

use std::rc::Rc;

use crate::ast::{BinaryOp, Branch, Index, Node, NodeKind, TemplatePart, UnaryOp};
use crate::token::{Keyword, Span, TemplateSegment, Token, TokenKind};

use super::{ParseResult, Parser, SyntaxError};

/// What a token means at a given binary precedence level.
#[derive(Clone, Copy)]
enum LevelOp {
    Binary(BinaryOp),
    Compound(BinaryOp),
}

fn cond_op(kind: &TokenKind) -> Option<LevelOp> {
    match kind {
        TokenKind::Keyword(Keyword::And) | TokenKind::AndAnd => {
            Some(LevelOp::Binary(BinaryOp::And))
        }
        TokenKind::Keyword(Keyword::Or) | TokenKind::OrOr => Some(LevelOp::Binary(BinaryOp::Or)),
        TokenKind::AndAndEqual => Some(LevelOp::Compound(BinaryOp::And)),
        TokenKind::OrOrEqual => Some(LevelOp::Compound(BinaryOp::Or)),
        _ => None,
    }
}

fn comp_op(kind: &TokenKind) -> Option<LevelOp> {
    let op = match kind {
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::BangEqual => BinaryOp::NotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        TokenKind::Nullish => BinaryOp::Nullish,
        TokenKind::NullishEqual => return Some(LevelOp::Compound(BinaryOp::Nullish)),
        _ => return None,
    };
    Some(LevelOp::Binary(op))
}

fn bitwise_op(kind: &TokenKind) -> Option<LevelOp> {
    let level_op = match kind {
        TokenKind::Shl => LevelOp::Binary(BinaryOp::Shl),
        TokenKind::Shr => LevelOp::Binary(BinaryOp::Shr),
        TokenKind::UShr => LevelOp::Binary(BinaryOp::UShr),
        TokenKind::Ampersand => LevelOp::Binary(BinaryOp::BitAnd),
        TokenKind::Pipe => LevelOp::Binary(BinaryOp::BitOr),
        TokenKind::CaretCaret => LevelOp::Binary(BinaryOp::BitXor),
        TokenKind::Keyword(Keyword::Instanceof) => LevelOp::Binary(BinaryOp::Instanceof),
        TokenKind::ShlEqual => LevelOp::Compound(BinaryOp::Shl),
        TokenKind::ShrEqual => LevelOp::Compound(BinaryOp::Shr),
        TokenKind::UShrEqual => LevelOp::Compound(BinaryOp::UShr),
        TokenKind::AmpersandEqual => LevelOp::Compound(BinaryOp::BitAnd),
        TokenKind::PipeEqual => LevelOp::Compound(BinaryOp::BitOr),
        TokenKind::CaretCaretEqual => LevelOp::Compound(BinaryOp::BitXor),
        _ => return None,
    };
    Some(level_op)
}

fn term_op(kind: &TokenKind) -> Option<LevelOp> {
    let level_op = match kind {
        TokenKind::Star => LevelOp::Binary(BinaryOp::Mul),
        TokenKind::Slash => LevelOp::Binary(BinaryOp::Div),
        TokenKind::Percent => LevelOp::Binary(BinaryOp::Mod),
        TokenKind::StarEqual => LevelOp::Compound(BinaryOp::Mul),
        TokenKind::SlashEqual => LevelOp::Compound(BinaryOp::Div),
        TokenKind::PercentEqual => LevelOp::Compound(BinaryOp::Mod),
        TokenKind::StarStarEqual | TokenKind::CaretEqual => LevelOp::Compound(BinaryOp::Pow),
        _ => return None,
    };
    Some(level_op)
}

pub(super) fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
    let span = left.span.to(right.span);
    Node::new(
        NodeKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

impl Parser {
    pub(super) fn expr(&mut self) -> ParseResult<Node> {
        self.nested(|parser| {
            if parser.check_keyword(Keyword::Var) {
                return parser.var_declare();
            }
            let node = parser.cond_expr()?;
            if parser.eat(&TokenKind::Equal) {
                let value = parser.expr()?;
                return parser.assign_to(node, value);
            }
            Ok(node)
        })
    }

    fn var_declare(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let (name, _) = self.expect_identifier("a variable name")?;
        self.expect(&TokenKind::Equal, "'='")?;
        let value = self.expr()?;
        let span = start.to(value.span);
        Ok(Node::new(
            NodeKind::VarDeclare {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn level(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Node>,
        classify: fn(&TokenKind) -> Option<LevelOp>,
    ) -> ParseResult<Node> {
        let mut left = operand(self)?;
        while let Some(level_op) = classify(self.kind()) {
            match level_op {
                LevelOp::Binary(op) => {
                    self.advance();
                    let right = operand(self)?;
                    left = binary(op, left, right);
                }
                LevelOp::Compound(op) => return self.compound(left, op),
            }
        }
        Ok(left)
    }

    fn cond_expr(&mut self) -> ParseResult<Node> {
        self.level(Self::comp_expr, cond_op)
    }

    fn comp_expr(&mut self) -> ParseResult<Node> {
        if matches!(self.kind(), TokenKind::Keyword(Keyword::Not) | TokenKind::Bang) {
            let start = self.advance().span;
            let operand = self.comp_expr()?;
            let span = start.to(operand.span);
            return Ok(Node::new(
                NodeKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.level(Self::bin_op, comp_op)
    }

    fn bin_op(&mut self) -> ParseResult<Node> {
        self.level(Self::arith_expr, bitwise_op)
    }

    fn arith_expr(&mut self) -> ParseResult<Node> {
        let mut left = self.term()?;
        loop {
            match self.kind() {
                TokenKind::Plus | TokenKind::Minus => {
                    let op = if self.check(&TokenKind::Plus) {
                        BinaryOp::Add
                    } else {
                        BinaryOp::Sub
                    };
                    self.advance();
                    let right = self.term()?;
                    left = binary(op, left, right);
                }
                TokenKind::PlusEqual => return self.compound(left, BinaryOp::Add),
                TokenKind::MinusEqual => return self.compound(left, BinaryOp::Sub),
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let (delta, span) = self.increments();
                    left = self.increment(left, delta, span)?;
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn term(&mut self) -> ParseResult<Node> {
        self.level(Self::power, term_op)
    }

    /// Exponentiation, right associative.
    fn power(&mut self) -> ParseResult<Node> {
        let base = self.factor()?;
        if matches!(self.kind(), TokenKind::StarStar | TokenKind::Caret) {
            self.advance();
            let exponent = self.nested(Self::power)?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn factor(&mut self) -> ParseResult<Node> {
        let op = match self.kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Keyword(Keyword::Typeof) => UnaryOp::Typeof,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let (delta, span) = self.increments();
                let target = self.prop()?;
                return self.increment(target, delta, span);
            }
            _ => return self.prop(),
        };
        let start = self.advance().span;
        let operand = self.nested(Self::factor)?;
        let span = start.to(operand.span);
        Ok(Node::new(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Consumes a run of `++`/`--` tokens, returning the combined delta.
    fn increments(&mut self) -> (f64, Span) {
        let start = self.span();
        let mut delta = 0.0;
        loop {
            match self.kind() {
                TokenKind::PlusPlus => delta += 1.0,
                TokenKind::MinusMinus => delta -= 1.0,
                _ => break,
            }
            self.advance();
        }
        (delta, start.to(self.previous_end()))
    }

    pub(super) fn prop(&mut self) -> ParseResult<Node> {
        let mut node = self.call()?;
        // Once a null-safe link appears, the rest of the chain is null-safe.
        let mut optional = false;
        loop {
            let (is_static, is_optional) = match self.kind() {
                TokenKind::Dot => (false, false),
                TokenKind::DoubleColon => (true, false),
                TokenKind::QuestionDot => (false, true),
                TokenKind::QuestionDoubleColon => (true, true),
                _ => break,
            };
            self.advance();
            optional |= is_optional;

            if is_optional && !is_static {
                if self.check(&TokenKind::LParen) {
                    node = self.call_args(node, optional)?;
                    node = self.postfix(node, optional)?;
                    continue;
                }
                if self.check(&TokenKind::LBracket) {
                    node = self.index(node, optional)?;
                    node = self.postfix(node, optional)?;
                    continue;
                }
            }

            let (name, name_span) = self.expect_identifier("a member name")?;
            let span = node.span.to(name_span);
            let target = Box::new(node);
            let kind = if is_static {
                NodeKind::StaticProperty {
                    target,
                    name,
                    optional,
                }
            } else {
                NodeKind::Property {
                    target,
                    name,
                    optional,
                }
            };
            node = self.postfix(Node::new(kind, span), optional)?;
        }
        Ok(node)
    }

    fn call(&mut self) -> ParseResult<Node> {
        if self.check_keyword(Keyword::New) {
            let node = self.new_instance()?;
            return self.postfix(node, false);
        }
        let atom = self.atom()?;
        self.postfix(atom, false)
    }

    fn new_instance(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let (name, name_span) = self.expect_identifier("a class name after 'new'")?;
        let class = Node::new(NodeKind::VarAccess(name), name_span);
        let args = if self.check(&TokenKind::LParen) {
            self.arguments()?
        } else {
            Vec::new()
        };
        let span = start.to(self.previous_end());
        Ok(Node::new(
            NodeKind::New {
                class: Box::new(class),
                args,
            },
            span,
        ))
    }

    /// Chained calls and index accesses.
    fn postfix(&mut self, mut node: Node, optional: bool) -> ParseResult<Node> {
        loop {
            match self.kind() {
                TokenKind::LParen => node = self.call_args(node, optional)?,
                TokenKind::LBracket => node = self.index(node, optional)?,
                _ => return Ok(node),
            }
        }
    }

    fn call_args(&mut self, callee: Node, optional: bool) -> ParseResult<Node> {
        let args = self.arguments()?;
        let span = callee.span.to(self.previous_end());
        Ok(Node::new(
            NodeKind::Call {
                callee: Box::new(callee),
                args,
                optional,
            },
            span,
        ))
    }

    /// `( expr, ... )` with newlines allowed between arguments.
    pub(super) fn arguments(&mut self) -> ParseResult<Vec<Node>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        self.skip_newlines();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                self.skip_newlines();
                continue;
            }
            self.expect(&TokenKind::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }

    fn index(&mut self, target: Node, optional: bool) -> ParseResult<Node> {
        let open = self.expect(&TokenKind::LBracket, "'['")?.span;
        let index = if self.check(&TokenKind::RBracket) {
            Index::Push
        } else if self.eat(&TokenKind::Colon) {
            let end = self.slice_bound()?;
            Index::Slice { start: None, end }
        } else {
            let first = self.expr()?;
            if self.eat(&TokenKind::Colon) {
                let end = self.slice_bound()?;
                Index::Slice {
                    start: Some(Box::new(first)),
                    end,
                }
            } else {
                Index::Single(Box::new(first))
            }
        };
        let close = self.expect(&TokenKind::RBracket, "']'")?.span;
        if matches!(index, Index::Push) && !self.check(&TokenKind::Equal) {
            return Err(SyntaxError::new(
                open.to(close),
                "The push marker '[]' is only allowed as an assignment target",
            ));
        }
        let span = target.span.to(close);
        Ok(Node::new(
            NodeKind::IndexAccess {
                target: Box::new(target),
                index,
                optional,
            },
            span,
        ))
    }

    fn slice_bound(&mut self) -> ParseResult<Option<Box<Node>>> {
        if self.check(&TokenKind::RBracket) {
            Ok(None)
        } else {
            Ok(Some(Box::new(self.expr()?)))
        }
    }

    fn atom(&mut self) -> ParseResult<Node> {
        let token = self.current().clone();
        let span = token.span;
        let kind = match token.kind {
            TokenKind::Number(value) => NodeKind::Number(value),
            TokenKind::String(value) => NodeKind::String(value),
            TokenKind::Template(segments) => {
                self.advance();
                return Ok(Node::new(self.template(segments, span)?, span));
            }
            TokenKind::Identifier(name) => NodeKind::VarAccess(name),
            TokenKind::Keyword(Keyword::True) => NodeKind::Boolean(true),
            TokenKind::Keyword(Keyword::False) => NodeKind::Boolean(false),
            TokenKind::Keyword(Keyword::None) => NodeKind::None,
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let mut inner = self.expr()?;
                self.skip_newlines();
                let close = self.expect(&TokenKind::RParen, "')'")?.span;
                inner.span = span.to(close);
                return Ok(inner);
            }
            TokenKind::LBracket => return self.list(),
            TokenKind::LBrace => return self.dict(),
            TokenKind::Keyword(Keyword::If) => return self.if_expr(),
            TokenKind::Keyword(Keyword::For) => return self.for_expr(),
            TokenKind::Keyword(Keyword::Foreach) => return self.foreach_expr(),
            TokenKind::Keyword(Keyword::While) => return self.while_expr(),
            TokenKind::Keyword(Keyword::Switch) => return self.switch_expr(),
            TokenKind::Keyword(Keyword::Func) => {
                let function = self.func_def()?;
                let span = function.span;
                return Ok(Node::new(NodeKind::FuncDef(function), span));
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                self.expect(&TokenKind::Dot, "'.' or '(' after 'super'")?;
                let (name, name_span) = self.expect_identifier("a method name")?;
                return Ok(Node::new(NodeKind::SuperProperty(name), span.to(name_span)));
            }
            _ => {
                return Err(self.unexpected(
                    "a number, string, identifier, '(', '[', '{', 'if', 'for', 'foreach', 'while', 'switch' or 'func'",
                ));
            }
        };
        self.advance();
        Ok(Node::new(kind, span))
    }

    fn template(&mut self, segments: Vec<TemplateSegment>, span: Span) -> ParseResult<NodeKind> {
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                TemplateSegment::Text(text) => parts.push(TemplatePart::Text(text)),
                TemplateSegment::Code(tokens) => parts.push(TemplatePart::Expr(
                    self.interpolation(tokens, span)?,
                )),
            }
        }
        Ok(NodeKind::Template(parts))
    }

    fn interpolation(&mut self, tokens: Vec<Token>, span: Span) -> ParseResult<Node> {
        if tokens.iter().all(|token| token.kind == TokenKind::Eof) {
            return Err(SyntaxError::new(span, "Empty interpolation in template string"));
        }
        let mut inner = Parser::new(tokens);
        inner.in_constructor = self.in_constructor;
        inner.depth = self.depth;
        let node = inner.expr()?;
        if !inner.check(&TokenKind::Eof) {
            return Err(inner.unexpected("'}'"));
        }
        Ok(node)
    }

    fn list(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let mut elements = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.expr()?);
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let close = self.expect(&TokenKind::RBracket, "',' or ']'")?.span;
        Ok(Node::new(NodeKind::List(elements), start.to(close)))
    }

    fn dict(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let mut entries: Vec<(String, Node)> = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBrace) {
            let key_span = self.span();
            let key = match self.kind() {
                TokenKind::String(key) | TokenKind::Identifier(key) => key.clone(),
                _ => return Err(self.unexpected("a string or identifier key")),
            };
            self.advance();
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(SyntaxError::new(
                    key_span,
                    format!("Duplicate key '{key}' in dictionary"),
                ));
            }
            self.expect(&TokenKind::Colon, "':'")?;
            self.skip_newlines();
            let value = self.expr()?;
            entries.push((key, value));
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        let close = self.expect(&TokenKind::RBrace, "',' or '}'")?.span;
        Ok(Node::new(NodeKind::Dict(entries), start.to(close)))
    }

    fn if_expr(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let mut branches = Vec::new();
        let (branch, mut last_block) = self.branch()?;
        branches.push(branch);
        let mut else_body = None;
        let mut else_discard = false;

        loop {
            // An inline branch may continue with `elif`/`else` on the next line.
            let skipped = if last_block { 0 } else { self.skip_newlines() };
            if self.eat_keyword(Keyword::Elif) {
                let (branch, block) = self.branch()?;
                branches.push(branch);
                last_block = block;
                continue;
            }
            if self.eat_keyword(Keyword::Else) {
                self.eat(&TokenKind::Colon);
                let block = self.check(&TokenKind::Newline);
                let body = if block {
                    self.block()?
                } else {
                    self.statement()?
                };
                else_body = Some(Box::new(body));
                else_discard = block;
                last_block = block;
            } else {
                self.backwards(skipped);
            }
            break;
        }

        if last_block {
            self.expect_keyword(Keyword::End)?;
        }
        let span = start.to(self.previous_end());
        Ok(Node::new(
            NodeKind::If {
                branches,
                else_body,
                else_discard,
            },
            span,
        ))
    }

    /// `condition : body` of an `if`/`elif`; block bodies stop before the
    /// next `elif`/`else`/`end`.
    fn branch(&mut self) -> ParseResult<(Branch, bool)> {
        let condition = self.expr()?;
        self.expect(&TokenKind::Colon, "':'")?;
        let block = self.check(&TokenKind::Newline);
        let body = if block {
            self.block()?
        } else {
            self.statement()?
        };
        Ok((
            Branch {
                condition,
                body,
                discard: block,
            },
            block,
        ))
    }

    fn for_expr(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let (var, _) = self.expect_identifier("a loop variable")?;
        let first = if self.eat(&TokenKind::Equal) {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        self.expect_keyword(Keyword::To)?;
        let end = Box::new(self.expr()?);
        let step = if self.eat_keyword(Keyword::Step) {
            Some(Box::new(self.expr()?))
        } else {
            None
        };
        self.expect(&TokenKind::Colon, "':'")?;
        let (body, discard) = self.body()?;
        let span = start.to(self.previous_end());
        Ok(Node::new(
            NodeKind::For {
                var,
                start: first,
                end,
                step,
                body: Box::new(body),
                discard,
            },
            span,
        ))
    }

    fn foreach_expr(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let iterable = Box::new(self.expr()?);
        self.expect_keyword(Keyword::As)?;
        let (first, _) = self.expect_identifier("a loop variable")?;
        let (key, value) = if self.eat(&TokenKind::Comma) {
            let (second, _) = self.expect_identifier("a loop variable")?;
            (Some(first), second)
        } else {
            (None, first)
        };
        self.expect(&TokenKind::Colon, "':'")?;
        let (body, discard) = self.body()?;
        let span = start.to(self.previous_end());
        Ok(Node::new(
            NodeKind::Foreach {
                iterable,
                key,
                value,
                body: Box::new(body),
                discard,
            },
            span,
        ))
    }

    fn while_expr(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let condition = Box::new(self.expr()?);
        self.expect(&TokenKind::Colon, "':'")?;
        let (body, discard) = self.body()?;
        let span = start.to(self.previous_end());
        Ok(Node::new(
            NodeKind::While {
                condition,
                body: Box::new(body),
                discard,
            },
            span,
        ))
    }

    /// `switch` desugars each `case v` into `subject == v`.
    fn switch_expr(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let subject = self.expr()?;
        self.expect(&TokenKind::Colon, "':'")?;
        self.expect(&TokenKind::Newline, "a newline after 'switch ...:'")?;
        self.skip_newlines();

        let mut cases = Vec::new();
        let mut default = None;
        loop {
            if self.eat_keyword(Keyword::Case) {
                if default.is_some() {
                    return Err(SyntaxError::new(
                        self.previous_end(),
                        "'default' must be the last branch of a switch",
                    ));
                }
                let value = self.expr()?;
                self.expect(&TokenKind::Colon, "':'")?;
                let body = self.block()?;
                cases.push((binary(BinaryOp::Equal, subject.clone(), value), body));
            } else if self.eat_keyword(Keyword::Default) {
                if default.is_some() {
                    return Err(SyntaxError::new(
                        self.previous_end(),
                        "A switch may only have one 'default' branch",
                    ));
                }
                self.expect(&TokenKind::Colon, "':'")?;
                default = Some(Box::new(self.block()?));
            } else {
                break;
            }
        }
        self.expect_keyword(Keyword::End)?;
        let span = start.to(self.previous_end());
        Ok(Node::new(NodeKind::Switch { cases, default }, span))
    }

    pub(super) fn func_def(&mut self) -> ParseResult<Rc<crate::ast::FunctionDef>> {
        let start = self.expect_keyword(Keyword::Func)?.span;
        let name = if let TokenKind::Identifier(name) = self.kind() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        };
        let params = self.params()?;
        let was_constructor = std::mem::replace(&mut self.in_constructor, false);
        let function = self.function_tail(name, params, start);
        self.in_constructor = was_constructor;
        function
    }
}
