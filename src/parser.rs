//! Recursive-descent parser turning a token sequence into a [`Program`].
//!
//! The whole token stream is materialised up front; the parser moves a cursor
//! over it and may step backwards. Parsing never recovers: the first mismatch
//! aborts with a [`SyntaxError`].

use thiserror::Error;
use tracing::debug;

use crate::ast::{Node, NodeKind, Program};
use crate::token::{Keyword, Span, Token, TokenKind};

mod assign;
mod class;
mod expr;
#[cfg(test)]
mod tests;

/// Expression nesting deeper than this is rejected instead of exhausting the
/// host stack.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{details}")]
pub struct SyntaxError {
    pub details: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(span: Span, details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
            span,
        }
    }

    pub fn name(&self) -> &'static str {
        "Invalid Syntax"
    }
}

pub type ParseResult<T> = Result<T, SyntaxError>;

pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    /// Set while parsing the body of a class `__init` method.
    in_constructor: bool,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let needs_eof = tokens
            .last()
            .is_none_or(|token| token.kind != TokenKind::Eof);
        if needs_eof {
            let span = tokens.last().map(|token| token.span).unwrap_or_default();
            tokens.push(Token::new(
                TokenKind::Eof,
                Span::new(span.end, span.end),
            ));
        }
        Self {
            tokens,
            cursor: 0,
            depth: 0,
            in_constructor: false,
        }
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let statements = self.statements()?;
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("an operator or a newline"));
        }
        debug!(statements = statements.len(), "parsed program");
        Ok(Program { statements })
    }

    // ---- cursor -----------------------------------------------------------

    fn current(&self) -> &Token {
        // The constructor guarantees a trailing Eof, and `advance` never moves
        // past it.
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let index = (self.cursor + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    fn backwards(&mut self, steps: usize) {
        self.cursor = self.cursor.saturating_sub(steps);
    }

    fn previous_end(&self) -> Span {
        let index = self.cursor.saturating_sub(1);
        self.tokens[index].span
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.kind().is_keyword(keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword.as_str())))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> ParseResult<(String, Span)> {
        if let TokenKind::Identifier(name) = self.kind() {
            let name = name.clone();
            let token = self.advance();
            Ok((name, token.span))
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Consumes consecutive newlines and reports how many were skipped.
    fn skip_newlines(&mut self) -> usize {
        let mut count = 0;
        while self.check(&TokenKind::Newline) {
            self.advance();
            count += 1;
        }
        count
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::new(
            self.span(),
            format!("Expected {expected}, got {}", self.kind()),
        )
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::new(
                self.span(),
                format!("Expression nesting exceeds {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ---- statements -------------------------------------------------------

    fn at_block_terminator(&self) -> bool {
        match self.kind() {
            TokenKind::Eof => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::End | Keyword::Elif | Keyword::Else | Keyword::Case | Keyword::Default
            ),
            _ => false,
        }
    }

    /// Parses statements until a block terminator or a statement that is not
    /// followed by at least one newline.
    fn statements(&mut self) -> ParseResult<Vec<Node>> {
        let mut statements = Vec::new();
        self.skip_newlines();
        if self.at_block_terminator() {
            return Ok(statements);
        }
        statements.push(self.statement()?);
        loop {
            let newlines = self.skip_newlines();
            if newlines == 0 || self.at_block_terminator() {
                break;
            }
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    /// A non-empty statement sequence, the body of a block-form construct.
    fn block(&mut self) -> ParseResult<Node> {
        let start = self.span();
        let statements = self.statements()?;
        let (Some(first), Some(last)) = (statements.first(), statements.last()) else {
            return Err(SyntaxError::new(
                start,
                "Expected a statement, use 'pass' for an empty block",
            ));
        };
        let span = first.span.to(last.span);
        Ok(Node::new(NodeKind::Block(statements), span))
    }

    /// Body following a `:`. A newline opens a block closed by `end`;
    /// anything else is a single inline statement. Returns the body and
    /// whether it was block-form.
    fn body(&mut self) -> ParseResult<(Node, bool)> {
        if self.check(&TokenKind::Newline) {
            let body = self.block()?;
            self.expect_keyword(Keyword::End)?;
            Ok((body, true))
        } else {
            Ok((self.statement()?, false))
        }
    }

    fn statement(&mut self) -> ParseResult<Node> {
        let start = self.span();
        match self.kind() {
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                if self.check(&TokenKind::Newline) || self.at_block_terminator() {
                    return Ok(Node::new(NodeKind::Return(None), start));
                }
                let value = self.expr()?;
                let span = start.to(value.span);
                Ok(Node::new(NodeKind::Return(Some(Box::new(value))), span))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                Ok(Node::new(NodeKind::Continue, start))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                Ok(Node::new(NodeKind::Break, start))
            }
            TokenKind::Keyword(Keyword::Pass) => {
                self.advance();
                Ok(Node::new(NodeKind::Pass, start))
            }
            TokenKind::Keyword(Keyword::Class) => self.class_def(),
            TokenKind::Keyword(Keyword::Enum) => self.enum_def(),
            TokenKind::Keyword(Keyword::Define) => self.const_declare(),
            TokenKind::Keyword(Keyword::Delete) => self.delete(),
            TokenKind::Keyword(Keyword::Super)
                if matches!(self.peek_kind(1), TokenKind::LParen) =>
            {
                self.super_call()
            }
            _ => self.expr(),
        }
    }

    fn super_call(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        if !self.in_constructor {
            return Err(SyntaxError::new(
                start,
                "super() is only allowed as a statement inside a constructor",
            ));
        }
        let args = self.arguments()?;
        let span = start.to(self.previous_end());
        Ok(Node::new(NodeKind::SuperCall(args), span))
    }

    fn const_declare(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let (name, _) = self.expect_identifier("a constant name")?;
        self.expect(&TokenKind::Equal, "'='")?;
        let value = self.expr()?;
        let span = start.to(value.span);
        Ok(Node::new(
            NodeKind::ConstDeclare {
                name,
                value: Box::new(value),
            },
            span,
        ))
    }

    fn delete(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let target = self.prop()?;
        let valid = matches!(
            &target.kind,
            NodeKind::VarAccess(_)
                | NodeKind::IndexAccess {
                    index: crate::ast::Index::Single(_),
                    optional: false,
                    ..
                }
        );
        if !valid {
            return Err(SyntaxError::new(
                target.span,
                "Expected a variable or an indexed element to delete",
            ));
        }
        let span = start.to(target.span);
        Ok(Node::new(NodeKind::Delete(Box::new(target)), span))
    }

    fn enum_def(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let (name, _) = self.expect_identifier("an enum name")?;
        self.expect(&TokenKind::Colon, "':'")?;
        let block = self.check(&TokenKind::Newline);
        let mut members: Vec<String> = Vec::new();
        loop {
            if block {
                self.skip_newlines();
                if self.check_keyword(Keyword::End) {
                    break;
                }
            }
            let (member, span) = self.expect_identifier("an enum member")?;
            if members.contains(&member) {
                return Err(SyntaxError::new(
                    span,
                    format!("Duplicate enum member '{member}'"),
                ));
            }
            members.push(member);
            if !self.eat(&TokenKind::Comma) && !(block && self.check(&TokenKind::Newline)) {
                break;
            }
        }
        if block {
            self.skip_newlines();
            self.expect_keyword(Keyword::End)?;
        }
        if members.is_empty() {
            return Err(SyntaxError::new(start, "An enum needs at least one member"));
        }
        let span = start.to(self.previous_end());
        Ok(Node::new(NodeKind::Enum { name, members }, span))
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}
