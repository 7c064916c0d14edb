//! Function signatures and class bodies.

use std::rc::Rc;

use crate::ast::{
    CONSTRUCTOR, ClassDef, FunctionDef, MemberFlags, MethodDef, Node, NodeKind, Param, PropertyDef,
    Visibility,
};
use crate::token::{Keyword, Span, TokenKind};

use super::{ParseResult, Parser, SyntaxError};

impl Parser {
    /// `( param, ... )`
    pub(super) fn params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params: Vec<Param> = Vec::new();
        self.skip_newlines();
        if self.eat(&TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let param = self.param()?;
            if let Some(last) = params.last() {
                if last.is_rest {
                    return Err(SyntaxError::new(
                        param.span,
                        "The rest parameter must be the last parameter",
                    ));
                }
                if last.is_optional && !param.is_optional && !param.is_rest {
                    return Err(SyntaxError::new(
                        param.span,
                        "Mandatory parameters must come before optional ones",
                    ));
                }
            }
            if params.iter().any(|existing| existing.name == param.name) {
                return Err(SyntaxError::new(
                    param.span,
                    format!("Duplicate parameter '{}'", param.name),
                ));
            }
            params.push(param);
            self.skip_newlines();
            if self.eat(&TokenKind::Comma) {
                self.skip_newlines();
                continue;
            }
            self.expect(&TokenKind::RParen, "',' or ')'")?;
            return Ok(params);
        }
    }

    fn param(&mut self) -> ParseResult<Param> {
        let start = self.span();
        let is_rest = self.eat(&TokenKind::Ellipsis);
        let (name, name_span) = self.expect_identifier("a parameter name")?;
        let mut param = Param::required(name, start.to(name_span));
        param.is_rest = is_rest;
        param.is_optional = self.eat(&TokenKind::Question);
        if self.eat(&TokenKind::Colon) {
            param.type_name = Some(self.type_name()?);
        }
        if self.eat(&TokenKind::Equal) {
            let default = self.expr()?;
            param.is_optional = true;
            param.span = param.span.to(default.span);
            param.default = Some(default);
        }
        if is_rest {
            if param.is_optional {
                return Err(SyntaxError::new(
                    param.span,
                    "The rest parameter cannot be optional or have a default value",
                ));
            }
            param.type_name.get_or_insert_with(|| "list".to_string());
        }
        param.span = param.span.to(self.previous_end());
        Ok(param)
    }

    fn type_name(&mut self) -> ParseResult<String> {
        match self.kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            TokenKind::Keyword(Keyword::Class) => {
                self.advance();
                Ok("class".to_string())
            }
            _ => Err(self.unexpected("a type name")),
        }
    }

    /// Everything after the parameter list: `-> expr` or `:` and a body.
    pub(super) fn function_tail(
        &mut self,
        name: Option<String>,
        params: Vec<Param>,
        start: Span,
    ) -> ParseResult<Rc<FunctionDef>> {
        let (body, auto_return) = if self.eat(&TokenKind::Arrow) {
            (self.expr()?, true)
        } else if self.eat(&TokenKind::Colon) {
            let (body, _) = self.body()?;
            (body, false)
        } else {
            return Err(self.unexpected("'->' or ':'"));
        };
        Ok(Rc::new(FunctionDef {
            name,
            params,
            body,
            auto_return,
            span: start.to(self.previous_end()),
        }))
    }

    pub(super) fn class_def(&mut self) -> ParseResult<Node> {
        let start = self.advance().span;
        let (name, _) = self.expect_identifier("a class name")?;
        let parent = if self.eat_keyword(Keyword::Extends) {
            Some(self.expect_identifier("a parent class name")?.0)
        } else {
            None
        };
        self.expect(&TokenKind::Colon, "':'")?;
        if !self.check(&TokenKind::Newline) {
            return Err(SyntaxError::new(
                self.span(),
                "A class body must start on a new line after ':' and be closed with 'end'",
            ));
        }

        let mut class = ClassDef {
            name,
            parent,
            properties: Vec::new(),
            methods: Vec::new(),
            getters: Vec::new(),
            setters: Vec::new(),
            span: start,
        };
        let mut saw_pass = false;
        loop {
            self.skip_newlines();
            if self.check_keyword(Keyword::End) {
                break;
            }
            if self.eat_keyword(Keyword::Pass) {
                saw_pass = true;
            } else {
                self.member(&mut class)?;
            }
            if !self.check(&TokenKind::Newline) && !self.check_keyword(Keyword::End) {
                return Err(self.unexpected("a newline"));
            }
        }
        self.expect_keyword(Keyword::End)?;

        let empty = class.properties.is_empty()
            && class.methods.is_empty()
            && class.getters.is_empty()
            && class.setters.is_empty();
        if empty && !saw_pass {
            return Err(SyntaxError::new(
                start,
                "Expected a class member, use 'pass' for an empty class body",
            ));
        }
        class.span = start.to(self.previous_end());
        let span = class.span;
        Ok(Node::new(NodeKind::ClassDef(Rc::new(class)), span))
    }

    fn modifiers(&mut self) -> ParseResult<MemberFlags> {
        let mut flags = MemberFlags::default();
        let mut visibility_set = false;
        loop {
            let span = self.span();
            let visibility = match self.kind() {
                TokenKind::Keyword(Keyword::Public) => Visibility::Public,
                TokenKind::Keyword(Keyword::Protected) => Visibility::Protected,
                TokenKind::Keyword(Keyword::Private) => Visibility::Private,
                TokenKind::Keyword(Keyword::Static) => {
                    if flags.is_static {
                        return Err(SyntaxError::new(span, "Duplicate modifier 'static'"));
                    }
                    self.advance();
                    flags.is_static = true;
                    continue;
                }
                TokenKind::Keyword(Keyword::Override) => {
                    if flags.is_override {
                        return Err(SyntaxError::new(span, "Duplicate modifier 'override'"));
                    }
                    self.advance();
                    flags.is_override = true;
                    continue;
                }
                _ => return Ok(flags),
            };
            if visibility_set {
                return Err(SyntaxError::new(
                    span,
                    "A member can only have one visibility modifier",
                ));
            }
            self.advance();
            flags.visibility = visibility;
            visibility_set = true;
        }
    }

    fn member(&mut self, class: &mut ClassDef) -> ParseResult<()> {
        let start = self.span();
        let flags = self.modifiers()?;
        let keyword = match self.kind() {
            TokenKind::Keyword(
                keyword @ (Keyword::Property | Keyword::Method | Keyword::Getter | Keyword::Setter),
            ) => *keyword,
            _ => return Err(self.unexpected("'property', 'method', 'getter' or 'setter'")),
        };
        self.advance();
        let (name, name_span) = self.expect_identifier("a member name")?;

        let taken = match keyword {
            Keyword::Property | Keyword::Method => {
                class.properties.iter().any(|p| p.name == name)
                    || class.methods.iter().any(|m| m.name == name)
            }
            Keyword::Getter => class.getters.iter().any(|g| g.name == name),
            _ => class.setters.iter().any(|s| s.name == name),
        };
        if taken {
            return Err(SyntaxError::new(
                name_span,
                format!("Duplicate member '{name}' in class '{}'", class.name),
            ));
        }

        match keyword {
            Keyword::Property => {
                let value = if self.eat(&TokenKind::Equal) {
                    Some(self.expr()?)
                } else {
                    None
                };
                class.properties.push(PropertyDef {
                    name,
                    value,
                    flags,
                    span: start.to(self.previous_end()),
                });
            }
            Keyword::Method => {
                let params = self.params()?;
                let was_constructor = self.in_constructor;
                self.in_constructor = name == CONSTRUCTOR;
                let function = self.function_tail(Some(name.clone()), params, start);
                self.in_constructor = was_constructor;
                class.methods.push(MethodDef {
                    name,
                    function: function?,
                    flags,
                    span: start.to(self.previous_end()),
                });
            }
            Keyword::Getter => {
                if flags.is_static {
                    return Err(SyntaxError::new(start, "Getters cannot be static"));
                }
                if self.check(&TokenKind::LParen) {
                    let params = self.params()?;
                    if !params.is_empty() {
                        return Err(SyntaxError::new(
                            params[0].span,
                            "A getter takes no parameters",
                        ));
                    }
                }
                let function = self.function_tail(Some(name.clone()), Vec::new(), start)?;
                class.getters.push(MethodDef {
                    name,
                    function,
                    flags,
                    span: start.to(self.previous_end()),
                });
            }
            _ => {
                if flags.is_static {
                    return Err(SyntaxError::new(start, "Setters cannot be static"));
                }
                let params = self.params()?;
                if params.len() != 1 || params[0].is_rest {
                    return Err(SyntaxError::new(
                        name_span,
                        "A setter takes exactly one parameter",
                    ));
                }
                let function = self.function_tail(Some(name.clone()), params, start)?;
                class.setters.push(MethodDef {
                    name,
                    function,
                    flags,
                    span: start.to(self.previous_end()),
                });
            }
        }
        Ok(())
    }
}
