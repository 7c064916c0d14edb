use tracing::trace;

use crate::token::{Keyword, Position, Span, TemplateSegment, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// Character scanner producing the token stream consumed by the parser.
///
/// Positions carry byte indices for slicing and zero-based line/column pairs
/// (columns count characters) for diagnostics.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    cursor: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            cursor: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        trace!(count = tokens.len(), "tokenized source");
        Ok(tokens)
    }

    fn position(&self) -> Position {
        let index = self
            .chars
            .get(self.cursor)
            .map(|(index, _)| *index)
            .unwrap_or(self.input.len());
        Position::new(index, self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.cursor + offset).map(|(_, ch)| *ch)
    }

    fn advance_char(&mut self) -> Option<char> {
        let (_, ch) = *self.chars.get(self.cursor)?;
        self.cursor += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance_char();
                }
                '#' => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance_char();
                    }
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    // Explicit line continuation.
                    self.advance_char();
                    self.advance_char();
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> LexResult<Token> {
        self.skip_trivia();
        let start = self.position();
        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.lex_number(start);
        }
        if ch.is_alphabetic() || ch == '_' {
            return Ok(self.lex_word(start));
        }
        match ch {
            '"' | '\'' => return self.lex_string(start, ch),
            '`' => return self.lex_template(start),
            _ => {}
        }

        let kind = self.lex_symbol(ch, start)?;
        Ok(Token::new(kind, Span::new(start, self.position())))
    }

    fn lex_number(&mut self, start: Position) -> LexResult<Token> {
        let mut literal = String::new();
        let mut seen_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                literal.push(ch);
            } else if ch == '_' {
                // Digit separator, dropped from the literal.
            } else if ch == '.'
                && !seen_dot
                && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                seen_dot = true;
                literal.push(ch);
            } else {
                break;
            }
            self.advance_char();
        }
        let span = Span::new(start, self.position());
        let value = literal
            .parse::<f64>()
            .map_err(|_| LexError::InvalidNumber {
                literal: literal.clone(),
                span,
            })?;
        Ok(Token::new(TokenKind::Number(value), span))
    }

    fn lex_word(&mut self, start: Position) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance_char();
            } else {
                break;
            }
        }
        let span = Span::new(start, self.position());
        let kind = match Keyword::from_word(&word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word),
        };
        Token::new(kind, span)
    }

    fn escaped(&mut self) -> Option<char> {
        let ch = self.advance_char()?;
        Some(match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        })
    }

    fn lex_string(&mut self, start: Position, quote: char) -> LexResult<Token> {
        self.advance_char();
        let mut value = String::new();
        loop {
            match self.advance_char() {
                None => {
                    return Err(LexError::UnterminatedString {
                        expected: quote,
                        span: Span::new(start, self.position()),
                    });
                }
                Some('\\') => {
                    if let Some(ch) = self.escaped() {
                        value.push(ch);
                    }
                }
                Some(ch) if ch == quote => break,
                Some(ch) => value.push(ch),
            }
        }
        Ok(Token::new(
            TokenKind::String(value),
            Span::new(start, self.position()),
        ))
    }

    fn lex_template(&mut self, start: Position) -> LexResult<Token> {
        self.advance_char();
        let mut segments = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedString {
                        expected: '`',
                        span: Span::new(start, self.position()),
                    });
                }
                Some('`') => {
                    self.advance_char();
                    break;
                }
                Some('\\') => {
                    self.advance_char();
                    if let Some(ch) = self.escaped() {
                        text.push(ch);
                    }
                }
                Some('{') => {
                    self.advance_char();
                    if !text.is_empty() {
                        segments.push(TemplateSegment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(TemplateSegment::Code(self.lex_interpolation()?));
                }
                Some(ch) => {
                    self.advance_char();
                    text.push(ch);
                }
            }
        }
        if !text.is_empty() {
            segments.push(TemplateSegment::Text(text));
        }
        Ok(Token::new(
            TokenKind::Template(segments),
            Span::new(start, self.position()),
        ))
    }

    /// Scans the tokens of one `{...}` segment. The closing brace is consumed
    /// and replaced by an `Eof` token so the segment parses standalone.
    fn lex_interpolation(&mut self) -> LexResult<Vec<Token>> {
        let open = self.position();
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let token = self.next_token()?;
            match token.kind {
                TokenKind::Eof => {
                    return Err(LexError::UnterminatedInterpolation {
                        span: Span::new(open, token.span.end),
                    });
                }
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace if depth == 0 => {
                    tokens.push(Token::new(TokenKind::Eof, token.span));
                    return Ok(tokens);
                }
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            tokens.push(token);
        }
    }

    /// Longest-match operator scanning.
    fn lex_symbol(&mut self, ch: char, start: Position) -> LexResult<TokenKind> {
        let next = self.peek_at(1);
        let third = self.peek_at(2);
        let fourth = self.peek_at(3);
        let (kind, width) = match (ch, next, third, fourth) {
            ('\n', ..) | (';', ..) => (TokenKind::Newline, 1),
            ('+', Some('+'), ..) => (TokenKind::PlusPlus, 2),
            ('+', Some('='), ..) => (TokenKind::PlusEqual, 2),
            ('+', ..) => (TokenKind::Plus, 1),
            ('-', Some('-'), ..) => (TokenKind::MinusMinus, 2),
            ('-', Some('='), ..) => (TokenKind::MinusEqual, 2),
            ('-', Some('>'), ..) => (TokenKind::Arrow, 2),
            ('-', ..) => (TokenKind::Minus, 1),
            ('*', Some('*'), Some('='), _) => (TokenKind::StarStarEqual, 3),
            ('*', Some('*'), ..) => (TokenKind::StarStar, 2),
            ('*', Some('='), ..) => (TokenKind::StarEqual, 2),
            ('*', ..) => (TokenKind::Star, 1),
            ('/', Some('='), ..) => (TokenKind::SlashEqual, 2),
            ('/', ..) => (TokenKind::Slash, 1),
            ('%', Some('='), ..) => (TokenKind::PercentEqual, 2),
            ('%', ..) => (TokenKind::Percent, 1),
            ('^', Some('^'), Some('='), _) => (TokenKind::CaretCaretEqual, 3),
            ('^', Some('^'), ..) => (TokenKind::CaretCaret, 2),
            ('^', Some('='), ..) => (TokenKind::CaretEqual, 2),
            ('^', ..) => (TokenKind::Caret, 1),
            ('<', Some('<'), Some('='), _) => (TokenKind::ShlEqual, 3),
            ('<', Some('<'), ..) => (TokenKind::Shl, 2),
            ('<', Some('='), ..) => (TokenKind::LessEqual, 2),
            ('<', ..) => (TokenKind::Less, 1),
            ('>', Some('>'), Some('>'), Some('=')) => (TokenKind::UShrEqual, 4),
            ('>', Some('>'), Some('>'), _) => (TokenKind::UShr, 3),
            ('>', Some('>'), Some('='), _) => (TokenKind::ShrEqual, 3),
            ('>', Some('>'), ..) => (TokenKind::Shr, 2),
            ('>', Some('='), ..) => (TokenKind::GreaterEqual, 2),
            ('>', ..) => (TokenKind::Greater, 1),
            ('&', Some('&'), Some('='), _) => (TokenKind::AndAndEqual, 3),
            ('&', Some('&'), ..) => (TokenKind::AndAnd, 2),
            ('&', Some('='), ..) => (TokenKind::AmpersandEqual, 2),
            ('&', ..) => (TokenKind::Ampersand, 1),
            ('|', Some('|'), Some('='), _) => (TokenKind::OrOrEqual, 3),
            ('|', Some('|'), ..) => (TokenKind::OrOr, 2),
            ('|', Some('='), ..) => (TokenKind::PipeEqual, 2),
            ('|', ..) => (TokenKind::Pipe, 1),
            ('~', ..) => (TokenKind::Tilde, 1),
            ('=', Some('='), ..) => (TokenKind::EqualEqual, 2),
            ('=', ..) => (TokenKind::Equal, 1),
            ('!', Some('='), ..) => (TokenKind::BangEqual, 2),
            ('!', ..) => (TokenKind::Bang, 1),
            ('?', Some('?'), Some('='), _) => (TokenKind::NullishEqual, 3),
            ('?', Some('?'), ..) => (TokenKind::Nullish, 2),
            ('?', Some('.'), ..) => (TokenKind::QuestionDot, 2),
            ('?', Some(':'), Some(':'), _) => (TokenKind::QuestionDoubleColon, 3),
            ('?', ..) => (TokenKind::Question, 1),
            (':', Some(':'), ..) => (TokenKind::DoubleColon, 2),
            (':', ..) => (TokenKind::Colon, 1),
            ('.', Some('.'), Some('.'), _) => (TokenKind::Ellipsis, 3),
            ('.', ..) => (TokenKind::Dot, 1),
            (',', ..) => (TokenKind::Comma, 1),
            ('(', ..) => (TokenKind::LParen, 1),
            (')', ..) => (TokenKind::RParen, 1),
            ('[', ..) => (TokenKind::LBracket, 1),
            (']', ..) => (TokenKind::RBracket, 1),
            ('{', ..) => (TokenKind::LBrace, 1),
            ('}', ..) => (TokenKind::RBrace, 1),
            (character, ..) => {
                self.advance_char();
                return Err(LexError::IllegalCharacter {
                    character,
                    span: Span::new(start, self.position()),
                });
            }
        };
        for _ in 0..width {
            self.advance_char();
        }
        Ok(kind)
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("tokenize failed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn scans_longest_operators_first() {
        assert_eq!(
            kinds("a >>>= 1 ?? b ?:: c"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::UShrEqual,
                TokenKind::Number(1.0),
                TokenKind::Nullish,
                TokenKind::Identifier("b".to_string()),
                TokenKind::QuestionDoubleColon,
                TokenKind::Identifier("c".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn optional_default_marker_is_split_from_equal() {
        assert_eq!(
            kinds("name?=5"),
            vec![
                TokenKind::Identifier("name".to_string()),
                TokenKind::Question,
                TokenKind::Equal,
                TokenKind::Number(5.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_semicolons() {
        assert_eq!(
            kinds("var x = 1_000 # trailing\nx; .5"),
            vec![
                TokenKind::Keyword(Keyword::Var),
                TokenKind::Identifier("x".to_string()),
                TokenKind::Equal,
                TokenKind::Number(1000.0),
                TokenKind::Newline,
                TokenKind::Identifier("x".to_string()),
                TokenKind::Newline,
                TokenKind::Number(0.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn template_segments_are_tokenized_recursively() {
        let tokens = kinds("`a{x + 1}b`");
        let TokenKind::Template(segments) = &tokens[0] else {
            panic!("expected template, got {:?}", tokens[0]);
        };
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], TemplateSegment::Text("a".to_string()));
        let TemplateSegment::Code(code) = &segments[1] else {
            panic!("expected code segment");
        };
        let code_kinds: Vec<_> = code.iter().map(|token| token.kind.clone()).collect();
        assert_eq!(
            code_kinds,
            vec![
                TokenKind::Identifier("x".to_string()),
                TokenKind::Plus,
                TokenKind::Number(1.0),
                TokenKind::Eof,
            ]
        );
        assert_eq!(segments[2], TemplateSegment::Text("b".to_string()));
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = tokenize("a\n  bc").expect("tokenize failed");
        let bc = &tokens[2];
        assert_eq!(bc.span.start.line, 1);
        assert_eq!(bc.span.start.column, 2);
        assert_eq!(bc.span.end.column, 4);
    }

    #[test]
    fn reports_illegal_characters_and_unterminated_strings() {
        let error = tokenize("1 @ 2").expect_err("expected illegal character");
        assert!(matches!(
            error,
            LexError::IllegalCharacter { character: '@', .. }
        ));
        assert_eq!(error.name(), "Illegal Character");

        let error = tokenize("\"abc").expect_err("expected unterminated string");
        assert!(matches!(
            error,
            LexError::UnterminatedString { expected: '"', .. }
        ));
    }
}
