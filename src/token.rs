//! Token model shared by the lexer and the parser.

use std::fmt;

/// A location in the source text. `line` and `column` are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }
}

/// Source range. `end` points one past the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let start = if other.start.index < self.start.index {
            other.start
        } else {
            self.start
        };
        let end = if other.end.index > self.end.index {
            other.end
        } else {
            self.end
        };
        Span { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Var,
    Define,
    Delete,
    If,
    Elif,
    Else,
    End,
    For,
    To,
    Step,
    Foreach,
    As,
    While,
    Func,
    Return,
    Continue,
    Break,
    Pass,
    Class,
    Extends,
    New,
    Super,
    Private,
    Protected,
    Public,
    Static,
    Override,
    Property,
    Method,
    Getter,
    Setter,
    Switch,
    Case,
    Default,
    Enum,
    Typeof,
    Instanceof,
    And,
    Or,
    Not,
    True,
    False,
    None,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "var" => Self::Var,
            "define" => Self::Define,
            "delete" => Self::Delete,
            "if" => Self::If,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "end" => Self::End,
            "for" => Self::For,
            "to" => Self::To,
            "step" => Self::Step,
            "foreach" => Self::Foreach,
            "as" => Self::As,
            "while" => Self::While,
            "func" => Self::Func,
            "return" => Self::Return,
            "continue" => Self::Continue,
            "break" => Self::Break,
            "pass" => Self::Pass,
            "class" => Self::Class,
            "extends" => Self::Extends,
            "new" => Self::New,
            "super" => Self::Super,
            "private" => Self::Private,
            "protected" => Self::Protected,
            "public" => Self::Public,
            "static" => Self::Static,
            "override" => Self::Override,
            "property" => Self::Property,
            "method" => Self::Method,
            "getter" => Self::Getter,
            "setter" => Self::Setter,
            "switch" => Self::Switch,
            "case" => Self::Case,
            "default" => Self::Default,
            "enum" => Self::Enum,
            "typeof" => Self::Typeof,
            "instanceof" => Self::Instanceof,
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "true" => Self::True,
            "false" => Self::False,
            "none" => Self::None,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Define => "define",
            Self::Delete => "delete",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::End => "end",
            Self::For => "for",
            Self::To => "to",
            Self::Step => "step",
            Self::Foreach => "foreach",
            Self::As => "as",
            Self::While => "while",
            Self::Func => "func",
            Self::Return => "return",
            Self::Continue => "continue",
            Self::Break => "break",
            Self::Pass => "pass",
            Self::Class => "class",
            Self::Extends => "extends",
            Self::New => "new",
            Self::Super => "super",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Public => "public",
            Self::Static => "static",
            Self::Override => "override",
            Self::Property => "property",
            Self::Method => "method",
            Self::Getter => "getter",
            Self::Setter => "setter",
            Self::Switch => "switch",
            Self::Case => "case",
            Self::Default => "default",
            Self::Enum => "enum",
            Self::Typeof => "typeof",
            Self::Instanceof => "instanceof",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::True => "true",
            Self::False => "false",
            Self::None => "none",
        }
    }
}

/// One piece of a backtick template string.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    /// Tokens of an interpolated `{...}` expression, terminated by `Eof`.
    Code(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Template(Vec<TemplateSegment>),
    Identifier(String),
    Keyword(Keyword),

    // Arithmetic
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    StarStar,   // **
    Caret,      // ^
    PlusPlus,   // ++
    MinusMinus, // --

    // Bitwise
    Shl,        // <<
    Shr,        // >>
    UShr,       // >>>
    Ampersand,  // &
    Pipe,       // |
    CaretCaret, // ^^
    Tilde,      // ~

    // Comparison and logic
    EqualEqual,   // ==
    BangEqual,    // !=
    Less,         // <
    Greater,      // >
    LessEqual,    // <=
    GreaterEqual, // >=
    Bang,         // !
    AndAnd,       // &&
    OrOr,         // ||
    Nullish,      // ??

    // Compound assignment
    PlusEqual,       // +=
    MinusEqual,      // -=
    StarEqual,       // *=
    SlashEqual,      // /=
    PercentEqual,    // %=
    StarStarEqual,   // **=
    CaretEqual,      // ^=
    CaretCaretEqual, // ^^=
    ShlEqual,        // <<=
    ShrEqual,        // >>=
    UShrEqual,       // >>>=
    AmpersandEqual,  // &=
    PipeEqual,       // |=
    AndAndEqual,     // &&=
    OrOrEqual,       // ||=
    NullishEqual,    // ??=

    // Delimiters
    Equal,             // =
    Arrow,             // ->
    Colon,             // :
    DoubleColon,       // ::
    Dot,               // .
    QuestionDot,       // ?.
    QuestionDoubleColon, // ?::
    Question,          // ?
    Ellipsis,          // ...
    Comma,             // ,
    LParen,            // (
    RParen,            // )
    LBracket,          // [
    RBracket,          // ]
    LBrace,            // {
    RBrace,            // }

    // Structural
    Newline,
    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == keyword)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number(value) => return write!(f, "number {value}"),
            TokenKind::String(value) => return write!(f, "string \"{value}\""),
            TokenKind::Template(_) => "template string",
            TokenKind::Identifier(name) => return write!(f, "identifier '{name}'"),
            TokenKind::Keyword(keyword) => return write!(f, "'{}'", keyword.as_str()),
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::StarStar => "'**'",
            TokenKind::Caret => "'^'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Shl => "'<<'",
            TokenKind::Shr => "'>>'",
            TokenKind::UShr => "'>>>'",
            TokenKind::Ampersand => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::CaretCaret => "'^^'",
            TokenKind::Tilde => "'~'",
            TokenKind::EqualEqual => "'=='",
            TokenKind::BangEqual => "'!='",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::LessEqual => "'<='",
            TokenKind::GreaterEqual => "'>='",
            TokenKind::Bang => "'!'",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Nullish => "'??'",
            TokenKind::PlusEqual => "'+='",
            TokenKind::MinusEqual => "'-='",
            TokenKind::StarEqual => "'*='",
            TokenKind::SlashEqual => "'/='",
            TokenKind::PercentEqual => "'%='",
            TokenKind::StarStarEqual => "'**='",
            TokenKind::CaretEqual => "'^='",
            TokenKind::CaretCaretEqual => "'^^='",
            TokenKind::ShlEqual => "'<<='",
            TokenKind::ShrEqual => "'>>='",
            TokenKind::UShrEqual => "'>>>='",
            TokenKind::AmpersandEqual => "'&='",
            TokenKind::PipeEqual => "'|='",
            TokenKind::AndAndEqual => "'&&='",
            TokenKind::OrOrEqual => "'||='",
            TokenKind::NullishEqual => "'??='",
            TokenKind::Equal => "'='",
            TokenKind::Arrow => "'->'",
            TokenKind::Colon => "':'",
            TokenKind::DoubleColon => "'::'",
            TokenKind::Dot => "'.'",
            TokenKind::QuestionDot => "'?.'",
            TokenKind::QuestionDoubleColon => "'?::'",
            TokenKind::Question => "'?'",
            TokenKind::Ellipsis => "'...'",
            TokenKind::Comma => "','",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
