use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    TypeName,
    Natural,
    Float,
    CharLiteral,
    QuotedLiteral,
    StringLiteral,

    // Derived string-interpolation kinds; never produced by the raw lexer.
    StringStart,
    StringMid,
    StringEnd,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Comma,
    Dot,
    Semi,
    Colon,
    Question,

    Eq,
    EqEq,
    NotEq,
    Bang,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpersandAmpersand,
    PipePipe,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Arrow,

    // Keywords
    ModuleKw,
    PackageKw,
    ImportKw,
    ClassKw,
    InterfaceKw,
    ObjectKw,
    FunctionKw,
    ValueKw,
    VoidKw,
    ReturnKw,
    ThisKw,
    SuperKw,
    OuterKw,
    ForKw,
    InKw,

    Unknown,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One token of the lexical stream.
///
/// `start`/`stop` index into the consumed-text buffer maintained by the
/// token source, not the original file: interpolation splitting changes
/// token boundaries relative to the raw input, so downstream coordinates
/// are derived from the text actually emitted so far.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub start: usize,
    pub stop: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            line: 1,
            column: 0,
            start: 0,
            stop: 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// A finite, forward-only producer of tokens. Exhausted once `next_token`
/// has returned an `Eof` token; callers must not pull past that point.
pub trait TokenSource {
    fn next_token(&mut self) -> Token;

    fn source_name(&self) -> &str;
}
