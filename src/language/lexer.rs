use crate::language::{
    span::Span,
    token::{Token, TokenKind, TokenSource},
};

#[derive(Clone, Debug)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Hand-written raw tokenizer for Quill source text.
///
/// Produces one token per `next_token` call; string literals are emitted
/// whole, with escape sequences and interpolation markers left verbatim in
/// the token text. The interpolating wrapper re-lexes those afterwards.
///
/// Owns its buffer so that a lexer can also be opened over a fragment
/// extracted from another token's text.
pub struct Lexer {
    src: String,
    offset: usize,
    line: u32,
    column: u32,
    name: String,
    errors: Vec<LexError>,
}

impl Lexer {
    /// Opens a lexer over a full source buffer or an extracted fragment.
    ///
    /// Fails when the text cannot be tokenized as a character stream at
    /// all; callers treat that as "no token source", not a diagnostic.
    pub fn open(src: impl Into<String>, name: impl Into<String>) -> Result<Self, LexError> {
        let src = src.into();
        if let Some(pos) = src.find('\0') {
            return Err(LexError::new(
                "source text contains a NUL character",
                Span::new(pos, pos + 1),
            ));
        }
        Ok(Self {
            src,
            offset: 0,
            line: 1,
            column: 0,
            name: name.into(),
            errors: Vec::new(),
        })
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    fn current(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    fn peek(&self) -> Option<char> {
        let mut chars = self.src[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.current() {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    fn error(&mut self, start: usize, message: impl Into<String>) {
        self.errors
            .push(LexError::new(message, Span::new(start, self.offset)));
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.current() {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek() == Some('/') => {
                    while let Some(ch) = self.current() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let start = self.offset;
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while self.current().is_some() {
                        if self.current() == Some('*') && self.peek() == Some('/') {
                            self.bump();
                            self.bump();
                            closed = true;
                            break;
                        }
                        self.bump();
                    }
                    if !closed {
                        self.error(start, "unterminated block comment");
                    }
                }
                _ => break,
            }
        }
    }

    fn token(&self, kind: TokenKind, start: usize, line: u32, column: u32) -> Token {
        Token {
            kind,
            text: self.src[start..self.offset].to_string(),
            line,
            column,
            start,
            stop: self.offset.saturating_sub(1),
        }
    }

    fn lex_identifier(&mut self, start: usize, line: u32, column: u32) -> Token {
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let slice = &self.src[start..self.offset];
        let kind = match slice {
            "module" => TokenKind::ModuleKw,
            "package" => TokenKind::PackageKw,
            "import" => TokenKind::ImportKw,
            "class" => TokenKind::ClassKw,
            "interface" => TokenKind::InterfaceKw,
            "object" => TokenKind::ObjectKw,
            "function" => TokenKind::FunctionKw,
            "value" => TokenKind::ValueKw,
            "void" => TokenKind::VoidKw,
            "return" => TokenKind::ReturnKw,
            "this" => TokenKind::ThisKw,
            "super" => TokenKind::SuperKw,
            "outer" => TokenKind::OuterKw,
            "for" => TokenKind::ForKw,
            "in" => TokenKind::InKw,
            _ if slice.starts_with(|c: char| c.is_ascii_uppercase()) => TokenKind::TypeName,
            _ => TokenKind::Identifier,
        };
        self.token(kind, start, line, column)
    }

    fn lex_number(&mut self, start: usize, line: u32, column: u32) -> Token {
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() || ch == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let mut is_float = false;
        if self.current() == Some('.') {
            if let Some(next) = self.peek() {
                if next.is_ascii_digit() {
                    is_float = true;
                    self.bump();
                    while let Some(ch) = self.current() {
                        if ch.is_ascii_digit() || ch == '_' {
                            self.bump();
                        } else {
                            break;
                        }
                    }
                }
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            is_float = true;
            self.bump();
            if matches!(self.current(), Some('+') | Some('-')) {
                self.bump();
            }
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Natural
        };
        self.token(kind, start, line, column)
    }

    /// Consumes a double-quoted string literal, keeping escapes and any
    /// `\(` interpolation markers verbatim in the token text.
    fn lex_string(&mut self, start: usize, line: u32, column: u32) -> Token {
        self.bump();
        loop {
            match self.current() {
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if self.current().is_some() {
                        self.bump();
                    }
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    self.error(start, "unterminated string literal");
                    break;
                }
            }
        }
        self.token(TokenKind::StringLiteral, start, line, column)
    }

    fn lex_delimited(
        &mut self,
        close: char,
        kind: TokenKind,
        unterminated: &str,
        start: usize,
        line: u32,
        column: u32,
    ) -> Token {
        self.bump();
        loop {
            match self.current() {
                Some(ch) if ch == close => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    self.error(start, unterminated);
                    break;
                }
            }
        }
        self.token(kind, start, line, column)
    }

    fn lex_symbol(&mut self, start: usize, line: u32, column: u32) -> Token {
        let ch = self.current();
        self.bump();
        let kind = match ch {
            Some('(') => TokenKind::LParen,
            Some(')') => TokenKind::RParen,
            Some('{') => TokenKind::LBrace,
            Some('}') => TokenKind::RBrace,
            Some('[') => TokenKind::LBracket,
            Some(']') => TokenKind::RBracket,
            Some(',') => TokenKind::Comma,
            Some('.') => TokenKind::Dot,
            Some(';') => TokenKind::Semi,
            Some(':') => TokenKind::Colon,
            Some('?') => TokenKind::Question,
            Some('+') => TokenKind::Plus,
            Some('*') => TokenKind::Star,
            Some('%') => TokenKind::Percent,
            Some('^') => TokenKind::Caret,
            Some('~') => TokenKind::Tilde,
            Some('=') => {
                if self.current() == Some('=') {
                    self.bump();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            Some('!') => {
                if self.current() == Some('=') {
                    self.bump();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            Some('<') => {
                if self.current() == Some('=') {
                    self.bump();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            Some('>') => {
                if self.current() == Some('=') {
                    self.bump();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            Some('&') => {
                if self.current() == Some('&') {
                    self.bump();
                    TokenKind::AmpersandAmpersand
                } else {
                    TokenKind::Ampersand
                }
            }
            Some('|') => {
                if self.current() == Some('|') {
                    self.bump();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            Some('-') => {
                if self.current() == Some('>') {
                    self.bump();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            Some('/') => TokenKind::Slash,
            _ => {
                self.error(
                    start,
                    format!("unrecognised character {:?}", ch.unwrap_or('\0')),
                );
                TokenKind::Unknown
            }
        };
        self.token(kind, start, line, column)
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let (start, line, column) = (self.offset, self.line, self.column);
        match self.current() {
            None => Token {
                kind: TokenKind::Eof,
                text: String::new(),
                line,
                column,
                start,
                stop: start,
            },
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                self.lex_identifier(start, line, column)
            }
            Some(ch) if ch.is_ascii_digit() => self.lex_number(start, line, column),
            Some('"') => self.lex_string(start, line, column),
            Some('\'') => self.lex_delimited(
                '\'',
                TokenKind::QuotedLiteral,
                "unterminated quoted literal",
                start,
                line,
                column,
            ),
            Some('`') => self.lex_delimited(
                '`',
                TokenKind::CharLiteral,
                "unterminated character literal",
                start,
                line,
                column,
            ),
            Some(_) => self.lex_symbol(start, line, column),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::open(src, "test").expect("open");
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            let eof = token.is_eof();
            out.push(token.kind);
            if eof {
                break;
            }
        }
        out
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("module quill.demo"),
            vec![
                TokenKind::ModuleKw,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("value Counter"),
            vec![TokenKind::ValueKw, TokenKind::TypeName, TokenKind::Eof]
        );
    }

    #[test]
    fn string_literal_keeps_marker_verbatim() {
        let mut lexer = Lexer::open(r#""hi \(name)!""#, "test").expect("open");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.text, r#""hi \(name)!""#);
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn escaped_quote_does_not_terminate() {
        let mut lexer = Lexer::open(r#""a\"b""#, "test").expect("open");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.text, r#""a\"b""#);
    }

    #[test]
    fn unterminated_string_is_recorded() {
        let mut lexer = Lexer::open("\"oops", "test").expect("open");
        let token = lexer.next_token();
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(lexer.errors().len(), 1);
    }

    #[test]
    fn nul_byte_rejects_the_source() {
        assert!(Lexer::open("a\0b", "test").is_err());
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            kinds("1 + 2.5 <= x"),
            vec![
                TokenKind::Natural,
                TokenKind::Plus,
                TokenKind::Float,
                TokenKind::LtEq,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_and_column_track_newlines() {
        let mut lexer = Lexer::open("a\nbb", "test").expect("open");
        let a = lexer.next_token();
        let bb = lexer.next_token();
        assert_eq!((a.line, a.column), (1, 0));
        assert_eq!((bb.line, bb.column), (2, 0));
        assert_eq!(bb.start, 2);
    }
}
