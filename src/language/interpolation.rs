use crate::language::{
    lexer::Lexer,
    token::{Token, TokenKind, TokenSource},
};

/// The two-character marker opening an interpolated expression inside a
/// string literal: `"total: \(count) items"`.
pub const INTERPOLATION_MARKER: &str = "\\(";

/// Re-lexes the stream produced by a raw tokenizer, scanning string
/// literals for `\(expression)` interpolations and splitting them into
/// `StringStart`/`StringMid`/`StringEnd` tokens with the interpolated
/// expressions lexed in between.
///
/// Line, column and offsets of every derived token are recomputed from a
/// cumulative buffer of all text emitted so far, so coordinates stay
/// monotonic across the literal/expression interleaving. Tokens that pass
/// through untouched keep the positions the raw lexer gave them.
pub struct InterpolatingLexer<S: TokenSource> {
    lexer: S,
    interpolated_string: Option<Token>,
    current_index: usize,
    inner: Option<Lexer>,
    consumed: String,
}

impl<S: TokenSource> InterpolatingLexer<S> {
    pub fn new(lexer: S) -> Self {
        Self {
            lexer,
            interpolated_string: None,
            current_index: 0,
            inner: None,
            consumed: String::new(),
        }
    }

    fn line(&self) -> u32 {
        let bytes = self.consumed.as_bytes();
        let mut line = 1u32;
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\n' || (bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\x0c')) {
                line += 1;
            }
            i += 1;
        }
        line
    }

    fn char_pos(&self) -> u32 {
        let last_nl = self.consumed.rfind('\n').map(|i| i as i64).unwrap_or(-1);
        let last_rf = self.consumed.rfind("\r\x0c").map(|i| i as i64).unwrap_or(-1);
        (self.consumed.len() as i64 - last_nl.max(last_rf)) as u32
    }

    /// Stamps a derived or forwarded token with coordinates taken from the
    /// consumed-text buffer and appends its text to that buffer.
    fn init_token(&mut self, token: &mut Token) {
        token.line = self.line();
        token.column = self.char_pos();
        token.start = self.consumed.len();
        self.consumed.push_str(&token.text);
        token.stop = self.consumed.len().saturating_sub(1);
    }

    /// Finds the close paren matching the marker at `from` with a plain
    /// depth count. Parens inside nested string literals are not treated
    /// specially; an unbalanced expression falls back to the end of the
    /// literal text.
    fn find_matching_close_paren(text: &str, from: usize) -> usize {
        let mut depth = 0i32;
        for (i, ch) in text[from + 2..].char_indices() {
            if ch == '(' {
                depth += 1;
            }
            if ch == ')' {
                depth -= 1;
            }
            if depth < 0 {
                return from + 2 + i;
            }
        }
        text.char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or_default()
    }

    fn open_inner_lexer(&mut self, text: &str, start: usize) {
        // A literal cut off right at the marker makes the last-character
        // fallback land before the fragment start; clamp so the fragment
        // degenerates to empty instead of an inverted range.
        let end = Self::find_matching_close_paren(text, start).max(start + 2);
        let fragment = &text[start + 2..end];
        match Lexer::open(fragment, self.lexer.source_name()) {
            Ok(lexer) => {
                self.inner = Some(lexer);
            }
            Err(_) => {
                // Lost cause; carry on lexing as if the literal held no
                // interpolation at all.
                self.interpolated_string = None;
                self.inner = None;
            }
        }
        self.current_index = end;
    }

    fn find_marker(text: &str, from: usize) -> Option<usize> {
        text[from..].find(INTERPOLATION_MARKER).map(|i| i + from)
    }
}

impl<S: TokenSource> TokenSource for InterpolatingLexer<S> {
    fn next_token(&mut self) -> Token {
        if let Some(inner) = self.inner.as_mut() {
            let token = inner.next_token();
            if token.is_eof() {
                self.inner = None;
            } else {
                let mut token = token;
                self.init_token(&mut token);
                return token;
            }
        }

        if let Some(string_token) = self.interpolated_string.take() {
            let text = string_token.text.clone();
            if let Some(start) = Self::find_marker(&text, self.current_index) {
                let mut mid = Token::new(
                    TokenKind::StringMid,
                    &text[self.current_index..start + 2],
                );
                self.init_token(&mut mid);
                self.interpolated_string = Some(string_token);
                self.open_inner_lexer(&text, start);
                return mid;
            } else {
                let mut end = Token::new(TokenKind::StringEnd, &text[self.current_index..]);
                self.init_token(&mut end);
                return end;
            }
        }

        let token = self.lexer.next_token();
        if token.kind != TokenKind::StringLiteral {
            self.consumed.push_str(&token.text);
            return token;
        }
        let Some(start) = Self::find_marker(&token.text, 0) else {
            self.consumed.push_str(&token.text);
            return token;
        };

        let text = token.text.clone();
        let mut start_token = Token::new(TokenKind::StringStart, &text[..start + 2]);
        self.init_token(&mut start_token);
        self.interpolated_string = Some(token);
        self.open_inner_lexer(&text, start);
        start_token
    }

    fn source_name(&self) -> &str {
        self.lexer.source_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<Token> {
        let raw = Lexer::open(src, "test").expect("open");
        let mut lexer = InterpolatingLexer::new(raw);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.is_eof() {
                break;
            }
            out.push(token);
        }
        out
    }

    #[test]
    fn plain_literal_passes_through_unchanged() {
        let tokens = lex_all(r#""no markers here""#);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].text, r#""no markers here""#);
    }

    #[test]
    fn single_interpolation_splits_into_start_and_end() {
        let tokens = lex_all(r#""hello \(name)!""#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StringStart,
                TokenKind::Identifier,
                TokenKind::StringEnd,
            ]
        );
        assert_eq!(tokens[0].text, "\"hello \\(");
        assert_eq!(tokens[1].text, "name");
        assert_eq!(tokens[2].text, ")!\"");
    }

    #[test]
    fn two_interpolations_produce_a_mid_segment() {
        let tokens = lex_all(r#""a \(x) b \(y) c""#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StringStart,
                TokenKind::Identifier,
                TokenKind::StringMid,
                TokenKind::Identifier,
                TokenKind::StringEnd,
            ]
        );
        assert_eq!(tokens[2].text, ") b \\(");
        assert_eq!(tokens[4].text, ") c\"");
    }

    #[test]
    fn offsets_increase_strictly_across_the_split() {
        let tokens = lex_all(r#""a \(x + y) b \(z) c""#);
        for pair in tokens.windows(2) {
            assert!(
                pair[1].start > pair[0].start,
                "offsets not increasing: {:?} then {:?}",
                pair[0],
                pair[1]
            );
        }
        for token in &tokens {
            assert!(token.stop >= token.start || token.text.is_empty());
        }
    }

    #[test]
    fn nested_parens_inside_interpolation_are_balanced() {
        let tokens = lex_all(r#""v = \(f(x))""#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StringStart,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::RParen,
                TokenKind::StringEnd,
            ]
        );
        assert_eq!(tokens[5].text, ")\"");
    }

    #[test]
    fn unbalanced_interpolation_falls_back_to_literal_end() {
        // No matching close paren: the scan runs to the last character.
        let tokens = lex_all(r#""x \(a + b""#);
        assert_eq!(tokens[0].kind, TokenKind::StringStart);
        assert!(tokens.iter().all(|t| t.kind != TokenKind::StringEnd || t.text == "\""));
    }

    #[test]
    fn literal_truncated_at_the_marker_still_lexes() {
        // An unterminated literal ending right at `\(` leaves no fragment
        // text at all; the wrapper must emit the start segment and an
        // empty end segment rather than slice past the literal.
        let tokens = lex_all("\"x \\(");
        assert_eq!(tokens[0].kind, TokenKind::StringStart);
        assert_eq!(tokens[0].text, "\"x \\(");
        assert_eq!(tokens[1].kind, TokenKind::StringEnd);
        assert_eq!(tokens[1].text, "");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn lines_stay_monotonic_across_multiline_literals() {
        let tokens = lex_all("\"one\n two \\(x)\n three\"");
        let mut last = 0;
        for token in &tokens {
            assert!(token.line >= last, "line went backwards at {:?}", token);
            last = token.line;
        }
        // The end segment starts after two embedded newlines... only one is
        // inside consumed text by the time it is stamped.
        assert!(tokens.last().map(|t| t.line >= 2).unwrap_or(false));
    }

    #[test]
    fn surrounding_tokens_flow_through_the_wrapper() {
        let tokens = lex_all(r#"value x = "n: \(n)";"#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::ValueKw,
                TokenKind::Identifier,
                TokenKind::Eq,
                TokenKind::StringStart,
                TokenKind::Identifier,
                TokenKind::StringEnd,
                TokenKind::Semi,
            ]
        );
    }

    /// Scripted source used to drive the degradation path: a literal whose
    /// interpolated fragment cannot be opened as a token stream.
    struct Scripted {
        tokens: std::vec::IntoIter<Token>,
    }

    impl TokenSource for Scripted {
        fn next_token(&mut self) -> Token {
            self.tokens
                .next()
                .unwrap_or_else(|| Token::new(TokenKind::Eof, ""))
        }

        fn source_name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn failed_inner_lexer_abandons_interpolation() {
        let literal = Token::new(TokenKind::StringLiteral, "\"a \\(\0) b\"");
        let tail = Token::new(TokenKind::Semi, ";");
        let source = Scripted {
            tokens: vec![literal, tail].into_iter(),
        };
        let mut lexer = InterpolatingLexer::new(source);

        // The start segment was already emitted when construction failed;
        // after that the wrapper degrades to plain forwarding.
        let first = lexer.next_token();
        assert_eq!(first.kind, TokenKind::StringStart);
        let second = lexer.next_token();
        assert_eq!(second.kind, TokenKind::Semi);
    }
}
