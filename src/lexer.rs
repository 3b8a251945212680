//! Byte stream → tokens, with source offsets.
//!
//! A hand-written lexer rather than a parser-generator crate: the lexical
//! rules here are small and fixed, so a restartable iterator over
//! offset-carrying tokens is simpler than pulling in an external grammar.
//!
//! One simplification from the prose description: rather than having the
//! lexer itself track a "preceding token class" to decide whether a `-`
//! is unary or binary, every `-` is lexed as one plain [`TokenKind::Minus`]
//! token; the evaluator's Pratt parser distinguishes unary from
//! binary the ordinary way a precedence-climbing parser already has to —
//! by whether it's looking for a prefix (`nud`) or an infix continuation
//! (`led`) — so no extra state needs to live in the lexer.

use crate::{error::LogoError, value::parse_number};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A bareword, not a number and not prefixed with `"`/`:`.
    Word(String),
    /// A numeric literal; the parsed value plus its exact source spelling
    /// (needed to preserve list contents verbatim,).
    Number(f32, String),
    /// `"foo` — evaluates to the atom `foo` directly.
    QuotedWord(String),
    /// `:name` — a variable reference.
    ColonName(String),
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '"' | ':' | ';')
}

fn is_operator_start(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '=' | '<' | '>')
}

/// Atoms are "length 0..255"; anything longer is the "atom overflow" lex
/// failure mode.
const MAX_ATOM_LEN: usize = 255;

fn check_atom_length(text: &str) -> Result<(), LogoError> {
    if text.len() > MAX_ATOM_LEN {
        return Err(LogoError::new(crate::error::LogoErrorKind::DoesntLikeInput, format!("atom overflow: '{text}' is longer than {MAX_ATOM_LEN} characters")));
    }
    Ok(())
}

/// Tokenises Logo source text. Finite and restartable: [`Lexer::reset`]
/// rewinds to an arbitrary byte offset previously observed via
/// [`Lexer::position`].
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char_at(&self, skip: usize) -> Option<char> {
        self.rest().chars().nth(skip)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace, `;`-comments, and `~`-newline continuations.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('~') => {
                    // Look ahead past trailing spaces/tabs for a newline;
                    // if found, the whole run is a line-continuation and
                    // collapses to whitespace.
                    let mut skip = 1;
                    while matches!(self.peek_char_at(skip), Some(c) if c == ' ' || c == '\t') {
                        skip += 1;
                    }
                    if matches!(self.peek_char_at(skip), Some('\n')) {
                        for _ in 0..=skip {
                            self.bump();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Produces the next token, advancing past it.
    ///
    /// # Errors
    /// `ERROR(LEX)` on an invalid number literal.
    pub fn next_token(&mut self) -> Result<Token, LogoError> {
        self.skip_trivia();
        let offset = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(Token { kind: TokenKind::Eof, offset });
        };

        let kind = match c {
            '[' => {
                self.bump();
                TokenKind::LeftBracket
            }
            ']' => {
                self.bump();
                TokenKind::RightBracket
            }
            '(' => {
                self.bump();
                TokenKind::LeftParen
            }
            ')' => {
                self.bump();
                TokenKind::RightParen
            }
            '+' => {
                self.bump();
                TokenKind::Plus
            }
            '-' => {
                self.bump();
                TokenKind::Minus
            }
            '*' => {
                self.bump();
                TokenKind::Star
            }
            '/' => {
                self.bump();
                TokenKind::Slash
            }
            '=' => {
                self.bump();
                TokenKind::Eq
            }
            '<' => {
                self.bump();
                match self.peek_char() {
                    Some('=') => {
                        self.bump();
                        TokenKind::Le
                    }
                    Some('>') => {
                        self.bump();
                        TokenKind::NotEq
                    }
                    _ => TokenKind::Lt,
                }
            }
            '>' => {
                self.bump();
                match self.peek_char() {
                    Some('=') => {
                        self.bump();
                        TokenKind::Ge
                    }
                    _ => TokenKind::Gt,
                }
            }
            '"' => {
                self.bump();
                let text = self.scan_word_text();
                check_atom_length(&text)?;
                TokenKind::QuotedWord(text)
            }
            ':' => {
                self.bump();
                let name = self.scan_word_text();
                if name.is_empty() {
                    return Err(LogoError::new(crate::error::LogoErrorKind::DoesntLikeInput, "empty variable name after ':'"));
                }
                check_atom_length(&name)?;
                TokenKind::ColonName(name)
            }
            _ if c.is_ascii_digit() => self.scan_number(offset)?,
            _ => {
                let text = self.scan_word_text();
                if text.is_empty() {
                    return Err(LogoError::new(crate::error::LogoErrorKind::DoesntLikeInput, format!("unexpected character '{c}'")));
                }
                check_atom_length(&text)?;
                if let Some(n) = parse_number(&text) {
                    TokenKind::Number(n, text)
                } else {
                    TokenKind::Word(text)
                }
            }
        };
        Ok(Token { kind, offset })
    }

    /// Scans a run of non-boundary, non-operator-starting characters — the
    /// body of a bareword, a quoted word's text, or a colon name.
    fn scan_word_text(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_word_boundary(c) || is_operator_start(c) {
                break;
            }
            self.bump();
        }
        self.source[start..self.pos].to_owned()
    }

    fn scan_number(&mut self, offset: usize) -> Result<TokenKind, LogoError> {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek_char() == Some('.') && matches!(self.peek_char_at(1), Some(c) if c.is_ascii_digit()) {
            self.bump();
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mark = self.pos;
            self.bump();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.bump();
            }
            let exp_start = self.pos;
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
            if self.pos == exp_start {
                // not a valid exponent after all; back out of the 'e'/'E'
                self.pos = mark;
            }
        }
        let text = &self.source[start..self.pos];
        let value = parse_number(text).ok_or_else(|| LogoError::new(crate::error::LogoErrorKind::DoesntLikeInput, format!("invalid number at offset {offset}")))?;
        Ok(TokenKind::Number(value, text.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn lexes_simple_command() {
        let toks = lex_all("forward 100");
        assert_eq!(toks, vec![TokenKind::Word("forward".into()), TokenKind::Number(100.0, "100".into()), TokenKind::Eof]);
    }

    #[test]
    fn lexes_quoted_word_and_colon_name() {
        let toks = lex_all(r#"make "a :b"#);
        assert_eq!(
            toks,
            vec![TokenKind::Word("make".into()), TokenKind::QuotedWord("a".into()), TokenKind::ColonName("b".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn comment_is_stripped() {
        let toks = lex_all("fd 10 ; go forward\n");
        assert_eq!(toks, vec![TokenKind::Word("fd".into()), TokenKind::Number(10.0, "10".into()), TokenKind::Eof]);
    }

    #[test]
    fn tilde_newline_splices_lines() {
        let toks = lex_all("fd ~\n100");
        assert_eq!(toks, vec![TokenKind::Word("fd".into()), TokenKind::Number(100.0, "100".into()), TokenKind::Eof]);
    }

    #[test]
    fn comparison_operators_lex_distinctly() {
        let toks = lex_all("<= >= <> = < >");
        assert_eq!(toks, vec![TokenKind::Le, TokenKind::Ge, TokenKind::NotEq, TokenKind::Eq, TokenKind::Lt, TokenKind::Gt, TokenKind::Eof]);
    }

    #[test]
    fn brackets_and_parens_are_distinct_tokens() {
        let toks = lex_all("[ ( ) ]");
        assert_eq!(toks, vec![TokenKind::LeftBracket, TokenKind::LeftParen, TokenKind::RightParen, TokenKind::RightBracket, TokenKind::Eof]);
    }

    #[test]
    fn word_past_255_bytes_is_atom_overflow() {
        let long = "a".repeat(256);
        let mut lexer = Lexer::new(&long);
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, crate::error::LogoErrorKind::DoesntLikeInput);

        let short = "a".repeat(255);
        let mut lexer = Lexer::new(&short);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Word(short));
    }
}
