//! A uniform token stream, whichever of two places it's coming from: live
//! source text being lexed, or a list value being run as code (`run`,
//! `if`, procedure bodies stored as line-lists, and friends all feed a
//! list's elements back through this same interface).
//!
//! Both modes tokenize eagerly into an owned buffer rather than streaming
//! lazily from the lexer/heap: a Logo instruction line or a `[...]` body is
//! always finite and small, and materializing up front means a `TokenSource`
//! never has to hold a live borrow of the evaluator's heap or interner while
//! the evaluator itself needs `&mut self` to dispatch.

use crate::{
    error::LogoError,
    heap::{Heap, NodeId},
    intern::{Interner, StringId},
    lexer::{Lexer, TokenKind},
    value::parse_number,
};

/// A token in evaluator-ready form: words/quoted-words/colon-names carry
/// interned ids rather than borrowed text, and a nested list is already a
/// heap handle rather than a pending bracket-matching job, so the evaluator
/// treats tokens from either source identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tok {
    Word(StringId),
    Number(f32),
    QuotedWord(StringId),
    ColonName(StringId),
    /// A list already fully materialised on the heap — produced directly
    /// when re-reading list-as-code, or built by the evaluator's own `[...]`
    /// expression handling when lexing fresh source ( level 8).
    ListLiteral(NodeId),
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

/// Position marker opaque to callers, passed back to [`TokenSource::restore`].
pub type SourcePos = usize;

/// Uniform peek/advance/save/restore over a token stream.
pub trait TokenSource {
    fn peek(&mut self) -> Tok;
    fn advance(&mut self) -> Tok;
    fn save(&self) -> SourcePos;
    fn restore(&mut self, pos: SourcePos);
}

/// A flat, already-tokenized buffer shared by both `TokenSource` impls.
struct TokenStream {
    tokens: Vec<Tok>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Tok {
        self.tokens.get(self.pos).copied().unwrap_or(Tok::Eof)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }
}

fn convert_lexer_token(kind: TokenKind, interns: &mut Interner) -> Tok {
    match kind {
        TokenKind::Word(text) => Tok::Word(interns.intern(&text)),
        TokenKind::Number(value, _) => Tok::Number(value),
        TokenKind::QuotedWord(text) => Tok::QuotedWord(interns.intern(&text)),
        TokenKind::ColonName(text) => Tok::ColonName(interns.intern(&text)),
        TokenKind::LeftBracket => Tok::LeftBracket,
        TokenKind::RightBracket => Tok::RightBracket,
        TokenKind::LeftParen => Tok::LeftParen,
        TokenKind::RightParen => Tok::RightParen,
        TokenKind::Plus => Tok::Plus,
        TokenKind::Minus => Tok::Minus,
        TokenKind::Star => Tok::Star,
        TokenKind::Slash => Tok::Slash,
        TokenKind::Eq => Tok::Eq,
        TokenKind::NotEq => Tok::NotEq,
        TokenKind::Lt => Tok::Lt,
        TokenKind::Gt => Tok::Gt,
        TokenKind::Le => Tok::Le,
        TokenKind::Ge => Tok::Ge,
        TokenKind::Eof => Tok::Eof,
    }
}

/// Tokenises a whole line of live source text up front.
pub struct LexerSource {
    stream: TokenStream,
}

impl LexerSource {
    /// # Errors
    /// `ERROR(LEX)` if the line contains an invalid token.
    pub fn new(source: &str, interns: &mut Interner) -> Result<Self, LogoError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let raw = lexer.next_token()?;
            let done = raw.kind == TokenKind::Eof;
            tokens.push(convert_lexer_token(raw.kind, interns));
            if done {
                break;
            }
        }
        Ok(Self { stream: TokenStream { tokens, pos: 0 } })
    }
}

impl TokenSource for LexerSource {
    fn peek(&mut self) -> Tok {
        self.stream.peek()
    }

    fn advance(&mut self) -> Tok {
        self.stream.advance()
    }

    fn save(&self) -> SourcePos {
        self.stream.pos
    }

    fn restore(&mut self, pos: SourcePos) {
        self.stream.pos = pos;
    }
}

/// Single-character and two-character operator spellings, shared between
/// fresh lexing and list-as-code reinterpretation.
fn operator_token(text: &str) -> Option<Tok> {
    Some(match text {
        "+" => Tok::Plus,
        "-" => Tok::Minus,
        "*" => Tok::Star,
        "/" => Tok::Slash,
        "=" => Tok::Eq,
        "<>" => Tok::NotEq,
        "<=" => Tok::Le,
        ">=" => Tok::Ge,
        "<" => Tok::Lt,
        ">" => Tok::Gt,
        "(" => Tok::LeftParen,
        ")" => Tok::RightParen,
        _ => return None,
    })
}

/// Reinterprets one heap node from a "list used as code" run as a token
///: a nested list becomes a list-literal token outright; an atom's
/// raw text is re-read the same way the lexer would read it fresh, since
/// list literals store each element's *original* source spelling, prefix
/// characters included (`"foo`, `:bar`, `+`, ...).
fn retokenize(heap: &Heap, interns: &mut Interner, id: NodeId) -> Tok {
    if id.is_nil() || id.is_cons() {
        return Tok::ListLiteral(id);
    }
    let text = interns.get(heap.atom_id(id)).to_owned();
    if let Some(rest) = text.strip_prefix('"') {
        return Tok::QuotedWord(interns.intern(rest));
    }
    if let Some(rest) = text.strip_prefix(':') {
        return Tok::ColonName(interns.intern(rest));
    }
    if let Some(n) = parse_number(&text) {
        return Tok::Number(n);
    }
    if let Some(op) = operator_token(&text) {
        return op;
    }
    Tok::Word(interns.intern(&text))
}

/// Walks a list's elements as a token stream, for "list as code" contexts:
/// `run`/`if`/`repeat`'s body argument, and procedure lines.
pub struct ListSource {
    stream: TokenStream,
}

impl ListSource {
    #[must_use]
    pub fn new(heap: &Heap, interns: &mut Interner, list: NodeId) -> Self {
        let items = heap.list_items(list);
        let mut tokens: Vec<Tok> = items.iter().map(|&id| retokenize(heap, interns, id)).collect();
        tokens.push(Tok::Eof);
        Self { stream: TokenStream { tokens, pos: 0 } }
    }
}

impl TokenSource for ListSource {
    fn peek(&mut self) -> Tok {
        self.stream.peek()
    }

    fn advance(&mut self) -> Tok {
        self.stream.advance()
    }

    fn save(&self) -> SourcePos {
        self.stream.pos
    }

    fn restore(&mut self, pos: SourcePos) {
        self.stream.pos = pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexer_source_interns_words_and_numbers() {
        let mut interns = Interner::new();
        let mut src = LexerSource::new("forward 100", &mut interns).unwrap();
        let forward = match src.advance() {
            Tok::Word(id) => id,
            other => panic!("expected Word, got {other:?}"),
        };
        assert_eq!(interns.get(forward), "forward");
        assert_eq!(src.advance(), Tok::Number(100.0));
        assert_eq!(src.advance(), Tok::Eof);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut interns = Interner::new();
        let mut src = LexerSource::new("fd 1", &mut interns).unwrap();
        let first = src.peek();
        assert_eq!(src.peek(), first);
        let advanced = src.advance();
        assert_eq!(advanced, first);
    }

    #[test]
    fn list_source_reinterprets_prefixed_atoms() {
        let mut heap = Heap::new();
        let mut interns = Interner::new();
        let quoted = heap.alloc_atom(interns.intern("\"foo"));
        let colon = heap.alloc_atom(interns.intern(":bar"));
        let plus = heap.alloc_atom(interns.intern("+"));
        let list = heap.build_list([quoted, colon, plus].into_iter());

        let mut src = ListSource::new(&heap, &mut interns, list);
        match src.advance() {
            Tok::QuotedWord(id) => assert_eq!(interns.get(id), "foo"),
            other => panic!("expected QuotedWord, got {other:?}"),
        }
        match src.advance() {
            Tok::ColonName(id) => assert_eq!(interns.get(id), "bar"),
            other => panic!("expected ColonName, got {other:?}"),
        }
        assert_eq!(src.advance(), Tok::Plus);
        assert_eq!(src.advance(), Tok::Eof);
    }

    #[test]
    fn list_source_surfaces_nested_lists_as_literal_tokens() {
        let mut heap = Heap::new();
        let mut interns = Interner::new();
        let inner = heap.build_list(std::iter::empty());
        let a = heap.alloc_atom(interns.intern("a"));
        let outer = heap.build_list([a, inner].into_iter());

        let mut src = ListSource::new(&heap, &mut interns, outer);
        assert!(matches!(src.advance(), Tok::Word(_)));
        assert_eq!(src.advance(), Tok::ListLiteral(inner));
    }
}
