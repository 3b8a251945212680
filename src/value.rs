//! The value model and evaluator control-flow carrier.

use std::fmt::Write as _;

use crate::{
    error::LogoError,
    heap::{Heap, NodeId},
    intern::{Interner, StringId},
};

/// A Logo value.
///
/// `Word` and `List` are handles into the shared heap; `None` and `Number`
/// are immediate. There is no separate boolean type — `true`/`false` are
/// ordinary words, tested for via [`Value::as_bool`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    /// A command's absence of output.
    None,
    /// A finite 32-bit float. NaN/Inf are rejected at construction time.
    Number(f32),
    /// An atom reference.
    Word(NodeId),
    /// A cons-or-NIL reference. `List(NodeId::NIL)` is the empty list.
    List(NodeId),
}

impl Value {
    /// Constructs a `Number`, rejecting non-finite floats.
    pub fn number(n: f32) -> Result<Self, LogoError> {
        if n.is_finite() {
            Ok(Self::Number(n))
        } else {
            Err(LogoError::doesnt_like(format_float(n)))
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    #[must_use]
    pub fn is_word(&self) -> bool {
        matches!(self, Self::Word(_) | Self::Number(_))
    }

    /// "Truthy as boolean": only the words `true`/`false`
    /// (case-insensitive) qualify; everything else is a type error.
    pub fn as_bool(&self, heap: &Heap, interns: &Interner) -> Result<bool, LogoError> {
        if let Self::Word(id) = self {
            let text = interns.get(heap.atom_id(*id));
            if text.eq_ignore_ascii_case("true") {
                return Ok(true);
            }
            if text.eq_ignore_ascii_case("false") {
                return Ok(false);
            }
        }
        Err(LogoError::not_bool(self.display(heap, interns)))
    }

    /// Coerces to a number: numeric values pass through; words whose full
    /// text parses as a float are converted.
    pub fn as_number(&self, heap: &Heap, interns: &Interner) -> Result<f32, LogoError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Word(id) => {
                let text = interns.get(heap.atom_id(*id));
                parse_number(text).ok_or_else(|| LogoError::doesnt_like(text.to_owned()))
            }
            Self::List(_) => Err(LogoError::doesnt_like(self.display(heap, interns))),
            Self::None => Err(LogoError::doesnt_like("nothing".to_owned())),
        }
    }

    /// Renders this value the way `print`/error messages show it.
    ///
    /// Numbers use `ryu` for fast, round-trip-exact float-to-text
    /// conversion, then trim a trailing `.0` from whole numbers so integers
    /// print without a decimal point.
    #[must_use]
    pub fn display(&self, heap: &Heap, interns: &Interner) -> String {
        match self {
            Self::None => String::new(),
            Self::Number(n) => format_float(*n),
            Self::Word(id) => interns.get(heap.atom_id(*id)).to_owned(),
            Self::List(id) => {
                let mut out = String::from("[");
                display_list_items(*id, heap, interns, &mut out);
                out.push(']');
                out
            }
        }
    }
}

fn display_list_items(mut id: NodeId, heap: &Heap, interns: &Interner, out: &mut String) {
    let mut first = true;
    while id.is_cons() {
        let (car, cdr) = heap.cons(id);
        if !first {
            out.push(' ');
        }
        first = false;
        if car.is_cons() || car.is_nil() {
            out.push('[');
            display_list_items(car, heap, interns, out);
            out.push(']');
        } else {
            let _ = write!(out, "{}", interns.get(heap.atom_id(car)));
        }
        id = cdr;
    }
}

/// Formats a finite float the way Logo source expects to read it back:
/// integral values print without a decimal point, everything else uses the
/// shortest round-tripping representation.
#[must_use]
pub fn format_float(n: f32) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        let mut buf = ryu::Buffer::new();
        buf.format(n).trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

/// Parses Logo numeric literal/word syntax: `(-|+)?[0-9]+(.[0-9]+)?([eE][+-]?[0-9]+)?`.
/// The whole string must match (no trailing garbage), per the lexer's number
/// rule applying equally to word-to-number coercion.
#[must_use]
pub fn parse_number(text: &str) -> Option<f32> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let mut i = 0;
    if bytes[i] == b'+' || bytes[i] == b'-' {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return None;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }
    if i != bytes.len() {
        return None;
    }
    text.parse::<f32>().ok().filter(|n: &f32| n.is_finite())
}

/// Non-local control transfer carried out of band from `Result::Err`
///. `eval_expression` only ever produces `Throw`/`Error` on the
/// error path (its success path is a plain `Value`); `eval_instruction`
/// additionally uses `Stop`/`Output` on its error path (its success path
/// carries no value — the NONE status).
#[derive(Debug, Clone)]
pub enum Flow {
    /// A `stop` inside a procedure body.
    Stop,
    /// An `output`/expression-form result.
    Output(Value),
    /// A `throw` with the given tag atom.
    Throw(StringId),
    /// A language-level error.
    Error(Box<LogoError>),
}

impl From<LogoError> for Flow {
    fn from(err: LogoError) -> Self {
        Self::Error(Box::new(err))
    }
}

/// Result type for `eval_instruction`: `Ok(())` is the NONE status; the
/// abnormal statuses (`STOP`, `OUTPUT`, `THROW`, `ERROR`) are carried by `Flow`.
pub type InstrResult = Result<(), Flow>;

/// Result type for `eval_expression`: `Ok(value)` is the OK status; `THROW`
/// and `ERROR` are carried by `Flow` (an expression can never itself
/// produce `Stop` — see `evaluator::eval_expression` for how a `Flow::Stop`
/// bubbling up from a sub-evaluation is turned into an error).
pub type ExprResult = Result<Value, Flow>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trips_integers_exactly() {
        for n in [0.0_f32, 1.0, -5.0, 1000.0] {
            let text = format_float(n);
            let parsed = parse_number(&text).unwrap();
            assert_eq!(parsed, n);
        }
    }

    #[test]
    fn number_round_trips_within_tolerance() {
        let n = 3.25_f32;
        let text = format_float(n);
        let parsed = parse_number(&text).unwrap();
        assert!((parsed - n).abs() < 1e-6);
    }

    #[test]
    fn rejects_non_finite() {
        assert!(Value::number(f32::NAN).is_err());
        assert!(Value::number(f32::INFINITY).is_err());
        assert!(Value::number(1.0).is_ok());
    }

    #[test]
    fn unary_minus_text_is_not_a_bare_number() {
        assert_eq!(parse_number("-5"), Some(-5.0));
        assert_eq!(parse_number("5-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("--5"), None);
    }
}
