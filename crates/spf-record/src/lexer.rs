//! Lexical decomposition of record terms.
//!
//! The lexer splits a raw record into whitespace-delimited terms and takes
//! each term apart into qualifier, name, separator, value and trailing CIDR
//! suffix. It is purely lexical: macro letters and CIDR numerics are not
//! interpreted here.

use crate::error::DiagnosticKind;
use crate::record::Qualifier;

/// How a term's name was separated from its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    /// `:` — mechanism payload.
    Colon,
    /// `=` — modifier payload.
    Equals,
}

/// One whitespace-delimited term, decomposed lexically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Term<'a> {
    /// Explicit qualifier character, if any.
    pub qualifier: Option<Qualifier>,
    /// The mechanism or modifier name.
    pub name: &'a str,
    /// The separator between name and value, if any.
    pub separator: Option<Separator>,
    /// The payload after the separator, CIDR suffix excluded. May be empty.
    pub value: Option<&'a str>,
    /// The trailing CIDR suffix including its leading slash(es), e.g.
    /// `/24`, `//64` or `/24//64`. Uninterpreted.
    pub cidr: Option<&'a str>,
    /// The whole term as written.
    pub raw: &'a str,
}

impl<'a> Term<'a> {
    /// Decomposes a single term.
    ///
    /// Fails only on structurally malformed terms: an empty name after the
    /// qualifier, or a term that is nothing but separators.
    pub(crate) fn parse(raw: &'a str) -> Result<Self, DiagnosticKind> {
        let mut rest = raw;
        let qualifier = rest.chars().next().and_then(Qualifier::from_char);
        if qualifier.is_some() {
            rest = &rest[1..];
        }

        let split = rest
            .char_indices()
            .find(|&(_, c)| matches!(c, ':' | '=' | '/'));

        let term = match split {
            None => Self {
                qualifier,
                name: rest,
                separator: None,
                value: None,
                cidr: None,
                raw,
            },
            Some((at, ':')) => {
                let (value, cidr) = split_trailing_cidr(&rest[at + 1..]);
                Self {
                    qualifier,
                    name: &rest[..at],
                    separator: Some(Separator::Colon),
                    value: Some(value),
                    cidr,
                    raw,
                }
            }
            // Modifier values keep everything after `=` verbatim: the
            // grammar forbids CIDR there and `/` is a legal literal.
            Some((at, '=')) => Self {
                qualifier,
                name: &rest[..at],
                separator: Some(Separator::Equals),
                value: Some(&rest[at + 1..]),
                cidr: None,
                raw,
            },
            Some((at, _)) => Self {
                qualifier,
                name: &rest[..at],
                separator: None,
                value: None,
                cidr: Some(&rest[at..]),
                raw,
            },
        };

        if term.name.is_empty() {
            return Err(DiagnosticKind::UnknownMechanism(raw.to_string()));
        }
        Ok(term)
    }
}

/// Splits the raw record into terms on ASCII whitespace runs, decomposing
/// each. Empty terms are dropped; malformed ones are kept as diagnostics so
/// the compiler can accumulate and continue.
pub(crate) fn tokenize(raw: &str) -> Vec<Result<Term<'_>, DiagnosticKind>> {
    raw.split_ascii_whitespace().map(Term::parse).collect()
}

/// Splits the maximal trailing CIDR suffix (`/digits`, `//digits` or
/// `/digits//digits`) off a value, purely lexically.
fn split_trailing_cidr(s: &str) -> (&str, Option<&str>) {
    // Index of a '/' starting a trailing all-digit run, if any.
    fn trailing_slash_digits(s: &str) -> Option<usize> {
        let at = s.rfind('/')?;
        let digits = &s[at + 1..];
        (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(at)
    }

    let Some(at) = trailing_slash_digits(s) else {
        return (s, None);
    };
    let mut start = at;
    if start > 0 && s.as_bytes()[start - 1] == b'/' {
        // `//v6` form; check for a preceding `/v4`.
        start -= 1;
        if let Some(v4_at) = trailing_slash_digits(&s[..start]) {
            start = v4_at;
        }
    }
    (&s[..start], Some(&s[start..]))
}
