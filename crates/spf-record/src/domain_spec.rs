//! Domain-spec macro strings.
//!
//! A domain-spec is the textual payload of mechanisms like `include:` and of
//! modifiers like `redirect=`. It may contain macro-expansion tokens
//! (`%{d}`, `%{ir}.%{v}.arpa`, ...) which this crate stores verbatim and
//! never expands; expansion happens in a separate evaluation phase.

use std::fmt;

use crate::error::DiagnosticKind;
use crate::record::CidrLength;

/// Macro letters defined by RFC 7208 section 7.1, including the
/// explanation-only letters `c`, `r` and `t`.
const MACRO_LETTERS: &str = "slodipvhcrt";

/// Delimiter characters allowed inside a macro expression.
const MACRO_DELIMITERS: &str = ".-+,/_=";

/// One token of a mechanism's or modifier's data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataToken {
    /// A literal substring, stored verbatim. The fixed escapes `%%`, `%_`
    /// and `%-` stay unexpanded inside literals so re-rendering is lossless.
    Literal(String),
    /// A macro-expansion token in `%{...}` form.
    Macro(MacroToken),
    /// A trailing CIDR prefix-length pair. Never part of a [`DomainSpec`];
    /// it only appears in the full data-token sequence of an `a`/`mx`
    /// mechanism handed to the renderer.
    Cidr(CidrLength),
}

/// A single `%{...}` macro expression, stored losslessly.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MacroToken {
    /// The macro letter, lowercased.
    pub letter: char,
    /// True if the letter was uppercase (URL-escaped expansion).
    pub url_escape: bool,
    /// Transformer digits exactly as written, empty when absent. See
    /// [`MacroToken::keep`] for the numeric view.
    pub digits: String,
    /// True if the `r` reversal transformer was given.
    pub reverse: bool,
    /// Delimiter set, empty for the default `.`.
    pub delimiters: String,
}

impl MacroToken {
    /// Numeric view of the transformer digits: keep the rightmost N labels
    /// when expanding (0 means all). `None` when no digits were written.
    #[must_use]
    pub fn keep(&self) -> Option<u32> {
        self.digits.parse().ok()
    }
}

impl fmt::Display for MacroToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%{")?;
        let letter = if self.url_escape {
            self.letter.to_ascii_uppercase()
        } else {
            self.letter
        };
        write!(f, "{letter}")?;
        f.write_str(&self.digits)?;
        if self.reverse {
            f.write_str("r")?;
        }
        f.write_str(&self.delimiters)?;
        f.write_str("}")
    }
}

/// An ordered sequence of literal and macro tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DomainSpec {
    tokens: Vec<DataToken>,
}

impl DomainSpec {
    /// Tokenizes a raw domain-spec string into literal and macro tokens.
    ///
    /// A `%` must start one of `%%`, `%_`, `%-` or a `%{...}` macro
    /// expression with a known letter, optional digits, optional `r` flag
    /// and optional delimiter set; anything else is an invalid macro
    /// sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DiagnosticKind::InvalidMacroSequence`] on a malformed `%`
    /// sequence.
    pub fn parse(raw: &str) -> Result<Self, DiagnosticKind> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices();

        while let Some((pos, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some((_, escape @ ('%' | '_' | '-'))) => {
                    literal.push('%');
                    literal.push(escape);
                }
                Some((body_start, '{')) => {
                    if !literal.is_empty() {
                        tokens.push(DataToken::Literal(std::mem::take(&mut literal)));
                    }
                    let rest = &raw[body_start + 1..];
                    let body_len = rest.find('}').ok_or_else(|| {
                        DiagnosticKind::InvalidMacroSequence(format!(
                            "unterminated macro expression in \"{raw}\""
                        ))
                    })?;
                    tokens.push(DataToken::Macro(parse_macro_body(&rest[..body_len])?));
                    // Skip past the body and the closing brace.
                    for _ in 0..=body_len {
                        chars.next();
                    }
                }
                _ => {
                    return Err(DiagnosticKind::InvalidMacroSequence(format!(
                        "stray % at offset {pos} in \"{raw}\""
                    )));
                }
            }
        }

        if !literal.is_empty() {
            tokens.push(DataToken::Literal(literal));
        }
        Ok(Self { tokens })
    }

    /// Returns the token sequence.
    #[must_use]
    pub fn tokens(&self) -> &[DataToken] {
        &self.tokens
    }

    /// Returns true if the domain-spec holds no tokens at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for DomainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            match token {
                DataToken::Literal(text) => f.write_str(text)?,
                DataToken::Macro(m) => write!(f, "{m}")?,
                // A DomainSpec never holds a Cidr token (enforced by parse).
                DataToken::Cidr(_) => return Err(fmt::Error),
            }
        }
        Ok(())
    }
}

/// Parses the inside of a `%{...}` expression:
/// `<letter>[<digits>][r][<delimiters>]`.
fn parse_macro_body(body: &str) -> Result<MacroToken, DiagnosticKind> {
    let mut chars = body.chars().peekable();
    let letter = chars.next().ok_or_else(|| {
        DiagnosticKind::InvalidMacroSequence("empty macro expression %{}".into())
    })?;
    let lowered = letter.to_ascii_lowercase();
    if !MACRO_LETTERS.contains(lowered) {
        return Err(DiagnosticKind::InvalidMacroSequence(format!(
            "unknown macro letter '{letter}'"
        )));
    }

    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if !digits.is_empty() && digits.parse::<u32>().is_err() {
        return Err(DiagnosticKind::InvalidMacroSequence(format!(
            "transformer digits \"{digits}\" out of range"
        )));
    }

    let reverse = matches!(chars.peek(), Some('r' | 'R'));
    if reverse {
        chars.next();
    }

    let delimiters: String = chars.collect();
    if let Some(bad) = delimiters.chars().find(|c| !MACRO_DELIMITERS.contains(*c)) {
        return Err(DiagnosticKind::InvalidMacroSequence(format!(
            "'{bad}' is not a valid macro delimiter"
        )));
    }

    Ok(MacroToken {
        letter: lowered,
        url_escape: letter.is_ascii_uppercase(),
        digits,
        reverse,
        delimiters,
    })
}
