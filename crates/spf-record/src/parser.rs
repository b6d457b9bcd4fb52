//! The grammar validator: compiles a raw record string into a validated
//! [`Record`], accumulating diagnostics across the whole term stream.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::domain_spec::{DataToken, DomainSpec};
use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::lexer::{self, Separator, Term};
use crate::record::{CidrLength, Mechanism, MechanismKind, Modifier, ModifierName, Record};

/// A successfully compiled record together with any warnings recorded
/// while scanning it. Warnings never block compilation; whether they block
/// *use* of the record is the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// The validated record.
    pub record: Record,
    /// Warning-severity diagnostics, in encounter order.
    pub warnings: Vec<Diagnostic>,
}

/// Per-record state the validator tracks while scanning terms.
#[derive(Debug, Default)]
struct Scan {
    seen_all: bool,
    seen_redirect: bool,
    seen_exp: bool,
}

/// Compiles a raw SPF record. See [`Record::compile`].
pub(crate) fn compile(raw: &str) -> Result<Compiled> {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut record = Record {
        mechanisms: Vec::new(),
        modifiers: Vec::new(),
    };
    let mut scan = Scan::default();

    let mut terms = lexer::tokenize(raw).into_iter();

    // The first term must lexically equal the version marker.
    match terms.next() {
        Some(Ok(term)) if term.raw == Record::VERSION => {}
        Some(Ok(term)) => diagnostics.push(Diagnostic::error(
            DiagnosticKind::MissingVersionPrefix(term.raw.to_string()),
        )),
        Some(Err(DiagnosticKind::UnknownMechanism(term))) => diagnostics.push(Diagnostic::error(
            DiagnosticKind::MissingVersionPrefix(term),
        )),
        Some(Err(kind)) => diagnostics.push(Diagnostic::error(kind)),
        None => diagnostics.push(Diagnostic::error(DiagnosticKind::MissingVersionPrefix(
            "(empty record)".to_string(),
        ))),
    }

    for item in terms {
        let term = match item {
            Ok(term) => term,
            Err(kind) => {
                diagnostics.push(Diagnostic::error(kind));
                continue;
            }
        };
        tracing::trace!(term = term.raw, "Scanning term");

        match MechanismKind::from_name(term.name) {
            Some(kind) if term.separator != Some(Separator::Equals) => {
                if let Some(mechanism) = compile_mechanism(kind, &term, &mut diagnostics) {
                    if scan.seen_all {
                        diagnostics.push(Diagnostic::warning(
                            DiagnosticKind::UnreachableMechanism(kind.name().to_string()),
                        ));
                    }
                    if kind == MechanismKind::All {
                        scan.seen_all = true;
                    }
                    record.mechanisms.push(mechanism);
                }
            }
            Some(kind) => diagnostics.push(Diagnostic::error(
                DiagnosticKind::InvalidMechanismData {
                    mechanism: kind.name().to_string(),
                    detail: "mechanisms take their data after ':', not '='".to_string(),
                },
            )),
            None if term.separator == Some(Separator::Equals) && term.qualifier.is_none() => {
                if let Some(modifier) = compile_modifier(&term, &mut scan, &mut diagnostics) {
                    record.modifiers.push(modifier);
                }
            }
            None => diagnostics.push(Diagnostic::error(DiagnosticKind::UnknownMechanism(
                term.raw.to_string(),
            ))),
        }
    }

    if diagnostics.iter().all(|d| !d.is_error()) {
        tracing::debug!(
            mechanisms = record.mechanisms.len(),
            modifiers = record.modifiers.len(),
            warnings = diagnostics.len(),
            "Compiled SPF record"
        );
        Ok(Compiled {
            record,
            warnings: diagnostics,
        })
    } else {
        tracing::debug!(diagnostics = diagnostics.len(), "SPF record failed to compile");
        Err(Error::Compile(diagnostics))
    }
}

/// Applies the per-kind structural checks and builds a mechanism.
/// Returns `None` after pushing error diagnostics.
fn compile_mechanism(
    kind: MechanismKind,
    term: &Term<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Mechanism> {
    let shape = kind.shape();
    let invalid = |detail: String| {
        Diagnostic::error(DiagnosticKind::InvalidMechanismData {
            mechanism: kind.name().to_string(),
            detail,
        })
    };

    if !shape.allows_domain_spec && !shape.takes_address {
        // `all` rejects any payload at all.
        if term.separator.is_some() || term.cidr.is_some() {
            diagnostics.push(invalid("takes no data".to_string()));
            return None;
        }
        return Some(Mechanism::new(term.qualifier.unwrap_or_default(), kind));
    }

    if shape.takes_address {
        return compile_address_mechanism(kind, term, diagnostics);
    }

    // Domain-spec kinds: a, mx, ptr, include, exists.
    let mut mechanism = Mechanism::new(term.qualifier.unwrap_or_default(), kind);

    match term.value {
        Some(value) if !value.is_empty() => match DomainSpec::parse(value) {
            Ok(spec) => {
                // Any well-formed prefix was split off by the lexer, so a
                // '/' left in literal text is a malformed one. Inside a
                // macro body, '/' is a plain delimiter character.
                if shape.allows_cidr
                    && spec.tokens().iter().any(|token| {
                        matches!(token, DataToken::Literal(text) if text.contains('/'))
                    })
                {
                    diagnostics.push(invalid(format!("malformed prefix length in \"{value}\"")));
                    return None;
                }
                mechanism.domain_spec = Some(spec);
            }
            Err(kind) => {
                diagnostics.push(Diagnostic::error(kind));
                return None;
            }
        },
        _ => {
            if matches!(
                kind,
                MechanismKind::Include | MechanismKind::Exists | MechanismKind::Ptr
            ) {
                diagnostics.push(Diagnostic::warning(DiagnosticKind::MissingDomainSpec(
                    kind.name().to_string(),
                )));
            }
        }
    }

    if let Some(suffix) = term.cidr {
        if !shape.allows_cidr {
            diagnostics.push(invalid("does not take a prefix length".to_string()));
            return None;
        }
        match parse_dual_prefix(suffix) {
            Ok(cidr) => mechanism.cidr = cidr,
            Err(detail) => {
                diagnostics.push(invalid(detail));
                return None;
            }
        }
    }

    Some(mechanism)
}

/// Builds an `ip4`/`ip6` mechanism: a literal address of the matching
/// family plus an optional single-family prefix length.
fn compile_address_mechanism(
    kind: MechanismKind,
    term: &Term<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Mechanism> {
    let invalid = |detail: String| {
        Diagnostic::error(DiagnosticKind::InvalidMechanismData {
            mechanism: kind.name().to_string(),
            detail,
        })
    };

    let value = match term.value {
        Some(value) if !value.is_empty() => value,
        _ => {
            diagnostics.push(invalid("requires an address".to_string()));
            return None;
        }
    };

    let address = match kind {
        MechanismKind::Ip4 => match value.parse::<Ipv4Addr>() {
            Ok(addr) => IpAddr::V4(addr),
            Err(_) => {
                diagnostics.push(invalid(format!("\"{value}\" is not an IPv4 address")));
                return None;
            }
        },
        _ => match value.parse::<Ipv6Addr>() {
            Ok(addr) => IpAddr::V6(addr),
            Err(_) => {
                diagnostics.push(invalid(format!("\"{value}\" is not an IPv6 address")));
                return None;
            }
        },
    };

    let max = if kind == MechanismKind::Ip4 { 32 } else { 128 };
    let cidr = match term.cidr {
        None => None,
        Some(suffix) => match parse_single_prefix(suffix, max) {
            Ok(None) => None,
            Ok(Some(len)) => {
                if kind == MechanismKind::Ip4 {
                    Some(CidrLength::new(Some(len), None))
                } else {
                    Some(CidrLength::new(None, Some(len)))
                }
            }
            Err(detail) => {
                diagnostics.push(invalid(detail));
                return None;
            }
        },
    };

    let mut mechanism = Mechanism::new(term.qualifier.unwrap_or_default(), kind);
    mechanism.address = Some(address);
    mechanism.cidr = cidr;
    Some(mechanism)
}

/// Compiles a modifier term, tracking `redirect`/`exp` duplicates.
fn compile_modifier(
    term: &Term<'_>,
    scan: &mut Scan,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Modifier> {
    let value = term.value.unwrap_or_default();

    let name = match term.name.to_ascii_lowercase().as_str() {
        known @ ("redirect" | "exp") => {
            let seen = if known == "redirect" {
                &mut scan.seen_redirect
            } else {
                &mut scan.seen_exp
            };
            if *seen {
                diagnostics.push(Diagnostic::error(DiagnosticKind::DuplicateModifier(
                    known.to_string(),
                )));
                return None;
            }
            *seen = true;
            if value.is_empty() {
                diagnostics.push(Diagnostic::error(DiagnosticKind::MalformedModifierData {
                    modifier: known.to_string(),
                    detail: "requires a domain-spec".to_string(),
                }));
                return None;
            }
            if known == "redirect" {
                ModifierName::Redirect
            } else {
                ModifierName::Exp
            }
        }
        _ => {
            if !is_valid_modifier_name(term.name) {
                diagnostics.push(Diagnostic::error(DiagnosticKind::MalformedModifierData {
                    modifier: term.name.to_string(),
                    detail: "invalid modifier name".to_string(),
                }));
                return None;
            }
            ModifierName::Other(term.name.to_string())
        }
    };

    match DomainSpec::parse(value) {
        Ok(data) => Some(Modifier { name, data }),
        Err(kind) => {
            diagnostics.push(Diagnostic::error(kind));
            None
        }
    }
}

/// `name = ALPHA *( ALPHA / DIGIT / "-" / "_" / "." )`
fn is_valid_modifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Parses a single-family prefix suffix (`/N`) for `ip4`/`ip6`.
/// A full-length prefix normalizes to `None`.
fn parse_single_prefix(suffix: &str, max: u32) -> std::result::Result<Option<u8>, String> {
    let digits = suffix
        .strip_prefix('/')
        .filter(|rest| !rest.contains('/'))
        .ok_or_else(|| format!("malformed prefix length \"{suffix}\""))?;
    let len = parse_prefix_len(digits, max)?;
    Ok((u32::from(len) != max).then_some(len))
}

/// Parses a dual-family prefix suffix for `a`/`mx`: `/v4`, `//v6` or
/// `/v4//v6`. Family-default lengths normalize away; a suffix carrying
/// only defaults yields `None`.
fn parse_dual_prefix(suffix: &str) -> std::result::Result<Option<CidrLength>, String> {
    let malformed = || format!("malformed prefix length \"{suffix}\"");

    let (v4, v6) = if let Some(v6_digits) = suffix.strip_prefix("//") {
        (None, Some(parse_prefix_len(v6_digits, 128)?))
    } else {
        let rest = suffix.strip_prefix('/').ok_or_else(malformed)?;
        if let Some((v4_digits, v6_digits)) = rest.split_once("//") {
            (
                Some(parse_prefix_len(v4_digits, 32)?),
                Some(parse_prefix_len(v6_digits, 128)?),
            )
        } else {
            if rest.contains('/') {
                return Err(malformed());
            }
            (Some(parse_prefix_len(rest, 32)?), None)
        }
    };

    let cidr = CidrLength::new(
        v4.filter(|&len| len != 32),
        v6.filter(|&len| len != 128),
    );
    Ok((!cidr.is_empty()).then_some(cidr))
}

/// Parses one prefix-length component and checks its family bound.
fn parse_prefix_len(digits: &str, max: u32) -> std::result::Result<u8, String> {
    let out_of_range = || format!("prefix length \"{digits}\" out of range (0-{max})");
    let len: u32 = digits.parse().map_err(|_| out_of_range())?;
    if len > max {
        return Err(out_of_range());
    }
    u8::try_from(len).map_err(|_| out_of_range())
}
