//! Error and diagnostic types for SPF record compilation.

use std::fmt;

/// Result type alias for SPF record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SPF record error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The record failed to compile. Carries every diagnostic collected
    /// while scanning the record, warnings included; at least one has
    /// [`Severity::Error`].
    #[error("SPF record failed to compile with {} diagnostic(s)", .0.len())]
    Compile(Vec<Diagnostic>),

    /// Internal consistency fault: the renderer was handed data that cannot
    /// come out of a successful compile (e.g. a hand-built token sequence
    /// with a CIDR token in modifier data). This is a programming error,
    /// not a recoverable data error.
    #[error("Internal consistency error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns the diagnostics of a failed compile, or an empty slice for
    /// other error variants.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Compile(diags) => diags,
            Self::Internal(_) => &[],
        }
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// The record cannot be used; compilation fails.
    Error,
    /// The record compiles, but something is questionable.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("Error"),
            Self::Warning => f.write_str("Warning"),
        }
    }
}

/// What a [`Diagnostic`] is about.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiagnosticKind {
    /// The record does not begin with the literal `v=spf1` version term.
    #[error("record does not begin with \"v=spf1\": {0}")]
    MissingVersionPrefix(String),

    /// A term matched neither a mechanism name nor a modifier shape.
    #[error("unknown mechanism: {0}")]
    UnknownMechanism(String),

    /// Mechanism data violated its kind's grammar shape (malformed address,
    /// out-of-range prefix length, data on a no-data mechanism, ...).
    #[error("invalid {mechanism} mechanism: {detail}")]
    InvalidMechanismData {
        /// Name of the offending mechanism.
        mechanism: String,
        /// What was wrong with its data.
        detail: String,
    },

    /// A `%` in a domain-spec started none of `%%`, `%_`, `%-`, `%{...}`.
    #[error("invalid macro sequence: {0}")]
    InvalidMacroSequence(String),

    /// A `redirect` or `exp` modifier appeared more than once.
    #[error("duplicate {0} modifier")]
    DuplicateModifier(String),

    /// A modifier's data did not satisfy its grammar.
    #[error("malformed {modifier} modifier: {detail}")]
    MalformedModifierData {
        /// Name of the offending modifier.
        modifier: String,
        /// What was wrong with its data.
        detail: String,
    },

    /// A mechanism that conventionally takes a domain-spec was given none.
    /// Warning-only: permissive real-world records rely on this.
    #[error("{0} used without a domain-spec")]
    MissingDomainSpec(String),

    /// A mechanism follows `all` and can never be evaluated under
    /// first-match semantics. Warning-only.
    #[error("mechanism \"{0}\" follows \"all\" and is unreachable")]
    UnreachableMechanism(String),
}

/// A single problem found while compiling a record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// Whether this blocks use of the record.
    pub severity: Severity,
    /// What the problem is.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Creates an error-severity diagnostic.
    #[must_use]
    pub const fn error(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Error,
            kind,
        }
    }

    /// Creates a warning-severity diagnostic.
    #[must_use]
    pub const fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
        }
    }

    /// Returns true if this diagnostic blocks compilation.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(DiagnosticKind::UnknownMechanism("foo".into()));
        assert_eq!(diag.to_string(), "Error: unknown mechanism: foo");
        assert!(diag.is_error());
    }

    #[test]
    fn test_warning_display() {
        let diag = Diagnostic::warning(DiagnosticKind::MissingDomainSpec("include".into()));
        assert_eq!(diag.to_string(), "Warning: include used without a domain-spec");
        assert!(!diag.is_error());
    }

    #[test]
    fn test_error_diagnostics_accessor() {
        let err = Error::Compile(vec![Diagnostic::error(DiagnosticKind::MissingVersionPrefix(
            "spf1".into(),
        ))]);
        assert_eq!(err.diagnostics().len(), 1);

        let err = Error::Internal("oops".into());
        assert!(err.diagnostics().is_empty());
    }

    #[test]
    fn test_duplicate_modifier_message() {
        let kind = DiagnosticKind::DuplicateModifier("redirect".into());
        assert_eq!(kind.to_string(), "duplicate redirect modifier");
    }
}
