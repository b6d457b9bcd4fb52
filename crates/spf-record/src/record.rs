//! The compiled SPF record data model.
//!
//! Everything here is immutable once compiled and owned solely by the
//! compile call's result; the engine keeps no state between calls.

use std::fmt;
use std::net::IpAddr;

use crate::domain_spec::{DataToken, DomainSpec};
use crate::error::Result;
use crate::parser::{self, Compiled};
use crate::render;

/// The qualifier prefix of a mechanism, controlling the outcome when the
/// mechanism matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Qualifier {
    /// `+` (the default when no qualifier is written).
    #[default]
    Pass,
    /// `-`
    Fail,
    /// `~`
    SoftFail,
    /// `?`
    Neutral,
}

impl Qualifier {
    /// Maps a qualifier character to its variant.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Pass),
            '-' => Some(Self::Fail),
            '~' => Some(Self::SoftFail),
            '?' => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Returns the qualifier character.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Pass => '+',
            Self::Fail => '-',
            Self::SoftFail => '~',
            Self::Neutral => '?',
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// The fixed set of SPF mechanism kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MechanismKind {
    /// `all`
    All,
    /// `include`
    Include,
    /// `a`
    A,
    /// `mx`
    Mx,
    /// `ptr`
    Ptr,
    /// `ip4`
    Ip4,
    /// `ip6`
    Ip6,
    /// `exists`
    Exists,
}

/// The grammar shape of a mechanism kind. Adding a vendor mechanism is a
/// data change in [`MechanismKind::shape`], not a new code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MechanismShape {
    /// The mechanism may carry a domain-spec payload.
    pub allows_domain_spec: bool,
    /// The mechanism may carry a CIDR prefix-length suffix.
    pub allows_cidr: bool,
    /// The mechanism carries a literal IP address instead of a domain-spec.
    pub takes_address: bool,
}

impl MechanismKind {
    /// Matches a mechanism name case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "include" => Some(Self::Include),
            "a" => Some(Self::A),
            "mx" => Some(Self::Mx),
            "ptr" => Some(Self::Ptr),
            "ip4" => Some(Self::Ip4),
            "ip6" => Some(Self::Ip6),
            "exists" => Some(Self::Exists),
            _ => None,
        }
    }

    /// Returns the canonical (lowercase) mechanism name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Include => "include",
            Self::A => "a",
            Self::Mx => "mx",
            Self::Ptr => "ptr",
            Self::Ip4 => "ip4",
            Self::Ip6 => "ip6",
            Self::Exists => "exists",
        }
    }

    /// Returns the grammar shape of this kind.
    #[must_use]
    pub const fn shape(self) -> MechanismShape {
        const fn shape(
            allows_domain_spec: bool,
            allows_cidr: bool,
            takes_address: bool,
        ) -> MechanismShape {
            MechanismShape {
                allows_domain_spec,
                allows_cidr,
                takes_address,
            }
        }
        match self {
            Self::All => shape(false, false, false),
            Self::Include | Self::Ptr | Self::Exists => shape(true, false, false),
            Self::A | Self::Mx => shape(true, true, false),
            Self::Ip4 | Self::Ip6 => shape(false, true, true),
        }
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An optional pair of CIDR prefix lengths, one per address family.
///
/// Absence of a component means "use the full address length implicitly";
/// the compiler normalizes explicit full-length prefixes (`/32`, `//128`)
/// to absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CidrLength {
    /// IPv4 prefix length, 0..=32.
    pub v4: Option<u8>,
    /// IPv6 prefix length, 0..=128.
    pub v6: Option<u8>,
}

impl CidrLength {
    /// Creates a pair from its components.
    #[must_use]
    pub const fn new(v4: Option<u8>, v6: Option<u8>) -> Self {
        Self { v4, v6 }
    }

    /// Returns true if neither family carries an explicit length.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }
}

impl fmt::Display for CidrLength {
    /// Renders the dual-CIDR suffix form used by `a` and `mx`:
    /// `/v4`, `//v6` or `/v4//v6`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v4) = self.v4 {
            write!(f, "/{v4}")?;
        }
        if let Some(v6) = self.v6 {
            write!(f, "//{v6}")?;
        }
        Ok(())
    }
}

/// A single mechanism of a compiled record.
///
/// The per-kind invariants of the grammar hold for every compiled value:
/// `all` carries no data at all, `ip4`/`ip6` carry an address of the
/// matching family and at most a single-family prefix length, and only
/// `a`/`mx` carry a CIDR alongside a domain-spec.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mechanism {
    /// Qualifier controlling the outcome on match.
    pub qualifier: Qualifier,
    /// Which test this mechanism performs.
    pub kind: MechanismKind,
    /// Domain-spec payload, for the kinds that take one. Absence defaults
    /// to the record's own domain during evaluation, which is outside this
    /// crate.
    pub domain_spec: Option<DomainSpec>,
    /// Literal address, for `ip4`/`ip6` only.
    pub address: Option<IpAddr>,
    /// Prefix length(s), for `a`/`mx`/`ip4`/`ip6` only.
    pub cidr: Option<CidrLength>,
}

impl Mechanism {
    /// Creates a bare mechanism of the given kind with no data.
    #[must_use]
    pub const fn new(qualifier: Qualifier, kind: MechanismKind) -> Self {
        Self {
            qualifier,
            kind,
            domain_spec: None,
            address: None,
            cidr: None,
        }
    }

    /// Returns the full data-token sequence of this mechanism: the
    /// domain-spec tokens followed by a trailing CIDR token if one is
    /// present. Empty for `ip4`/`ip6`, whose data is the literal address.
    #[must_use]
    pub fn data_tokens(&self) -> Vec<DataToken> {
        let mut tokens: Vec<DataToken> = self
            .domain_spec
            .as_ref()
            .map(|spec| spec.tokens().to_vec())
            .unwrap_or_default();
        if let Some(cidr) = self.cidr {
            if !self.kind.shape().takes_address && !cidr.is_empty() {
                tokens.push(DataToken::Cidr(cidr));
            }
        }
        tokens
    }

    /// Renders this mechanism's data back to its canonical text, without
    /// the mechanism name: `192.0.2.0/24` for `ip4:192.0.2.0/24`,
    /// `example.com/24//64` for `a:example.com/24//64`, empty for `all`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] only for hand-built values that
    /// violate the compiled invariants; it is total over compiled records.
    pub fn data_text(&self) -> Result<String> {
        if self.kind.shape().takes_address {
            return render::render_address(self.address, self.cidr, self.kind);
        }
        render::render_data(&self.data_tokens(), false, self.kind.shape().allows_cidr)
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifier != Qualifier::Pass {
            write!(f, "{}", self.qualifier)?;
        }
        f.write_str(self.kind.name())?;
        let data = self.data_text().map_err(|_| fmt::Error)?;
        if !data.is_empty() {
            // The colon separator only precedes domain-spec or address
            // payloads; a bare CIDR suffix (`a/24`) attaches directly.
            if self.kind.shape().takes_address || self.domain_spec.is_some() {
                f.write_str(":")?;
            }
            f.write_str(&data)?;
        }
        Ok(())
    }
}

/// The name of a modifier.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierName {
    /// `redirect=` — evaluation continues at another domain's record.
    Redirect,
    /// `exp=` — domain of the explanation string.
    Exp,
    /// Any other name, preserved verbatim for forward compatibility.
    Other(String),
}

impl ModifierName {
    /// Returns the modifier name text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Redirect => "redirect",
            Self::Exp => "exp",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ModifierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `name=value` modifier of a compiled record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifier {
    /// The modifier name.
    pub name: ModifierName,
    /// The modifier's domain-spec data, stored verbatim.
    pub data: DomainSpec,
}

impl Modifier {
    /// Renders this modifier's data back to its canonical text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] only for hand-built token
    /// sequences carrying a CIDR token, which the grammar forbids here.
    pub fn data_text(&self) -> Result<String> {
        render::render_data(self.data.tokens(), true, false)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.data)
    }
}

/// A compiled SPF record: the version marker plus ordered mechanisms and
/// modifiers. Mechanism order is semantically significant — evaluation
/// stops at the first match.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    /// Mechanisms in encounter order.
    pub mechanisms: Vec<Mechanism>,
    /// Modifiers in encounter order.
    pub modifiers: Vec<Modifier>,
}

impl Record {
    /// The version marker every record must begin with.
    pub const VERSION: &'static str = "v=spf1";

    /// Compiles a raw SPF record string into a validated [`Record`].
    ///
    /// Diagnostics accumulate across the whole term stream; the result is
    /// an error iff at least one Error-severity diagnostic was recorded,
    /// and no partial record is exposed on failure. Cost is O(n) in the
    /// input length with no implicit size cap — callers holding
    /// attacker-controlled records should bound the input themselves.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Compile`] with the full diagnostic list when
    /// the record does not satisfy the grammar.
    pub fn compile(raw: &str) -> Result<Compiled> {
        parser::compile(raw)
    }

    /// Returns the `redirect=` modifier, if present.
    #[must_use]
    pub fn redirect(&self) -> Option<&Modifier> {
        self.modifiers
            .iter()
            .find(|m| m.name == ModifierName::Redirect)
    }

    /// Returns the `exp=` modifier, if present.
    #[must_use]
    pub fn explanation(&self) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.name == ModifierName::Exp)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::VERSION)?;
        for mechanism in &self.mechanisms {
            write!(f, " {mechanism}")?;
        }
        for modifier in &self.modifiers {
            write!(f, " {modifier}")?;
        }
        Ok(())
    }
}
