//! Stringification of compiled mechanism and modifier data.
//!
//! The renderer is the inverse of the compiler: it turns a data-token
//! sequence back into canonical record text, reattaching CIDR suffixes per
//! address family. It is total over data coming out of a successful
//! compile; token sequences that bypass the validator's invariants surface
//! as [`Error::Internal`] instead of producing malformed text.

use std::net::IpAddr;

use crate::domain_spec::DataToken;
use crate::error::{Error, Result};
use crate::record::{CidrLength, MechanismKind};

/// Renders a data-token sequence to canonical text. Literal tokens pass
/// through verbatim and macro tokens re-render losslessly; a trailing CIDR
/// token is attached only where the grammar allows one.
pub(crate) fn render_data(
    tokens: &[DataToken],
    is_modifier: bool,
    cidr_allowed: bool,
) -> Result<String> {
    let mut out = String::new();
    for (index, token) in tokens.iter().enumerate() {
        match token {
            DataToken::Literal(text) => out.push_str(text),
            DataToken::Macro(m) => out.push_str(&m.to_string()),
            DataToken::Cidr(cidr) => {
                if is_modifier {
                    return Err(Error::Internal(
                        "CIDR token in modifier data".to_string(),
                    ));
                }
                if !cidr_allowed {
                    return Err(Error::Internal(
                        "CIDR token on a mechanism that takes no prefix length".to_string(),
                    ));
                }
                if index + 1 != tokens.len() {
                    return Err(Error::Internal(
                        "CIDR token not at the end of the data stream".to_string(),
                    ));
                }
                out.push_str(&cidr.to_string());
            }
        }
    }
    Ok(out)
}

/// Renders the data of an `ip4`/`ip6` mechanism: the literal address plus
/// its single-family prefix length, if any.
pub(crate) fn render_address(
    address: Option<IpAddr>,
    cidr: Option<CidrLength>,
    kind: MechanismKind,
) -> Result<String> {
    let internal = |detail: &str| Error::Internal(format!("{kind} mechanism {detail}"));

    let address = address.ok_or_else(|| internal("without an address"))?;
    let family_matches = match kind {
        MechanismKind::Ip4 => address.is_ipv4(),
        MechanismKind::Ip6 => address.is_ipv6(),
        _ => false,
    };
    if !family_matches {
        return Err(internal("with an address of the wrong family"));
    }

    let mut out = address.to_string();
    if let Some(cidr) = cidr {
        let length = if kind == MechanismKind::Ip4 {
            cidr.v4
        } else {
            cidr.v6
        };
        match length {
            Some(length) => {
                out.push('/');
                out.push_str(&length.to_string());
            }
            None if !cidr.is_empty() => {
                return Err(internal("with a prefix length of the wrong family"));
            }
            None => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain_spec::MacroToken;

    fn literal(text: &str) -> DataToken {
        DataToken::Literal(text.to_string())
    }

    #[test]
    fn test_render_literals_and_macros() {
        let tokens = vec![
            DataToken::Macro(MacroToken {
                letter: 'i',
                url_escape: false,
                digits: String::new(),
                reverse: true,
                delimiters: String::new(),
            }),
            literal("._spf.example.com"),
        ];
        assert_eq!(
            render_data(&tokens, false, false).unwrap(),
            "%{ir}._spf.example.com"
        );
        // Modifier data renders the same way when no CIDR is present.
        assert_eq!(
            render_data(&tokens, true, false).unwrap(),
            "%{ir}._spf.example.com"
        );
    }

    #[test]
    fn test_render_reattaches_cidr() {
        let tokens = vec![
            literal("example.com"),
            DataToken::Cidr(CidrLength::new(Some(24), Some(64))),
        ];
        assert_eq!(
            render_data(&tokens, false, true).unwrap(),
            "example.com/24//64"
        );
    }

    #[test]
    fn test_render_cidr_in_modifier_is_internal_error() {
        let tokens = vec![literal("x"), DataToken::Cidr(CidrLength::new(Some(8), None))];
        assert!(matches!(
            render_data(&tokens, true, false),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_render_cidr_where_not_allowed_is_internal_error() {
        let tokens = vec![DataToken::Cidr(CidrLength::new(Some(8), None))];
        assert!(matches!(
            render_data(&tokens, false, false),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_render_cidr_not_last_is_internal_error() {
        let tokens = vec![
            DataToken::Cidr(CidrLength::new(Some(8), None)),
            literal("tail"),
        ];
        assert!(matches!(
            render_data(&tokens, false, true),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_render_address() {
        let addr: IpAddr = "192.0.2.0".parse().unwrap();
        assert_eq!(
            render_address(Some(addr), Some(CidrLength::new(Some(24), None)), MechanismKind::Ip4)
                .unwrap(),
            "192.0.2.0/24"
        );
        assert_eq!(
            render_address(Some(addr), None, MechanismKind::Ip4).unwrap(),
            "192.0.2.0"
        );

        let addr: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(
            render_address(Some(addr), Some(CidrLength::new(None, Some(32))), MechanismKind::Ip6)
                .unwrap(),
            "2001:db8::1/32"
        );
    }

    #[test]
    fn test_render_address_family_mismatch_is_internal_error() {
        let v6: IpAddr = "::1".parse().unwrap();
        assert!(matches!(
            render_address(Some(v6), None, MechanismKind::Ip4),
            Err(Error::Internal(_))
        ));
        assert!(matches!(
            render_address(None, None, MechanismKind::Ip6),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_render_address_wrong_family_prefix_is_internal_error() {
        let v4: IpAddr = "192.0.2.1".parse().unwrap();
        assert!(matches!(
            render_address(Some(v4), Some(CidrLength::new(None, Some(64))), MechanismKind::Ip4),
            Err(Error::Internal(_))
        ));
    }
}
