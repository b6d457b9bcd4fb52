//! Integration tests for record compilation and canonical re-rendering.
//!
//! The round-trip property at the bottom generates structurally valid
//! records, renders them to text and compiles the text back, checking that
//! render and parse are inverses over the whole grammar.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use proptest::prelude::*;
use spf_record::{
    CidrLength, DiagnosticKind, DomainSpec, Error, Mechanism, MechanismKind, Modifier,
    ModifierName, Qualifier, Record, Severity,
};

#[test]
fn compiles_a_typical_published_record() {
    let compiled = Record::compile(
        "v=spf1 a mx include:_spf.example.net ip4:192.0.2.0/24 ip6:2001:db8::/32 ~all",
    )
    .unwrap();
    assert_eq!(compiled.record.mechanisms.len(), 6);
    assert!(compiled.warnings.is_empty());
    assert_eq!(
        compiled.record.to_string(),
        "v=spf1 a mx include:_spf.example.net ip4:192.0.2.0/24 ip6:2001:db8::/32 ~all"
    );
}

#[test]
fn render_reproduces_mechanism_text_exactly() {
    let compiled = Record::compile("v=spf1 ip4:192.0.2.0/24 -all").unwrap();
    assert_eq!(compiled.record.mechanisms[0].to_string(), "ip4:192.0.2.0/24");
    assert_eq!(
        compiled.record.mechanisms[0].data_text().unwrap(),
        "192.0.2.0/24"
    );
    assert_eq!(compiled.record.mechanisms[1].to_string(), "-all");
}

#[test]
fn explicit_pass_qualifier_canonicalizes_away() {
    let compiled = Record::compile("v=spf1 +mx -all").unwrap();
    assert_eq!(compiled.record.to_string(), "v=spf1 mx -all");
    assert_eq!(compiled.record.mechanisms[0].qualifier, Qualifier::Pass);
}

#[test]
fn failure_exposes_no_partial_record() {
    let err = Record::compile("v=spf1 a mx ip4:192.0.2.0/33 -all").unwrap_err();
    let Error::Compile(diagnostics) = err else {
        panic!("expected a compile failure");
    };
    assert!(diagnostics.iter().any(|d| d.severity == Severity::Error));
    // The valid leading terms are not reachable through any API.
}

#[test]
fn diagnostics_display_like_the_reference_message_loop() {
    let err = Record::compile("v=spf1 redirect=a.example redirect=b.example").unwrap_err();
    let messages: Vec<String> = err.diagnostics().iter().map(ToString::to_string).collect();
    assert_eq!(messages, vec!["Error: duplicate redirect modifier"]);
}

#[test]
fn warnings_accompany_a_successful_compile() {
    let compiled = Record::compile("v=spf1 include -all ptr").unwrap();
    let kinds: Vec<&DiagnosticKind> = compiled.warnings.iter().map(|d| &d.kind).collect();
    assert_eq!(compiled.warnings.len(), 3);
    assert!(matches!(kinds[0], DiagnosticKind::MissingDomainSpec(name) if name == "include"));
    assert!(matches!(kinds[1], DiagnosticKind::MissingDomainSpec(name) if name == "ptr"));
    assert!(matches!(kinds[2], DiagnosticKind::UnreachableMechanism(name) if name == "ptr"));
}

#[test]
fn macro_domain_specs_round_trip_losslessly() {
    let raw = "v=spf1 exists:%{ir}.%{v}._spf.%{d2} redirect=%{L1r-}._spf.example.com";
    let compiled = Record::compile(raw).unwrap();
    assert_eq!(compiled.record.to_string(), raw);
}

#[test]
fn modifier_order_and_accessors() {
    let compiled =
        Record::compile("v=spf1 -all unknown=kept exp=why.example.com").unwrap();
    let record = &compiled.record;
    assert_eq!(record.modifiers.len(), 2);
    assert_eq!(record.modifiers[0].name, ModifierName::Other("unknown".into()));
    assert!(record.redirect().is_none());
    assert_eq!(record.explanation().unwrap().data.to_string(), "why.example.com");
}

#[cfg(feature = "serde")]
#[test]
fn record_serializes_and_deserializes() {
    let compiled = Record::compile("v=spf1 ip4:192.0.2.0/24 ~all redirect=_spf.example.com")
        .unwrap();
    let json = serde_json::to_string(&compiled.record).unwrap();
    let back: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(back, compiled.record);
}

fn qualifier_strategy() -> impl Strategy<Value = Qualifier> {
    prop_oneof![
        Just(Qualifier::Pass),
        Just(Qualifier::Fail),
        Just(Qualifier::SoftFail),
        Just(Qualifier::Neutral),
    ]
}

fn domain_spec_strategy() -> impl Strategy<Value = DomainSpec> {
    prop_oneof![
        "[a-z]{1,8}(\\.[a-z]{1,8}){1,2}",
        Just("%{ir}.%{v}._spf.%{d2}".to_string()),
        Just("%{l1r-}._spf.example.com".to_string()),
        Just("%{S}.example.com".to_string()),
    ]
    .prop_map(|raw| DomainSpec::parse(&raw).unwrap())
}

fn dual_cidr_strategy() -> impl Strategy<Value = Option<CidrLength>> {
    prop_oneof![
        Just(None),
        (0u8..32).prop_map(|v4| Some(CidrLength::new(Some(v4), None))),
        (0u8..128).prop_map(|v6| Some(CidrLength::new(None, Some(v6)))),
        (0u8..32, 0u8..128).prop_map(|(v4, v6)| Some(CidrLength::new(Some(v4), Some(v6)))),
    ]
}

fn mechanism_strategy() -> impl Strategy<Value = Mechanism> {
    let all = qualifier_strategy().prop_map(|q| Mechanism::new(q, MechanismKind::All));

    let ip4 = (qualifier_strategy(), any::<u32>(), prop::option::of(0u8..32)).prop_map(
        |(qualifier, bits, prefix)| Mechanism {
            qualifier,
            kind: MechanismKind::Ip4,
            domain_spec: None,
            address: Some(IpAddr::V4(Ipv4Addr::from(bits))),
            cidr: prefix.map(|v4| CidrLength::new(Some(v4), None)),
        },
    );

    let ip6 = (qualifier_strategy(), any::<u128>(), prop::option::of(0u8..128)).prop_map(
        |(qualifier, bits, prefix)| Mechanism {
            qualifier,
            kind: MechanismKind::Ip6,
            domain_spec: None,
            address: Some(IpAddr::V6(Ipv6Addr::from(bits))),
            cidr: prefix.map(|v6| CidrLength::new(None, Some(v6))),
        },
    );

    let a_mx = (
        qualifier_strategy(),
        prop_oneof![Just(MechanismKind::A), Just(MechanismKind::Mx)],
        prop::option::of(domain_spec_strategy()),
        dual_cidr_strategy(),
    )
        .prop_map(|(qualifier, kind, domain_spec, cidr)| Mechanism {
            qualifier,
            kind,
            domain_spec,
            address: None,
            cidr,
        });

    let named = (
        qualifier_strategy(),
        prop_oneof![
            Just(MechanismKind::Include),
            Just(MechanismKind::Exists),
            Just(MechanismKind::Ptr),
        ],
        prop::option::of(domain_spec_strategy()),
    )
        .prop_map(|(qualifier, kind, domain_spec)| Mechanism {
            qualifier,
            kind,
            domain_spec,
            address: None,
            cidr: None,
        });

    prop_oneof![all, ip4, ip6, a_mx, named]
}

fn record_strategy() -> impl Strategy<Value = Record> {
    (
        prop::collection::vec(mechanism_strategy(), 0..6),
        prop::option::of(domain_spec_strategy()),
        prop::option::of(domain_spec_strategy()),
    )
        .prop_map(|(mechanisms, redirect, exp)| {
            let mut modifiers = Vec::new();
            if let Some(data) = redirect {
                modifiers.push(Modifier {
                    name: ModifierName::Redirect,
                    data,
                });
            }
            if let Some(data) = exp {
                modifiers.push(Modifier {
                    name: ModifierName::Exp,
                    data,
                });
            }
            Record {
                mechanisms,
                modifiers,
            }
        })
}

proptest! {
    /// render ∘ parse is the identity over structurally valid records.
    #[test]
    fn prop_render_then_compile_round_trips(record in record_strategy()) {
        let text = record.to_string();
        let compiled = Record::compile(&text).unwrap();
        prop_assert_eq!(compiled.record, record, "rendered text: {}", text);
    }

    /// Compiling the rendering of a compiled record is a fixed point.
    #[test]
    fn prop_canonical_text_is_stable(record in record_strategy()) {
        let text = record.to_string();
        let once = Record::compile(&text).unwrap();
        let twice = Record::compile(&once.record.to_string()).unwrap();
        prop_assert_eq!(once.record, twice.record);
    }
}
