//! # spf-record
//!
//! SPF (RFC 7208) record grammar engine: compiles a raw policy string such
//! as `v=spf1 a mx ip4:192.0.2.0/24 -all` into a structured, validated
//! record, and re-renders any compiled mechanism or modifier back to its
//! canonical text.
//!
//! ## Features
//!
//! - **Compilation**: tokenize and validate a record against the SPF
//!   grammar, producing a [`Record`] or a structured diagnostic list
//! - **Diagnostics**: errors and warnings accumulate across the whole
//!   record instead of stopping at the first problem
//! - **Macro strings**: domain-specs with `%{...}` macro tokens are stored
//!   verbatim and round-trip losslessly
//! - **Canonical rendering**: `Display` on every model type, with CIDR
//!   suffix reattachment per address family
//!
//! Evaluation (matching a sending IP against a record), macro expansion and
//! DNS resolution are out of scope; this crate is the grammar engine only.
//!
//! ## Quick Start
//!
//! ### Compiling a record
//!
//! ```ignore
//! use spf_record::{MechanismKind, Record};
//!
//! let compiled = Record::compile("v=spf1 ip4:192.0.2.0/24 -all")?;
//! assert_eq!(compiled.record.mechanisms.len(), 2);
//! assert_eq!(compiled.record.mechanisms[0].kind, MechanismKind::Ip4);
//! assert!(compiled.warnings.is_empty());
//! ```
//!
//! ### Inspecting diagnostics
//!
//! ```ignore
//! use spf_record::{Error, Record};
//!
//! match Record::compile("v=spf1 ip4:192.0.2.0/33 -all") {
//!     Err(Error::Compile(diagnostics)) => {
//!         for diagnostic in &diagnostics {
//!             eprintln!("{diagnostic}");
//!         }
//!     }
//!     other => unreachable!("{other:?}"),
//! }
//! ```
//!
//! ### Re-rendering
//!
//! ```ignore
//! use spf_record::Record;
//!
//! let compiled = Record::compile("v=spf1 a:%{d}/24 -all")?;
//! assert_eq!(compiled.record.to_string(), "v=spf1 a:%{d}/24 -all");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod domain_spec;
mod error;
mod lexer;
mod parser;
mod record;
mod render;

pub use domain_spec::{DataToken, DomainSpec, MacroToken};
pub use error::{Diagnostic, DiagnosticKind, Error, Result, Severity};
pub use parser::Compiled;
pub use record::{
    CidrLength, Mechanism, MechanismKind, MechanismShape, Modifier, ModifierName, Qualifier,
    Record,
};
