//! Sieve (RFC 5228) filter scripts as a structured rule model.
//!
//! [`generate`] renders a [`RuleSet`](model::RuleSet) as script text,
//! [`parse`] recovers a rule set from text in the supported subset, and
//! [`validate`] reports advisory consistency warnings.

pub mod config;
pub mod model;
pub mod sieve;
pub mod store;
pub mod validator;

pub use sieve::{compute_requires, generate, parse, ParseError};
pub use validator::{validate, Warning};
