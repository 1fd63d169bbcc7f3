//! Rule value types, scopes, and the serialized rule shape.
//!
//! - `RuleFields`: the fields shared by alert and record rules, plus the
//!   field-level [`patch`](RuleFields::patch) operation
//! - `Rule`: tagged union of alert and record rules
//! - `Scope`: default scope or a named cluster
//! - `RuleSpec` / `RuleGroupSpec`: the YAML wire shape read from inputs and
//!   written to outputs

mod rule;
mod scope;
mod wire;

pub use rule::*;
pub use scope::*;
pub use wire::*;

#[cfg(test)]
mod tests;
