pub mod capabilities;
pub mod enums;
pub mod rule;
pub mod rule_set;

pub use capabilities::CapabilitySet;
pub use enums::*;
pub use rule::{Action, Condition, Rule, RuleId, DEFAULT_COMPARATOR};
pub use rule_set::RuleSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid size literal '{0}': expected digits with an optional K, M or G suffix")]
    InvalidSize(String),
}
