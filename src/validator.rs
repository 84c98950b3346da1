//! Advisory consistency checks over a rule set.
//!
//! Warnings never block generation or saving; they are ordered by scan:
//! active-rule presence, then each active rule's conditions and actions,
//! then the extension cross-check.

use std::collections::HashSet;
use std::fmt;

use crate::model::{Action, ActionKind, Capability, Condition, ConditionKind, RuleSet};

/// Rule, condition and action numbers are 1-based positions in the full
/// rule list, inactive rules included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    NoActiveRules,
    NoConditions { rule: usize },
    EmptyHeaderName { rule: usize, condition: usize },
    EmptyValue { rule: usize, condition: usize },
    NoActions { rule: usize },
    EmptyMailbox { rule: usize, action: usize },
    EmptyRedirectAddress { rule: usize, action: usize },
    ActionNotEnabled(ActionKind),
    TestNotEnabled(ConditionKind),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveRules => f.write_str("No active rules - script will have no effect"),
            Self::NoConditions { rule } => write!(f, "Rule {rule} has no conditions"),
            Self::EmptyHeaderName { rule, condition } => {
                write!(f, "Rule {rule}, condition {condition} has an empty header name")
            }
            Self::EmptyValue { rule, condition } => {
                write!(f, "Rule {rule}, condition {condition} has an empty value")
            }
            Self::NoActions { rule } => write!(f, "Rule {rule} has no actions"),
            Self::EmptyMailbox { rule, action } => {
                write!(f, "Rule {rule}, action {action} has an empty mailbox name")
            }
            Self::EmptyRedirectAddress { rule, action } => {
                write!(f, "Rule {rule}, action {action} has an empty redirect address")
            }
            Self::ActionNotEnabled(kind) => write!(
                f,
                "Script uses '{kind}' action but '{kind}' extension is not enabled"
            ),
            Self::TestNotEnabled(kind) => write!(
                f,
                "Script uses '{kind}' test but '{kind}' extension is not enabled"
            ),
        }
    }
}

/// Actions and tests whose extension must be enabled, in report order.
const GATED_ACTIONS: [ActionKind; 3] = [
    ActionKind::FileInto,
    ActionKind::Reject,
    ActionKind::Vacation,
];
const GATED_TESTS: [ConditionKind; 2] = [ConditionKind::Envelope, ConditionKind::Body];

pub fn validate(rule_set: &RuleSet) -> Vec<Warning> {
    let mut warnings = Vec::new();

    if !rule_set.rules.is_empty() && !rule_set.has_active_rules() {
        warnings.push(Warning::NoActiveRules);
    }

    for (idx, rule) in rule_set.rules.iter().enumerate() {
        if !rule.active {
            continue;
        }
        let n = idx + 1;

        if rule.conditions.is_empty() {
            warnings.push(Warning::NoConditions { rule: n });
        }
        for (c, condition) in rule.conditions.iter().enumerate() {
            check_condition(&mut warnings, n, c + 1, condition);
        }

        if rule.actions.is_empty() {
            warnings.push(Warning::NoActions { rule: n });
        }
        for (a, action) in rule.actions.iter().enumerate() {
            match action {
                Action::FileInto { mailbox, .. } if mailbox.trim().is_empty() => {
                    warnings.push(Warning::EmptyMailbox { rule: n, action: a + 1 });
                }
                Action::Redirect { address, .. } if address.trim().is_empty() => {
                    warnings.push(Warning::EmptyRedirectAddress { rule: n, action: a + 1 });
                }
                _ => {}
            }
        }
    }

    let used_actions: HashSet<ActionKind> = rule_set
        .active_rules()
        .flat_map(|r| r.actions.iter().map(Action::kind))
        .collect();
    let used_tests: HashSet<ConditionKind> = rule_set
        .active_rules()
        .flat_map(|r| r.conditions.iter().map(Condition::kind))
        .collect();

    for kind in GATED_ACTIONS {
        if used_actions.contains(&kind) && !is_gate_open(rule_set, kind.capability()) {
            warnings.push(Warning::ActionNotEnabled(kind));
        }
    }
    for kind in GATED_TESTS {
        if used_tests.contains(&kind) && !is_gate_open(rule_set, kind.capability()) {
            warnings.push(Warning::TestNotEnabled(kind));
        }
    }

    warnings
}

fn is_gate_open(rule_set: &RuleSet, cap: Option<Capability>) -> bool {
    cap.map_or(true, |cap| rule_set.extensions.is_enabled(cap))
}

fn check_condition(warnings: &mut Vec<Warning>, rule: usize, condition: usize, c: &Condition) {
    let (Condition::Header { header, keys, .. } | Condition::Address { header, keys, .. }) = c
    else {
        return;
    };
    if header.trim().is_empty() {
        warnings.push(Warning::EmptyHeaderName { rule, condition });
    }
    if keys.first().map_or(true, |k| k.is_empty()) {
        warnings.push(Warning::EmptyValue { rule, condition });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapabilitySet, MatchType, Rule};

    fn messages(set: &RuleSet) -> Vec<String> {
        validate(set).iter().map(ToString::to_string).collect()
    }

    fn subject_rule(key: &str) -> Rule {
        Rule::new(
            vec![Condition::header("Subject", MatchType::Is, vec![key.to_string()])],
            vec![Action::file_into("INBOX.Spam")],
        )
    }

    #[test]
    fn test_clean_model_has_no_warnings() {
        let set = RuleSet::new(vec![subject_rule("[SPAM]")], CapabilitySet::default());
        assert!(validate(&set).is_empty());
        assert!(validate(&RuleSet::default()).is_empty());
    }

    #[test]
    fn test_empty_key_is_reported_once() {
        let set = RuleSet::new(vec![subject_rule("")], CapabilitySet::default());
        assert_eq!(messages(&set), vec!["Rule 1, condition 1 has an empty value"]);
    }

    #[test]
    fn test_fileinto_without_extension() {
        let set = RuleSet::new(vec![subject_rule("[SPAM]")], CapabilitySet::none());
        assert_eq!(
            messages(&set),
            vec!["Script uses 'fileinto' action but 'fileinto' extension is not enabled"]
        );
    }

    #[test]
    fn test_no_active_rules() {
        let mut rule = subject_rule("x");
        rule.active = false;
        let set = RuleSet::new(vec![rule], CapabilitySet::none());
        assert_eq!(validate(&set), vec![Warning::NoActiveRules]);
    }

    #[test]
    fn test_numbering_counts_inactive_rules() {
        let mut off = subject_rule("x");
        off.active = false;
        let empty = Rule::new(Vec::new(), Vec::new());
        let set = RuleSet::new(vec![off, empty], CapabilitySet::default());
        assert_eq!(
            validate(&set),
            vec![Warning::NoConditions { rule: 2 }, Warning::NoActions { rule: 2 }]
        );
    }

    #[test]
    fn test_scan_order() {
        let rule = Rule::new(
            vec![
                Condition::address("  ", MatchType::Is, Default::default(), Vec::new()),
                Condition::True,
            ],
            vec![
                Action::Keep,
                Action::file_into(" "),
                Action::redirect(""),
                Action::Vacation {
                    days: None,
                    subject: None,
                    message: "Away".to_string(),
                },
                Action::Reject {
                    reason: "No".to_string(),
                },
            ],
        );
        let body = Rule::new(
            vec![
                Condition::Body {
                    comparator: crate::model::DEFAULT_COMPARATOR.to_string(),
                    match_type: MatchType::Contains,
                    transform: Default::default(),
                    keys: vec!["x".to_string()],
                },
                Condition::Envelope {
                    comparator: crate::model::DEFAULT_COMPARATOR.to_string(),
                    match_type: MatchType::Is,
                    address_part: Default::default(),
                    header: "from".to_string(),
                    keys: vec!["a@b.c".to_string()],
                },
            ],
            vec![Action::Discard],
        );
        let set = RuleSet::new(vec![rule, body], CapabilitySet::none());
        assert_eq!(
            messages(&set),
            vec![
                "Rule 1, condition 1 has an empty header name",
                "Rule 1, condition 1 has an empty value",
                "Rule 1, action 2 has an empty mailbox name",
                "Rule 1, action 3 has an empty redirect address",
                "Script uses 'fileinto' action but 'fileinto' extension is not enabled",
                "Script uses 'reject' action but 'reject' extension is not enabled",
                "Script uses 'vacation' action but 'vacation' extension is not enabled",
                "Script uses 'envelope' test but 'envelope' extension is not enabled",
                "Script uses 'body' test but 'body' extension is not enabled",
            ]
        );
    }

    #[test]
    fn test_inactive_rules_do_not_need_extensions() {
        let mut rule = subject_rule("x");
        rule.active = false;
        let set = RuleSet::new(
            vec![rule, Rule::new(vec![Condition::True], vec![Action::Keep])],
            CapabilitySet::none(),
        );
        assert!(validate(&set).is_empty());
    }
}
