use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::model::capabilities::CapabilitySet;
use crate::model::rule::{Rule, RuleId};

/// The whole filter policy: ordered rules plus the declared extensions.
///
/// This is also the persisted layout, `{"rules": [...], "extensions": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default = "CapabilitySet::none")]
    pub extensions: CapabilitySet,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            extensions: CapabilitySet::default(),
        }
    }
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>, extensions: CapabilitySet) -> Self {
        Self { rules, extensions }
    }

    /// No rules and no extensions enabled.
    pub fn empty() -> Self {
        Self::new(Vec::new(), CapabilitySet::none())
    }

    pub fn active_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.active)
    }

    pub fn has_active_rules(&self) -> bool {
        self.rules.iter().any(|r| r.active)
    }

    pub fn position(&self, id: &RuleId) -> Option<usize> {
        self.rules.iter().position(|r| &r.id == id)
    }

    pub fn rule(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    pub fn rule_mut(&mut self, id: &RuleId) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| &r.id == id)
    }

    /// Append a default rule and return its id.
    pub fn add_rule(&mut self) -> RuleId {
        let rule = Rule::default();
        let id = rule.id.clone();
        self.rules.push(rule);
        id
    }

    /// Insert a deep copy of `id` right after it, under a fresh id.
    pub fn duplicate_rule(&mut self, id: &RuleId) -> Option<RuleId> {
        let idx = self.position(id)?;
        let mut copy = self.rules[idx].clone();
        copy.id = RuleId::fresh();
        let new_id = copy.id.clone();
        self.rules.insert(idx + 1, copy);
        Some(new_id)
    }

    pub fn remove_rule(&mut self, id: &RuleId) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| &r.id != id);
        self.rules.len() != before
    }

    pub fn toggle_active(&mut self, id: &RuleId) -> bool {
        match self.rule_mut(id) {
            Some(rule) => {
                rule.active = !rule.active;
                true
            }
            None => false,
        }
    }

    pub fn toggle_combinator(&mut self, id: &RuleId) -> bool {
        match self.rule_mut(id) {
            Some(rule) => {
                rule.combinator = rule.combinator.toggled();
                true
            }
            None => false,
        }
    }

    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.rules.len() {
            return false;
        }
        self.rules.swap(index, index - 1);
        true
    }

    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.rules.len() {
            return false;
        }
        self.rules.swap(index, index + 1);
        true
    }

    /// Re-mint ids that collide with an earlier rule. Returns how many changed.
    pub fn ensure_unique_ids(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut reminted = 0;
        for rule in &mut self.rules {
            if !seen.insert(rule.id.clone()) {
                rule.id = RuleId::fresh();
                seen.insert(rule.id.clone());
                reminted += 1;
            }
        }
        reminted
    }

    /// Accept a parsed rule set as the new source of truth.
    ///
    /// Rules are replaced wholesale; extensions enabled by the parsed
    /// `require` are switched on, the rest are left as they were.
    pub fn adopt(&mut self, parsed: RuleSet) {
        self.rules = parsed.rules;
        self.ensure_unique_ids();
        self.extensions.merge_enabled(&parsed.extensions);
    }
}
