use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::enums::Capability;

/// Enabled/disabled flag per Sieve extension, keyed by extension name.
///
/// Names outside [`Capability::ALL`] are kept so that a parsed
/// `require "regex"` survives persistence, but the generator never
/// requires them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    flags: BTreeMap<String, bool>,
}

impl Default for CapabilitySet {
    /// Only `fileinto` enabled, every known extension listed explicitly.
    fn default() -> Self {
        let mut set = Self::none();
        for cap in Capability::ALL {
            set.set(cap, cap == Capability::FileInto);
        }
        set
    }
}

impl CapabilitySet {
    /// Everything disabled.
    pub fn none() -> Self {
        Self {
            flags: BTreeMap::new(),
        }
    }

    pub fn from_flags<I>(flags: I) -> Self
    where
        I: IntoIterator<Item = (String, bool)>,
    {
        Self {
            flags: flags.into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.is_enabled_name(cap.as_sieve())
    }

    pub fn is_enabled_name(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, cap: Capability, enabled: bool) {
        self.set_name(cap.as_sieve(), enabled);
    }

    pub fn set_name(&mut self, name: &str, enabled: bool) {
        self.flags.insert(name.to_string(), enabled);
    }

    pub fn toggle(&mut self, cap: Capability) {
        let enabled = self.is_enabled(cap);
        self.set(cap, !enabled);
    }

    /// Known capabilities that are enabled, in canonical order.
    pub fn enabled(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.is_enabled(*cap))
    }

    /// Turn on every extension `other` has enabled. Nothing is turned off.
    pub fn merge_enabled(&mut self, other: &CapabilitySet) {
        for (name, enabled) in &other.flags {
            if *enabled {
                self.set_name(name, true);
            }
        }
    }
}
