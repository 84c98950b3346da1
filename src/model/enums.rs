use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    #[default]
    #[serde(rename = ":is")]
    Is,
    #[serde(rename = ":contains")]
    Contains,
    #[serde(rename = ":matches")]
    Matches,
}

impl MatchType {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Is => ":is",
            Self::Contains => ":contains",
            Self::Matches => ":matches",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            ":is" => Some(Self::Is),
            ":contains" => Some(Self::Contains),
            ":matches" => Some(Self::Matches),
            _ => None,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressPart {
    #[default]
    #[serde(rename = ":all")]
    All,
    #[serde(rename = ":localpart")]
    Localpart,
    #[serde(rename = ":domain")]
    Domain,
}

impl AddressPart {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::All => ":all",
            Self::Localpart => ":localpart",
            Self::Domain => ":domain",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            ":all" => Some(Self::All),
            ":localpart" => Some(Self::Localpart),
            ":domain" => Some(Self::Domain),
            _ => None,
        }
    }
}

impl fmt::Display for AddressPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeOperator {
    #[default]
    #[serde(rename = ":over")]
    Over,
    #[serde(rename = ":under")]
    Under,
}

impl SizeOperator {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Over => ":over",
            Self::Under => ":under",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            ":over" => Some(Self::Over),
            ":under" => Some(Self::Under),
            _ => None,
        }
    }
}

impl fmt::Display for SizeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

/// Body transform tag of the `body` test (RFC 5173).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyTransform {
    #[default]
    #[serde(rename = ":text")]
    Text,
    #[serde(rename = ":raw")]
    Raw,
    #[serde(rename = ":content")]
    Content,
}

impl BodyTransform {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Text => ":text",
            Self::Raw => ":raw",
            Self::Content => ":content",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            ":text" => Some(Self::Text),
            ":raw" => Some(Self::Raw),
            ":content" => Some(Self::Content),
            _ => None,
        }
    }
}

impl fmt::Display for BodyTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    AnyOf,
    AllOf,
}

impl Combinator {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::AnyOf => "anyof",
            Self::AllOf => "allof",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "anyof" => Some(Self::AnyOf),
            "allof" => Some(Self::AllOf),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::AnyOf => Self::AllOf,
            Self::AllOf => Self::AnyOf,
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Header,
    Address,
    Envelope,
    Size,
    Body,
    Exists,
    True,
    False,
}

impl ConditionKind {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Address => "address",
            Self::Envelope => "envelope",
            Self::Size => "size",
            Self::Body => "body",
            Self::Exists => "exists",
            Self::True => "true",
            Self::False => "false",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "header" => Some(Self::Header),
            "address" => Some(Self::Address),
            "envelope" => Some(Self::Envelope),
            "size" => Some(Self::Size),
            "body" => Some(Self::Body),
            "exists" => Some(Self::Exists),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            _ => None,
        }
    }

    /// Capability that must be required before the test may be used, if any.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Self::Envelope => Some(Capability::Envelope),
            Self::Body => Some(Capability::Body),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Keep,
    FileInto,
    Redirect,
    Discard,
    Reject,
    AddHeader,
    DeleteHeader,
    Stop,
    Vacation,
}

impl ActionKind {
    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::FileInto => "fileinto",
            Self::Redirect => "redirect",
            Self::Discard => "discard",
            Self::Reject => "reject",
            Self::AddHeader => "addheader",
            Self::DeleteHeader => "deleteheader",
            Self::Stop => "stop",
            Self::Vacation => "vacation",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "fileinto" => Some(Self::FileInto),
            "redirect" => Some(Self::Redirect),
            "discard" => Some(Self::Discard),
            "reject" => Some(Self::Reject),
            "addheader" => Some(Self::AddHeader),
            "deleteheader" => Some(Self::DeleteHeader),
            "stop" => Some(Self::Stop),
            "vacation" => Some(Self::Vacation),
            _ => None,
        }
    }

    /// Actions with no parameters of their own.
    pub fn is_bare(&self) -> bool {
        matches!(self, Self::Keep | Self::Discard | Self::Stop)
    }

    /// Capability that must be required before the action may be used, if any.
    ///
    /// `addheader`/`deleteheader` belong to `editheader`, but the validator
    /// only cross-checks the gates listed here.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            Self::FileInto => Some(Capability::FileInto),
            Self::Reject => Some(Capability::Reject),
            Self::Vacation => Some(Capability::Vacation),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

/// Sieve extensions the editor knows how to declare.
///
/// The declaration order of [`Capability::ALL`] is the order of the
/// generated `require` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    FileInto,
    Reject,
    Vacation,
    Envelope,
    Variables,
    Body,
    Relational,
    Comparator,
    Subaddress,
    Copy,
    Imap4Flags,
    Date,
    Index,
    EditHeader,
    Enotify,
    Environment,
    Mime,
    Convert,
    Include,
    Fcc,
}

impl Capability {
    pub const ALL: [Capability; 20] = [
        Self::FileInto,
        Self::Reject,
        Self::Vacation,
        Self::Envelope,
        Self::Variables,
        Self::Body,
        Self::Relational,
        Self::Comparator,
        Self::Subaddress,
        Self::Copy,
        Self::Imap4Flags,
        Self::Date,
        Self::Index,
        Self::EditHeader,
        Self::Enotify,
        Self::Environment,
        Self::Mime,
        Self::Convert,
        Self::Include,
        Self::Fcc,
    ];

    pub fn as_sieve(&self) -> &'static str {
        match self {
            Self::FileInto => "fileinto",
            Self::Reject => "reject",
            Self::Vacation => "vacation",
            Self::Envelope => "envelope",
            Self::Variables => "variables",
            Self::Body => "body",
            Self::Relational => "relational",
            Self::Comparator => "comparator",
            Self::Subaddress => "subaddress",
            Self::Copy => "copy",
            Self::Imap4Flags => "imap4flags",
            Self::Date => "date",
            Self::Index => "index",
            Self::EditHeader => "editheader",
            Self::Enotify => "enotify",
            Self::Environment => "environment",
            Self::Mime => "mime",
            Self::Convert => "convert",
            Self::Include => "include",
            Self::Fcc => "fcc",
        }
    }

    pub fn from_sieve(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        Self::ALL.into_iter().find(|cap| cap.as_sieve() == lower)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sieve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_type_serde_uses_sieve_tags() {
        let json = serde_json::to_string(&MatchType::Contains).unwrap();
        assert_eq!(json, "\":contains\"");
        let back: MatchType = serde_json::from_str("\":matches\"").unwrap();
        assert_eq!(back, MatchType::Matches);
    }

    #[test]
    fn test_combinator_toggle() {
        assert_eq!(Combinator::AnyOf.toggled(), Combinator::AllOf);
        assert_eq!(Combinator::AllOf.toggled(), Combinator::AnyOf);
        assert_eq!(Combinator::from_sieve("ANYOF"), Some(Combinator::AnyOf));
    }

    #[test]
    fn test_capability_lookup() {
        assert_eq!(Capability::from_sieve("imap4flags"), Some(Capability::Imap4Flags));
        assert_eq!(Capability::from_sieve("regex"), None);
        assert_eq!(Capability::ALL[0], Capability::FileInto);
        assert_eq!(Capability::ALL[19], Capability::Fcc);
    }

    #[test]
    fn test_gated_kinds() {
        assert_eq!(ActionKind::FileInto.capability(), Some(Capability::FileInto));
        assert_eq!(ActionKind::Keep.capability(), None);
        assert_eq!(ConditionKind::Body.capability(), Some(Capability::Body));
        assert_eq!(ConditionKind::Header.capability(), None);
    }

    #[test]
    fn test_bare_actions() {
        assert!(ActionKind::Keep.is_bare());
        assert!(ActionKind::Stop.is_bare());
        assert!(!ActionKind::Reject.is_bare());
    }
}
