use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::model::enums::{
    ActionKind, AddressPart, BodyTransform, Combinator, ConditionKind, MatchType, SizeOperator,
};
use crate::model::ModelError;

/// Comparator assumed when a test does not name one.
pub const DEFAULT_COMPARATOR: &str = "i;ascii-casemap";

fn default_comparator() -> String {
    DEFAULT_COMPARATOR.to_string()
}

fn default_true() -> bool {
    true
}

/// Accepts either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Action list that tolerates a leftover `parameters` object on
/// `keep`/`discard`/`stop`, as left behind when an action's type is
/// switched in place.
fn lenient_actions<'de, D>(deserializer: D) -> Result<Vec<Action>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|mut item| {
            if let Some(obj) = item.as_object_mut() {
                let bare = obj
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(ActionKind::from_sieve)
                    .is_some_and(|kind| kind.is_bare());
                if bare {
                    obj.remove("parameters");
                }
            }
            serde_json::from_value(item).map_err(de::Error::custom)
        })
        .collect()
}

/// Opaque rule identifier, unique within a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn fresh() -> Self {
        Self(format!("id_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RuleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single test inside a rule.
///
/// Persisted internally tagged by `type`, e.g.
/// `{"type": "header", "matchType": ":is", "header": "Subject", "keys": ["x"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Condition {
    Header {
        #[serde(default = "default_comparator")]
        comparator: String,
        #[serde(default, rename = "matchType")]
        match_type: MatchType,
        #[serde(default)]
        header: String,
        #[serde(default)]
        keys: Vec<String>,
    },
    Address {
        #[serde(default = "default_comparator")]
        comparator: String,
        #[serde(default, rename = "matchType")]
        match_type: MatchType,
        #[serde(default, rename = "addressPart")]
        address_part: AddressPart,
        #[serde(default)]
        header: String,
        #[serde(default)]
        keys: Vec<String>,
    },
    Envelope {
        #[serde(default = "default_comparator")]
        comparator: String,
        #[serde(default, rename = "matchType")]
        match_type: MatchType,
        #[serde(default, rename = "addressPart")]
        address_part: AddressPart,
        #[serde(default, alias = "part")]
        header: String,
        #[serde(default)]
        keys: Vec<String>,
    },
    Size {
        #[serde(default)]
        operator: SizeOperator,
        #[serde(default)]
        size: String,
    },
    Body {
        #[serde(default = "default_comparator")]
        comparator: String,
        #[serde(default, rename = "matchType")]
        match_type: MatchType,
        #[serde(default)]
        transform: BodyTransform,
        #[serde(default)]
        keys: Vec<String>,
    },
    Exists {
        #[serde(default, rename = "header", deserialize_with = "one_or_many")]
        headers: Vec<String>,
    },
    True,
    False,
}

impl Default for Condition {
    fn default() -> Self {
        Self::header("Subject", MatchType::Is, vec![String::new()])
    }
}

impl Condition {
    pub fn header(header: &str, match_type: MatchType, keys: Vec<String>) -> Self {
        Self::Header {
            comparator: default_comparator(),
            match_type,
            header: header.to_string(),
            keys,
        }
    }

    pub fn address(
        header: &str,
        match_type: MatchType,
        address_part: AddressPart,
        keys: Vec<String>,
    ) -> Self {
        Self::Address {
            comparator: default_comparator(),
            match_type,
            address_part,
            header: header.to_string(),
            keys,
        }
    }

    pub fn exists(headers: &[&str]) -> Self {
        Self::Exists {
            headers: headers.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Build a size test, checking that the limit is `digits [K|M|G]`.
    pub fn size(operator: SizeOperator, size: &str) -> Result<Self, ModelError> {
        if !is_size_literal(size) {
            return Err(ModelError::InvalidSize(size.to_string()));
        }
        Ok(Self::Size {
            operator,
            size: size.to_string(),
        })
    }

    pub fn kind(&self) -> ConditionKind {
        match self {
            Self::Header { .. } => ConditionKind::Header,
            Self::Address { .. } => ConditionKind::Address,
            Self::Envelope { .. } => ConditionKind::Envelope,
            Self::Size { .. } => ConditionKind::Size,
            Self::Body { .. } => ConditionKind::Body,
            Self::Exists { .. } => ConditionKind::Exists,
            Self::True => ConditionKind::True,
            Self::False => ConditionKind::False,
        }
    }

    /// Comparator named by the test, for the kinds that take one.
    pub fn comparator(&self) -> Option<&str> {
        match self {
            Self::Header { comparator, .. }
            | Self::Address { comparator, .. }
            | Self::Envelope { comparator, .. }
            | Self::Body { comparator, .. } => Some(comparator),
            _ => None,
        }
    }
}

fn is_size_literal(s: &str) -> bool {
    let digits = s.strip_suffix(['K', 'k', 'M', 'm', 'G', 'g']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// An effect applied when a rule matches.
///
/// Persisted adjacently tagged: `{"type": "fileinto", "parameters": {"mailbox": "Junk"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters", rename_all = "lowercase")]
pub enum Action {
    Keep,
    FileInto {
        #[serde(default)]
        mailbox: String,
        #[serde(default)]
        create: bool,
        #[serde(default)]
        copy: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        flags: Vec<String>,
    },
    Redirect {
        #[serde(default)]
        address: String,
        #[serde(default)]
        copy: bool,
    },
    Discard,
    Reject {
        #[serde(default)]
        reason: String,
    },
    AddHeader {
        #[serde(default)]
        name: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        last: bool,
    },
    DeleteHeader {
        #[serde(default)]
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
        #[serde(default)]
        last: bool,
        #[serde(default, rename = "matchType", skip_serializing_if = "Option::is_none")]
        match_type: Option<MatchType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        comparator: Option<String>,
    },
    Stop,
    Vacation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default)]
        message: String,
    },
}

impl Default for Action {
    fn default() -> Self {
        Self::file_into("INBOX.Filtered")
    }
}

impl Action {
    pub fn file_into(mailbox: &str) -> Self {
        Self::FileInto {
            mailbox: mailbox.to_string(),
            create: false,
            copy: false,
            flags: Vec::new(),
        }
    }

    pub fn redirect(address: &str) -> Self {
        Self::Redirect {
            address: address.to_string(),
            copy: false,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Keep => ActionKind::Keep,
            Self::FileInto { .. } => ActionKind::FileInto,
            Self::Redirect { .. } => ActionKind::Redirect,
            Self::Discard => ActionKind::Discard,
            Self::Reject { .. } => ActionKind::Reject,
            Self::AddHeader { .. } => ActionKind::AddHeader,
            Self::DeleteHeader { .. } => ActionKind::DeleteHeader,
            Self::Stop => ActionKind::Stop,
            Self::Vacation { .. } => ActionKind::Vacation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "RuleId::fresh")]
    pub id: RuleId,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "lenient_actions")]
    pub actions: Vec<Action>,
}

impl Default for Rule {
    fn default() -> Self {
        Self::new(vec![Condition::default()], vec![Action::default()])
    }
}

impl Rule {
    /// An active `anyof` rule with a fresh id.
    pub fn new(conditions: Vec<Condition>, actions: Vec<Action>) -> Self {
        Self {
            id: RuleId::fresh(),
            active: true,
            combinator: Combinator::AnyOf,
            conditions,
            actions,
        }
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }
}
