/// Recover a rule set from SIEVE script text.
///
/// `parse()`: text → AST → model
///
/// Only what the rule model can hold comes back. Each top-level
/// `if`/`elsif`/`else` becomes one rule. A block whose tests fall outside
/// header/address/exists/true/false is skipped as a whole; actions other
/// than keep/fileinto/redirect/discard/stop/vacation/reject are dropped
/// from their rule. Both are logged at `warn`.
use tracing::{debug, warn};

use crate::model::{
    Action, ActionKind, AddressPart, CapabilitySet, Capability, Combinator, Condition,
    ConditionKind, MatchType, Rule, RuleId, RuleSet, DEFAULT_COMPARATOR,
};
use crate::sieve::ast::*;
use crate::sieve::error::ParseError;
use crate::sieve::parser;

/// Why a block could not become a rule.
#[derive(Debug, thiserror::Error)]
enum Unrecoverable {
    #[error("'{0}' test is not supported")]
    Test(String),
    #[error("'{test}' test: {detail}")]
    TestArguments { test: String, detail: String },
    #[error("block has no test")]
    MissingTest,
    #[error("nested blocks are not supported")]
    NestedBlock,
}

fn bad_arguments(test: &Test, detail: impl Into<String>) -> Unrecoverable {
    Unrecoverable::TestArguments {
        test: test.name.clone(),
        detail: detail.into(),
    }
}

pub fn parse(text: &str) -> Result<RuleSet, ParseError> {
    let script = parser::parse(text)?;
    script_to_rule_set(&script)
}

fn script_to_rule_set(script: &Script) -> Result<RuleSet, ParseError> {
    let mut extensions = CapabilitySet::none();
    let mut saw_require = false;
    let mut blocks = 0;
    let mut rules = Vec::new();

    for command in &script.commands {
        match command.name.as_str() {
            "require" if saw_require => {
                debug!("ignoring additional require statement");
            }
            "require" => {
                saw_require = true;
                let names = command
                    .arguments
                    .iter()
                    .filter_map(Argument::as_strings)
                    .flatten();
                for name in names {
                    enable_requirement(&mut extensions, &name);
                }
            }
            "if" | "elsif" | "else" => {
                blocks += 1;
                match block_to_rule(command) {
                    Ok(rule) => rules.push(rule),
                    Err(reason) => {
                        warn!(
                            block = blocks,
                            %reason,
                            "skipping block the rule model cannot represent"
                        );
                    }
                }
            }
            other => {
                debug!(command = other, "ignoring top-level command outside a rule");
            }
        }
    }

    if blocks == 0 {
        return Err(ParseError::NoBlocks);
    }

    Ok(RuleSet::new(rules, extensions))
}

/// `comparator-<name>` tokens all switch on the one `comparator` capability.
fn enable_requirement(extensions: &mut CapabilitySet, name: &str) {
    if name.starts_with("comparator-") {
        extensions.set(Capability::Comparator, true);
    } else {
        extensions.set_name(name, true);
    }
}

fn block_to_rule(command: &Command) -> Result<Rule, Unrecoverable> {
    let (combinator, conditions) = if command.name == "else" {
        (Combinator::AllOf, vec![Condition::True])
    } else {
        match command.tests.as_slice() {
            [test] => extract_conditions(test)?,
            _ => return Err(Unrecoverable::MissingTest),
        }
    };

    let body = command.block.as_deref().unwrap_or_default();
    let actions = extract_actions(body)?;

    Ok(Rule {
        id: RuleId::fresh(),
        active: true,
        combinator,
        conditions,
        actions,
    })
}

/// A bare test is stored as `allof` with one condition.
fn extract_conditions(test: &Test) -> Result<(Combinator, Vec<Condition>), Unrecoverable> {
    match Combinator::from_sieve(&test.name) {
        Some(combinator) => {
            let conditions = test
                .tests
                .iter()
                .map(test_to_condition)
                .collect::<Result<Vec<_>, _>>()?;
            Ok((combinator, conditions))
        }
        None => Ok((Combinator::AllOf, vec![test_to_condition(test)?])),
    }
}

fn test_to_condition(test: &Test) -> Result<Condition, Unrecoverable> {
    let kind = ConditionKind::from_sieve(&test.name)
        .ok_or_else(|| Unrecoverable::Test(test.name.clone()))?;
    if !test.tests.is_empty() {
        return Err(Unrecoverable::Test(test.name.clone()));
    }

    match kind {
        ConditionKind::Header => {
            let args = collect_test_args(test, false)?;
            let (header, keys) = header_and_keys(test, &args)?;
            Ok(Condition::Header {
                comparator: args.comparator(),
                match_type: args.match_type.unwrap_or_default(),
                header,
                keys,
            })
        }
        ConditionKind::Address => {
            let args = collect_test_args(test, true)?;
            let (header, keys) = header_and_keys(test, &args)?;
            Ok(Condition::Address {
                comparator: args.comparator(),
                match_type: args.match_type.unwrap_or_default(),
                address_part: args.address_part.unwrap_or_default(),
                header,
                keys,
            })
        }
        ConditionKind::Exists => {
            let args = collect_test_args(test, false)?;
            if args.match_type.is_some() || args.comparator.is_some() {
                return Err(bad_arguments(test, "takes no match type or comparator"));
            }
            match args.positional.as_slice() {
                [headers] => Ok(Condition::Exists {
                    headers: headers.clone(),
                }),
                _ => Err(bad_arguments(test, "expects one header list")),
            }
        }
        ConditionKind::True | ConditionKind::False => {
            if !test.arguments.is_empty() {
                return Err(bad_arguments(test, "takes no arguments"));
            }
            Ok(if kind == ConditionKind::True {
                Condition::True
            } else {
                Condition::False
            })
        }
        ConditionKind::Envelope | ConditionKind::Size | ConditionKind::Body => {
            Err(Unrecoverable::Test(test.name.clone()))
        }
    }
}

#[derive(Debug, Default)]
struct TestArgs {
    match_type: Option<MatchType>,
    comparator: Option<String>,
    address_part: Option<AddressPart>,
    positional: Vec<Vec<String>>,
}

impl TestArgs {
    fn comparator(&self) -> String {
        self.comparator
            .clone()
            .unwrap_or_else(|| DEFAULT_COMPARATOR.to_string())
    }
}

fn collect_test_args(test: &Test, allow_address_part: bool) -> Result<TestArgs, Unrecoverable> {
    let mut args = TestArgs::default();
    let mut iter = test.arguments.iter();

    while let Some(arg) = iter.next() {
        match arg {
            Argument::Tag(tag) if tag == ":comparator" => match iter.next() {
                Some(Argument::String(name)) => args.comparator = Some(name.clone()),
                _ => return Err(bad_arguments(test, "':comparator' needs a string")),
            },
            Argument::Tag(tag) => {
                if let Some(match_type) = MatchType::from_sieve(tag) {
                    args.match_type = Some(match_type);
                } else if let Some(part) =
                    AddressPart::from_sieve(tag).filter(|_| allow_address_part)
                {
                    args.address_part = Some(part);
                } else {
                    return Err(bad_arguments(test, format!("unsupported tag '{tag}'")));
                }
            }
            Argument::Number(n) => {
                return Err(bad_arguments(test, format!("unexpected number {n}")));
            }
            Argument::String(_) | Argument::StringList(_) => {
                args.positional.push(arg.as_strings().unwrap_or_default());
            }
        }
    }

    Ok(args)
}

fn header_and_keys(test: &Test, args: &TestArgs) -> Result<(String, Vec<String>), Unrecoverable> {
    match args.positional.as_slice() {
        [names, keys] => match names.as_slice() {
            [name] => Ok((name.clone(), keys.clone())),
            _ => Err(bad_arguments(test, "expects exactly one header name")),
        },
        _ => Err(bad_arguments(test, "expects a header name and a key list")),
    }
}

fn extract_actions(commands: &[Command]) -> Result<Vec<Action>, Unrecoverable> {
    let mut actions = Vec::new();
    for command in commands {
        if command.block.is_some() || matches!(command.name.as_str(), "if" | "elsif" | "else") {
            return Err(Unrecoverable::NestedBlock);
        }
        match command_to_action(command) {
            Some(action) => actions.push(action),
            None => warn!(
                action = %command.name,
                "dropping action the rule model cannot represent"
            ),
        }
    }
    Ok(actions)
}

fn command_to_action(command: &Command) -> Option<Action> {
    let kind = ActionKind::from_sieve(&command.name)?;
    let mut args = command.arguments.iter();

    let action = match kind {
        ActionKind::Keep => Action::Keep,
        ActionKind::Discard => Action::Discard,
        ActionKind::Stop => Action::Stop,
        ActionKind::FileInto => {
            let (mut create, mut copy) = (false, false);
            let mut flags = Vec::new();
            let mut mailbox = String::new();
            while let Some(arg) = args.next() {
                match arg {
                    Argument::Tag(t) if t == ":create" => create = true,
                    Argument::Tag(t) if t == ":copy" => copy = true,
                    Argument::Tag(t) if t == ":flags" => {
                        flags = args.next().and_then(Argument::as_strings).unwrap_or_default();
                    }
                    Argument::String(s) => mailbox = s.clone(),
                    other => debug!(?other, "ignoring fileinto argument"),
                }
            }
            Action::FileInto {
                mailbox,
                create,
                copy,
                flags,
            }
        }
        ActionKind::Redirect => {
            let mut copy = false;
            let mut address = String::new();
            for arg in args {
                match arg {
                    Argument::Tag(t) if t == ":copy" => copy = true,
                    Argument::String(s) => address = s.clone(),
                    other => debug!(?other, "ignoring redirect argument"),
                }
            }
            Action::Redirect { address, copy }
        }
        ActionKind::Reject => {
            let reason = args
                .find_map(|arg| match arg {
                    Argument::String(s) => Some(s.clone()),
                    _ => None,
                })
                .unwrap_or_default();
            Action::Reject { reason }
        }
        ActionKind::Vacation => {
            let mut days = None;
            let mut subject = None;
            let mut message = String::new();
            while let Some(arg) = args.next() {
                match arg {
                    Argument::Tag(t) if t == ":days" => {
                        days = match args.next() {
                            Some(Argument::Number(n)) => n.parse().ok(),
                            _ => None,
                        };
                    }
                    Argument::Tag(t) if t == ":subject" => {
                        subject = match args.next() {
                            Some(Argument::String(s)) => Some(s.clone()),
                            _ => None,
                        };
                    }
                    // Valued vacation tags the model has no field for.
                    Argument::Tag(t)
                        if matches!(
                            t.as_str(),
                            ":from" | ":addresses" | ":handle" | ":seconds" | ":fcc"
                        ) =>
                    {
                        debug!(tag = %t, "ignoring vacation option");
                        args.next();
                    }
                    Argument::String(s) => message = s.clone(),
                    other => debug!(?other, "ignoring vacation argument"),
                }
            }
            Action::Vacation {
                days,
                subject,
                message,
            }
        }
        ActionKind::AddHeader | ActionKind::DeleteHeader => return None,
    };

    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sieve::emitter::generate;

    const SIMPLE_FILEINTO: &str = r#"require "fileinto";

# Move spam
if header :contains "Subject" "SPAM" {
    fileinto "Junk";
    stop;
}
"#;

    const MULTI_CONDITION: &str = r#"require "fileinto";

if allof (header :is "From" "boss@example.com", header :contains "Subject" "urgent") {
    fileinto "Important";
}
"#;

    const ANYOF_SCRIPT: &str = r#"require "fileinto";

if anyof (header :contains "From" "news@a.com", header :contains "From" "news@b.com") {
    fileinto "Newsletters";
}
"#;

    const ADDRESS_DOMAIN_SCRIPT: &str = r#"require ["reject", "fileinto", "body", "mailbox"];

if address :is :domain "From" "hapimag.com" {
    fileinto "INBOX/Hapimag";
}
"#;

    fn caps(enabled: &[Capability]) -> CapabilitySet {
        let mut set = CapabilitySet::none();
        for cap in enabled {
            set.set(*cap, true);
        }
        set
    }

    /// Ids are minted fresh on every parse; compare everything else.
    fn without_ids(mut set: RuleSet) -> RuleSet {
        for rule in &mut set.rules {
            rule.id = RuleId::from("id");
        }
        set
    }

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_simple_fileinto() {
        let set = parse(SIMPLE_FILEINTO).unwrap();
        assert!(set.extensions.is_enabled(Capability::FileInto));
        assert_eq!(set.rules.len(), 1);

        let rule = &set.rules[0];
        assert!(rule.active);
        assert_eq!(rule.combinator, Combinator::AllOf);
        assert_eq!(
            rule.conditions,
            vec![Condition::header("Subject", MatchType::Contains, keys(&["SPAM"]))]
        );
        assert_eq!(rule.actions, vec![Action::file_into("Junk"), Action::Stop]);
    }

    #[test]
    fn test_parse_multi_condition_allof() {
        let set = parse(MULTI_CONDITION).unwrap();
        let rule = &set.rules[0];
        assert_eq!(rule.combinator, Combinator::AllOf);
        assert_eq!(
            rule.conditions,
            vec![
                Condition::header("From", MatchType::Is, keys(&["boss@example.com"])),
                Condition::header("Subject", MatchType::Contains, keys(&["urgent"])),
            ]
        );
    }

    #[test]
    fn test_parse_anyof() {
        let set = parse(ANYOF_SCRIPT).unwrap();
        let rule = &set.rules[0];
        assert_eq!(rule.combinator, Combinator::AnyOf);
        assert_eq!(rule.conditions.len(), 2);
    }

    #[test]
    fn test_parse_address_domain() {
        let set = parse(ADDRESS_DOMAIN_SCRIPT).unwrap();
        assert_eq!(set.rules.len(), 1);
        assert_eq!(
            set.rules[0].conditions,
            vec![Condition::address(
                "From",
                MatchType::Is,
                AddressPart::Domain,
                keys(&["hapimag.com"])
            )]
        );
        assert_eq!(set.rules[0].actions, vec![Action::file_into("INBOX/Hapimag")]);
        assert!(set.extensions.is_enabled(Capability::Reject));
        assert!(set.extensions.is_enabled(Capability::Body));
        assert!(set.extensions.is_enabled_name("mailbox"));
        assert!(!set.extensions.is_enabled(Capability::Vacation));
    }

    #[test]
    fn test_parse_generated_spam_filter() {
        let text = "require [\"fileinto\"];\n\nif header :is \"Subject\" [\"[SPAM]\"]\n{\n    fileinto  \"INBOX.Spam\";\n}\n";
        let set = parse(text).unwrap();
        assert_eq!(set.extensions, caps(&[Capability::FileInto]));
        assert_eq!(
            set.rules[0].conditions,
            vec![Condition::header("Subject", MatchType::Is, keys(&["[SPAM]"]))]
        );
        assert_eq!(set.rules[0].actions, vec![Action::file_into("INBOX.Spam")]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("this is not valid sieve {{{"),
            Err(ParseError::Expected { .. })
        ));
        assert_eq!(parse("").unwrap_err(), ParseError::NoBlocks);
        assert_eq!(
            parse("require [\"fileinto\"];\n\n").unwrap_err(),
            ParseError::NoBlocks
        );
        assert_eq!(parse("keep;").unwrap_err(), ParseError::NoBlocks);
        assert!(matches!(
            parse("if true { fileinto \"x; }"),
            Err(ParseError::Unterminated { what: "string", .. })
        ));
    }

    #[test]
    fn test_only_first_require_counts() {
        let set =
            parse("require [\"vacation\"];\nrequire [\"reject\"];\nif true { keep; }").unwrap();
        assert!(set.extensions.is_enabled(Capability::Vacation));
        assert!(!set.extensions.is_enabled(Capability::Reject));
    }

    #[test]
    fn test_comparator_tokens_enable_comparator() {
        let set = parse(
            "require [\"comparator-i;ascii-casemap\", \"comparator-i;octet\"];\n\
             if header :is :comparator \"i;octet\" \"X\" \"y\" { keep; }",
        )
        .unwrap();
        assert!(set.extensions.is_enabled(Capability::Comparator));
        assert!(!set.extensions.is_enabled_name("comparator-i;octet"));
        assert_eq!(set.rules[0].conditions[0].comparator(), Some("i;octet"));
    }

    #[test]
    fn test_else_becomes_true_rule() {
        let set = parse("if false { discard; } else { keep; }").unwrap();
        assert_eq!(set.rules.len(), 2);
        assert_eq!(set.rules[1].conditions, vec![Condition::True]);
        assert_eq!(set.rules[1].actions, vec![Action::Keep]);
    }

    #[test]
    fn test_unsupported_blocks_are_skipped() {
        let text = r#"
if not header :is "X" "y" { discard; }
elsif header :is "X" "1" { if true { keep; } }
elsif header :count "ge" "X" "2" { discard; }
elsif header :is ["To", "Cc"] "me" { discard; }
elsif exists "X-Keep" { keep; }
"#;
        let set = parse(text).unwrap();
        assert_eq!(set.rules.len(), 1);
        assert_eq!(set.rules[0].conditions, vec![Condition::exists(&["X-Keep"])]);
    }

    #[test]
    fn test_actions_keep_source_order_and_repeats() {
        let set = parse(
            "if true { stop; redirect :copy \"a@x.org\"; redirect \"b@x.org\"; keep; }",
        )
        .unwrap();
        assert_eq!(
            set.rules[0].actions,
            vec![
                Action::Stop,
                Action::Redirect {
                    address: "a@x.org".to_string(),
                    copy: true
                },
                Action::redirect("b@x.org"),
                Action::Keep,
            ]
        );
    }

    #[test]
    fn test_vacation_options() {
        let set = parse(
            "require \"vacation\";\n\
             if true { vacation :from \"me@x.org\" :days 5 :addresses [\"a@x.org\"] \"Gone\"; }",
        )
        .unwrap();
        assert_eq!(
            set.rules[0].actions,
            vec![Action::Vacation {
                days: Some(5),
                subject: None,
                message: "Gone".to_string(),
            }]
        );
    }

    #[test]
    fn test_multiline_vacation_message() {
        let set = parse("if true {\nvacation text:\nLine one\n..\n.\n;\n}").unwrap();
        assert!(matches!(
            &set.rules[0].actions[0],
            Action::Vacation { message, .. } if message == "Line one\n.\n"
        ));
    }

    #[test]
    fn test_round_trip_supported_subset() {
        let mut octet =
            Condition::header("Subject", MatchType::Matches, keys(&["*sale*", "*deal*"]));
        if let Condition::Header { comparator, .. } = &mut octet {
            *comparator = "i;octet".to_string();
        }
        let rules = vec![
            Rule::new(vec![octet], vec![Action::Discard, Action::Stop])
                .with_combinator(Combinator::AllOf),
            Rule::new(
                vec![
                    Condition::address(
                        "From",
                        MatchType::Contains,
                        AddressPart::Localpart,
                        keys(&["billing"]),
                    ),
                    Condition::exists(&["X-Invoice", "X-Order"]),
                    Condition::False,
                ],
                vec![
                    Action::FileInto {
                        mailbox: "Receipts".to_string(),
                        create: true,
                        copy: true,
                        flags: keys(&["\\Seen"]),
                    },
                    Action::Redirect {
                        address: "books@example.com".to_string(),
                        copy: true,
                    },
                ],
            ),
            Rule::new(
                vec![
                    Condition::header("To", MatchType::Is, keys(&["old@example.com"])),
                    Condition::header("Cc", MatchType::Is, keys(&["old@example.com"])),
                ],
                vec![Action::Reject {
                    reason: "Address \"old\" retired".to_string(),
                }],
            )
            .with_combinator(Combinator::AllOf),
            Rule::new(
                vec![Condition::True],
                vec![
                    Action::Vacation {
                        days: Some(7),
                        subject: Some("Out of Office".to_string()),
                        message: "I'm away.\nBack on Monday.".to_string(),
                    },
                    Action::Vacation {
                        days: None,
                        subject: None,
                        message: "Plain".to_string(),
                    },
                    Action::Keep,
                ],
            )
            .with_combinator(Combinator::AllOf),
        ];
        let extensions = caps(&[
            Capability::FileInto,
            Capability::Reject,
            Capability::Vacation,
            Capability::Comparator,
            Capability::Copy,
            Capability::Imap4Flags,
        ]);
        let model = RuleSet::new(rules, extensions);

        let parsed = parse(&generate(&model)).unwrap();
        assert_eq!(without_ids(parsed), without_ids(model));
    }

    #[test]
    fn test_round_trip_fills_defaults() {
        let model = RuleSet::new(
            vec![Rule::new(
                vec![Condition::header("Subject", MatchType::Is, Vec::new())],
                vec![Action::file_into("")],
            )],
            CapabilitySet::none(),
        );
        let parsed = parse(&generate(&model)).unwrap();
        let rule = &parsed.rules[0];
        assert_eq!(rule.combinator, Combinator::AllOf);
        assert_eq!(
            rule.conditions,
            vec![Condition::header("Subject", MatchType::Is, keys(&[""]))]
        );
        assert_eq!(rule.actions, vec![Action::file_into("INBOX")]);
    }

    #[test]
    fn test_round_trip_rule_without_conditions_gains_true() {
        let model = RuleSet::new(
            vec![Rule::new(Vec::new(), vec![Action::Keep])],
            CapabilitySet::none(),
        );
        let parsed = parse(&generate(&model)).unwrap();
        assert_eq!(parsed.rules[0].conditions, vec![Condition::True]);
    }

    #[test]
    fn test_round_trip_drops_unsupported_tests() {
        let supported = Rule::new(
            vec![Condition::header("Subject", MatchType::Contains, keys(&["x"]))],
            vec![Action::Keep],
        )
        .with_combinator(Combinator::AllOf);
        let envelope = Rule::new(
            vec![Condition::Envelope {
                comparator: DEFAULT_COMPARATOR.to_string(),
                match_type: MatchType::Is,
                address_part: AddressPart::Domain,
                header: "from".to_string(),
                keys: keys(&["example.com"]),
            }],
            vec![Action::Discard],
        );
        let size = Rule::new(
            vec![Condition::size(crate::model::SizeOperator::Over, "10M").unwrap()],
            vec![Action::Discard],
        );
        let body = Rule::new(
            vec![
                Condition::header("From", MatchType::Is, keys(&["a@b.c"])),
                Condition::Body {
                    comparator: DEFAULT_COMPARATOR.to_string(),
                    match_type: MatchType::Contains,
                    transform: crate::model::BodyTransform::Raw,
                    keys: keys(&["viagra"]),
                },
            ],
            vec![Action::Discard],
        );
        let model = RuleSet::new(
            vec![envelope, supported.clone(), size, body],
            caps(&[Capability::Envelope, Capability::Body]),
        );

        let parsed = parse(&generate(&model)).unwrap();
        assert_eq!(parsed.extensions, model.extensions);
        let expected = RuleSet::new(vec![supported], CapabilitySet::none());
        assert_eq!(without_ids(parsed).rules, without_ids(expected).rules);
    }

    #[test]
    fn test_round_trip_drops_header_editing_actions() {
        let model = RuleSet::new(
            vec![Rule::new(
                vec![Condition::True],
                vec![
                    Action::AddHeader {
                        name: "X-Seen".to_string(),
                        value: "1".to_string(),
                        last: false,
                    },
                    Action::file_into("Archive"),
                    Action::DeleteHeader {
                        name: "X-Junk".to_string(),
                        value: None,
                        index: None,
                        last: false,
                        match_type: None,
                        comparator: None,
                    },
                    Action::Stop,
                ],
            )],
            caps(&[Capability::FileInto, Capability::EditHeader]),
        );

        let parsed = parse(&generate(&model)).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(
            parsed.rules[0].actions,
            vec![Action::file_into("Archive"), Action::Stop]
        );
    }

    #[test]
    fn test_single_condition_anyof_comes_back_as_allof() {
        let model = RuleSet::new(
            vec![Rule::new(vec![Condition::True], vec![Action::Keep])],
            CapabilitySet::none(),
        );
        assert_eq!(model.rules[0].combinator, Combinator::AnyOf);
        let parsed = parse(&generate(&model)).unwrap();
        assert_eq!(parsed.rules[0].combinator, Combinator::AllOf);
    }
}
