/// Emit SIEVE script text from a rule set.
///
/// Output depends only on the rule set: same model, same bytes.
use crate::model::{Action, Capability, Condition, Rule, RuleSet, DEFAULT_COMPARATOR};

const INDENT: &str = "    ";

pub fn generate(rule_set: &RuleSet) -> String {
    let mut out = String::new();

    let requires = compute_requires(rule_set);
    if !requires.is_empty() {
        let list = requires
            .iter()
            .map(|r| quote(r))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!("require [{list}];\n\n"));
    }

    for (i, rule) in rule_set.active_rules().enumerate() {
        let keyword = if i == 0 { "if" } else { "elsif" };
        emit_rule(&mut out, keyword, rule);
    }

    out
}

/// The `require` tokens for the enabled extensions, in canonical order.
pub fn compute_requires(rule_set: &RuleSet) -> Vec<String> {
    let mut requires: Vec<String> = Vec::new();

    for cap in rule_set.extensions.enabled() {
        if cap != Capability::Comparator {
            requires.push(cap.as_sieve().to_string());
            continue;
        }
        requires.push(format!("comparator-{DEFAULT_COMPARATOR}"));
        for name in used_comparators(rule_set) {
            let token = format!("comparator-{name}");
            if !requires.contains(&token) {
                requires.push(token);
            }
        }
    }

    requires
}

/// Non-default comparators named by active rules, in first-use order.
fn used_comparators(rule_set: &RuleSet) -> Vec<&str> {
    let mut names = Vec::new();
    for rule in rule_set.active_rules() {
        let from_conditions = rule.conditions.iter().filter_map(Condition::comparator);
        let from_actions = rule.actions.iter().filter_map(|a| match a {
            Action::DeleteHeader { comparator, .. } => comparator.as_deref(),
            _ => None,
        });
        for name in from_conditions.chain(from_actions) {
            if is_explicit_comparator(name) && !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn is_explicit_comparator(name: &str) -> bool {
    !name.is_empty() && name != DEFAULT_COMPARATOR
}

fn emit_rule(out: &mut String, keyword: &str, rule: &Rule) {
    out.push_str(keyword);
    out.push(' ');
    emit_condition_expr(out, rule);
    out.push_str("\n{\n");

    for action in &rule.actions {
        out.push_str(INDENT);
        emit_action(out, action);
        out.push_str(";\n");
    }

    out.push_str("}\n");
}

fn emit_condition_expr(out: &mut String, rule: &Rule) {
    match rule.conditions.as_slice() {
        [] => out.push_str("true"),
        [single] => emit_condition(out, single),
        conditions => {
            out.push_str(rule.combinator.as_sieve());
            out.push_str(" (");
            for (i, condition) in conditions.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                emit_condition(out, condition);
            }
            out.push(')');
        }
    }
}

fn emit_condition(out: &mut String, condition: &Condition) {
    match condition {
        Condition::Header {
            comparator,
            match_type,
            header,
            keys,
        } => {
            out.push_str("header ");
            out.push_str(match_type.as_sieve());
            out.push(' ');
            emit_comparator(out, comparator);
            out.push_str(&quote(header));
            out.push(' ');
            emit_string_list(out, keys);
        }
        Condition::Address {
            comparator,
            match_type,
            address_part,
            header,
            keys,
        } => emit_address_test(
            out,
            "address",
            comparator,
            match_type.as_sieve(),
            address_part.as_sieve(),
            header,
            keys,
        ),
        Condition::Envelope {
            comparator,
            match_type,
            address_part,
            header,
            keys,
        } => emit_address_test(
            out,
            "envelope",
            comparator,
            match_type.as_sieve(),
            address_part.as_sieve(),
            header,
            keys,
        ),
        Condition::Size { operator, size } => {
            out.push_str("size ");
            out.push_str(operator.as_sieve());
            out.push(' ');
            out.push_str(if size.is_empty() { "0" } else { size.as_str() });
        }
        Condition::Body {
            comparator,
            match_type,
            transform,
            keys,
        } => {
            out.push_str("body ");
            out.push_str(match_type.as_sieve());
            out.push(' ');
            out.push_str(transform.as_sieve());
            out.push(' ');
            emit_comparator(out, comparator);
            emit_string_list(out, keys);
        }
        Condition::Exists { headers } => {
            out.push_str("exists ");
            emit_string_or_list(out, headers);
        }
        Condition::True => out.push_str("true"),
        Condition::False => out.push_str("false"),
    }
}

fn emit_address_test(
    out: &mut String,
    keyword: &str,
    comparator: &str,
    match_type: &str,
    address_part: &str,
    header: &str,
    keys: &[String],
) {
    out.push_str(keyword);
    out.push(' ');
    out.push_str(match_type);
    out.push(' ');
    out.push_str(address_part);
    out.push(' ');
    emit_comparator(out, comparator);
    out.push_str(&quote(header));
    out.push(' ');
    emit_string_list(out, keys);
}

/// `:comparator "name" ` (trailing space included), only for a non-default comparator.
fn emit_comparator(out: &mut String, comparator: &str) {
    if is_explicit_comparator(comparator) {
        out.push_str(":comparator ");
        out.push_str(&quote(comparator));
        out.push(' ');
    }
}

fn emit_action(out: &mut String, action: &Action) {
    match action {
        Action::Keep => out.push_str("keep"),
        Action::Discard => out.push_str("discard"),
        Action::Stop => out.push_str("stop"),
        Action::FileInto {
            mailbox,
            create,
            copy,
            flags,
        } => {
            let mut options = Vec::new();
            if *create {
                options.push(":create".to_string());
            }
            if !flags.is_empty() {
                options.push(format!(":flags {}", string_list(flags)));
            }
            if *copy {
                options.push(":copy".to_string());
            }
            let mailbox = if mailbox.is_empty() { "INBOX" } else { mailbox.as_str() };
            emit_with_options(out, "fileinto", &options, &quote(mailbox));
        }
        Action::Redirect { address, copy } => {
            let options = if *copy { vec![":copy".to_string()] } else { Vec::new() };
            emit_with_options(out, "redirect", &options, &quote(address));
        }
        Action::Reject { reason } => {
            out.push_str("reject ");
            out.push_str(&quote(reason));
        }
        Action::AddHeader { name, value, last } => {
            out.push_str("addheader ");
            if *last {
                out.push_str(":last ");
            }
            out.push_str(&quote(name));
            out.push(' ');
            out.push_str(&quote(value));
        }
        Action::DeleteHeader {
            name,
            value,
            index,
            last,
            match_type,
            comparator,
        } => {
            let mut options = Vec::new();
            if let Some(index) = index {
                options.push(format!(":index {index}"));
            }
            if *last {
                options.push(":last".to_string());
            }
            if let Some(match_type) = match_type {
                options.push(match_type.as_sieve().to_string());
            }
            if let Some(comparator) = comparator.as_deref().filter(|c| is_explicit_comparator(c)) {
                options.push(format!(":comparator {}", quote(comparator)));
            }
            let mut positional = quote(name);
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                positional.push(' ');
                positional.push_str(&quote(value));
            }
            emit_with_options(out, "deleteheader", &options, &positional);
        }
        Action::Vacation {
            days,
            subject,
            message,
        } => {
            let mut options = Vec::new();
            if let Some(days) = days.filter(|d| *d > 0) {
                options.push(format!(":days {days}"));
            }
            if let Some(subject) = subject.as_deref().filter(|s| !s.is_empty()) {
                options.push(format!(":subject {}", quote(subject)));
            }
            emit_with_options(out, "vacation", &options, &quote(message));
        }
    }
}

/// `keyword <options> <positional>`; the option slot keeps its separator
/// even when empty, so `fileinto "X"` comes out as `fileinto  "X"`.
fn emit_with_options(out: &mut String, keyword: &str, options: &[String], positional: &str) {
    out.push_str(keyword);
    out.push(' ');
    out.push_str(&options.join(" "));
    out.push(' ');
    out.push_str(positional);
}

/// Key lists are always bracketed; an empty list renders as `[""]`.
fn emit_string_list(out: &mut String, items: &[String]) {
    out.push_str(&string_list(items));
}

fn string_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[\"\"]".to_string();
    }
    let quoted = items.iter().map(|s| quote(s)).collect::<Vec<_>>().join(", ");
    format!("[{quoted}]")
}

fn emit_string_or_list(out: &mut String, items: &[String]) {
    match items {
        [] => out.push_str("\"\""),
        [single] => out.push_str(&quote(single)),
        _ => out.push_str(&string_list(items)),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", escape_sieve_string(s))
}

fn escape_sieve_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
