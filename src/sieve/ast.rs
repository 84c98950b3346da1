/// Syntax tree for SIEVE scripts, following the RFC 5228 grammar:
///
/// ```text
/// command   = identifier arguments (";" / block)
/// arguments = *argument [ test / test-list ]
/// test      = identifier arguments
/// ```
///
/// The tree is kind-agnostic; deciding what a `header` test or a
/// `fileinto` command means happens in the converter.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Lowercased command name (`require`, `if`, `fileinto`, ...).
    pub name: String,
    pub arguments: Vec<Argument>,
    /// The test (or test list) following the arguments, e.g. of `if`.
    pub tests: Vec<Test>,
    /// `Some` when the command ends in `{ ... }` instead of `;`.
    pub block: Option<Vec<Command>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    /// Lowercased test name (`header`, `anyof`, `not`, ...).
    pub name: String,
    pub arguments: Vec<Argument>,
    /// Nested tests: the list of `anyof`/`allof`, the operand of `not`.
    pub tests: Vec<Test>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Quoted or multi-line string.
    String(String),
    StringList(Vec<String>),
    Number(String),
    Tag(String),
}

impl Argument {
    /// Strings and string lists both read as a list of strings.
    pub fn as_strings(&self) -> Option<Vec<String>> {
        match self {
            Self::String(s) => Some(vec![s.clone()]),
            Self::StringList(items) => Some(items.clone()),
            _ => None,
        }
    }
}
