//! Named detection rules compiled into a single `RegexSet`.
//!
//! Rule order is the order of definition and is preserved in every result,
//! which keeps finding lists deterministic.

use crate::MatcherError;
use regex::RegexSet;
use std::sync::OnceLock;

/// Built-in ruleset: `(name, pattern)`. Names are part of the public contract.
const DEFAULT_RULES: &[(&str, &str)] = &[
    (
        "Generic API Key",
        r#"(?i)api[_-]?key['"]?\s*[:=]\s*['"]?[a-z0-9]{20,60}['"]?"#,
    ),
    ("Google API Key", r"AIza[0-9A-Za-z\-_]{35}"),
    ("AWS Access Key", r"(?:AKIA|ASIA)[0-9A-Z]{16}"),
    (
        "AWS Secret Key",
        r#"(?i)aws_?secret_?(?:access_?)?key['"]?\s*[:=]\s*['"]?[A-Za-z0-9/+=]{40}"#,
    ),
    (
        "Private Key",
        r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |ENCRYPTED |PGP )?PRIVATE KEY(?: BLOCK)?-----",
    ),
    ("Stripe Secret", r"(?:sk|rk)_live_[0-9a-zA-Z]{24,}"),
    ("GitHub Token", r"\bgh[pousr]_[A-Za-z0-9]{36,}"),
    ("Slack Token", r"\bxox[baprs]-[A-Za-z0-9-]{10,}"),
    (
        "Database Connection String",
        concat!(
            r"(?i)\b(?:postgres(?:ql)?|mysql|mariadb|mongodb(?:\+srv)?",
            r"|rediss?|amqps?|mssql|sqlserver)",
            r#"://[^\s:/@'"]+:[^\s@'"]+@[^\s/'"]+"#,
        ),
    ),
];

static DEFAULT_SET: OnceLock<RuleSet> = OnceLock::new();

/// An ordered list of named regular expressions.
#[derive(Debug, Clone)]
pub struct RuleSet {
    names: Vec<String>,
    set: RegexSet,
}

impl RuleSet {
    /// Compiles `(name, pattern)` pairs.
    ///
    /// # Errors
    /// `MatcherError::InvalidRule` naming the first rule whose pattern fails to compile.
    pub fn new<I, N, P>(rules: I) -> Result<Self, MatcherError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: AsRef<str>,
    {
        let mut names = Vec::new();
        let mut patterns = Vec::new();
        for (name, pattern) in rules {
            let name = name.into();
            // Compile individually first so the error can name the rule.
            regex::Regex::new(pattern.as_ref()).map_err(|e| MatcherError::InvalidRule {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            names.push(name);
            patterns.push(pattern.as_ref().to_string());
        }
        let set = RegexSet::new(&patterns).map_err(|e| MatcherError::InvalidRule {
            name: "<set>".into(),
            reason: e.to_string(),
        })?;
        Ok(Self { names, set })
    }

    /// The built-in ruleset, compiled once per process.
    pub fn default_rules() -> &'static RuleSet {
        DEFAULT_SET.get_or_init(|| {
            RuleSet::new(DEFAULT_RULES.iter().copied())
                .expect("BUG: built-in secret patterns must compile")
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names of every rule matching `line`, in rule order.
    pub(crate) fn matching<'a>(&'a self, line: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.set
            .matches(line)
            .into_iter()
            .map(move |idx| self.names[idx].as_str())
    }
}
