//! Label matching logic.
//!
//! # Responsibilities
//! - Parse the three constraint syntaxes (`match`, `match_re`, `matchers`)
//! - Normalize them to one operator set (`=`, `!=`, `=~`, `!~`)
//! - Evaluate a constraint against a flat set of alert labels
//!
//! # Design Decisions
//! - Parsing and evaluation are separate: a [`Condition`] holds either a
//!   parsed [`Matcher`] or the parse error, and an error always evaluates
//!   to "no match" (fail closed)
//! - An absent label compares as the empty string
//! - Regex operators search anywhere in the value, they are not anchored

use std::fmt;

use regex::Regex;

use crate::routing::Labels;

/// Comparison operator shared by all matcher syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    RegexMatch,
    RegexNotMatch,
}

impl Operator {
    /// The operator as written in a `matchers` expression.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::RegexMatch => "=~",
            Operator::RegexNotMatch => "!~",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            "=~" => Some(Operator::RegexMatch),
            "!~" => Some(Operator::RegexNotMatch),
            _ => None,
        }
    }

    fn is_regex(self) -> bool {
        matches!(self, Operator::RegexMatch | Operator::RegexNotMatch)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Reasons a constraint could not be turned into a [`Matcher`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatcherError {
    #[error("invalid matcher format: '{0}'")]
    Malformed(String),

    #[error("unknown operator '{operator}' in matcher '{expression}'")]
    UnknownOperator { operator: String, expression: String },

    #[error("invalid label name '{0}'")]
    InvalidLabel(String),

    #[error("missing value for label '{0}'")]
    MissingValue(String),

    #[error("invalid regex pattern '{pattern}' for label '{label}': {reason}")]
    InvalidRegex {
        label: String,
        pattern: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
enum Operand {
    Literal,
    Pattern(Regex),
}

/// A single parsed `label OP value` constraint.
#[derive(Debug, Clone)]
pub struct Matcher {
    label: String,
    operator: Operator,
    value: String,
    operand: Operand,
}

impl Matcher {
    /// Create a matcher, validating the label name and compiling regex operands.
    pub fn new(
        label: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
    ) -> Result<Self, MatcherError> {
        let label = label.into();
        let value = value.into();

        if !is_valid_label_name(&label) {
            return Err(MatcherError::InvalidLabel(label));
        }

        let operand = if operator.is_regex() {
            let regex = Regex::new(&value).map_err(|e| MatcherError::InvalidRegex {
                label: label.clone(),
                pattern: value.clone(),
                reason: e.to_string(),
            })?;
            Operand::Pattern(regex)
        } else {
            Operand::Literal
        };

        Ok(Self {
            label,
            operator,
            value,
            operand,
        })
    }

    /// Build from a `match` entry (`label: value`).
    pub fn from_equality(label: &str, value: &str) -> Result<Self, MatcherError> {
        Self::new(label, Operator::Equal, value)
    }

    /// Build from a `match_re` entry (`label: pattern`).
    pub fn from_regex(label: &str, pattern: &str) -> Result<Self, MatcherError> {
        Self::new(label, Operator::RegexMatch, pattern)
    }

    /// Parse a `matchers` expression such as `severity = "critical"`.
    ///
    /// Whitespace around the operator and around the value is ignored, and a
    /// value wrapped in double quotes has the quotes stripped.
    pub fn parse(expression: &str) -> Result<Self, MatcherError> {
        let malformed = || MatcherError::Malformed(expression.to_string());

        let rest = expression.trim_start();
        let label_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let (label, rest) = rest.split_at(label_len);
        if !is_valid_label_name(label) {
            return Err(malformed());
        }

        let rest = rest.trim_start();
        let op_len = rest
            .find(|c: char| !matches!(c, '=' | '!' | '~'))
            .unwrap_or(rest.len());
        if op_len == 0 {
            return Err(malformed());
        }
        let (symbol, rest) = rest.split_at(op_len);
        let operator =
            Operator::from_symbol(symbol).ok_or_else(|| MatcherError::UnknownOperator {
                operator: symbol.to_string(),
                expression: expression.to_string(),
            })?;

        Self::new(label, operator, unquote(rest.trim()))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if the alert labels satisfy this constraint.
    pub fn matches(&self, labels: &Labels) -> bool {
        let actual = labels.get(&self.label).map(String::as_str).unwrap_or("");

        match (&self.operand, self.operator) {
            (Operand::Pattern(re), Operator::RegexMatch) => re.is_match(actual),
            (Operand::Pattern(re), Operator::RegexNotMatch) => !re.is_match(actual),
            (_, Operator::Equal) => actual == self.value,
            (_, Operator::NotEqual) => actual != self.value,
            // Regex operators always carry a compiled pattern.
            (Operand::Literal, _) => false,
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.label, self.operator, self.value)
    }
}

/// Which constraint group of a route a condition was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `match: {label: value}`
    Match,
    /// `match_re: {label: pattern}`
    MatchRe,
    /// `matchers: ["label OP value"]`
    Matchers,
}

/// A declared constraint together with its parse outcome.
#[derive(Debug, Clone)]
pub struct Condition {
    syntax: Syntax,
    source: String,
    parsed: Result<Matcher, MatcherError>,
}

impl Condition {
    pub fn equality(label: &str, value: &str) -> Self {
        Self {
            syntax: Syntax::Match,
            source: format!("{} = {}", label, value),
            parsed: Matcher::from_equality(label, value),
        }
    }

    pub fn regex(label: &str, pattern: &str) -> Self {
        Self {
            syntax: Syntax::MatchRe,
            source: format!("{} =~ {}", label, pattern),
            parsed: Matcher::from_regex(label, pattern),
        }
    }

    pub fn expression(expression: &str) -> Self {
        Self {
            syntax: Syntax::Matchers,
            source: expression.to_string(),
            parsed: Matcher::parse(expression),
        }
    }

    /// A `match`/`match_re` entry declared without a value. It never matches.
    pub fn missing_value(syntax: Syntax, label: &str) -> Self {
        let symbol = match syntax {
            Syntax::MatchRe => Operator::RegexMatch.symbol(),
            Syntax::Match | Syntax::Matchers => Operator::Equal.symbol(),
        };
        Self {
            syntax,
            source: format!("{} {} null", label, symbol),
            parsed: Err(MatcherError::MissingValue(label.to_string())),
        }
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// The constraint as declared in the configuration.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matcher(&self) -> Option<&Matcher> {
        self.parsed.as_ref().ok()
    }

    pub fn error(&self) -> Option<&MatcherError> {
        self.parsed.as_ref().err()
    }

    /// Evaluate against the alert labels. An unparsable condition never matches.
    pub fn matches(&self, labels: &Labels) -> bool {
        match &self.parsed {
            Ok(matcher) => matcher.matches(labels),
            Err(_) => false,
        }
    }
}

/// Returns true if `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
