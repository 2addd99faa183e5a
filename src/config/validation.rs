//! Configuration validation issues.
//!
//! # Responsibilities
//! - Describe one problem found while assembling a configuration
//! - Collect every problem of a pass, in discovery order
//! - Decide whether the pass is fatal
//!
//! # Design Decisions
//! - Issues are collected, never raised: a whole multi-file configuration
//!   is checked before any pass/fail decision is made
//! - The collector is append-only and passed explicitly by `&mut`
//! - Rendering prefixes `Error:` for fatal issues and `Warning:` otherwise

use std::fmt;

/// Whether an issue blocks producing the combined document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// Category of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Malformed input document.
    Parse,
    /// Wrong type at a recognized key.
    Structural,
    /// A route names a receiver that does not exist.
    Reference,
    /// Receiver or time interval name collision.
    Duplicate,
    /// Receiver content problem, e.g. empty webhook URL.
    Content,
    /// Unresolved `$VAR` reference.
    Substitution,
    /// Malformed matcher expression or regex.
    Matcher,
    /// A file could not be removed or written.
    Io,
}

/// One problem found during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "Error: {}", self.message),
            Severity::Warning => write!(f, "Warning: {}", self.message),
        }
    }
}

/// Append-only issue collector for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issues {
    entries: Vec<Issue>,
}

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Error => tracing::debug!(issue = %issue, "Recorded fatal issue"),
            Severity::Warning => tracing::debug!(issue = %issue, "Recorded warning"),
        }
        self.entries.push(issue);
    }

    pub fn error(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.push(Issue::error(kind, message));
    }

    pub fn warning(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.push(Issue::warning(kind, message));
    }

    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(Issue::is_fatal)
    }

    pub fn fatal_count(&self) -> usize {
        self.entries.iter().filter(|i| i.is_fatal()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.entries.iter()
    }

    /// Issues of one kind, in the order they were recorded.
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.entries.iter().filter(move |i| i.kind == kind)
    }
}

impl Extend<Issue> for Issues {
    fn extend<T: IntoIterator<Item = Issue>>(&mut self, iter: T) {
        for issue in iter {
            self.push(issue);
        }
    }
}

impl<'a> IntoIterator for &'a Issues {
    type Item = &'a Issue;
    type IntoIter = std::slice::Iter<'a, Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Issues {
    type Item = Issue;
    type IntoIter = std::vec::IntoIter<Issue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Human-readable name of a YAML value's type, for structural messages.
pub fn type_name(value: &serde_yaml::Value) -> &'static str {
    use serde_yaml::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
