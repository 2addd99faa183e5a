//! Name-keyed registries for receivers and time intervals.
//!
//! # Responsibilities
//! - Enforce unique, non-empty `name` keys
//! - Remember which source file defined each entry
//! - Validate receiver integration settings after registration
//!
//! # Design Decisions
//! - First writer wins: a rejected insert leaves the registry untouched
//! - Rejections are returned as [`Issue`]s for the caller to collect
//! - Registration and content validation are decoupled: a receiver with bad
//!   content is still registered so routes referencing it resolve
//! - Entries keep insertion order, which is the order they are written out

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};
use url::Url;

use crate::config::validation::{type_name, Issue, IssueKind};

/// What a registry holds; drives the wording of its issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Receiver,
    TimeInterval,
}

impl RegistryKind {
    fn noun(self) -> &'static str {
        match self {
            RegistryKind::Receiver => "receiver",
            RegistryKind::TimeInterval => "time interval",
        }
    }

    fn title(self) -> &'static str {
        match self {
            RegistryKind::Receiver => "Receiver",
            RegistryKind::TimeInterval => "Time interval",
        }
    }
}

/// One registered definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub name: String,
    pub definition: Value,
    pub source: String,
}

/// Insertion-ordered collection of definitions with unique names.
#[derive(Debug, Clone)]
pub struct NamedRegistry {
    kind: RegistryKind,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl NamedRegistry {
    pub fn new(kind: RegistryKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// Register `definition` read from `source`.
    pub fn insert(&mut self, definition: Value, source: &str) -> Result<&Entry, Issue> {
        let title = self.kind.title();
        let noun = self.kind.noun();

        let Some(mapping) = definition.as_mapping() else {
            return Err(Issue::error(
                IssueKind::Structural,
                format!(
                    "{} definition in '{}' must be a mapping, got {}.",
                    title,
                    source,
                    type_name(&definition)
                ),
            ));
        };

        let name = match mapping.get("name") {
            None | Some(Value::Null) => {
                return Err(Issue::error(
                    IssueKind::Structural,
                    format!("{} definition in '{}' is missing the 'name' key.", title, source),
                ));
            }
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            Some(other) => {
                return Err(Issue::error(
                    IssueKind::Structural,
                    format!(
                        "{} name '{}' in '{}' is invalid or empty.",
                        title,
                        render_scalar(other),
                        source
                    ),
                ));
            }
        };

        if let Some(&existing) = self.index.get(&name) {
            return Err(Issue::error(
                IssueKind::Duplicate,
                format!(
                    "Duplicate {} name '{}' found. First defined in '{}', duplicated in '{}'.",
                    noun, name, self.entries[existing].source, source
                ),
            ));
        }

        tracing::debug!(kind = noun, name = %name, source, "Registered definition");
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(Entry {
            name,
            definition,
            source: source.to_string(),
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Definitions in insertion order, as written to the combined document.
    pub fn definitions(&self) -> Vec<Value> {
        self.entries.iter().map(|e| e.definition.clone()).collect()
    }
}

/// Set of named time intervals.
pub type TimeIntervalSet = NamedRegistry;

impl TimeIntervalSet {
    pub fn time_intervals() -> Self {
        NamedRegistry::new(RegistryKind::TimeInterval)
    }
}

/// Receiver definitions keyed by name.
#[derive(Debug, Clone)]
pub struct ReceiverRegistry {
    inner: NamedRegistry,
}

impl Default for ReceiverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self {
            inner: NamedRegistry::new(RegistryKind::Receiver),
        }
    }

    /// Register a receiver.
    ///
    /// On success returns the content issues found in the definition; the
    /// receiver stays registered regardless of them.
    pub fn insert(&mut self, definition: Value, source: &str) -> Result<Vec<Issue>, Issue> {
        let entry = self.inner.insert(definition, source)?;
        Ok(validate_receiver(entry))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.inner.get(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.inner.iter()
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.inner.definitions()
    }
}

/// Integration-specific checks for one registered receiver.
fn validate_receiver(entry: &Entry) -> Vec<Issue> {
    let mut issues = Vec::new();
    let Some(definition) = entry.definition.as_mapping() else {
        return issues;
    };
    let receiver = ReceiverRef {
        name: &entry.name,
        source: &entry.source,
    };

    receiver.each_config(definition, "webhook_configs", "Webhook", &mut issues, |i, config, issues| {
        let url = non_empty_str(config, "url");
        if url.is_none() && non_empty_str(config, "url_file").is_none() {
            issues.push(Issue::error(
                IssueKind::Content,
                format!(
                    "Webhook config {} for receiver '{}' in file '{}' is missing a 'url' or it's empty.",
                    i, receiver.name, receiver.source
                ),
            ));
        }
        if let Some(url) = url {
            if let Err(e) = Url::parse(url) {
                issues.push(Issue::warning(
                    IssueKind::Content,
                    format!(
                        "Webhook config {} for receiver '{}' in file '{}' has a 'url' that is not an absolute URL ({}): '{}'.",
                        i, receiver.name, receiver.source, e, url
                    ),
                ));
            }
        }
    });

    receiver.each_config(definition, "email_configs", "Email", &mut issues, |i, config, issues| {
        if non_empty_str(config, "to").is_none() {
            issues.push(Issue::error(
                IssueKind::Content,
                format!(
                    "Email config {} for receiver '{}' in file '{}' is missing a 'to' address.",
                    i, receiver.name, receiver.source
                ),
            ));
        }
    });

    receiver.each_config(definition, "slack_configs", "Slack", &mut issues, |i, config, issues| {
        if non_empty_str(config, "channel").is_none() && non_empty_str(config, "api_url").is_none() {
            issues.push(Issue::warning(
                IssueKind::Content,
                format!(
                    "Slack config {} for receiver '{}' in file '{}' sets neither 'channel' nor 'api_url'; global defaults will be used.",
                    i, receiver.name, receiver.source
                ),
            ));
        }
    });

    issues
}

#[derive(Clone, Copy)]
struct ReceiverRef<'a> {
    name: &'a str,
    source: &'a str,
}

impl ReceiverRef<'_> {
    /// Run `check` over each entry of the `key` integration list, reporting
    /// structural problems with the list itself.
    fn each_config<F>(&self, definition: &Mapping, key: &str, label: &str, issues: &mut Vec<Issue>, check: F)
    where
        F: Fn(usize, &Mapping, &mut Vec<Issue>),
    {
        let Some(configs) = definition.get(key) else {
            return;
        };
        let Some(configs) = configs.as_sequence() else {
            issues.push(Issue::error(
                IssueKind::Structural,
                format!(
                    "'{}' for receiver '{}' in file '{}' must be a list.",
                    key, self.name, self.source
                ),
            ));
            return;
        };

        for (i, config) in configs.iter().enumerate() {
            match config.as_mapping() {
                Some(config) => check(i, config, issues),
                None => issues.push(Issue::error(
                    IssueKind::Structural,
                    format!(
                        "{} config {} for receiver '{}' in file '{}' is not a mapping.",
                        label, i, self.name, self.source
                    ),
                )),
            }
        }
    }
}

fn non_empty_str<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a str> {
    mapping
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => type_name(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_duplicate_keeps_first_entry() {
        let mut registry = ReceiverRegistry::new();
        assert!(registry.insert(yaml("name: x\nemail_configs: [{to: a@example.com}]"), "a.yaml").unwrap().is_empty());

        let err = registry.insert(yaml("name: x"), "b.yaml").unwrap_err();
        assert_eq!(err.kind, IssueKind::Duplicate);
        assert!(err.is_fatal());
        assert_eq!(
            err.message,
            "Duplicate receiver name 'x' found. First defined in 'a.yaml', duplicated in 'b.yaml'."
        );

        assert_eq!(registry.len(), 1);
        let kept = registry.get("x").unwrap();
        assert_eq!(kept.source, "a.yaml");
        assert!(kept.definition.get("email_configs").is_some());
    }

    #[test]
    fn test_missing_or_invalid_name() {
        let mut registry = ReceiverRegistry::new();

        let missing = registry.insert(yaml("webhook_configs: []"), "a.yaml").unwrap_err();
        assert!(missing.message.contains("missing the 'name' key"));

        let empty = registry.insert(yaml("name: ''"), "a.yaml").unwrap_err();
        assert!(empty.message.contains("invalid or empty"));

        let numeric = registry.insert(yaml("name: 42"), "a.yaml").unwrap_err();
        assert!(numeric.message.contains("'42'"));

        let scalar = registry.insert(yaml("just-a-string"), "a.yaml").unwrap_err();
        assert_eq!(scalar.kind, IssueKind::Structural);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_webhook_url_validation() {
        let mut registry = ReceiverRegistry::new();

        let ok = registry
            .insert(yaml("name: hook\nwebhook_configs: [{url: 'http://example.com'}]"), "t.yaml")
            .unwrap();
        assert!(ok.is_empty());

        let issues = registry
            .insert(yaml("name: invalid_receiver\nwebhook_configs: [{url: ''}]"), "t.yaml")
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].to_string(),
            "Error: Webhook config 0 for receiver 'invalid_receiver' in file 't.yaml' is missing a 'url' or it's empty."
        );
        // Content problems do not prevent registration.
        assert!(registry.contains("invalid_receiver"));

        let relative = registry
            .insert(yaml("name: rel\nwebhook_configs: [{url: '/hook'}]"), "t.yaml")
            .unwrap();
        assert_eq!(relative.len(), 1);
        assert!(!relative[0].is_fatal());

        let from_file = registry
            .insert(yaml("name: file\nwebhook_configs: [{url_file: /etc/hook}]"), "t.yaml")
            .unwrap();
        assert!(from_file.is_empty());
    }

    #[test]
    fn test_integration_list_shapes() {
        let mut registry = ReceiverRegistry::new();

        let not_list = registry
            .insert(yaml("name: a\nwebhook_configs: {url: 'http://x'}"), "t.yaml")
            .unwrap();
        assert_eq!(not_list.len(), 1);
        assert!(not_list[0].message.contains("must be a list"));

        let not_mapping = registry
            .insert(yaml("name: b\nemail_configs: [oops]"), "t.yaml")
            .unwrap();
        assert!(not_mapping[0].message.contains("Email config 0"));

        let no_to = registry.insert(yaml("name: c\nemail_configs: [{}]"), "t.yaml").unwrap();
        assert!(no_to[0].is_fatal());

        let slack = registry.insert(yaml("name: d\nslack_configs: [{}]"), "t.yaml").unwrap();
        assert_eq!(slack.len(), 1);
        assert!(!slack[0].is_fatal());
    }

    #[test]
    fn test_time_interval_set() {
        let mut set = TimeIntervalSet::time_intervals();
        assert!(set.insert(yaml("name: weekdays"), "base.yaml").is_ok());
        let err = set.insert(yaml("name: weekdays"), "team.yaml").unwrap_err();
        assert!(err.message.starts_with("Duplicate time interval name 'weekdays'"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.kind(), RegistryKind::TimeInterval);
    }

    #[test]
    fn test_definitions_keep_insertion_order() {
        let mut registry = ReceiverRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.insert(yaml(&format!("name: {}", name)), "t.yaml").unwrap();
        }
        let names: Vec<_> = registry.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(registry.definitions().len(), 3);
    }
}
