//! Environment variable substitution in loaded documents.
//!
//! Any string value starting with `$` names an environment variable: the rest
//! of the string, upper-cased, is looked up and substituted. Mapping keys are
//! never substituted. An unresolved reference is reported as a warning and the
//! literal string is kept.

use std::collections::{BTreeMap, HashMap};

use serde_yaml::Value;

use crate::config::validation::{IssueKind, Issues};

/// Source of variable values.
pub trait Environment {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl Environment for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Substitute `$VAR` references in `value` in place.
pub fn interpolate(value: &mut Value, env: &dyn Environment, source: &str, issues: &mut Issues) {
    match value {
        Value::Mapping(mapping) => {
            for (_, v) in mapping.iter_mut() {
                interpolate(v, env, source, issues);
            }
        }
        Value::Sequence(items) => {
            for item in items.iter_mut() {
                interpolate(item, env, source, issues);
            }
        }
        Value::Tagged(tagged) => interpolate(&mut tagged.value, env, source, issues),
        Value::String(s) => {
            let Some(reference) = s.strip_prefix('$') else {
                return;
            };
            let name = reference.to_uppercase();
            match env.lookup(&name) {
                Some(resolved) => {
                    tracing::debug!(variable = %name, source, "Substituted environment variable");
                    *s = resolved;
                }
                None => issues.warning(
                    IssueKind::Substitution,
                    format!(
                        "Required environment variable '{}' not found for string '{}' in '{}'.",
                        name, s, source
                    ),
                ),
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
