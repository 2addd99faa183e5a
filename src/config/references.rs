//! Receiver reference validation for route subtrees.
//!
//! Also reports constraints that can never match, so a broken matcher shows
//! up when a configuration is assembled rather than only at evaluation time.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::config::registry::ReceiverRegistry;
use crate::config::validation::{type_name, Issue, IssueKind};
use crate::routing::matcher::{Condition, Syntax};
use crate::routing::node::Scalar;

/// Check that every `receiver` in the route subtree at `route` is registered.
///
/// `path` names the subtree in messages (`route`, `routes[2]`, ...) and grows
/// with `.routes[i]` on the way down. Receivers must be registered before this
/// is called; the order they were declared in across files does not matter.
pub fn validate_reference(
    route: &Value,
    path: &str,
    source: &str,
    registry: &ReceiverRegistry,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    walk(route, path, source, registry, &mut issues);
    issues
}

fn walk(route: &Value, path: &str, source: &str, registry: &ReceiverRegistry, issues: &mut Vec<Issue>) {
    let Some(route) = route.as_mapping() else {
        issues.push(Issue::error(
            IssueKind::Structural,
            format!(
                "Route at '{}' in file '{}' must be a mapping, got {}.",
                path,
                source,
                type_name(route)
            ),
        ));
        return;
    };

    if let Some(receiver) = route.get("receiver") {
        match receiver.as_str() {
            Some(name) if !name.is_empty() => {
                if !registry.contains(name) {
                    issues.push(Issue::error(
                        IssueKind::Reference,
                        format!(
                            "Receiver '{}' referenced at '{}' in file '{}' is not defined in any 'receivers' section.",
                            name, path, source
                        ),
                    ));
                }
            }
            _ => issues.push(Issue::error(
                IssueKind::Structural,
                format!(
                    "Invalid or empty receiver name at '{}.receiver' in file '{}'.",
                    path, source
                ),
            )),
        }
    }

    check_conditions(route, path, source, issues);

    let Some(children) = route.get("routes") else {
        return;
    };
    let Some(children) = children.as_sequence() else {
        issues.push(Issue::error(
            IssueKind::Structural,
            format!("'routes' at '{}.routes' in file '{}' must be a list.", path, source),
        ));
        return;
    };

    for (i, child) in children.iter().enumerate() {
        walk(child, &format!("{}.routes[{}]", path, i), source, registry, issues);
    }
}

fn check_conditions(route: &Mapping, path: &str, source: &str, issues: &mut Vec<Issue>) {
    let mut conditions = Vec::new();

    for (key, syntax) in [("match", Syntax::Match), ("match_re", Syntax::MatchRe)] {
        let Some(value) = route.get(key) else {
            continue;
        };
        match serde_yaml::from_value::<BTreeMap<String, Scalar>>(value.clone()) {
            Ok(entries) => conditions.extend(
                entries
                    .iter()
                    .map(|(label, value)| value.condition(syntax, label)),
            ),
            Err(_) => issues.push(Issue::error(
                IssueKind::Structural,
                format!(
                    "'{}' at '{}.{}' in file '{}' must map label names to scalar values, got {}.",
                    key,
                    path,
                    key,
                    source,
                    type_name(value)
                ),
            )),
        }
    }

    if let Some(value) = route.get("matchers") {
        match serde_yaml::from_value::<Vec<String>>(value.clone()) {
            Ok(expressions) => conditions.extend(expressions.iter().map(|e| Condition::expression(e))),
            Err(_) => issues.push(Issue::error(
                IssueKind::Structural,
                format!(
                    "'matchers' at '{}.matchers' in file '{}' must be a list of strings, got {}.",
                    path,
                    source,
                    type_name(value)
                ),
            )),
        }
    }

    for condition in &conditions {
        if let Some(err) = condition.error() {
            issues.push(Issue::warning(
                IssueKind::Matcher,
                format!(
                    "Matcher '{}' at '{}' in file '{}' will never match: {}.",
                    condition.source(),
                    path,
                    source,
                    err
                ),
            ));
        }
    }
}
