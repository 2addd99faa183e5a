//! Route tree construction.
//!
//! # Responsibilities
//! - Deserialize one route mapping (and its nested `routes`) into [`RouteSpec`]
//! - Flatten the nested specs into an arena ([`RouteTree`]) addressed by [`NodeId`]
//! - Resolve per-node defaults once, at construction time
//!
//! # Design Decisions
//! - Children are owned by the arena; parents are index back-references only
//! - The root defaults to `continue: true` and the configured default
//!   receiver, every other node to `continue: false` and no receiver
//! - Constraint parse failures are kept on the node, never raised

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::routing::matcher::{Condition, Syntax};
use crate::routing::Labels;

/// Receiver used by a root route that does not name one.
pub const DEFAULT_RECEIVER: &str = "default";

/// A scalar label value as it may appear in YAML (`code: 500`, `paging: true`).
///
/// Numbers keep their YAML representation so `1.0` compares as `"1.0"`, the
/// same text an alert file produces for that literal.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Number(serde_yaml::Number),
    Bool(bool),
    Null,
}

impl Scalar {
    /// String form used for matching, or `None` for a missing (`null`) value.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::String(s) => Some(s.clone()),
            Scalar::Number(n) => Some(n.to_string()),
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Null => None,
        }
    }

    /// The condition declared by `label: self` in a `match` or `match_re` group.
    pub fn condition(&self, syntax: Syntax, label: &str) -> Condition {
        match (self.as_text(), syntax) {
            (Some(pattern), Syntax::MatchRe) => Condition::regex(label, &pattern),
            (Some(value), _) => Condition::equality(label, &value),
            (None, syntax) => Condition::missing_value(syntax, label),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => f.write_str(s),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => f.write_str("null"),
        }
    }
}

/// Input schema of one route node.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteSpec {
    pub receiver: Option<String>,

    pub group_by: Vec<String>,

    #[serde(rename = "match")]
    pub match_eq: BTreeMap<String, Scalar>,

    pub match_re: BTreeMap<String, Scalar>,

    pub matchers: Vec<String>,

    #[serde(rename = "continue")]
    pub continue_flag: Option<bool>,

    pub routes: Vec<RouteSpec>,

    pub group_wait: Option<String>,
    pub group_interval: Option<String>,
    pub repeat_interval: Option<String>,
}

/// Index of a node inside a [`RouteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Timing fields carried for display only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timings {
    pub group_wait: Option<String>,
    pub group_interval: Option<String>,
    pub repeat_interval: Option<String>,
}

/// One routing rule.
#[derive(Debug, Clone)]
pub struct RouteNode {
    receiver: String,
    group_by: Vec<String>,
    conditions: Vec<Condition>,
    continue_flag: bool,
    timings: Timings,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl RouteNode {
    /// Receiver name; empty when a non-root node does not name one.
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Constraints in declaration order: `match`, then `match_re`, then `matchers`.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn continues(&self) -> bool {
        self.continue_flag
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_catch_all(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Conjunction over every constraint; a node without constraints matches everything.
    pub fn matches(&self, labels: &Labels) -> bool {
        self.conditions.iter().all(|c| c.matches(labels))
    }
}

/// Arena-backed routing tree. The root is always node 0.
#[derive(Debug, Clone)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
}

impl RouteTree {
    /// Build a tree from a `route` mapping, using [`DEFAULT_RECEIVER`] for the root.
    pub fn from_value(route: &serde_yaml::Value) -> Result<Self, serde_yaml::Error> {
        Self::from_value_with_default(route, DEFAULT_RECEIVER)
    }

    pub fn from_value_with_default(
        route: &serde_yaml::Value,
        default_receiver: &str,
    ) -> Result<Self, serde_yaml::Error> {
        let spec: RouteSpec = serde_yaml::from_value(route.clone())?;
        Ok(Self::from_spec(&spec, default_receiver))
    }

    pub fn from_spec(spec: &RouteSpec, default_receiver: &str) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.push(spec, None, default_receiver);

        for (id, node) in tree.iter() {
            for condition in node.conditions() {
                if let Some(err) = condition.error() {
                    tracing::warn!(
                        node = id.index(),
                        receiver = node.receiver(),
                        error = %err,
                        "Matcher is invalid and will never match"
                    );
                }
            }
        }
        tree
    }

    fn push(&mut self, spec: &RouteSpec, parent: Option<NodeId>, default_receiver: &str) -> NodeId {
        let is_root = parent.is_none();
        let receiver = match &spec.receiver {
            Some(receiver) => receiver.clone(),
            None if is_root => default_receiver.to_string(),
            None => String::new(),
        };

        let mut conditions = Vec::with_capacity(
            spec.match_eq.len() + spec.match_re.len() + spec.matchers.len(),
        );
        conditions.extend(
            spec.match_eq
                .iter()
                .map(|(label, value)| value.condition(Syntax::Match, label)),
        );
        conditions.extend(
            spec.match_re
                .iter()
                .map(|(label, pattern)| pattern.condition(Syntax::MatchRe, label)),
        );
        conditions.extend(spec.matchers.iter().map(|expr| Condition::expression(expr)));

        let id = NodeId(self.nodes.len());
        self.nodes.push(RouteNode {
            receiver,
            group_by: spec.group_by.clone(),
            conditions,
            continue_flag: spec.continue_flag.unwrap_or(is_root),
            timings: Timings {
                group_wait: spec.group_wait.clone(),
                group_interval: spec.group_interval.clone(),
                repeat_interval: spec.repeat_interval.clone(),
            },
            parent,
            children: Vec::with_capacity(spec.routes.len()),
        });

        for child in &spec.routes {
            let child_id = self.push(child, Some(id), default_receiver);
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &RouteNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.node(parent).parent;
        }
        depth
    }

    /// Every non-empty receiver name referenced anywhere in the tree.
    pub fn receivers(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .map(RouteNode::receiver)
            .filter(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::matcher::MatcherError;

    fn tree(yaml: &str) -> RouteTree {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        RouteTree::from_value(&value).unwrap()
    }

    #[test]
    fn test_root_and_child_defaults() {
        let t = tree(
            r#"
routes:
  - match: {severity: critical}
  - receiver: slack
    continue: true
"#,
        );
        let root = t.node(t.root());
        assert_eq!(root.receiver(), DEFAULT_RECEIVER);
        assert!(root.continues());
        assert!(root.is_catch_all());

        let first = t.node(root.children()[0]);
        assert_eq!(first.receiver(), "");
        assert!(!first.continues());

        let second = t.node(root.children()[1]);
        assert_eq!(second.receiver(), "slack");
        assert!(second.continues());
    }

    #[test]
    fn test_explicit_root_continue_false() {
        let t = tree("receiver: ops\ncontinue: false\n");
        assert!(!t.node(t.root()).continues());
        assert_eq!(t.node(t.root()).receiver(), "ops");
    }

    #[test]
    fn test_custom_default_receiver() {
        let value: serde_yaml::Value = serde_yaml::from_str("group_by: [alertname]").unwrap();
        let t = RouteTree::from_value_with_default(&value, "blackhole").unwrap();
        assert_eq!(t.node(t.root()).receiver(), "blackhole");
        assert_eq!(t.node(t.root()).group_by(), ["alertname".to_string()]);
    }

    #[test]
    fn test_parent_links_and_depth() {
        let t = tree(
            r#"
receiver: root
routes:
  - receiver: a
    routes:
      - receiver: a1
  - receiver: b
"#,
        );
        let names: Vec<_> = t.iter().map(|(_, n)| n.receiver().to_string()).collect();
        assert_eq!(names, ["root", "a", "a1", "b"]);

        let (a1, _) = t.iter().find(|(_, n)| n.receiver() == "a1").unwrap();
        let a = t.node(a1).parent().unwrap();
        assert_eq!(t.node(a).receiver(), "a");
        assert_eq!(t.node(a).parent(), Some(t.root()));
        assert_eq!(t.depth(a1), 2);
        assert_eq!(t.depth(t.root()), 0);
    }

    #[test]
    fn test_conditions_from_all_syntaxes() {
        let t = tree(
            r#"
receiver: root
match:
  code: 500
match_re:
  job: "web.*"
matchers:
  - env = "prod"
"#,
        );
        let root = t.node(t.root());
        let syntaxes: Vec<_> = root.conditions().iter().map(|c| c.syntax()).collect();
        assert_eq!(syntaxes, [Syntax::Match, Syntax::MatchRe, Syntax::Matchers]);

        let labels: Labels = [("code", "500"), ("job", "webapp"), ("env", "prod")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(root.matches(&labels));
    }

    #[test]
    fn test_timings_carried() {
        let t = tree("group_wait: 30s\nrepeat_interval: 4h\n");
        let timings = t.node(t.root()).timings();
        assert_eq!(timings.group_wait.as_deref(), Some("30s"));
        assert_eq!(timings.group_interval, None);
        assert_eq!(timings.repeat_interval.as_deref(), Some("4h"));
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let value: serde_yaml::Value = serde_yaml::from_str("routes: not-a-list").unwrap();
        assert!(RouteTree::from_value(&value).is_err());
    }

    #[test]
    fn test_receivers_skip_empty() {
        let t = tree("receiver: r\nroutes:\n  - match: {a: b}\n  - receiver: s\n");
        let receivers: Vec<_> = t.receivers().collect();
        assert_eq!(receivers, ["r", "s"]);
    }

    #[test]
    fn test_null_constraint_value_fails_closed() {
        let t = tree(
            r#"
receiver: root
routes:
  - receiver: broken
    match: {team: }
  - receiver: regex
    match_re: {team: ~}
  - receiver: ops
    match: {team: ops}
"#,
        );
        let broken = t.node(t.node(t.root()).children()[0]);
        assert_eq!(broken.conditions().len(), 1);
        assert_eq!(broken.conditions()[0].source(), "team = null");
        assert!(matches!(
            broken.conditions()[0].error(),
            Some(MatcherError::MissingValue(label)) if label == "team"
        ));
        assert!(!broken.matches(&Labels::new()));

        let regex = t.node(t.node(t.root()).children()[1]);
        assert_eq!(regex.conditions()[0].syntax(), Syntax::MatchRe);
        assert!(regex.conditions()[0].error().is_some());

        let labels: Labels = [("team".to_string(), "ops".to_string())].into_iter().collect();
        assert!(t.node(t.node(t.root()).children()[2]).matches(&labels));
    }

    #[test]
    fn test_numeric_values_keep_yaml_text() {
        let t = tree(
            r#"
match:
  version: 1.0
  code: 500
  big: 18446744073709551615
  paging: true
"#,
        );
        let sources: Vec<_> = t
            .node(t.root())
            .conditions()
            .iter()
            .map(|c| c.source().to_string())
            .collect();
        assert_eq!(
            sources,
            [
                "big = 18446744073709551615",
                "code = 500",
                "paging = true",
                "version = 1.0",
            ]
        );
    }
}
