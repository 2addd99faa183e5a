//! Alert evaluation against a route tree.
//!
//! # Responsibilities
//! - Walk the tree depth-first, pre-order, from the root
//! - Apply the `continue` suppression rule
//! - Return the set of receivers that would be notified
//!
//! # Design Decisions
//! - A node that does not match contributes nothing, its subtree is skipped
//! - The first matching child with `continue: false` stops its remaining
//!   siblings and suppresses the parent's own receiver
//! - Receivers are returned sorted; evaluation has no side effects on the tree

use std::collections::BTreeSet;

use crate::routing::node::{NodeId, RouteTree};
use crate::routing::Labels;

/// Evaluates alerts against an immutable [`RouteTree`].
#[derive(Debug, Clone, Copy)]
pub struct RouteEvaluator<'a> {
    tree: &'a RouteTree,
}

impl<'a> RouteEvaluator<'a> {
    pub fn new(tree: &'a RouteTree) -> Self {
        Self { tree }
    }

    /// Receivers that would fire for `labels`, sorted by name.
    pub fn evaluate(&self, labels: &Labels) -> Vec<String> {
        let mut matched = BTreeSet::new();
        if !self.tree.is_empty() {
            self.visit(self.tree.root(), labels, &mut matched);
        }
        matched.into_iter().collect()
    }

    /// Returns whether the node at `id` matched.
    fn visit(&self, id: NodeId, labels: &Labels, matched: &mut BTreeSet<String>) -> bool {
        let node = self.tree.node(id);

        tracing::debug!(
            node = id.index(),
            receiver = node.receiver(),
            conditions = node.conditions().len(),
            continue_flag = node.continues(),
            "Evaluating route"
        );

        if !node.matches(labels) {
            tracing::debug!(receiver = node.receiver(), "Route did not match");
            return false;
        }
        tracing::debug!(receiver = node.receiver(), "Route matched");

        let mut stopped_by = None;
        for &child_id in node.children() {
            if self.visit(child_id, labels, matched) && !self.tree.node(child_id).continues() {
                stopped_by = Some(child_id);
                break;
            }
        }

        match stopped_by {
            Some(child_id) => {
                tracing::debug!(
                    receiver = node.receiver(),
                    child = self.tree.node(child_id).receiver(),
                    "Child matched with continue: false, suppressing receiver and skipping siblings"
                );
            }
            None if node.receiver().is_empty() => {
                tracing::debug!(node = id.index(), "Route has no receiver to add");
            }
            None => {
                tracing::debug!(receiver = node.receiver(), "Adding receiver");
                matched.insert(node.receiver().to_string());
            }
        }

        true
    }
}

/// Build a tree from a `route` mapping and evaluate one alert against it.
pub fn evaluate(
    route: &serde_yaml::Value,
    labels: &Labels,
) -> Result<Vec<String>, serde_yaml::Error> {
    let tree = RouteTree::from_value(route)?;
    Ok(RouteEvaluator::new(&tree).evaluate(labels))
}
