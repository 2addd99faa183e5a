//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Alert labels (flat name → value map)
//!     → evaluator.rs (depth-first walk from the root)
//!     → node.rs (per-node conjunction of conditions)
//!     → matcher.rs (evaluate one condition)
//!     → Return: sorted receiver names
//!
//! Tree Construction (per call):
//!     `route` mapping
//!     → RouteSpec (serde)
//!     → Resolve defaults, parse conditions
//!     → Freeze as arena RouteTree
//! ```
//!
//! # Design Decisions
//! - Trees are built fresh for each evaluation, no state survives a call
//! - Malformed conditions fail closed (never match)
//! - Deterministic: same tree and labels always give the same receivers

use std::collections::BTreeMap;

pub mod evaluator;
pub mod matcher;
pub mod node;

pub use evaluator::RouteEvaluator;
pub use matcher::{Condition, Matcher, MatcherError, Operator};
pub use node::{NodeId, RouteNode, RouteSpec, RouteTree};

/// Alert labels, keyed by label name.
pub type Labels = BTreeMap<String, String>;
