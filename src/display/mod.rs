//! Human-readable output.
//!
//! # Data Flow
//! ```text
//! RouteTree
//!     → tree.rs (branch per route, attributes first, children last)
//!     → String (optionally ANSI coloured)
//! ```

pub mod tree;

pub use tree::TreeRenderer;
