//! Alertmanager routing inspection library.
//!
//! Evaluates which receivers an alert would notify under a routing tree, and
//! assembles multi-file routing configurations with uniqueness and
//! referential-integrity checks.

pub mod config;
pub mod display;
pub mod observability;
pub mod routing;

pub use config::{render, Assembler, Issues, Settings};
pub use routing::{Labels, RouteEvaluator, RouteTree};
