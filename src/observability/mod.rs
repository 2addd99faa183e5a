//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! routing / config subsystems
//!     → tracing events (node visits, stage transitions, issues)
//!     → logging.rs subscriber (stderr)
//! ```
//!
//! # Design Decisions
//! - The library only emits events; the binary decides where they go
//! - Evaluation detail is logged at debug, enabled by `--verbose`

pub mod logging;
