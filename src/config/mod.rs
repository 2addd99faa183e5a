//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! render folder
//!     → loader.rs (read & parse base.yaml)
//!     → discovery.rs (walk folder, parse each fragment once)
//!     → interpolate.rs ($VAR substitution)
//!     → assembler.rs (stage-by-stage merge)
//!         → registry.rs (unique receivers / time intervals)
//!         → references.rs (route → receiver integrity)
//!         → validation.rs (collected issues)
//!     → combined document (written only without fatal issues)
//! ```
//!
//! # Design Decisions
//! - Every pass owns its registries and issue collector, nothing is global
//! - All issues across all files are collected before the pass/fail decision
//! - Tool settings are optional; every field has a default

pub mod assembler;
pub mod discovery;
pub mod interpolate;
pub mod loader;
pub mod references;
pub mod registry;
pub mod schema;
pub mod validation;

pub use assembler::{render, Assembler, Assembly, AssemblyFailure, RenderOutcome, Stage};
pub use discovery::LoadedDocument;
pub use interpolate::{Environment, ProcessEnv};
pub use loader::ConfigError;
pub use registry::{ReceiverRegistry, TimeIntervalSet};
pub use schema::Settings;
pub use validation::{Issue, IssueKind, Issues, Severity};
