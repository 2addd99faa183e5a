//! Multi-file configuration assembly.
//!
//! # Responsibilities
//! - Merge a base document with fragment documents contributing
//!   `receivers`, `routes` and `time_intervals`
//! - Enforce unique receiver and time interval names across all files
//! - Check every route's receiver reference against the final registry
//! - Write the combined document only when no fatal issue was found
//!
//! # Stages
//! ```text
//! LoadBase → RegisterBaseReceivers → DiscoverFragments
//!     → MergeFragments → CrossValidate → Finalize
//! ```
//! Only `LoadBase` can fail immediately. Every later stage records issues and
//! keeps going, so one run reports every problem across every file.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::config::discovery::{self, LoadedDocument};
use crate::config::interpolate::{interpolate, Environment};
use crate::config::references::validate_reference;
use crate::config::registry::{ReceiverRegistry, TimeIntervalSet};
use crate::config::schema::Settings;
use crate::config::validation::{type_name, Issue, IssueKind, Issues, Severity};

const RECEIVERS: &str = "receivers";
const ROUTE: &str = "route";
const ROUTES: &str = "routes";
const TIME_INTERVALS: &str = "time_intervals";

/// Position of an assembly pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadBase,
    RegisterBaseReceivers,
    DiscoverFragments,
    MergeFragments,
    CrossValidate,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadBase => "load base",
            Stage::RegisterBaseReceivers => "register base receivers",
            Stage::DiscoverFragments => "discover fragments",
            Stage::MergeFragments => "merge fragments",
            Stage::CrossValidate => "cross-validate",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// A successful pass: the combined document plus any warnings.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Value,
    pub issues: Issues,
}

/// A failed pass. Carries every issue recorded up to the failing stage.
#[derive(Debug, Clone, thiserror::Error)]
#[error("configuration assembly failed at '{stage}' with {} fatal issue(s)", .issues.fatal_count())]
pub struct AssemblyFailure {
    pub stage: Stage,
    pub issues: Issues,
}

/// Contributions of one fragment, kept until all receivers are registered.
#[derive(Debug, Default)]
struct FragmentParts {
    source: String,
    receivers: Vec<Value>,
    routes: Vec<(String, Value)>,
    time_intervals: Vec<Value>,
}

/// One assembly pass. Owns its registries and issue collector.
pub struct Assembler<'e> {
    env: &'e dyn Environment,
    stage: Stage,
    issues: Issues,
    receivers: ReceiverRegistry,
    time_intervals: TimeIntervalSet,
}

impl<'e> Assembler<'e> {
    pub fn new(env: &'e dyn Environment) -> Self {
        Self {
            env,
            stage: Stage::LoadBase,
            issues: Issues::new(),
            receivers: ReceiverRegistry::new(),
            time_intervals: TimeIntervalSet::time_intervals(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "Assembly stage transition");
        self.stage = stage;
    }

    fn fail(self) -> AssemblyFailure {
        report(&self.issues);
        AssemblyFailure {
            stage: self.stage,
            issues: self.issues,
        }
    }

    fn register_receivers(&mut self, definitions: Vec<Value>, source: &str) {
        for definition in definitions {
            match self.receivers.insert(definition, source) {
                Ok(content_issues) => self.issues.extend(content_issues),
                Err(issue) => self.issues.push(issue),
            }
        }
    }

    fn register_time_intervals(&mut self, definitions: Vec<Value>, source: &str) {
        for definition in definitions {
            if let Err(issue) = self.time_intervals.insert(definition, source) {
                self.issues.push(issue);
            }
        }
    }

    /// Run the pass over `base` and `fragments` (in discovery order).
    pub fn assemble<I>(mut self, base: LoadedDocument, fragments: I) -> Result<Assembly, AssemblyFailure>
    where
        I: IntoIterator<Item = LoadedDocument>,
    {
        // LoadBase
        let base_source = base.source;
        let mut base_doc = match base.document {
            Ok(doc) => doc,
            Err(err) => {
                self.issues.error(
                    IssueKind::Parse,
                    format!("Failed to load base configuration from '{}': {}", base_source, err),
                );
                return Err(self.fail());
            }
        };
        if !base_doc.is_mapping() {
            self.issues.error(
                IssueKind::Structural,
                format!(
                    "Invalid format for '{}': expected a mapping at root, but got {}. Cannot proceed.",
                    base_source,
                    type_name(&base_doc)
                ),
            );
            return Err(self.fail());
        }
        interpolate(&mut base_doc, self.env, &base_source, &mut self.issues);
        tracing::info!(source = %base_source, "Base configuration loaded");

        self.enter(Stage::RegisterBaseReceivers);
        if let Some(receivers) = self.sequence_at(&base_doc, RECEIVERS, &base_source) {
            self.register_receivers(receivers, &base_source);
        }
        if let Some(intervals) = self.sequence_at(&base_doc, TIME_INTERVALS, &base_source) {
            self.register_time_intervals(intervals, &base_source);
        }

        self.enter(Stage::DiscoverFragments);
        let mut seen = HashSet::new();
        let mut parts = Vec::new();
        for fragment in fragments {
            if fragment.source == base_source || !seen.insert(fragment.source.clone()) {
                tracing::debug!(source = %fragment.source, "Skipping already processed file");
                continue;
            }
            if let Some(fragment_parts) = self.split_fragment(fragment) {
                parts.push(fragment_parts);
            }
        }

        self.enter(Stage::MergeFragments);
        let mut routes = Vec::new();
        let mut intervals = Vec::new();
        for part in &mut parts {
            let definitions = std::mem::take(&mut part.receivers);
            tracing::info!(source = %part.source, count = definitions.len(), "Registering receivers");
            self.register_receivers(definitions, &part.source);
        }
        for part in parts {
            for (path, route) in part.routes {
                let reference_issues = validate_reference(&route, &path, &part.source, &self.receivers);
                self.issues.extend(reference_issues);
                if route.is_mapping() {
                    routes.push(route);
                }
            }
            intervals.push((part.source, part.time_intervals));
        }
        for (source, definitions) in intervals {
            self.register_time_intervals(definitions, &source);
        }

        self.enter(Stage::CrossValidate);
        self.cross_validate(&base_doc, &base_source);

        self.enter(Stage::Finalize);
        let document = self.combine(base_doc, &base_source, routes);

        if self.issues.has_fatal() {
            tracing::error!(
                fatal = self.issues.fatal_count(),
                total = self.issues.len(),
                "Fatal errors found during validation, aborting configuration generation"
            );
            return Err(self.fail());
        }

        report(&self.issues);
        if self.issues.is_empty() {
            tracing::info!("Configuration passed all validation checks");
        } else {
            tracing::warn!(warnings = self.issues.len(), "Validation completed with warnings");
        }

        Ok(Assembly {
            document,
            issues: self.issues,
        })
    }

    /// The sequence under `key`, or `None` (recording an issue) if it is not one.
    fn sequence_at(&mut self, doc: &Value, key: &str, source: &str) -> Option<Vec<Value>> {
        match doc.get(key)? {
            Value::Sequence(items) => Some(items.clone()),
            other => {
                self.issues.error(
                    IssueKind::Structural,
                    format!("'{}' in '{}' must be a list, got {}.", key, source, type_name(other)),
                );
                None
            }
        }
    }

    /// Validate the shape of one fragment and split out its contributions.
    fn split_fragment(&mut self, fragment: LoadedDocument) -> Option<FragmentParts> {
        let source = fragment.source;
        let mut doc = match fragment.document {
            Ok(doc) => doc,
            Err(err) => {
                self.issues.error(IssueKind::Parse, err.to_string());
                return None;
            }
        };

        if !doc.is_mapping() {
            self.issues.warning(
                IssueKind::Structural,
                format!(
                    "Skipping '{}': expected a mapping at root, but got {}.",
                    source,
                    type_name(&doc)
                ),
            );
            return None;
        }
        if ![RECEIVERS, ROUTES, TIME_INTERVALS].iter().any(|k| doc.get(k).is_some()) {
            self.issues.warning(
                IssueKind::Structural,
                format!(
                    "Skipping '{}': no expected root keys ('receivers', 'routes', 'time_intervals') found.",
                    source
                ),
            );
            return None;
        }

        interpolate(&mut doc, self.env, &source, &mut self.issues);

        let mut parts = FragmentParts {
            source,
            ..FragmentParts::default()
        };
        for key in [RECEIVERS, ROUTES, TIME_INTERVALS] {
            let Some(value) = doc.get_mut(key).map(|v| std::mem::replace(v, Value::Null)) else {
                continue;
            };
            let items = match value {
                Value::Sequence(items) => items,
                Value::Mapping(route) if key == ROUTES => {
                    parts.routes.push((ROUTE.to_string(), Value::Mapping(route)));
                    continue;
                }
                other => {
                    self.issues.error(
                        IssueKind::Structural,
                        format!(
                            "Expected a list for '{}' in '{}', but got {}.",
                            key,
                            parts.source,
                            type_name(&other)
                        ),
                    );
                    break;
                }
            };

            tracing::info!(source = %parts.source, key, count = items.len(), "Found fragment entries");
            match key {
                RECEIVERS => parts.receivers = items,
                ROUTES => parts.routes.extend(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, route)| (format!("routes[{}]", i), route)),
                ),
                _ => parts.time_intervals = items,
            }
        }

        Some(parts)
    }

    /// Check the base route tree against the final registry.
    fn cross_validate(&mut self, base_doc: &Value, base_source: &str) {
        let Some(route) = base_doc.get(ROUTE) else {
            self.issues.warning(
                IssueKind::Structural,
                format!("Key 'route' not found in '{}'.", base_source),
            );
            return;
        };
        let Some(route) = route.as_mapping() else {
            self.issues.error(
                IssueKind::Structural,
                format!(
                    "'route' in '{}' must be a mapping, got {}.",
                    base_source,
                    type_name(route)
                ),
            );
            return;
        };

        match route.get("receiver") {
            None => self.issues.warning(
                IssueKind::Reference,
                format!(
                    "Root route in '{}' has no 'receiver'; alerts that match no child route are not delivered.",
                    base_source
                ),
            ),
            Some(Value::String(name)) if !name.is_empty() => {
                if !self.receivers.contains(name) {
                    self.issues.error(
                        IssueKind::Reference,
                        format!(
                            "Root receiver '{}' referenced at 'route.receiver' in file '{}' is not defined in any 'receivers' section.",
                            name, base_source
                        ),
                    );
                }
            }
            Some(_) => self.issues.error(
                IssueKind::Structural,
                format!(
                    "Invalid or empty receiver name at 'route.receiver' in file '{}'.",
                    base_source
                ),
            ),
        }

        match route.get(ROUTES) {
            None => {}
            Some(Value::Sequence(children)) => {
                for (i, child) in children.iter().enumerate() {
                    let path = format!("route.routes[{}]", i);
                    let reference_issues = validate_reference(child, &path, base_source, &self.receivers);
                    self.issues.extend(reference_issues);
                }
            }
            Some(other) => self.issues.error(
                IssueKind::Structural,
                format!(
                    "'routes' at 'route.routes' in file '{}' must be a list, got {}.",
                    base_source,
                    type_name(other)
                ),
            ),
        }
    }

    /// Build the combined document from the base and the merged registries.
    fn combine(&mut self, mut doc: Value, base_source: &str, routes: Vec<Value>) -> Value {
        if !doc.is_mapping() {
            return doc;
        }
        if let Some(root) = doc.as_mapping_mut() {
            self.merge_into(root, base_source, routes);
        }
        doc
    }

    fn merge_into(&mut self, root: &mut Mapping, base_source: &str, routes: Vec<Value>) {
        if root.contains_key(RECEIVERS) || !self.receivers.is_empty() {
            root.insert(RECEIVERS.into(), Value::Sequence(self.receivers.definitions()));
        }

        if !routes.is_empty() {
            let route = root
                .entry(ROUTE.into())
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            if !route.is_mapping() {
                *route = Value::Mapping(Mapping::new());
            }
            if let Some(route) = route.as_mapping_mut() {
                let children = route
                    .entry(ROUTES.into())
                    .or_insert_with(|| Value::Sequence(Vec::new()));
                match children.as_sequence_mut() {
                    Some(children) => {
                        tracing::debug!(count = routes.len(), "Extending root routes");
                        children.extend(routes);
                    }
                    // Already reported by cross_validate.
                    None => tracing::debug!(
                        source = base_source,
                        "Base 'route.routes' is not a list, fragment routes not appended"
                    ),
                }
            }
        }

        if root.contains_key(TIME_INTERVALS) || !self.time_intervals.is_empty() {
            root.insert(
                TIME_INTERVALS.into(),
                Value::Sequence(self.time_intervals.definitions()),
            );
        }
    }
}

fn report(issues: &Issues) {
    for issue in issues {
        match issue.severity {
            Severity::Error => tracing::error!("- {}", issue),
            Severity::Warning => tracing::warn!("- {}", issue),
        }
    }
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output: PathBuf,
    pub fragments: usize,
    pub issues: Issues,
}

fn io_failure(stage: Stage, message: String) -> AssemblyFailure {
    let mut issues = Issues::new();
    issues.push(Issue::error(IssueKind::Io, message));
    AssemblyFailure { stage, issues }
}

/// Assemble the configuration in `folder` and write the combined document.
///
/// A stale output file is removed first, so a failed render never leaves an
/// old combined document behind.
pub fn render(folder: &Path, settings: &Settings, env: &dyn Environment) -> Result<RenderOutcome, AssemblyFailure> {
    tracing::info!(folder = %folder.display(), "Starting alertmanager configuration generation");
    let output = folder.join(&settings.output_file);

    if output.exists() {
        fs::remove_file(&output).map_err(|e| {
            io_failure(
                Stage::LoadBase,
                format!("Cannot remove stale output '{}': {}", output.display(), e),
            )
        })?;
    }

    let base = LoadedDocument::load(&folder.join(&settings.base_file));
    let fragments = discovery::discover(folder, settings);
    let fragment_count = fragments.len();

    let assembly = Assembler::new(env).assemble(base, fragments)?;

    let content = serde_yaml::to_string(&assembly.document).map_err(|e| {
        io_failure(
            Stage::Finalize,
            format!("Cannot serialize combined configuration: {}", e),
        )
    })?;
    fs::write(&output, content).map_err(|e| {
        io_failure(
            Stage::Finalize,
            format!("Error writing to output file '{}': {}", output.display(), e),
        )
    })?;
    tracing::info!(output = %output.display(), "Successfully generated combined configuration");

    Ok(RenderOutcome {
        output,
        fragments: fragment_count,
        issues: assembly.issues,
    })
}
