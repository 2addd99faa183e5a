//! axe: inspect and troubleshoot Alertmanager routing configurations.
//!
//! # Commands
//!
//! ```text
//!   tree <file>                         print the route tree
//!   eval <file> --alert <path>          which receivers would fire for an alert
//!        [--label key=value]... [--verbose]
//!   render <folder> [--verbose]         merge base.yaml with every fragment in
//!                                       the folder and write alertmanager.yaml
//! ```
//!
//! Exit status is 0 on success and 1 on any fatal condition.

use std::error::Error;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use axe::config::{self, loader, ConfigError, Issues, ProcessEnv, Settings};
use axe::display::TreeRenderer;
use axe::observability::logging;
use axe::routing::{Labels, RouteEvaluator, RouteTree};

#[derive(Parser)]
#[command(name = "axe")]
#[command(about = "Inspect and troubleshoot Alertmanager routing configurations", long_about = None)]
struct Cli {
    /// Optional TOML settings file
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the alertmanager configuration route tree
    Tree {
        /// Path to the YAML file
        file: PathBuf,
    },
    /// Evaluate which receivers an alert would be routed to
    Eval {
        /// Path to the YAML file
        file: PathBuf,

        /// Alert labels as a JSON or YAML mapping
        #[arg(long, required_unless_present = "labels")]
        alert: Option<PathBuf>,

        /// Extra label, overriding the alert file (repeatable)
        #[arg(short, long = "label", value_name = "KEY=VALUE", value_parser = parse_label)]
        labels: Vec<(String, String)>,

        /// Log every routing decision
        #[arg(short, long)]
        verbose: bool,
    },
    /// Render the combined alertmanager configuration from a folder
    Render {
        /// Folder containing base.yaml and fragment files
        folder: PathBuf,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn parse_label(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", arg)),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = matches!(
        cli.command,
        Commands::Eval { verbose: true, .. } | Commands::Render { verbose: true, .. }
    );
    logging::init(verbose);

    let result = load_settings(cli.settings.as_deref()).and_then(|settings| match cli.command {
        Commands::Tree { file } => run_tree(&file, &settings),
        Commands::Eval {
            file,
            alert,
            labels,
            ..
        } => run_eval(&file, alert.as_deref(), labels, &settings),
        Commands::Render { folder, .. } => run_render(&folder, &settings),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn Error>> {
    match path {
        Some(path) => {
            let settings = loader::load_settings(path)?;
            tracing::debug!(path = %path.display(), "Settings loaded");
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}

fn build_tree(file: &Path, settings: &Settings) -> Result<RouteTree, ConfigError> {
    let route = loader::load_route(file)?;
    RouteTree::from_value_with_default(&route, &settings.default_receiver).map_err(|source| {
        ConfigError::Route {
            path: file.to_path_buf(),
            source,
        }
    })
}

fn run_tree(file: &Path, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let tree = build_tree(file, settings)?;
    let renderer = TreeRenderer::new(std::io::stdout().is_terminal());
    print!("{}", renderer.render(&tree));
    Ok(())
}

fn run_eval(
    file: &Path,
    alert: Option<&Path>,
    overrides: Vec<(String, String)>,
    settings: &Settings,
) -> Result<(), Box<dyn Error>> {
    let tree = build_tree(file, settings)?;

    let mut labels = match alert {
        Some(path) => loader::load_alert(path)?,
        None => Labels::new(),
    };
    labels.extend(overrides);

    println!("{}", "Alert Evaluation Process".bold().underline());
    println!();
    println!("{}", "Alert Labels:".bold());
    for (key, value) in &labels {
        println!("  {}: {}", key.cyan(), value.yellow());
    }

    for (_, node) in tree.iter() {
        for condition in node.conditions() {
            if let Some(err) = condition.error() {
                println!("  {} {}", "⚠".yellow(), format!("Matcher never matches: {}", err).yellow());
            }
        }
    }

    let receivers = RouteEvaluator::new(&tree).evaluate(&labels);

    println!("\n{}\n", "-".repeat(70));
    println!("{}", "Matched Receivers:".bold());
    if receivers.is_empty() {
        println!(
            "  {}",
            "No matching receivers found (check default receiver or matchers)".red()
        );
    } else {
        for receiver in &receivers {
            println!("  {} {}", "✓".green(), receiver.bold().blue());
        }
    }
    Ok(())
}

fn run_render(folder: &Path, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match config::render(folder, settings, &ProcessEnv) {
        Ok(outcome) => {
            print_issues(&outcome.issues);
            println!(
                "  {} Generated {} from {} fragment file(s)",
                "✓".green(),
                outcome.output.display(),
                outcome.fragments
            );
            Ok(())
        }
        Err(failure) => {
            print_issues(&failure.issues);
            Err(failure.into())
        }
    }
}

fn print_issues(issues: &Issues) {
    let (errors, warnings): (Vec<_>, Vec<_>) = issues.iter().partition(|i| i.is_fatal());

    if !warnings.is_empty() {
        println!();
        println!("{}", "Configuration Warnings:".yellow().bold());
        for warning in warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if !errors.is_empty() {
        println!();
        println!("{}", "Configuration Errors:".red().bold());
        for error in errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if issues.is_empty() {
        println!("  {} Configuration OK", "✓".green());
    }
}
