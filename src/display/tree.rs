//! Route tree rendering.
//!
//! Renders a [`RouteTree`] as an indented tree, one branch per route with its
//! grouping, constraints, continue flag and timing settings listed before the
//! child routes.

use colored::{ColoredString, Colorize};

use crate::routing::matcher::Syntax;
use crate::routing::node::{NodeId, RouteTree};

const TITLE: &str = "Alertmanager Route Tree";

type Style = fn(ColoredString) -> ColoredString;

#[derive(Debug, Default)]
struct Branch {
    label: String,
    children: Vec<Branch>,
}

impl Branch {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }
}

/// Renders route trees as text, optionally with ANSI colour.
#[derive(Debug, Clone, Copy)]
pub struct TreeRenderer {
    color: bool,
}

impl TreeRenderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            style(text.into()).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, tree: &RouteTree) -> String {
        let mut out = self.paint(TITLE, |s| s.bold());
        out.push('\n');
        if !tree.is_empty() {
            let root = self.branch(tree, tree.root());
            write_branch(&mut out, &root, "", true);
        }
        out
    }

    fn branch(&self, tree: &RouteTree, id: NodeId) -> Branch {
        let node = tree.node(id);
        let label = if node.receiver().is_empty() {
            self.paint("(no receiver)", |s| s.dimmed())
        } else {
            self.paint(node.receiver(), |s| s.bold().blue())
        };
        let mut branch = Branch::leaf(label);

        if !node.group_by().is_empty() {
            branch.children.push(Branch::leaf(format!(
                "{} {}",
                self.paint("Group By:", |s| s.bold().green()),
                self.paint(&node.group_by().join(", "), |s| s.green())
            )));
        }

        let groups: [(Syntax, &str, Style, Style); 3] = [
            (Syntax::Match, "Match", |s| s.bold().yellow(), |s| s.yellow()),
            (Syntax::MatchRe, "Match RE", |s| s.bold().magenta(), |s| s.magenta()),
            (Syntax::Matchers, "Matchers", |s| s.bold().cyan(), |s| s.cyan()),
        ];
        for (syntax, title, header_style, entry_style) in groups {
            let entries: Vec<Branch> = node
                .conditions()
                .iter()
                .filter(|c| c.syntax() == syntax)
                .map(|c| match c.error() {
                    None => Branch::leaf(self.paint(c.source(), entry_style)),
                    Some(err) => Branch::leaf(format!(
                        "{} {}",
                        self.paint(c.source(), entry_style),
                        self.paint(&format!("(invalid: {})", err), |s| s.red())
                    )),
                })
                .collect();
            if !entries.is_empty() {
                branch.children.push(Branch {
                    label: self.paint(title, header_style),
                    children: entries,
                });
            }
        }

        if node.continues() {
            branch
                .children
                .push(Branch::leaf(self.paint("Continue: true", |s| s.bold().green())));
        }

        let timings = node.timings();
        for (title, value) in [
            ("Wait:", &timings.group_wait),
            ("Group Interval:", &timings.group_interval),
            ("Repeat Interval:", &timings.repeat_interval),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                branch.children.push(Branch::leaf(format!(
                    "{} {}",
                    self.paint(title, |s| s.bold().yellow()),
                    self.paint(value, |s| s.yellow())
                )));
            }
        }

        for &child in node.children() {
            branch.children.push(self.branch(tree, child));
        }
        branch
    }
}

fn write_branch(out: &mut String, branch: &Branch, prefix: &str, last: bool) {
    out.push_str(prefix);
    out.push_str(if last { "└── " } else { "├── " });
    out.push_str(&branch.label);
    out.push('\n');

    let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
    for (i, child) in branch.children.iter().enumerate() {
        write_branch(out, child, &child_prefix, i + 1 == branch.children.len());
    }
}
