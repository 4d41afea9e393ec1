//! Human-readable rendering of a decoded forwarding path.

use serde::{Deserialize, Serialize};

const NO_DESCRIPTION: &str = "No description";

/// One step of a decoded script: a call to `to`, optionally labelled with the app that lives there.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingStep {
    #[serde(default)]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ForwardingStep>,
}

pub type ForwardingPath = Vec<ForwardingStep>;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl ForwardingStep {
    /// `name (identifier)`, `name`, or the raw target address.
    pub fn app_label(&self) -> String {
        match (non_empty(&self.name), non_empty(&self.identifier)) {
            (Some(name), Some(identifier)) => format!("{name} ({identifier})"),
            (Some(name), None) => name.to_string(),
            _ => self.to.clone(),
        }
    }

    pub fn summary(&self) -> String {
        let description = non_empty(&self.description).unwrap_or(NO_DESCRIPTION);
        format!("{}: {}", self.app_label(), description)
    }
}

/// Renders the path as numbered lines (`1.`, `1.1.`, `2.`), depth first in document order.
pub fn describe_forwarding_path(path: &[ForwardingStep]) -> String {
    let mut lines = Vec::new();
    render_steps(path, None, &mut lines);
    lines.join("\n")
}

fn render_steps(steps: &[ForwardingStep], parent: Option<&str>, lines: &mut Vec<String>) {
    for (i, step) in steps.iter().enumerate() {
        let position = match parent {
            Some(parent) => format!("{parent}.{}", i + 1),
            None => (i + 1).to_string(),
        };
        lines.push(format!("{position}. {}", step.summary()));
        render_steps(&step.children, Some(&position), lines);
    }
}

/// Returns a copy of the tree where every description is replaced by its step summary.
pub fn annotate(path: &[ForwardingStep]) -> ForwardingPath {
    path.iter()
        .map(|step| ForwardingStep {
            description: Some(step.summary()),
            children: annotate(&step.children),
            ..step.clone()
        })
        .collect()
}
