//! Markdown progress report, re-rendered in full after every task change.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::graph::TaskGraph;
use crate::task::TaskStatus;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ProgressReport {
    path: PathBuf,
}

impl ProgressReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the report file with the graph's current state.
    pub fn write(&self, graph: &TaskGraph) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, render_markdown(graph, Utc::now()))
    }
}

/// Render the summary block followed by one section per task, in id order.
pub fn render_markdown(graph: &TaskGraph, now: DateTime<Utc>) -> String {
    let counts = graph.status_counts();
    let mut out = String::new();

    let _ = writeln!(out, "# Task Log\n");
    let _ = writeln!(out, "Last updated: {}\n", now.format(TIME_FORMAT));
    let _ = writeln!(out, "## Task Summary\n");
    let _ = writeln!(out, "- Total Tasks: {}", graph.len());
    for status in [
        TaskStatus::Completed,
        TaskStatus::InProgress,
        TaskStatus::Pending,
        TaskStatus::Failed,
        TaskStatus::Skipped,
    ] {
        let _ = writeln!(out, "- {}: {}", status.label(), counts[status.label()]);
    }
    let _ = writeln!(out, "\n## Tasks\n");

    for task in graph.tasks() {
        let _ = writeln!(out, "### {} {}: {}\n", task.status.symbol(), task.id, task.description);
        let _ = writeln!(out, "- **Status:** {}", task.status.label());
        let _ = writeln!(out, "- **Created:** {}", task.created_at.format(TIME_FORMAT));
        if let Some(started) = task.started_at {
            let _ = writeln!(out, "- **Started:** {}", started.format(TIME_FORMAT));
        }
        if let Some(completed) = task.completed_at {
            let _ = writeln!(out, "- **Completed:** {}", completed.format(TIME_FORMAT));
        }
        if !task.dependencies.is_empty() {
            let deps: Vec<&str> = task.dependencies.iter().map(|d| d.as_str()).collect();
            let _ = writeln!(out, "- **Dependencies:** {}", deps.join(", "));
        }
        if !task.notes.is_empty() {
            let _ = writeln!(out, "\n#### Notes\n");
            for note in &task.notes {
                let _ = writeln!(
                    out,
                    "- **{}:** {}",
                    note.timestamp.format(TIME_FORMAT),
                    note.content
                );
            }
        }
        out.push('\n');
    }

    out
}
