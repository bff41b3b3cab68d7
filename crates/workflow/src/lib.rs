//! Task graph for prospector.
//!
//! Tracks the run's work items, computes which one is ready next, and
//! keeps a human-readable progress report on disk. Execution is strictly
//! sequential; the graph is shared behind a single async mutex.

pub mod task;
pub mod graph;
pub mod report;
pub mod plan;

pub use task::{Task, TaskId, TaskNote, TaskStatus};
pub use graph::{SharedTaskGraph, TaskGraph, TaskSnapshot};
pub use report::{ProgressReport, render_markdown};
pub use plan::{PlannedTask, DEFAULT_OUTREACH_STEPS, default_outreach_plan, linear_plan, parse_plan};
