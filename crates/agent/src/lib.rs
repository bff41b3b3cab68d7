//! The planning loop: the heart of prospector.
//!
//! The agent follows an **Ask → Act → Observe** cycle:
//!
//! 1. **Project** the run's conversation into oracle input
//! 2. **Ask** the oracle for the next action, offering every capability
//! 3. **Act**: dispatch the selected capability through the registry
//! 4. **Observe**: append the result and repeat
//!
//! A plain message instead of a capability call is shown to the user and
//! ends the run when it reports completion or when every task is done.
//! The turn budget is a hard ceiling.

pub mod history;
pub mod planner;
pub mod prompt;
pub mod seeding;

#[cfg(test)]
pub(crate) mod testing;

pub use planner::{ORACLE_FAILURE_MESSAGE, PlanningLoop, RunSummary, StopReason};
pub use prompt::system_prompt;
pub use seeding::{plan_with_oracle, seed_tasks};
