//! Job view
//!
//! Follows a single job until it reaches a terminal state:
//! - `render`: pure formatting of a job snapshot
//! - `state`: per-view state derived from each snapshot
//! - `poller`: the fixed-interval fetch loop and its owning handle
//! - `view`: terminal front end driving a poller

pub mod poller;
pub mod render;
pub mod state;
mod view;

pub use view::{ViewOptions, run_job_view};
