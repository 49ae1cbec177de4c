//! CircleCI v1.1 build orchestration.
//!
//! - `api`: the endpoint trait the rest of the module is written against
//! - `client`: reqwest implementation of that trait
//! - `builder`: retried access to the API plus project and history lookups
//! - `correlate`: trigger a build and find the build it created
//! - `tracker`: follow a build and its workflow to completion
//! - `workflow`: per-workflow status aggregation and final checks

mod api;
mod builder;
mod client;
mod correlate;
mod retry;
mod tracker;
mod types;
mod waiter;
mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use api::CircleApi;
pub use builder::{Builder, MAX_PAGE_SIZE};
pub use client::CircleClient;
pub use tracker::WorkflowOutcome;
pub use types::{
    Build, BuildSelector, BuildStatus, BuildSummary, BuildWorkflow, FollowStatus, Lifecycle,
    Outcome, Project, SummaryFilter, SummaryPage, TriggerResponse, User,
};
pub use workflow::aggregate_workflow_status;
