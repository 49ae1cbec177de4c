use std::time::Duration;

use log::{info, warn};

use super::api::CircleApi;
use super::builder::Builder;
use super::types::{Build, BuildSelector, BuildSummary, Outcome, Project};
use super::waiter::{should_report, Waiter};
use crate::error::{BuilderError, Result};

/// How a tracked workflow ended, when it did not fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Every job of the workflow finished with status success
    Succeeded,
    /// A job failed but the entry allows continuing on failure
    FailedAndContinued { build_num: u64 },
}

impl<A: CircleApi> Builder<A> {
    /// Follows a build, and every later job of its workflow, to completion.
    ///
    /// Each build is polled until finished or `job_timeout` elapses. After a
    /// build finishes, the next unfinished job of the same workflow is looked
    /// for during `wait_timeout`; when none shows up the workflow is taken to
    /// have ended and its final status decides the result.
    ///
    /// # Errors
    ///
    /// - `JobTimeoutExceeded` when a build does not finish in time
    /// - `BuildFailed` when a build fails and `continue_on_fail` is off
    /// - `MissingWorkflowDetails` when a finished build has no workflow
    /// - `WorkflowFailed` when any job of the ended workflow did not succeed
    pub async fn track_build_to_workflow_completion(
        &self,
        project: &Project,
        selector: &BuildSelector,
        initial: &BuildSummary,
        job_timeout: Duration,
        wait_timeout: Duration,
        continue_on_fail: bool,
    ) -> Result<WorkflowOutcome> {
        let mut build_num = initial.build_num;

        loop {
            let build = self.wait_for_build(project, build_num, job_timeout).await?;

            if build.has_failed() {
                warn!(
                    "build {} [{build_num}] finished with outcome: {}",
                    project.reponame,
                    build.outcome.map_or("none", Outcome::as_str)
                );
                if continue_on_fail {
                    warn!(
                        "build {} [{build_num}] failed, continue on failure is enabled for this project",
                        project.reponame
                    );
                    return Ok(WorkflowOutcome::FailedAndContinued { build_num });
                }
                return Err(BuilderError::BuildFailed {
                    project: project.reponame.clone(),
                    build_num,
                });
            }

            let Some(workflow) = build.workflow else {
                return Err(BuilderError::MissingWorkflowDetails(build_num));
            };

            match self
                .wait_for_next_build(project, selector, &workflow.workflow_id, wait_timeout)
                .await
            {
                Ok(next) => {
                    info!(
                        "Following next build {} [{}] of workflow {}",
                        project.reponame, next.build_num, workflow.workflow_name
                    );
                    build_num = next.build_num;
                }
                // No further job showed up: the workflow is over
                Err(BuilderError::TimeoutExceeded) => {
                    self.final_workflow_status(project, selector, &workflow.workflow_id)
                        .await?;
                    info!(
                        "Workflow {} of {} completed successfully",
                        workflow.workflow_name, project.reponame
                    );
                    return Ok(WorkflowOutcome::Succeeded);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Polls a build until its lifecycle is finished.
    ///
    /// Fetch errors are logged and retried on the next tick. Does not look
    /// at whether the build succeeded.
    async fn wait_for_build(
        &self,
        project: &Project,
        build_num: u64,
        job_timeout: Duration,
    ) -> Result<Build> {
        let polling = self.settings().polling;
        let mut waiter = Waiter::new(polling.build_interval(), job_timeout, self.cancel_token());

        loop {
            let count = waiter.tick().await.map_err(|e| match e {
                BuilderError::TimeoutExceeded => BuilderError::JobTimeoutExceeded {
                    project: project.reponame.clone(),
                    build_num,
                },
                other => other,
            })?;
            if should_report(count, polling.progress_every) {
                info!(
                    "waiting for build {} [{build_num}] to finish",
                    project.reponame
                );
            }

            match self.get_build(project, build_num).await {
                Ok(build) if build.is_finished() => return Ok(build),
                Ok(_) => {}
                Err(BuilderError::Cancelled) => return Err(BuilderError::Cancelled),
                Err(e) => warn!(
                    "failed to get build {} [{build_num}] -> {e}",
                    project.reponame
                ),
            }
        }
    }

    /// Waits for an unfinished job of `workflow_id` triggered by the current
    /// user. Fails with `TimeoutExceeded` when none appears in time.
    async fn wait_for_next_build(
        &self,
        project: &Project,
        selector: &BuildSelector,
        workflow_id: &str,
        wait_timeout: Duration,
    ) -> Result<BuildSummary> {
        let me = self.current_user().await?;
        let polling = self.settings().polling;
        let mut waiter = Waiter::new(polling.summary_interval(), wait_timeout, self.cancel_token());

        loop {
            let count = waiter.tick().await?;
            if should_report(count, polling.progress_every) {
                info!(
                    "waiting for the next build summary matching the project: {} and workflowId: {workflow_id}",
                    project.reponame
                );
            }

            let summaries = match self.build_summaries(project, None).await {
                Ok(summaries) => summaries,
                Err(BuilderError::Cancelled) => return Err(BuilderError::Cancelled),
                Err(e) => {
                    warn!("failed to enumerate build summaries: {e}");
                    continue;
                }
            };

            let next = summaries.into_iter().find(|s| {
                selector.matches(s)
                    && s.triggered_by(&me)
                    && !s.is_finished()
                    && s.workflow_id() == Some(workflow_id)
            });
            if let Some(next) = next {
                return Ok(next);
            }
        }
    }
}
