use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;

use super::api::CircleApi;
use super::builder::Builder;
use super::types::{BuildSelector, BuildSummary, Project};
use super::waiter::{should_report, Waiter};
use crate::error::{BuilderError, Result};

impl<A: CircleApi> Builder<A> {
    /// Triggers a build of `project` and returns the summary of the build it
    /// created.
    ///
    /// The trigger endpoint does not return a build number, so the new build
    /// is located by polling the recent builds for one queued after the
    /// trigger by the current user and matching `selector`. Gives up with
    /// `TimeoutExceeded` after `wait_timeout`.
    pub async fn trigger_and_locate_build(
        &self,
        project: &Project,
        selector: &BuildSelector,
        wait_timeout: Duration,
    ) -> Result<BuildSummary> {
        let polling = self.settings().polling;
        let now = Utc::now();
        let after = chrono::Duration::from_std(polling.queued_skew())
            .ok()
            .and_then(|skew| now.checked_sub_signed(skew))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let target = format!("POST /{}/build", project.api_path());
        let response = self
            .retried("BuildProject", &target, || {
                self.api().trigger_build(project, selector)
            })
            .await?;
        if response.status != 200 {
            return Err(BuilderError::TriggerRejected {
                status: response.status,
                body: response.body,
            });
        }
        info!("Triggered build of {} for {selector}", project.reponame);

        let mut waiter = Waiter::new(polling.summary_interval(), wait_timeout, self.cancel_token());
        loop {
            let count = waiter.tick().await?;
            if should_report(count, polling.progress_every) {
                info!(
                    "waiting for a build summary matching the project: {}",
                    project.reponame
                );
            }

            match self.find_build_summary(project, selector, after).await {
                Ok(summary) => {
                    info!(
                        "Located build {} [{}] queued at {:?}",
                        project.reponame, summary.build_num, summary.queued_at
                    );
                    return Ok(summary);
                }
                Err(BuilderError::SummaryNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// One correlation attempt: the first summary triggered by the current
    /// user, matching `selector` and queued strictly after `after`.
    pub(super) async fn find_build_summary(
        &self,
        project: &Project,
        selector: &BuildSelector,
        after: DateTime<Utc>,
    ) -> Result<BuildSummary> {
        let summaries = self.build_summaries(project, None).await?;
        let me = self.current_user().await?;

        summaries
            .into_iter()
            .find(|s| {
                s.queued_at.is_some_and(|queued| queued > after)
                    && selector.matches(s)
                    && s.triggered_by(&me)
            })
            .ok_or_else(|| BuilderError::SummaryNotFound(project.to_string()))
    }
}
