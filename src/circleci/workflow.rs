use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::api::CircleApi;
use super::builder::Builder;
use super::types::{BuildSelector, BuildStatus, BuildSummary, Project};
use crate::error::{BuilderError, Result};

/// Keeps the summaries whose workflow ended with status `target`.
///
/// Each workflow gets one status, folded over the summaries in input
/// order: the first summary sets it, and a later summary replaces it only
/// when its status differs from the stored one and is not `target`. Once a
/// workflow has recorded a non-target status, a later `target` cannot hide
/// it. Summaries without a workflow are ignored. Output keeps input order.
pub fn aggregate_workflow_status(
    summaries: &[BuildSummary],
    target: BuildStatus,
) -> Vec<BuildSummary> {
    let mut workflows: HashMap<&str, Option<BuildStatus>> = HashMap::new();

    for summary in summaries {
        let Some(workflow_id) = summary.workflow_id() else {
            continue;
        };
        match workflows.entry(workflow_id) {
            Entry::Vacant(entry) => {
                entry.insert(summary.status);
            }
            Entry::Occupied(mut entry) => {
                if summary.status != *entry.get() && summary.status != Some(target) {
                    entry.insert(summary.status);
                }
            }
        }
    }

    summaries
        .iter()
        .filter(|s| {
            s.workflow_id()
                .and_then(|id| workflows.get(id))
                .is_some_and(|status| *status == Some(target))
        })
        .cloned()
        .collect()
}

impl<A: CircleApi> Builder<A> {
    /// Fails when any job of `workflow_id` matching `selector` did not end
    /// with status success.
    pub async fn final_workflow_status(
        &self,
        project: &Project,
        selector: &BuildSelector,
        workflow_id: &str,
    ) -> Result<()> {
        let policy = self.settings().final_status_retry;
        let target = format!("GET /{}", project.api_path());
        let summaries = self
            .retried_with(&policy, "BuildSummary", &target, || {
                self.api().build_summaries(project, None)
            })
            .await?;

        for summary in &summaries {
            let Some(workflow) = &summary.workflow else {
                continue;
            };
            if selector.matches(summary)
                && workflow.workflow_id == workflow_id
                && summary.status != Some(BuildStatus::Success)
            {
                return Err(BuilderError::WorkflowFailed {
                    project: summary.reponame.clone(),
                    workflow: workflow.workflow_name.clone(),
                    job: workflow.job_name.clone(),
                    status: summary
                        .status
                        .map_or("none", BuildStatus::as_str)
                        .to_string(),
                });
            }
        }

        Ok(())
    }
}
