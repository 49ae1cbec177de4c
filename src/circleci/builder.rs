use std::future::Future;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::api::CircleApi;
use super::retry::retry;
use super::types::{
    Build, BuildSelector, BuildSummary, Project, SummaryFilter, SummaryPage, User,
};
use crate::config::{RetryConfig, Settings};
use crate::error::{BuilderError, Result};

/// Largest page the recent builds endpoint serves.
pub const MAX_PAGE_SIZE: usize = 100;

/// Drives CircleCI builds through a [`CircleApi`].
///
/// Every remote call goes through the retry policy from [`Settings`]. All
/// waits honor the cancellation token; requests already in flight are left
/// to complete.
pub struct Builder<A> {
    api: A,
    settings: Settings,
    cancel: CancellationToken,
}

impl<A: CircleApi> Builder<A> {
    pub fn new(api: A, settings: Settings) -> Self {
        Self {
            api,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub(super) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(super) async fn retried<T, F, Fut>(&self, operation: &str, target: &str, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retried_with(&self.settings.retry, operation, target, call)
            .await
    }

    pub(super) async fn retried_with<T, F, Fut>(
        &self,
        policy: &RetryConfig,
        operation: &str,
        target: &str,
        call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry(policy, &self.cancel, operation, target, call).await
    }

    /// Returns the user the API token belongs to.
    pub async fn current_user(&self) -> Result<User> {
        self.retried("Me", "GET /me", || self.api.me()).await
    }

    /// Lists recent build summaries for `project`, newest first.
    pub async fn build_summaries(
        &self,
        project: &Project,
        page: Option<&SummaryPage>,
    ) -> Result<Vec<BuildSummary>> {
        let target = format!("GET /{}", project.api_path());
        self.retried("BuildSummary", &target, || {
            self.api.build_summaries(project, page)
        })
        .await
    }

    pub async fn get_build(&self, project: &Project, build_num: u64) -> Result<Build> {
        let target = format!("GET /{}/{build_num}", project.api_path());
        self.retried("GetBuild", &target, || self.api.get_build(project, build_num))
            .await
    }

    /// Lists every project visible to the current user.
    pub async fn projects(&self) -> Result<Vec<Project>> {
        self.retried("Projects", "GET /projects", || self.api.projects())
            .await
    }

    /// Returns the first visible project accepted by `predicate`.
    pub async fn find_project<P>(&self, predicate: P) -> Result<Option<Project>>
    where
        P: Fn(&Project) -> bool,
    {
        let projects = self.projects().await?;
        Ok(projects.into_iter().find(|p| predicate(p)))
    }

    /// Looks a project up by its exact VCS URL.
    ///
    /// There is no lookup-by-URL endpoint, so this scans the project list.
    pub async fn resolve_project_by_url(&self, vcs_url: &str) -> Result<Project> {
        self.find_project(|p| p.vcs_url == vcs_url)
            .await?
            .ok_or_else(|| BuilderError::ProjectNotFound(vcs_url.to_string()))
    }

    pub async fn follow_project(&self, project: &Project) -> Result<()> {
        let target = format!("POST /{}/follow", project.api_path());
        let status = self
            .retried("FollowProject", &target, || self.api.follow_project(project))
            .await?;
        expect_following(project, true, status.following)
    }

    pub async fn unfollow_project(&self, project: &Project) -> Result<()> {
        let target = format!("POST /{}/unfollow", project.api_path());
        let status = self
            .retried("UnfollowProject", &target, || {
                self.api.unfollow_project(project)
            })
            .await?;
        expect_following(project, false, status.following)
    }

    /// Collects every finished build of `project` matching `selector` that
    /// the current user triggered.
    ///
    /// Pages through the history 100 builds at a time until a short page
    /// comes back.
    pub async fn list_all_matching_build_summaries(
        &self,
        project: &Project,
        selector: &BuildSelector,
    ) -> Result<Vec<BuildSummary>> {
        let me = self.current_user().await?;
        let mut page = SummaryPage {
            limit: MAX_PAGE_SIZE,
            offset: 0,
            filter: Some(SummaryFilter::Completed),
        };
        let mut matching = Vec::new();

        loop {
            let results = self.build_summaries(project, Some(&page)).await?;
            let fetched = results.len();
            debug!(
                "Fetched {fetched} build summaries for {} at offset {}",
                project.reponame, page.offset
            );

            matching.extend(results.into_iter().filter(|s| {
                selector.matches(s)
                    && s.reponame == project.reponame
                    && s.is_finished()
                    && s.triggered_by(&me)
            }));

            if fetched < page.limit {
                break;
            }
            page.offset += page.limit;
        }

        info!(
            "Found {} finished builds of {} matching {selector}",
            matching.len(),
            project.reponame
        );
        Ok(matching)
    }
}

fn expect_following(project: &Project, expected: bool, actual: bool) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(BuilderError::FollowMismatch {
            url: project.vcs_url.clone(),
            expected,
            actual,
        })
    }
}
