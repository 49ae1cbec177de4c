use async_trait::async_trait;

use super::types::{
    Build, BuildSelector, BuildSummary, FollowStatus, Project, SummaryPage, TriggerResponse, User,
};
use crate::error::Result;

/// The CircleCI v1.1 endpoints the builder depends on.
///
/// Each method performs exactly one request and never retries; retrying is
/// the caller's job. [`super::CircleClient`] talks to the real service.
#[async_trait]
pub trait CircleApi: Send + Sync {
    /// `POST /project/:vcs/:user/:repo/build`
    async fn trigger_build(
        &self,
        project: &Project,
        selector: &BuildSelector,
    ) -> Result<TriggerResponse>;

    /// `GET /project/:vcs/:user/:repo`, most recent builds first
    async fn build_summaries(
        &self,
        project: &Project,
        page: Option<&SummaryPage>,
    ) -> Result<Vec<BuildSummary>>;

    /// `GET /project/:vcs/:user/:repo/:build_num`
    async fn get_build(&self, project: &Project, build_num: u64) -> Result<Build>;

    /// `GET /me`
    async fn me(&self) -> Result<User>;

    /// `GET /projects`
    async fn projects(&self) -> Result<Vec<Project>>;

    /// `POST /project/:vcs/:user/:repo/follow`
    async fn follow_project(&self, project: &Project) -> Result<FollowStatus>;

    /// `POST /project/:vcs/:user/:repo/unfollow`
    async fn unfollow_project(&self, project: &Project) -> Result<FollowStatus>;
}
