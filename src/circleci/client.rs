mod core;

use async_trait::async_trait;
use reqwest::Method;

pub use self::core::CircleClient;

use super::api::CircleApi;
use super::types::{
    Build, BuildSelector, BuildSummary, FollowStatus, Project, SummaryPage, TriggerResponse, User,
};
use crate::error::Result;

#[async_trait]
impl CircleApi for CircleClient {
    async fn trigger_build(
        &self,
        project: &Project,
        selector: &BuildSelector,
    ) -> Result<TriggerResponse> {
        let path = format!("{}/build", project.api_path());
        let body = serde_json::to_value(selector)?;
        self.request(Method::POST, &path, &[], Some(body)).await
    }

    async fn build_summaries(
        &self,
        project: &Project,
        page: Option<&SummaryPage>,
    ) -> Result<Vec<BuildSummary>> {
        let query = page.map(SummaryPage::query).unwrap_or_default();
        self.request(Method::GET, &project.api_path(), &query, None)
            .await
    }

    async fn get_build(&self, project: &Project, build_num: u64) -> Result<Build> {
        let path = format!("{}/{build_num}", project.api_path());
        self.request(Method::GET, &path, &[], None).await
    }

    async fn me(&self) -> Result<User> {
        self.request(Method::GET, "me", &[], None).await
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        self.request(Method::GET, "projects", &[], None).await
    }

    async fn follow_project(&self, project: &Project) -> Result<FollowStatus> {
        let path = format!("{}/follow", project.api_path());
        self.request(Method::POST, &path, &[], None).await
    }

    async fn unfollow_project(&self, project: &Project) -> Result<FollowStatus> {
        let path = format!("{}/unfollow", project.api_path());
        self.request(Method::POST, &path, &[], None).await
    }
}
