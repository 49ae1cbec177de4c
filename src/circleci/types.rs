use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{BuilderError, Result};

/// A project visible to the current user, as returned by `GET /projects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Owning account (organization or user)
    pub username: String,
    /// Repository name
    pub reponame: String,
    /// Version control kind (e.g., "github", "bitbucket")
    #[serde(rename = "vcs_type")]
    pub vcs: String,
    /// Canonical repository URL, used to look projects up
    pub vcs_url: String,
}

impl Project {
    /// Builds a provisional project from a repository URL.
    ///
    /// `https://github.com/org/repo` becomes user `org`, repo `repo`, vcs
    /// `github`. Only the first two path segments are significant.
    pub fn from_url(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| BuilderError::InvalidProjectUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

        let parts: Vec<&str> = url
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|p| !p.is_empty())
            .collect();
        if parts.len() < 2 {
            return Err(invalid("path not properly formatted"));
        }

        let host = url.host_str().unwrap_or_default();
        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return Err(invalid("host not properly formatted"));
        }

        Ok(Self {
            username: parts[0].to_string(),
            reponame: parts[1].to_string(),
            vcs: labels[0].to_string(),
            vcs_url: url.to_string(),
        })
    }

    /// API path of this project relative to the v1.1 base URL.
    pub fn api_path(&self) -> String {
        format!("project/{}/{}/{}", self.vcs, self.username, self.reponame)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.vcs, self.username, self.reponame)
    }
}

/// Selects what to build: at most one of branch, revision or tag.
///
/// The same value filters build summaries afterwards. Empty fields act as
/// wildcards. Setting more than one field is left to the remote service to
/// interpret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSelector {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

impl BuildSelector {
    pub fn branch(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Self::default()
        }
    }

    pub fn revision(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            ..Self::default()
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Returns true when every non-empty field equals the summary's field.
    pub fn matches(&self, summary: &BuildSummary) -> bool {
        field_matches(&self.tag, summary.vcs_tag.as_deref())
            && field_matches(&self.revision, summary.vcs_revision.as_deref())
            && field_matches(&self.branch, summary.branch.as_deref())
    }
}

fn field_matches(wanted: &str, actual: Option<&str>) -> bool {
    wanted.is_empty() || actual == Some(wanted)
}

impl fmt::Display for BuildSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Branch: {:?}, Revision: {:?}, Tag: {:?}]",
            self.branch, self.revision, self.tag
        )
    }
}

/// Coarse build stage. Only `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Queued,
    Scheduled,
    NotRun,
    NotRunning,
    Running,
    Finished,
    #[serde(other)]
    Unknown,
}

/// Final result of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Canceled,
    InfrastructureFail,
    Timedout,
    Failed,
    NoTests,
    Success,
    #[serde(other)]
    Unknown,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::InfrastructureFail => "infrastructure_fail",
            Self::Timedout => "timedout",
            Self::Failed => "failed",
            Self::NoTests => "no_tests",
            Self::Success => "success",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a build, finer grained than [`Lifecycle`].
///
/// Workflow aggregation runs on this field; `Success` means "did not fail".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Retried,
    Canceled,
    InfrastructureFail,
    Timedout,
    NotRun,
    Running,
    Failed,
    Queued,
    Scheduled,
    NotRunning,
    NoTests,
    Fixed,
    Success,
    #[serde(other)]
    Unknown,
}

impl BuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retried => "retried",
            Self::Canceled => "canceled",
            Self::InfrastructureFail => "infrastructure_fail",
            Self::Timedout => "timedout",
            Self::NotRun => "not_run",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Queued => "queued",
            Self::Scheduled => "scheduled",
            Self::NotRunning => "not_running",
            Self::NoTests => "no_tests",
            Self::Fixed => "fixed",
            Self::Success => "success",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow membership reported on a build or build summary.
///
/// The API returns this under the `workflows` key as a single object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildWorkflow {
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub workflow_id: String,
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub upstream_job_ids: Vec<String>,
}

/// The authenticated user, as returned by `GET /me`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name
    pub login: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

/// Point-in-time snapshot of a build from the recent builds listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub build_num: u64,
    /// Project owner
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub reponame: String,
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub status: Option<BuildStatus>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub vcs_revision: Option<String>,
    #[serde(default)]
    pub vcs_tag: Option<String>,
    #[serde(default)]
    pub vcs_type: Option<String>,
    /// User who triggered the build
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, rename = "usage_queued_at")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "stop_time")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "workflows")]
    pub workflow: Option<BuildWorkflow>,
}

impl BuildSummary {
    pub fn is_finished(&self) -> bool {
        self.lifecycle == Some(Lifecycle::Finished)
    }

    pub fn triggered_by(&self, user: &User) -> bool {
        self.user.as_ref().is_some_and(|u| u.login == user.login)
    }

    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow.as_ref().map(|w| w.workflow_id.as_str())
    }
}

/// Detailed view of a single build, as returned by `GET /project/.../{num}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub build_num: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub reponame: String,
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub status: Option<BuildStatus>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub vcs_revision: Option<String>,
    #[serde(default)]
    pub vcs_type: Option<String>,
    #[serde(default)]
    pub failed: Option<bool>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, rename = "usage_queued_at")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "stop_time")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "workflows")]
    pub workflow: Option<BuildWorkflow>,
}

impl Build {
    pub fn is_finished(&self) -> bool {
        self.lifecycle == Some(Lifecycle::Finished)
    }

    /// An absent `failed` flag counts as not failed.
    pub fn has_failed(&self) -> bool {
        self.failed.unwrap_or(false)
    }
}

/// Restricts which builds the recent builds listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFilter {
    Completed,
    Successful,
    Failed,
    Running,
}

impl SummaryFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Running => "running",
        }
    }
}

/// Paging parameters for the recent builds listing.
///
/// The API caps `limit` at 100 and defaults it to 30.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryPage {
    pub limit: usize,
    pub offset: usize,
    pub filter: Option<SummaryFilter>,
}

impl SummaryPage {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }
        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        if let Some(filter) = self.filter {
            params.push(("filter", filter.as_str().to_string()));
        }
        params
    }
}

/// Body returned when a new project build is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStatus {
    pub following: bool,
}
