//! In-memory stand-in for the CircleCI API used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::api::CircleApi;
use super::types::{
    Build, BuildSelector, BuildStatus, BuildSummary, BuildWorkflow, FollowStatus, Lifecycle,
    Project, SummaryFilter, SummaryPage, TriggerResponse, User,
};
use crate::config::{PollingConfig, RetryConfig, Settings};
use crate::error::{BuilderError, Result};

pub const WORKFLOW_ID: &str = "wf-1";

pub fn project() -> Project {
    Project {
        username: "org".into(),
        reponame: "test1".into(),
        vcs: "github".into(),
        vcs_url: "https://github.com/org/test1".into(),
    }
}

pub fn user(login: &str) -> User {
    User {
        login: login.into(),
        name: None,
    }
}

pub fn workflow(id: &str) -> BuildWorkflow {
    BuildWorkflow {
        job_name: "build".into(),
        workflow_name: "ci".into(),
        workflow_id: id.into(),
        ..BuildWorkflow::default()
    }
}

/// A successful build summary of `test1` in workflow [`WORKFLOW_ID`].
pub fn summary(build_num: u64, login: &str, branch: &str, lifecycle: Lifecycle) -> BuildSummary {
    BuildSummary {
        build_num,
        username: "org".into(),
        reponame: "test1".into(),
        lifecycle: Some(lifecycle),
        status: Some(BuildStatus::Success),
        branch: Some(branch.into()),
        user: Some(user(login)),
        queued_at: Some(Utc::now()),
        workflow: Some(workflow(WORKFLOW_ID)),
        ..BuildSummary::default()
    }
}

pub fn build(build_num: u64, lifecycle: Lifecycle, failed: bool) -> Build {
    Build {
        build_num,
        reponame: "test1".into(),
        lifecycle: Some(lifecycle),
        failed: Some(failed),
        workflow: Some(workflow(WORKFLOW_ID)),
        ..Build::default()
    }
}

/// Short intervals so paused-clock tests stay readable.
pub fn fast_settings() -> Settings {
    Settings {
        retry: RetryConfig {
            interval_secs: 1,
            attempts: 3,
        },
        final_status_retry: RetryConfig {
            interval_secs: 1,
            attempts: 3,
        },
        polling: PollingConfig {
            trigger_wait_secs: 10,
            next_build_wait_secs: 5,
            ..PollingConfig::default()
        },
        ..Settings::default()
    }
}

fn unavailable() -> BuilderError {
    BuilderError::Api {
        status: 503,
        message: "service unavailable".into(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub trigger: usize,
    pub summaries: usize,
    pub summary_pages: Vec<(usize, usize)>,
    pub summary_filters: Vec<Option<SummaryFilter>>,
    pub get_build: usize,
    pub me: usize,
    pub projects: usize,
    pub follow: usize,
}

#[derive(Default)]
struct State {
    me: User,
    projects: Vec<Project>,
    projects_failures: u32,
    history: Vec<BuildSummary>,
    frames: VecDeque<Vec<BuildSummary>>,
    summaries_failures: u32,
    created: Option<BuildSummary>,
    created_summaries: Vec<BuildSummary>,
    builds: HashMap<u64, VecDeque<Build>>,
    build_failures: u32,
    trigger_response: TriggerResponse,
    trigger_error: Option<u16>,
    following: bool,
    stuck_follow_flag: Option<bool>,
    calls: Calls,
}

/// Scriptable fake of [`CircleApi`].
///
/// Unpaged summary listings replay `frames` in order and then keep
/// returning the last one; summaries created by a trigger come first.
/// Paged listings slice `history`. Build details replay per build number
/// the same way.
pub struct FakeCircle {
    state: Mutex<State>,
}

impl FakeCircle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                me: user("org"),
                trigger_response: TriggerResponse {
                    status: 200,
                    body: "Build created".into(),
                },
                ..State::default()
            }),
        }
    }

    fn with(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.with(|s| s.projects = projects)
    }

    pub fn failing_projects(self, times: u32) -> Self {
        self.with(|s| s.projects_failures = times)
    }

    pub fn with_history(self, history: Vec<BuildSummary>) -> Self {
        self.with(|s| s.history = history)
    }

    pub fn with_frame(self, frame: Vec<BuildSummary>) -> Self {
        self.with(|s| s.frames.push_back(frame))
    }

    pub fn failing_summaries(self, times: u32) -> Self {
        self.with(|s| s.summaries_failures = times)
    }

    /// A trigger call makes this summary appear, queued at trigger time.
    pub fn creating_on_trigger(self, summary: BuildSummary) -> Self {
        self.with(|s| s.created = Some(summary))
    }

    pub fn with_trigger_response(self, status: u16, body: &str) -> Self {
        self.with(|s| {
            s.trigger_response = TriggerResponse {
                status,
                body: body.into(),
            }
        })
    }

    pub fn with_trigger_error(self, status: u16) -> Self {
        self.with(|s| s.trigger_error = Some(status))
    }

    pub fn with_build_states(self, build_num: u64, states: Vec<Build>) -> Self {
        self.with(|s| {
            s.builds.insert(build_num, states.into());
        })
    }

    pub fn failing_builds(self, times: u32) -> Self {
        self.with(|s| s.build_failures = times)
    }

    pub fn with_stuck_follow_flag(self, following: bool) -> Self {
        self.with(|s| s.stuck_follow_flag = Some(following))
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn is_following(&self) -> bool {
        self.state.lock().unwrap().following
    }
}

fn replay<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn take_failure(remaining: &mut u32) -> bool {
    if *remaining > 0 {
        *remaining -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl CircleApi for FakeCircle {
    async fn trigger_build(
        &self,
        _project: &Project,
        _selector: &BuildSelector,
    ) -> Result<TriggerResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.trigger += 1;
        if let Some(status) = state.trigger_error {
            return Err(BuilderError::Api {
                status,
                message: "Not Found".into(),
            });
        }
        if let Some(mut created) = state.created.clone() {
            created.queued_at = Some(Utc::now());
            state.created_summaries.push(created);
        }
        Ok(state.trigger_response.clone())
    }

    async fn build_summaries(
        &self,
        _project: &Project,
        page: Option<&SummaryPage>,
    ) -> Result<Vec<BuildSummary>> {
        let mut state = self.state.lock().unwrap();
        state.calls.summaries += 1;
        if take_failure(&mut state.summaries_failures) {
            return Err(unavailable());
        }

        if let Some(page) = page {
            state.calls.summary_pages.push((page.limit, page.offset));
            state.calls.summary_filters.push(page.filter);
            return Ok(state
                .history
                .iter()
                .skip(page.offset)
                .take(page.limit)
                .cloned()
                .collect());
        }

        let mut listing = state.created_summaries.clone();
        listing.extend(replay(&mut state.frames).unwrap_or_default());
        Ok(listing)
    }

    async fn get_build(&self, _project: &Project, build_num: u64) -> Result<Build> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_build += 1;
        if take_failure(&mut state.build_failures) {
            return Err(unavailable());
        }
        state
            .builds
            .get_mut(&build_num)
            .and_then(replay)
            .ok_or_else(|| BuilderError::Api {
                status: 404,
                message: format!("build {build_num} not found"),
            })
    }

    async fn me(&self) -> Result<User> {
        let mut state = self.state.lock().unwrap();
        state.calls.me += 1;
        Ok(state.me.clone())
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        let mut state = self.state.lock().unwrap();
        state.calls.projects += 1;
        if take_failure(&mut state.projects_failures) {
            return Err(unavailable());
        }
        Ok(state.projects.clone())
    }

    async fn follow_project(&self, _project: &Project) -> Result<FollowStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.follow += 1;
        state.following = true;
        Ok(FollowStatus {
            following: state.stuck_follow_flag.unwrap_or(true),
        })
    }

    async fn unfollow_project(&self, _project: &Project) -> Result<FollowStatus> {
        let mut state = self.state.lock().unwrap();
        state.following = false;
        Ok(FollowStatus {
            following: state.stuck_follow_flag.unwrap_or(false),
        })
    }
}
