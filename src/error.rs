use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("non-success status code returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to start project build: Status: {status}, Body: {body:?}")]
    TriggerRejected { status: u16, body: String },

    #[error("build summary not found matching project: {0}")]
    SummaryNotFound(String),

    #[error("time expired while running the checker")]
    TimeoutExceeded,

    #[error("job timeout exceeded while waiting for build {project} [{build_num}] to finish")]
    JobTimeoutExceeded { project: String, build_num: u64 },

    #[error("build {project} [{build_num}] failed")]
    BuildFailed { project: String, build_num: u64 },

    #[error("could not obtain workflow details from build {0}")]
    MissingWorkflowDetails(u64),

    #[error("workflow {project} [{workflow}->{job}] failed with status: {status}")]
    WorkflowFailed {
        project: String,
        workflow: String,
        job: String,
        status: String,
    },

    #[error("failed to locate a project with url: {0}")]
    ProjectNotFound(String),

    #[error("invalid project url {url}: {reason}")]
    InvalidProjectUrl { url: String, reason: String },

    #[error("attempted to set following={expected} on {url}, following property is still {actual}")]
    FollowMismatch {
        url: String,
        expected: bool,
        actual: bool,
    },

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, BuilderError>;
