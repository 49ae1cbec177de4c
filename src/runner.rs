use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;

use crate::circleci::{
    aggregate_workflow_status, BuildStatus, BuildSummary, Builder, CircleApi, Project,
    WorkflowOutcome,
};
use crate::entries::BuildEntry;

/// When a previously successful build lets an entry be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Skip once the selector has ever built successfully
    Always,
    /// Skip when the last success stopped within this many days
    WithinDays(i64),
}

impl SkipPolicy {
    /// `-1` means [`SkipPolicy::Always`].
    pub fn from_days(days: i64) -> Self {
        if days == -1 {
            Self::Always
        } else {
            Self::WithinDays(days)
        }
    }
}

/// Decides from the build history whether an entry can be skipped.
///
/// Only workflows that ended in success count; the latest stop time among
/// their builds is compared with the policy. No success, no skip.
pub fn should_skip(history: &[BuildSummary], policy: SkipPolicy, now: DateTime<Utc>) -> bool {
    let last_success = aggregate_workflow_status(history, BuildStatus::Success)
        .iter()
        .filter_map(|s| s.stopped_at)
        .max();

    match (last_success, policy) {
        (None, _) => false,
        (Some(_), SkipPolicy::Always) => true,
        (Some(stopped), SkipPolicy::WithinDays(days)) => {
            match chrono::TimeDelta::try_days(days).and_then(|d| now.checked_sub_signed(d)) {
                Some(cutoff) => stopped > cutoff,
                // cutoff out of range: a huge window covers every success
                None => days > 0,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub job_timeout: Duration,
    pub skip: Option<SkipPolicy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Built,
    Skipped,
    FailedAndContinued { build_num: u64 },
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub name: String,
    pub url: String,
    pub status: EntryStatus,
}

/// Builds every entry in order, stopping at the first failure.
///
/// Reports for the entries processed so far are pushed onto `reports`
/// even when a later entry fails.
pub async fn run_builds<A: CircleApi>(
    builder: &Builder<A>,
    options: &RunOptions,
    entries: &[BuildEntry],
    reports: &mut Vec<EntryReport>,
) -> Result<()> {
    for entry in entries {
        let status = if entry.is_blank() {
            info!("skipping blank entry...");
            EntryStatus::Blank
        } else {
            run_entry(builder, options, entry)
                .await
                .with_context(|| format!("failed to build entry {:?} ({})", entry.name, entry.url))?
        };

        reports.push(EntryReport {
            name: entry.name.clone(),
            url: entry.url.clone(),
            status,
        });
    }

    Ok(())
}

async fn run_entry<A: CircleApi>(
    builder: &Builder<A>,
    options: &RunOptions,
    entry: &BuildEntry,
) -> Result<EntryStatus> {
    let provisional = Project::from_url(&entry.url)?;

    info!("Following project with url: {}", entry.url);
    builder
        .follow_project(&provisional)
        .await
        .with_context(|| format!("failed to follow project with URL: {}", entry.url))?;

    info!("Searching for project with url: {}", entry.url);
    let project = builder.resolve_project_by_url(&entry.url).await?;
    let selector = entry.selector();

    if let Some(policy) = options.skip {
        info!(
            "Searching for builds in project {:?}, matching {selector} to skip ({policy:?})",
            project.reponame
        );
        let history = builder
            .list_all_matching_build_summaries(&project, &selector)
            .await
            .with_context(|| {
                format!(
                    "failed to query information about previous project builds for project {}",
                    project.reponame
                )
            })?;
        if should_skip(&history, policy, Utc::now()) {
            info!(
                "Skipping project {:?}, a previous successful build was found for {selector}",
                project.reponame
            );
            return Ok(EntryStatus::Skipped);
        }
    }

    info!("Building project {:?}", project.reponame);
    let polling = builder.settings().polling;
    let summary = builder
        .trigger_and_locate_build(&project, &selector, polling.trigger_wait())
        .await?;
    let outcome = builder
        .track_build_to_workflow_completion(
            &project,
            &selector,
            &summary,
            options.job_timeout,
            polling.next_build_wait(),
            entry.continue_on_fail,
        )
        .await?;

    match outcome {
        WorkflowOutcome::Succeeded => {
            info!("Building project {:?}, completed successfully", project.reponame);
            Ok(EntryStatus::Built)
        }
        WorkflowOutcome::FailedAndContinued { build_num } => {
            Ok(EntryStatus::FailedAndContinued { build_num })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circleci::testing::{build, fast_settings, project, summary, FakeCircle};
    use crate::circleci::Lifecycle;

    fn success_at(build_num: u64, workflow_id: &str, stopped: DateTime<Utc>) -> BuildSummary {
        let mut s = summary(build_num, "org", "master", Lifecycle::Finished);
        s.workflow.as_mut().unwrap().workflow_id = workflow_id.into();
        s.stopped_at = Some(stopped);
        s
    }

    fn entry(name: &str) -> BuildEntry {
        BuildEntry {
            name: name.into(),
            url: "https://github.com/org/test1".into(),
            branch: "master".into(),
            ..BuildEntry::default()
        }
    }

    fn options(skip: Option<SkipPolicy>) -> RunOptions {
        RunOptions {
            job_timeout: Duration::from_secs(60),
            skip,
        }
    }

    #[test]
    fn test_skip_policy_from_days() {
        assert_eq!(SkipPolicy::from_days(-1), SkipPolicy::Always);
        assert_eq!(SkipPolicy::from_days(3), SkipPolicy::WithinDays(3));
    }

    #[test]
    fn test_should_skip() {
        let now = Utc::now();
        let history = vec![success_at(1, "a", now - chrono::Duration::days(2))];

        assert!(should_skip(&history, SkipPolicy::Always, now));
        assert!(!should_skip(&history, SkipPolicy::WithinDays(1), now));
        assert!(should_skip(&history, SkipPolicy::WithinDays(3), now));
    }

    #[test]
    fn test_always_skips_ancient_success() {
        let now = Utc::now();
        let history = vec![success_at(1, "a", now - chrono::Duration::days(3650))];
        assert!(should_skip(&history, SkipPolicy::Always, now));
    }

    #[test]
    fn test_no_success_never_skips() {
        let now = Utc::now();
        let mut failed = success_at(1, "a", now);
        failed.status = Some(BuildStatus::Failed);

        assert!(!should_skip(&[], SkipPolicy::Always, now));
        assert!(!should_skip(&[failed], SkipPolicy::Always, now));
    }

    #[test]
    fn test_latest_success_wins() {
        let now = Utc::now();
        let history = vec![
            success_at(1, "a", now - chrono::Duration::days(10)),
            success_at(2, "b", now - chrono::Duration::hours(2)),
        ];
        assert!(should_skip(&history, SkipPolicy::WithinDays(1), now));
    }

    #[test]
    fn test_failed_workflow_success_does_not_count() {
        let now = Utc::now();
        let mut failed_job = success_at(1, "a", now - chrono::Duration::hours(1));
        failed_job.status = Some(BuildStatus::Failed);
        let history = vec![
            failed_job,
            success_at(2, "a", now - chrono::Duration::hours(1)),
        ];
        assert!(!should_skip(&history, SkipPolicy::WithinDays(1), now));
    }

    #[test]
    fn test_skip_is_monotonic_in_days() {
        let now = Utc::now();
        let history = vec![success_at(1, "a", now - chrono::Duration::hours(60))];
        let mut skipped = false;
        for days in 0..10 {
            let skip = should_skip(&history, SkipPolicy::WithinDays(days), now);
            assert!(!skipped || skip, "skip flipped back at {days} days");
            skipped = skip;
        }
        assert!(skipped);
    }

    #[test]
    fn test_out_of_range_windows() {
        let now = Utc::now();
        let history = vec![success_at(1, "a", now - chrono::Duration::days(3650))];

        assert!(should_skip(&history, SkipPolicy::from_days(200_000_000), now));
        assert!(should_skip(&history, SkipPolicy::WithinDays(i64::MAX), now));
        assert!(!should_skip(&history, SkipPolicy::from_days(-200_000_000), now));
        assert!(!should_skip(&history, SkipPolicy::WithinDays(i64::MIN), now));
    }

    #[test]
    fn test_success_without_stop_time_is_ignored() {
        let now = Utc::now();
        let mut running = success_at(1, "a", now);
        running.stopped_at = None;
        assert!(!should_skip(&[running], SkipPolicy::Always, now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_builds_skips_recently_built_entry() {
        let history = vec![success_at(1, "a", Utc::now() - chrono::Duration::hours(1))];
        let fake = FakeCircle::new()
            .with_projects(vec![project()])
            .with_history(history);
        let builder = Builder::new(fake, fast_settings());

        let mut reports = Vec::new();
        run_builds(
            &builder,
            &options(Some(SkipPolicy::WithinDays(1))),
            &[entry("test1"), BuildEntry::default()],
            &mut reports,
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].status, EntryStatus::Skipped);
        assert_eq!(reports[1].status, EntryStatus::Blank);
        let calls = builder.api().calls();
        assert_eq!(calls.follow, 1);
        assert_eq!(calls.trigger, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_builds_triggers_and_tracks() {
        let fake = FakeCircle::new()
            .with_projects(vec![project()])
            .creating_on_trigger(summary(42, "org", "master", Lifecycle::Queued))
            .with_build_states(42, vec![build(42, Lifecycle::Finished, false)]);
        let builder = Builder::new(fake, fast_settings());

        let mut reports = Vec::new();
        run_builds(&builder, &options(None), &[entry("test1")], &mut reports)
            .await
            .unwrap();

        assert_eq!(reports[0].status, EntryStatus::Built);
        let calls = builder.api().calls();
        assert_eq!(calls.trigger, 1);
        assert!(calls.summary_pages.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_builds_records_continued_failure() {
        let fake = FakeCircle::new()
            .with_projects(vec![project()])
            .creating_on_trigger(summary(42, "org", "master", Lifecycle::Queued))
            .with_build_states(42, vec![build(42, Lifecycle::Finished, true)]);
        let builder = Builder::new(fake, fast_settings());

        let mut continuing = entry("test1");
        continuing.continue_on_fail = true;

        let mut reports = Vec::new();
        run_builds(&builder, &options(None), &[continuing], &mut reports)
            .await
            .unwrap();

        assert_eq!(
            reports[0].status,
            EntryStatus::FailedAndContinued { build_num: 42 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_builds_stops_at_first_failure() {
        let fake = FakeCircle::new()
            .with_projects(vec![project()])
            .creating_on_trigger(summary(42, "org", "master", Lifecycle::Queued))
            .with_build_states(42, vec![build(42, Lifecycle::Finished, true)]);
        let builder = Builder::new(fake, fast_settings());

        let mut reports = Vec::new();
        let err = run_builds(
            &builder,
            &options(None),
            &[BuildEntry::default(), entry("test1"), entry("test1")],
            &mut reports,
        )
        .await
        .unwrap_err();

        assert!(format!("{err:#}").contains("build test1 [42] failed"));
        assert_eq!(reports.len(), 1);
        assert_eq!(builder.api().calls().trigger, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_builds_unknown_project() {
        let builder = Builder::new(FakeCircle::new(), fast_settings());

        let mut reports = Vec::new();
        let err = run_builds(&builder, &options(None), &[entry("test1")], &mut reports)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("failed to locate a project"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_builds_rejects_malformed_url() {
        let builder = Builder::new(FakeCircle::new(), fast_settings());
        let mut bad = entry("test1");
        bad.url = "https://github.com/only-org".into();

        let mut reports = Vec::new();
        let err = run_builds(&builder, &options(None), &[bad], &mut reports)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("path not properly formatted"));
        assert_eq!(builder.api().calls().follow, 0);
    }
}
