use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use log::{error, info, warn};

use crate::auth::{authenticate, AuthError, Prompt};
use crate::settings::Profile;
use crate::slack::SlackApi;
use crate::tasks::Task;
use crate::upload::{upload_one, Outcome, UploadResult};

/// Complete record of one invocation, in resolved task order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<UploadResult>,
    pub auth_error: Option<AuthError>,
}

impl BatchReport {
    fn count(&self, matches: impl Fn(&Outcome) -> bool) -> usize {
        self.results
            .iter()
            .filter(|result| matches(&result.outcome))
            .count()
    }
    pub fn successes(&self) -> usize {
        self.count(|outcome| *outcome == Outcome::Success)
    }
    pub fn already_exists(&self) -> usize {
        self.count(|outcome| *outcome == Outcome::AlreadyExists)
    }
    pub fn rejected(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Rejected(_)))
    }
    pub fn transport_failures(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::TransportFailure(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.auth_error.is_none() && !self.results.iter().any(|result| result.outcome.is_failure())
    }
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }
}

/// Set from a signal handler; the runner abandons remaining tasks once it
/// observes the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Authenticates once, then drives every (id, source) pair sequentially.
/// A failing item never aborts the batch; an auth failure means the batch
/// never starts.
pub async fn run<A, P>(
    api: &A,
    prompt: &P,
    profile: &Profile,
    tasks: &[Task],
    upload_folder: &Path,
    cancel: &CancelFlag,
) -> BatchReport
where
    A: SlackApi + Sync,
    P: Prompt + Sync,
{
    let session = match authenticate(
        api,
        prompt,
        &profile.team,
        profile.cookie.as_deref(),
        profile.credentials.as_ref(),
    )
    .await
    {
        Ok(session) => session,
        Err(err) => {
            error!("authentication failed: {err}");
            return BatchReport {
                results: Vec::new(),
                auth_error: Some(err),
            };
        }
    };

    let total: u64 = tasks.iter().map(|task| task.sources.len() as u64).sum();
    let bar = ProgressBar::new(total);
    let mut results = Vec::with_capacity(total as usize);
    'tasks: for task in tasks {
        for source in &task.sources {
            if cancel.is_cancelled() {
                warn!("interrupted, abandoning remaining uploads");
                break 'tasks;
            }
            results.push(upload_one(api, &session, upload_folder, &task.id, source).await);
            bar.inc(1);
        }
    }
    bar.finish_and_clear();

    BatchReport {
        results,
        auth_error: None,
    }
}

/// Reports what would be uploaded without authenticating or touching the
/// network.
pub fn dry_run(tasks: &[Task]) -> BatchReport {
    for task in tasks {
        for source in &task.sources {
            info!("would upload `{source}` as `{}`", task.id);
        }
    }
    BatchReport::default()
}
