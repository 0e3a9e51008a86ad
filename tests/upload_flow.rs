use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;

use emojoid::auth::{AuthError, Prompt};
use emojoid::runner::{self, CancelFlag};
use emojoid::settings::{Credentials, Settings};
use emojoid::slack::{ApiError, EmojiResponse, LoginOutcome, Session, SlackApi};
use emojoid::tasks::resolve_tasks;
use emojoid::upload::Outcome;

/// In-memory stand-in for the platform: accepts one cookie, remembers
/// which emoji names were created.
struct FakeSlack {
    created: Mutex<Vec<String>>,
}

impl FakeSlack {
    fn new() -> FakeSlack {
        FakeSlack {
            created: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SlackApi for FakeSlack {
    async fn validate_session(&self, session: &Session) -> Result<bool, ApiError> {
        Ok(session.cookie() == "d=abc123")
    }
    async fn login(&self, _email: &str, _password: &str) -> Result<LoginOutcome, ApiError> {
        Ok(LoginOutcome::Rejected)
    }
    async fn two_factor(&self, _code: &str) -> Result<LoginOutcome, ApiError> {
        Ok(LoginOutcome::Rejected)
    }
    async fn create_emoji(
        &self,
        _session: &Session,
        name: &str,
        _image: Bytes,
    ) -> Result<EmojiResponse, ApiError> {
        let mut created = self.created.lock().unwrap();
        if created.iter().any(|existing| existing == name) {
            return Ok(EmojiResponse::NameTaken);
        }
        created.push(name.to_string());
        Ok(EmojiResponse::Created)
    }
    async fn fetch_image(&self, _url: &str) -> Result<Bytes, ApiError> {
        Ok(Bytes::from_static(b"remote-bytes"))
    }
}

struct NoPrompt;

#[async_trait]
impl Prompt for NoPrompt {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        panic!("unexpected credential prompt");
    }
    async fn one_time_code(&self) -> Result<String, AuthError> {
        panic!("unexpected two-factor prompt");
    }
}

fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
    let config = dir.path().join("config");
    std::fs::write(
        &config,
        "[DEFAULT]\n\
         slack.team=kadeem\n\
         slack.cookie=d=abc123\n\
         \n\
         [other_team]\n\
         slack.team=kazzer\n\
         0.id=alpha\n\
         0.filename=alpha.png\n\
         1.id=bravo|beta\n\
         1.filename=bravo.png|beta.png\n\
         2.id=alpha\n\
         2.filename=alpha-alt.png\n",
    )
    .unwrap();
    for name in ["alpha.png", "alpha-alt.png", "bravo.png", "beta.png"] {
        std::fs::write(dir.path().join(name), b"png-bytes").unwrap();
    }
    config
}

#[tokio::test]
async fn config_to_report_round() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);

    let settings = Settings::load(&config).unwrap();
    let profile = settings.profile("other_team").unwrap();
    assert_eq!(profile.team, "kazzer");

    let tasks = resolve_tasks(&profile, 0, 2).unwrap();
    let ids: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "bravo", "beta"]);
    assert_eq!(tasks[0].sources, vec!["alpha.png", "alpha-alt.png"]);

    let api = FakeSlack::new();
    let report = runner::run(
        &api,
        &NoPrompt,
        &profile,
        &tasks,
        dir.path(),
        &CancelFlag::new(),
    )
    .await;

    // alpha's second source hits the name it created itself
    assert_eq!(report.results.len(), 4);
    assert_eq!(report.successes(), 3);
    assert_eq!(report.already_exists(), 1);
    assert_eq!(report.results[1].outcome, Outcome::AlreadyExists);
    assert!(report.is_clean());
    assert_eq!(report.exit_code(), 0);

    let created = api.created.lock().unwrap();
    assert_eq!(*created, vec!["alpha", "bravo", "beta"]);
}

#[tokio::test]
async fn rejected_login_aborts_before_any_upload() {
    let dir = TempDir::new().unwrap();
    let config = write_fixture(&dir);

    let settings = Settings::load(&config).unwrap();
    let mut profile = settings.profile("other_team").unwrap();
    // stale cookie forces the login fallback, which FakeSlack rejects
    profile.cookie = Some("d=stale".to_string());
    profile.credentials = Some(Credentials {
        email: "someone@example.com".to_string(),
        password: "hunter2".to_string(),
    });
    let tasks = resolve_tasks(&profile, 0, 2).unwrap();

    let api = FakeSlack::new();
    let report = runner::run(
        &api,
        &NoPrompt,
        &profile,
        &tasks,
        dir.path(),
        &CancelFlag::new(),
    )
    .await;

    assert!(report.results.is_empty());
    assert!(report.auth_error.is_some());
    assert_eq!(report.exit_code(), 1);
    assert!(api.created.lock().unwrap().is_empty());
}
