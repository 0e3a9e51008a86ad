use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lazy_regex::{lazy_regex, regex_captures};
use log::{debug, warn};
use reqwest::header::COOKIE;
use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const USER_AGENT: &str = "\
    Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) \
    Chrome/110.0.0.0 Safari/537.36";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response (status {0})")]
    UnexpectedStatus(StatusCode),
}

/// Authenticated handle for one team. Only carries what's needed to issue
/// further requests; persisting the cookie is the caller's business.
#[derive(Debug, Clone)]
pub struct Session {
    team: String,
    cookie: String,
}

impl Session {
    pub fn new(team: &str, cookie: &str) -> Session {
        Session {
            team: team.to_string(),
            cookie: cookie.to_string(),
        }
    }
    pub fn team(&self) -> &str {
        &self.team
    }
    pub fn cookie(&self) -> &str {
        &self.cookie
    }
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(Session),
    TwoFactorChallenge,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiResponse {
    Created,
    NameTaken,
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SlackApi {
    async fn validate_session(&self, session: &Session) -> Result<bool, ApiError>;
    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ApiError>;
    async fn two_factor(&self, code: &str) -> Result<LoginOutcome, ApiError>;
    async fn create_emoji(
        &self,
        session: &Session,
        name: &str,
        image: Bytes,
    ) -> Result<EmojiResponse, ApiError>;
    async fn fetch_image(&self, url: &str) -> Result<Bytes, ApiError>;
}

pub struct SlackClient {
    team: String,
    client: reqwest::Client,
    // hidden fields of a pending two-factor form, kept between login calls
    challenge: Mutex<Option<Vec<(String, String)>>>,
}

impl SlackClient {
    pub fn new(team: &str) -> Result<SlackClient, ApiError> {
        Ok(SlackClient {
            team: team.to_string(),
            client: reqwest::ClientBuilder::new()
                .user_agent(USER_AGENT)
                .cookie_store(true)
                .timeout(Duration::from_secs(60))
                .build()?,
            challenge: Mutex::new(None),
        })
    }

    fn login_url(&self) -> String {
        format!("https://{}.slack.com/", self.team)
    }
    fn customize_url(&self) -> String {
        format!("https://{}.slack.com/customize/emoji", self.team)
    }

    async fn submit_login_form(
        &self,
        form: &[(String, String)],
    ) -> Result<LoginOutcome, ApiError> {
        let response = self.client.post(self.login_url()).form(form).send().await?;
        let granted: Vec<String> = response
            .cookies()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect();
        let body = response.text().await?;

        if granted.is_empty() {
            if let Some(fields) = two_factor_form(&body) {
                *self.challenge.lock().unwrap() = Some(fields);
                return Ok(LoginOutcome::TwoFactorChallenge);
            }
            return Ok(LoginOutcome::Rejected);
        }
        Ok(LoginOutcome::Authenticated(Session::new(
            &self.team,
            &granted.join("; "),
        )))
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn validate_session(&self, session: &Session) -> Result<bool, ApiError> {
        let response = self
            .client
            .get(self.customize_url())
            .header(COOKIE, session.cookie())
            .send()
            .await?;
        classify_probe(response.status(), response.url().path())
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let page = self.client.get(self.login_url()).send().await?;
        if !page.status().is_success() {
            return Err(ApiError::UnexpectedStatus(page.status()));
        }
        let mut form = hidden_inputs(&page.text().await?);
        form.push(("email".to_string(), email.to_string()));
        form.push(("password".to_string(), password.to_string()));
        self.submit_login_form(&form).await
    }

    async fn two_factor(&self, code: &str) -> Result<LoginOutcome, ApiError> {
        let fields = self.challenge.lock().unwrap().take();
        let mut form = match fields {
            Some(fields) => fields,
            None => {
                warn!("received a two-factor code with no pending challenge");
                return Ok(LoginOutcome::Rejected);
            }
        };
        form.push(("2fa_code".to_string(), code.to_string()));
        match self.submit_login_form(&form).await? {
            // a rejected code renders the challenge again
            LoginOutcome::TwoFactorChallenge => Ok(LoginOutcome::Rejected),
            outcome => Ok(outcome),
        }
    }

    async fn create_emoji(
        &self,
        session: &Session,
        name: &str,
        image: Bytes,
    ) -> Result<EmojiResponse, ApiError> {
        let page = self
            .client
            .get(self.customize_url())
            .header(COOKIE, session.cookie())
            .send()
            .await?;
        if !page.status().is_success() {
            return Err(ApiError::UnexpectedStatus(page.status()));
        }

        let mut form = multipart::Form::new();
        for (key, value) in hidden_inputs(&page.text().await?) {
            form = form.text(key, value);
        }
        form = form
            .text("name", name.to_string())
            .text("mode", "data")
            .part(
                "img",
                multipart::Part::bytes(image.to_vec()).file_name(format!("{name}.png")),
            );

        debug!("posting emoji `{name}` ({} bytes)", image.len());
        let response = self
            .client
            .post(self.customize_url())
            .header(COOKIE, session.cookie())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(classify_emoji_response(status, &body))
    }

    async fn fetch_image(&self, url: &str) -> Result<Bytes, ApiError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::UnexpectedStatus(response.status()));
        }
        Ok(response.bytes().await?)
    }
}

/// A rejected cookie lands on the sign-in page with a 200; a non-2xx
/// means the server itself is unwell, which is not a verdict on the cookie.
fn classify_probe(status: StatusCode, path: &str) -> Result<bool, ApiError> {
    if !status.is_success() {
        return Err(ApiError::UnexpectedStatus(status));
    }
    Ok(path.contains("/customize/emoji"))
}

fn hidden_inputs(html: &str) -> Vec<(String, String)> {
    lazy_regex!(r#"<input[^>]*type="hidden"[^>]*name="([^"]+)"[^>]*value="([^"]*)""#)
        .captures_iter(html)
        .map(|capture| (capture[1].to_string(), capture[2].to_string()))
        .collect()
}

fn two_factor_form(html: &str) -> Option<Vec<(String, String)>> {
    if html.contains(r#"name="2fa_code""#) {
        Some(hidden_inputs(html))
    } else {
        None
    }
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn classify_emoji_response(status: StatusCode, body: &str) -> EmojiResponse {
    if let Ok(reply) = serde_json::from_str::<ApiReply>(body) {
        return if reply.ok {
            EmojiResponse::Created
        } else {
            match reply.error.as_deref() {
                Some("error_name_taken") => EmojiResponse::NameTaken,
                Some(error) => EmojiResponse::Rejected(error.to_string()),
                None => EmojiResponse::Rejected(format!("status {status}")),
            }
        };
    }
    if body.contains("already in use") {
        return EmojiResponse::NameTaken;
    }
    if let Some((_, message)) = regex_captures!(r#"<p class="alert_error"[^>]*>\s*([^<]+)"#, body) {
        return EmojiResponse::Rejected(message.trim().to_string());
    }
    if status.is_success() {
        EmojiResponse::Created
    } else {
        EmojiResponse::Rejected(format!("status {status}"))
    }
}
