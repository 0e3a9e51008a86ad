use async_trait::async_trait;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use log::{info, warn};
use thiserror::Error;

use crate::settings::Credentials;
use crate::slack::{ApiError, LoginOutcome, Session, SlackApi};

pub const TWO_FACTOR_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("the platform rejected the credentials")]
    InvalidCredentials,
    #[error("ran out of two-factor attempts")]
    TwoFactorExhausted,
    #[error("transport failure during authentication: {0}")]
    Transport(#[from] ApiError),
    #[error("prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Prompt {
    async fn credentials(&self) -> Result<Credentials, AuthError>;
    async fn one_time_code(&self) -> Result<String, AuthError>;
}

/// Interactive prompts on the terminal.
pub struct TermPrompt;

async fn blocking_prompt<T, F>(prompt: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    tokio::task::spawn_blocking(prompt).await.map_err(|err| {
        AuthError::Prompt(std::io::Error::new(std::io::ErrorKind::Other, err))
    })?
}

#[async_trait]
impl Prompt for TermPrompt {
    async fn credentials(&self) -> Result<Credentials, AuthError> {
        blocking_prompt(|| {
            let email = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Email Address")
                .interact_text()
                .map_err(AuthError::Prompt)?;
            let password = Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Password")
                .interact()
                .map_err(AuthError::Prompt)?;
            Ok(Credentials { email, password })
        })
        .await
    }

    async fn one_time_code(&self) -> Result<String, AuthError> {
        blocking_prompt(|| {
            Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Two Factor Authentication Code")
                .interact_text()
                .map_err(AuthError::Prompt)
        })
        .await
    }
}

/// Establishes a session: configured cookie first, interactive login as the
/// fallback, with a bounded number of two-factor attempts.
pub async fn authenticate<A, P>(
    api: &A,
    prompt: &P,
    team: &str,
    cookie: Option<&str>,
    credentials: Option<&Credentials>,
) -> Result<Session, AuthError>
where
    A: SlackApi + Sync,
    P: Prompt + Sync,
{
    if let Some(cookie) = cookie {
        let session = Session::new(team, cookie);
        if api.validate_session(&session).await? {
            info!("configured cookie accepted for team `{team}`");
            return Ok(session);
        }
        warn!("configured cookie was rejected, falling back to interactive login");
    }

    let credentials = match credentials {
        Some(credentials) => credentials.clone(),
        None => prompt.credentials().await?,
    };

    match api.login(&credentials.email, &credentials.password).await? {
        LoginOutcome::Authenticated(session) => {
            info!("logged in to team `{team}`");
            Ok(session)
        }
        LoginOutcome::Rejected => Err(AuthError::InvalidCredentials),
        LoginOutcome::TwoFactorChallenge => {
            for attempt in 1..=TWO_FACTOR_ATTEMPTS {
                let code = prompt.one_time_code().await?;
                match api.two_factor(&code).await? {
                    LoginOutcome::Authenticated(session) => {
                        info!("logged in to team `{team}`");
                        return Ok(session);
                    }
                    _ => warn!("two-factor code rejected (attempt {attempt}/{TWO_FACTOR_ATTEMPTS})"),
                }
            }
            Err(AuthError::TwoFactorExhausted)
        }
    }
}
