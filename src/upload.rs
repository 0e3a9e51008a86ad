use std::path::Path;

use bytes::Bytes;
use log::{debug, info, warn};

use crate::slack::{EmojiResponse, Session, SlackApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AlreadyExists,
    Rejected(String),
    TransportFailure(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Rejected(_) | Outcome::TransportFailure(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub task_id: String,
    pub source: String,
    pub outcome: Outcome,
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn read_source<A>(api: &A, upload_folder: &Path, source: &str) -> Result<Bytes, String>
where
    A: SlackApi + Sync,
{
    if is_url(source) {
        api.fetch_image(source)
            .await
            .map_err(|err| format!("couldn't fetch `{source}`: {err}"))
    } else {
        let path = upload_folder.join(source);
        debug!("opening `{}` for uploading", path.display());
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|err| format!("couldn't read `{}`: {err}", path.display()))
    }
}

/// Uploads one (id, source) pair. Expected platform responses and source
/// read failures all land in the returned result, never in an error.
pub async fn upload_one<A>(
    api: &A,
    session: &Session,
    upload_folder: &Path,
    task_id: &str,
    source: &str,
) -> UploadResult
where
    A: SlackApi + Sync,
{
    let outcome = match read_source(api, upload_folder, source).await {
        Err(reason) => Outcome::TransportFailure(reason),
        Ok(image) => match api.create_emoji(session, task_id, image).await {
            Ok(EmojiResponse::Created) => Outcome::Success,
            Ok(EmojiResponse::NameTaken) => Outcome::AlreadyExists,
            Ok(EmojiResponse::Rejected(reason)) => Outcome::Rejected(reason),
            Err(err) => Outcome::TransportFailure(err.to_string()),
        },
    };

    match &outcome {
        Outcome::Success => info!("uploaded `{source}` as `{task_id}` successfully"),
        Outcome::AlreadyExists => info!("`{task_id}` already exists, skipped"),
        Outcome::Rejected(reason) => warn!("upload of `{task_id}` was rejected: {reason}"),
        Outcome::TransportFailure(reason) => warn!("upload of `{task_id}` failed: {reason}"),
    }

    UploadResult {
        task_id: task_id.to_string(),
        source: source.to_string(),
        outcome,
    }
}
