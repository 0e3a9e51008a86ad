use lazy_regex::regex_is_match;
use thiserror::Error;

use crate::settings::Profile;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("index {0} has no `{0}.id` or `{0}.filename` entry")]
    MissingIndex(u32),
    #[error("index {index}: {ids} id(s) paired with {filenames} filename(s)")]
    GroupArityMismatch {
        index: u32,
        ids: usize,
        filenames: usize,
    },
    #[error("index {index}: `{id}` is not a valid emoji name")]
    InvalidId { index: u32, id: String },
}

/// One emoji name and the image sources configured for it, in the order
/// they were encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub sources: Vec<String>,
}

fn is_valid_id(id: &str) -> bool {
    regex_is_match!(r"^[a-z0-9_-]+$", id)
}

/// Expands the inclusive index range into an ordered task list.
///
/// `<n>.id` and `<n>.filename` are split on `|` and paired positionally.
/// An id that recurs across indices accumulates its sources instead of
/// clobbering the earlier ones.
pub fn resolve_tasks(profile: &Profile, start: u32, finish: u32) -> Result<Vec<Task>, ConfigError> {
    let mut tasks: Vec<Task> = Vec::new();
    for index in start..=finish {
        let ids = profile
            .get(&format!("{index}.id"))
            .ok_or(ConfigError::MissingIndex(index))?;
        let filenames = profile
            .get(&format!("{index}.filename"))
            .ok_or(ConfigError::MissingIndex(index))?;

        let ids: Vec<&str> = ids.split('|').collect();
        let filenames: Vec<&str> = filenames.split('|').collect();
        if ids.len() != filenames.len() {
            return Err(ConfigError::GroupArityMismatch {
                index,
                ids: ids.len(),
                filenames: filenames.len(),
            });
        }

        for (id, filename) in ids.iter().zip(&filenames) {
            if !is_valid_id(id) {
                return Err(ConfigError::InvalidId {
                    index,
                    id: id.to_string(),
                });
            }
            match tasks.iter_mut().find(|task| task.id == *id) {
                Some(task) => task.sources.push(filename.to_string()),
                None => tasks.push(Task {
                    id: id.to_string(),
                    sources: vec![filename.to_string()],
                }),
            }
        }
    }
    Ok(tasks)
}
