use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use configparser::ini::Ini;
use log::debug;

const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// One team's upload plan: the named section merged over `DEFAULT`.
#[derive(Debug, Clone)]
pub struct Profile {
    pub team: String,
    pub cookie: Option<String>,
    pub credentials: Option<Credentials>,
    pub(crate) keys: HashMap<String, String>,
}

impl Profile {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }
}

pub struct Settings {
    sections: HashMap<String, HashMap<String, Option<String>>>,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        debug!("loading settings from `{}`", path.display());
        let mut ini = Ini::new_cs();
        let sections = ini
            .load(path)
            .map_err(|err| anyhow!("couldn't load settings from `{}`: {err}", path.display()))?;
        Ok(Settings { sections })
    }

    /// Keys in the named section override `DEFAULT`; a missing section
    /// falls back to `DEFAULT` alone.
    pub fn profile(&self, name: &str) -> Result<Profile> {
        let mut keys: HashMap<String, String> = HashMap::new();
        if let Some(defaults) = self.sections.get(DEFAULT_SECTION) {
            for (key, value) in defaults {
                if let Some(value) = value {
                    keys.insert(key.clone(), value.clone());
                }
            }
        }
        match self.sections.get(name) {
            Some(section) => {
                debug!("loading `{name}` profile from settings");
                for (key, value) in section {
                    if let Some(value) = value {
                        keys.insert(key.clone(), value.clone());
                    }
                }
            }
            None => debug!("profile `{name}` was not found in settings"),
        }

        let team = keys
            .get("slack.team")
            .cloned()
            .ok_or_else(|| anyhow!("profile `{name}` has no `slack.team` key"))?;
        let cookie = keys
            .get("slack.cookie")
            .cloned()
            .filter(|cookie| !cookie.is_empty());
        let credentials = match (keys.get("slack.email"), keys.get("slack.password")) {
            (Some(email), Some(password)) => Some(Credentials {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Ok(Profile {
            team,
            cookie,
            credentials,
            keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn default_section_supplies_fallbacks() {
        let file = write_config(
            "[DEFAULT]\n\
             slack.team=kadeem\n\
             slack.cookie=d=abc123\n",
        );

        let profile = Settings::load(file.path()).unwrap().profile("default").unwrap();

        assert_eq!(profile.team, "kadeem");
        assert_eq!(profile.cookie.as_deref(), Some("d=abc123"));
        assert!(profile.credentials.is_none());
    }

    #[test]
    fn profile_section_overrides_default() {
        let file = write_config(
            "[DEFAULT]\n\
             slack.team=kadeem\n\
             [other_team]\n\
             slack.team=kazzer\n",
        );
        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.profile("other_team").unwrap().team, "kazzer");
        assert_eq!(settings.profile("default").unwrap().team, "kadeem");
    }

    #[test]
    fn missing_profile_falls_back_to_default_alone() {
        let file = write_config(
            "[DEFAULT]\n\
             slack.team=kadeem\n\
             [other_team]\n\
             slack.team=kazzer\n",
        );

        let profile = Settings::load(file.path()).unwrap().profile("absent").unwrap();

        assert_eq!(profile.team, "kadeem");
    }

    #[test]
    fn empty_cookie_is_treated_as_absent() {
        let file = write_config(
            "[DEFAULT]\n\
             slack.team=kadeem\n\
             slack.cookie=\n",
        );

        let profile = Settings::load(file.path()).unwrap().profile("default").unwrap();

        assert!(profile.cookie.is_none());
    }

    #[test]
    fn credentials_require_both_keys() {
        let file = write_config(
            "[DEFAULT]\n\
             slack.team=kadeem\n\
             slack.email=someone@example.com\n",
        );

        let profile = Settings::load(file.path()).unwrap().profile("default").unwrap();

        assert!(profile.credentials.is_none());
    }

    #[test]
    fn missing_team_fails() {
        let file = write_config("[other_team]\n1.id=bravo\n");

        let settings = Settings::load(file.path()).unwrap();

        assert!(settings.profile("other_team").is_err());
    }
}
