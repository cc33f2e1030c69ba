use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    api::Credential,
    auth::{self, Authorization},
    config::Config,
    prompt::{self, Prompt},
};

pub const CONSUMER_KEY_FILE: &str = "consumer_key";
pub const AUTH_FILE: &str = "auth.json";

const CONSUMER_KEY_QUESTION: &str =
    "Enter your consumer key (from https://getpocket.com/developer/apps/)";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
    #[error("The consumer key or access token is empty")]
    EmptyCredential,
    #[error("Failed to ask for the consumer key")]
    Prompt(#[from] prompt::Error),
    #[error("Authorization failed")]
    Authorization(#[from] auth::Error),
    /// Authorization worked but the token could not be saved. The credential
    /// is still good for this run.
    #[error("Authorized, but failed to save the access token to {path}")]
    Unsaved {
        path: PathBuf,
        #[source]
        error: io::Error,
        credential: Credential,
    },
}

impl Error {
    /// The credential an [`Error::Unsaved`] still carries.
    pub fn into_credential(self) -> Result<Credential, Self> {
        match self {
            Error::Unsaved { credential, .. } => Ok(credential),
            other => Err(other),
        }
    }
}

/// The consumer key and access token files under the configuration directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(config: &Config) -> Self {
        Self {
            dir: config.dir.clone(),
        }
    }

    pub fn consumer_key_path(&self) -> PathBuf {
        self.dir.join(CONSUMER_KEY_FILE)
    }

    pub fn auth_path(&self) -> PathBuf {
        self.dir.join(AUTH_FILE)
    }

    /// Read the consumer key, asking for it and saving the answer when there
    /// is none yet. Only the first line of the file counts.
    pub fn load_consumer_key(&self, prompt: &mut dyn Prompt) -> Result<String, Error> {
        let path = self.consumer_key_path();
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let key = contents.lines().next().unwrap_or_default().trim();
                if !key.is_empty() {
                    return Ok(key.to_owned());
                }
                info!(path = %path.display(), "consumer key file is empty");
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no consumer key saved yet");
            }
            Err(error) => return Err(Error::Read { path, error }),
        }

        let key = prompt.input(CONSUMER_KEY_QUESTION)?.trim().to_owned();
        if key.is_empty() {
            return Err(Error::EmptyCredential);
        }
        write_private(&path, format!("{key}\n").as_bytes())
            .map_err(|error| Error::Write { path, error })?;
        Ok(key)
    }

    /// Load the saved access token, or run `authorize` and save its result.
    ///
    /// A missing, unreadable or empty token file all lead to authorization.
    pub fn ensure_access_token<F>(&self, consumer_key: &str, authorize: F) -> Result<Credential, Error>
    where
        F: FnOnce(&str) -> Result<Authorization, auth::Error>,
    {
        let path = self.auth_path();
        if let Some(credential) = load_authorization(&path)
            .and_then(|saved| Credential::new(consumer_key, saved.access_token))
        {
            return Ok(credential);
        }

        let authorization = authorize(consumer_key)?;
        let credential = Credential::new(consumer_key, authorization.access_token.as_str())
            .ok_or(Error::EmptyCredential)?;
        let saved = serde_json::to_vec_pretty(&authorization)
            .map_err(io::Error::from)
            .and_then(|json| write_private(&path, &json));
        match saved {
            Ok(()) => {
                info!(path = %path.display(), user = %authorization.username, "saved access token");
                Ok(credential)
            }
            Err(error) => Err(Error::Unsaved {
                path,
                error,
                credential,
            }),
        }
    }
}

fn load_authorization(path: &Path) -> Option<Authorization> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(error) => {
            debug!(path = %path.display(), "no saved access token: {error}");
            return None;
        }
    };
    serde_json::from_slice(&contents)
        .inspect_err(|error| warn!(path = %path.display(), "ignoring unreadable access token: {error}"))
        .ok()
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)?.write_all(contents)
}
