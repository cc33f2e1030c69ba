use std::{fs, io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{api::DEFAULT_ORIGIN, cli::Cli};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not determine the home directory; pass --config-dir")]
    NoHomeDir,
    #[error("Failed to create configuration directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Everything the commands need to know about their environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Holds `consumer_key` and `auth.json`.
    pub dir: PathBuf,
    pub origin: String,
    pub auth_timeout: Duration,
    pub browser: Option<String>,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, Error> {
        let dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => default_dir()?,
        };
        Ok(Self {
            dir,
            origin: cli.origin.clone(),
            auth_timeout: Duration::from_secs(cli.auth_timeout),
            browser: cli.browser.clone(),
        })
    }

    /// Create the configuration directory if it is missing.
    pub fn ensure_dir(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.dir).map_err(|error| Error::CreateDir {
            path: self.dir.clone(),
            error,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".config/pocket"),
            origin: DEFAULT_ORIGIN.to_owned(),
            auth_timeout: Duration::from_secs(300),
            browser: None,
        }
    }
}

/// `~/.config/pocket`, the location earlier releases used on every platform.
fn default_dir() -> Result<PathBuf, Error> {
    dirs::home_dir()
        .map(|home| home.join(".config").join("pocket"))
        .ok_or(Error::NoHomeDir)
}
