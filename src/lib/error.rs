use std::{error::Error as StdError, io};

use thiserror::Error;

use crate::{api, config, cull, prompt, store, template};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error(transparent)]
    Api(#[from] api::Error),
    #[error(transparent)]
    Template(#[from] template::Error),
    #[error(transparent)]
    Cull(#[from] cull::Error),
    #[error(transparent)]
    Prompt(#[from] prompt::Error),
    #[error("Failed to write output")]
    Output(#[from] io::Error),
}

/// What went wrong, coarsely, for choosing an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote service or a probed site could not be reached.
    Transport,
    /// The remote service answered with an error status.
    RemoteApi,
    Auth,
    /// Local files or streams could not be read or written.
    Persistence,
    /// Bad template, missing home directory, no terminal to ask on.
    Config,
    /// The operator quit.
    Interrupted,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => 2,
            ErrorKind::Auth => 3,
            ErrorKind::Persistence => 4,
            ErrorKind::RemoteApi => 5,
            ErrorKind::Transport => 6,
            ErrorKind::Interrupted => 130,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::Store(e) => store_kind(e),
            Error::Api(e) => api_kind(e),
            Error::Template(_) => ErrorKind::Config,
            Error::Cull(e) => match e {
                cull::Error::Template(_) => ErrorKind::Config,
                cull::Error::Prompt(e) => prompt_kind(e),
                cull::Error::Output(_) => ErrorKind::Persistence,
                cull::Error::BulkDelete(e) => api_kind(e),
            },
            Error::Prompt(e) => prompt_kind(e),
            Error::Output(_) => ErrorKind::Persistence,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}

fn api_kind(e: &api::Error) -> ErrorKind {
    if e.is_remote() {
        ErrorKind::RemoteApi
    } else {
        ErrorKind::Transport
    }
}

fn prompt_kind(e: &prompt::Error) -> ErrorKind {
    match e {
        prompt::Error::Quit => ErrorKind::Interrupted,
        prompt::Error::Terminal(_) => ErrorKind::Config,
    }
}

fn store_kind(e: &store::Error) -> ErrorKind {
    match e {
        store::Error::Authorization(_) => ErrorKind::Auth,
        store::Error::Prompt(e) => prompt_kind(e),
        store::Error::Read { .. }
        | store::Error::Write { .. }
        | store::Error::EmptyCredential
        | store::Error::Unsaved { .. } => ErrorKind::Persistence,
    }
}

/// An error and all of its sources on one line.
pub fn describe(error: &dyn StdError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(e) = source {
        text.push_str(": ");
        text.push_str(&e.to_string());
        source = e.source();
    }
    text
}
