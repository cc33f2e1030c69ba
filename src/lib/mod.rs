use std::time::Duration;

use once_cell::sync::Lazy;
use ureq::Agent;

pub mod api;
pub mod auth;
pub mod browser;
pub mod canonical;
pub mod cli;
pub mod commands;
pub mod config;
pub mod cull;
pub mod error;
pub mod probe;
pub mod prompt;
pub mod store;
pub mod template;

pub use error::{Error, ErrorKind};

const USER_AGENT: &str = concat!("pocket/", env!("CARGO_PKG_VERSION"));

/// HTTP agent shared by the API gateway and the liveness prober.
///
/// Non-2xx statuses are returned as responses rather than errors so callers
/// can read the error and rate-limit headers.
pub static AGENT: Lazy<Agent> = Lazy::new(|| {
    let config = Agent::config_builder()
        .user_agent(USER_AGENT)
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(30)))
        .build();
    let agent: Agent = config.into();
    agent
});
