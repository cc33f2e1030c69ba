use std::fmt::Display;

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;
use ureq::http::HeaderMap;

use crate::AGENT;

pub mod add;
pub mod item;
pub mod modify;

pub use add::{AddOptions, AddResult};
pub use item::{Item, RetrieveOptions, RetrieveResult, Sort};
pub use modify::{Action, ActionKind, ModifyResult, Modifier};

/// Where the Pocket API lives unless overridden.
pub const DEFAULT_ORIGIN: &str = "https://getpocket.com";

/// The consumer key and access token sent with every authenticated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    consumer_key: String,
    access_token: String,
}

impl Credential {
    /// Returns `None` unless both halves are non-empty.
    pub fn new(consumer_key: impl Into<String>, access_token: impl Into<String>) -> Option<Self> {
        let consumer_key = consumer_key.into();
        let access_token = access_token.into();
        if consumer_key.trim().is_empty() || access_token.trim().is_empty() {
            return None;
        }
        Some(Self {
            consumer_key,
            access_token,
        })
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

/// Rate-limit snapshot taken from the `X-Limit-*` response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub user_limit: String,
    pub user_remaining: String,
    pub user_reset: String,
    pub key_limit: String,
    pub key_remaining: String,
    pub key_reset: String,
}

impl RateLimit {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            user_limit: header(headers, "X-Limit-User-Limit"),
            user_remaining: header(headers, "X-Limit-User-Remaining"),
            user_reset: header(headers, "X-Limit-User-Reset"),
            key_limit: header(headers, "X-Limit-Key-Limit"),
            key_remaining: header(headers, "X-Limit-Key-Remaining"),
            key_reset: header(headers, "X-Limit-Key-Reset"),
        }
    }
}

impl Display for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "X-Limit-User-Limit={:?}; X-Limit-User-Remaining={:?}; X-Limit-User-Reset={:?}; \
             X-Limit-Key-Limit={:?}; X-Limit-Key-Remaining={:?}; X-Limit-Key-Reset={:?}",
            self.user_limit,
            self.user_remaining,
            self.user_reset,
            self.key_limit,
            self.key_remaining,
            self.key_reset,
        )
    }
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to reach {url}")]
    Transport {
        url: String,
        #[source]
        error: ureq::Error,
    },
    #[error("got response {status}; X-Error={x_error:?}; X-Error-Code={x_error_code:?}; {limits}")]
    Remote {
        status: u16,
        x_error: String,
        x_error_code: String,
        limits: RateLimit,
    },
    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        error: ureq::Error,
    },
}

impl Error {
    fn remote(status: u16, headers: &HeaderMap) -> Self {
        Error::Remote {
            status,
            x_error: header(headers, "X-Error"),
            x_error_code: header(headers, "X-Error-Code"),
            limits: RateLimit::from_headers(headers),
        }
    }

    /// Whether the remote answered at all, as opposed to the request never
    /// completing or the answer being unreadable.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. })
    }
}

/// POST `payload` as JSON to `origin` + `endpoint` and decode the JSON answer.
///
/// Any non-2xx status becomes [`Error::Remote`]. There are no retries.
pub fn post<P, R>(origin: &str, endpoint: &str, payload: &P) -> Result<R, Error>
where
    P: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let url = format!("{}{}", origin.trim_end_matches('/'), endpoint);
    debug!(%url, "POST");
    let mut response = AGENT
        .post(&url)
        .header("X-Accept", "application/json")
        .header("Content-Type", "application/json")
        .send_json(payload)
        .map_err(|error| Error::Transport {
            url: url.clone(),
            error,
        })?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::remote(status.as_u16(), response.headers()));
    }
    response
        .body_mut()
        .read_json::<R>()
        .map_err(|error| Error::Decode { url, error })
}

#[derive(Serialize)]
struct Authenticated<'a, P: ?Sized> {
    #[serde(flatten)]
    credential: &'a Credential,
    #[serde(flatten)]
    payload: &'a P,
}

/// An authenticated Pocket API client.
#[derive(Debug, Clone)]
pub struct Client {
    origin: String,
    credential: Credential,
}

impl Client {
    pub fn new(origin: impl Into<String>, credential: Credential) -> Self {
        Self {
            origin: origin.into(),
            credential,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// POST `payload` with the credential merged into the same JSON object.
    pub fn post<P, R>(&self, endpoint: &str, payload: &P) -> Result<R, Error>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = Authenticated {
            credential: &self.credential,
            payload,
        };
        post(&self.origin, endpoint, &body)
    }
}
