use std::io;

use thiserror::Error;
use tracing::debug;
use ureq::{Body, ResponseExt, http::Response};

use crate::AGENT;

/// Body fragments of pages that answer 200 for content that is gone.
const REMOVED_PHRASES: &[&str] = &["isn't available anymore", "this page doesn"];

/// The highest status still counted as reachable (308 Permanent Redirect).
const LAST_ALIVE_STATUS: u16 = 308;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: u16,
    pub status_text: String,
    /// Where the redirect chain ended, which may be another host entirely.
    pub final_url: String,
}

impl ProbeResult {
    pub fn is_alive(&self) -> bool {
        self.status <= LAST_ALIVE_STATUS
    }

    fn not_found(final_url: String) -> Self {
        Self {
            status: 404,
            status_text: "Not Available".to_owned(),
            final_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Response(ProbeResult),
    /// The server closed the connection without answering.
    Inconclusive,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to probe {url}")]
    Request {
        url: String,
        #[source]
        error: ureq::Error,
    },
}

pub trait Prober {
    fn probe(&self, url: &str) -> Result<Outcome, Error>;
}

/// Probes over the shared HTTP agent.
///
/// HEAD comes first. A dead HEAD answer is final; anything else is confirmed
/// with a GET whose body is checked for removal notices, since soft-404 pages
/// answer HEAD with 200 too.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpProber;

impl Prober for HttpProber {
    fn probe(&self, url: &str) -> Result<Outcome, Error> {
        let head = match AGENT.head(url).call() {
            Ok(response) if refuses_head(response.status().as_u16()) => {
                debug!(%url, status = response.status().as_u16(), "HEAD refused, trying GET");
                None
            }
            Ok(response) => {
                let result = summarize(&response);
                if !result.is_alive() {
                    return Ok(Outcome::Response(result));
                }
                Some(result)
            }
            Err(error) if is_end_of_stream(&error) => return Ok(Outcome::Inconclusive),
            Err(error) => {
                debug!(%url, "HEAD failed ({error}), trying GET");
                None
            }
        };

        let mut response = match (AGENT.get(url).call(), head) {
            (Ok(response), _) => response,
            // HEAD already showed the page is there.
            (Err(error), Some(result)) => {
                debug!(%url, "GET failed after a live HEAD ({error})");
                return Ok(Outcome::Response(result));
            }
            (Err(error), None) => {
                return Err(Error::Request {
                    url: url.to_owned(),
                    error,
                });
            }
        };
        let result = summarize(&response);
        // Unreadable bodies are not evidence either way.
        let body = response.body_mut().read_to_string().unwrap_or_default();
        if looks_removed(&body) {
            return Ok(Outcome::Response(ProbeResult::not_found(result.final_url)));
        }
        Ok(Outcome::Response(result))
    }
}

fn summarize(response: &Response<Body>) -> ProbeResult {
    let status = response.status();
    ProbeResult {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        final_url: response.get_uri().to_string(),
    }
}

fn refuses_head(status: u16) -> bool {
    status == 405 || status == 501
}

fn is_end_of_stream(error: &ureq::Error) -> bool {
    matches!(error, ureq::Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

fn looks_removed(body: &str) -> bool {
    REMOVED_PHRASES.iter().any(|p| body.contains(p))
}
