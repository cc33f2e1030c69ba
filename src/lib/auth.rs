//! Three-legged authorization against Pocket.
//!
//! A request token is obtained for a loopback redirect URL, the operator
//! approves it in a browser, and the browser's redirect to the loopback
//! listener is what allows the request token to be exchanged for an access
//! token.

use std::{
    io::{self, BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::api;

/// How long a single callback connection may take to send its request.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// What the access-token endpoint returns, and what gets stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub access_token: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to bind the local callback listener")]
    Bind(#[source] io::Error),
    #[error("Failed to obtain a request token")]
    RequestToken(#[source] api::Error),
    #[error("The service returned an empty request token")]
    EmptyRequestToken,
    #[error("Failed to build the authorization URL")]
    AuthorizationUrl(#[source] url::ParseError),
    #[error("Timed out after {0:?} waiting for the authorization callback")]
    Timeout(Duration),
    #[error("The callback listener stopped before authorization was approved")]
    ListenerClosed,
    #[error("Failed to exchange the request token for an access token")]
    AccessToken(#[source] api::Error),
    #[error("The service returned an empty access token")]
    EmptyAccessToken,
}

#[derive(Serialize)]
struct RequestTokenRequest<'a> {
    consumer_key: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct RequestToken {
    code: String,
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    consumer_key: &'a str,
    code: &'a str,
}

pub struct Authorizer {
    origin: String,
    timeout: Duration,
}

impl Authorizer {
    pub fn new(origin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            origin: origin.into(),
            timeout,
        }
    }

    /// Run the whole handshake for `consumer_key`.
    ///
    /// `show_url` receives the page the operator must open and approve. The
    /// call blocks until the browser lands on the callback listener or the
    /// timeout elapses. The listener is closed before this returns, whatever
    /// the outcome.
    pub fn authorize(
        &self,
        consumer_key: &str,
        show_url: impl FnOnce(&Url),
    ) -> Result<Authorization, Error> {
        let callback = CallbackServer::bind().map_err(Error::Bind)?;
        let redirect_uri = callback.url();
        info!(%redirect_uri, "listening for the authorization callback");

        let RequestToken { code } = api::post(
            &self.origin,
            "/v3/oauth/request",
            &RequestTokenRequest {
                consumer_key,
                redirect_uri: &redirect_uri,
            },
        )
        .map_err(Error::RequestToken)?;
        if code.trim().is_empty() {
            return Err(Error::EmptyRequestToken);
        }

        show_url(&self.authorization_url(&code, &redirect_uri)?);
        callback.wait(self.timeout)?;
        debug!("authorization approved, exchanging request token");

        let authorization: Authorization = api::post(
            &self.origin,
            "/v3/oauth/authorize",
            &AccessTokenRequest {
                consumer_key,
                code: &code,
            },
        )
        .map_err(Error::AccessToken)?;
        if authorization.access_token.trim().is_empty() {
            return Err(Error::EmptyAccessToken);
        }
        Ok(authorization)
    }

    fn authorization_url(&self, code: &str, redirect_uri: &str) -> Result<Url, Error> {
        Url::parse_with_params(
            &format!("{}/auth/authorize", self.origin.trim_end_matches('/')),
            &[("request_token", code), ("redirect_uri", redirect_uri)],
        )
        .map_err(Error::AuthorizationUrl)
    }
}

/// Loopback listener that fires once when the browser comes back.
///
/// Dropping it stops the accept loop and joins its thread.
struct CallbackServer {
    addr: SocketAddr,
    approved: Receiver<()>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CallbackServer {
    fn bind() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let (tx, approved) = mpsc::sync_channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn({
            let stop = Arc::clone(&stop);
            move || serve(listener, tx, &stop)
        });
        Ok(Self {
            addr,
            approved,
            stop,
            handle: Some(handle),
        })
    }

    fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    fn wait(&self, timeout: Duration) -> Result<(), Error> {
        match self.approved.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(Error::ListenerClosed),
        }
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Wake the blocking accept so the loop sees the flag.
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!(addr = %self.addr, "callback listener closed");
    }
}

fn serve(listener: TcpListener, tx: SyncSender<()>, stop: &AtomicBool) {
    let mut tx = Some(tx);
    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("callback accept failed: {e}");
                continue;
            }
        };
        match answer(stream) {
            Ok(true) => {
                if let Some(tx) = tx.take() {
                    let _ = tx.try_send(());
                }
            }
            Ok(false) => {}
            Err(e) => warn!("callback request failed: {e}"),
        }
    }
}

/// Answer one request. Returns whether it counts as the approval signal.
fn answer(stream: TcpStream) -> io::Result<bool> {
    stream.set_read_timeout(Some(CALLBACK_READ_TIMEOUT))?;
    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    debug!(%path, "callback request");
    if path == "/favicon.ico" {
        respond(&stream, "404 Not Found", "Not Found\n")?;
        return Ok(false);
    }
    respond(&stream, "200 OK", "Authorized.\n")?;
    Ok(true)
}

fn respond(mut stream: &TcpStream, status: &str, body: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )?;
    stream.flush()
}
