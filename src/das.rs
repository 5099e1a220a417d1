//! Client for the DAS cache server.
//!
//! DAS answers a query either with the final JSON document or, while the query is
//! still being processed, with a 32-character job id. The client keeps re-sending
//! the query with that id attached (`pid`), sleeping between polls, until the
//! document arrives or the client-side threshold runs out.

use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;
use reqwest::Identity;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::DasError;
use crate::fs_util::{expand_home, read_file};
use crate::normalize::normalize;

pub const DEFAULT_HOST: &str = "https://cmsweb.cern.ch";
pub const DEFAULT_THRESHOLD: Duration = Duration::from_secs(300);
pub const INITIAL_DELAY: Duration = Duration::from_secs(2);
pub const MAX_DELAY: Duration = Duration::from_secs(20);

const CACHE_PATH: &str = "/das/cache";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

static HOST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("host pattern compiles"));
static TOKEN_PATTERN: LazyLock<regex::bytes::Regex> = LazyLock::new(|| {
    regex::bytes::Regex::new(r"^[0-9a-f]{32}$").expect("token pattern compiles")
});

/// Byte-level access to the DAS server.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<Vec<u8>, DasError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<Vec<u8>, DasError> {
        (**self).get(url, params)
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub key: Option<String>,
    pub cert: Option<String>,
    pub verbose: u8,
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(options: &TransportOptions) -> Result<Self, DasError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("das-import/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DasError::Http(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .connection_verbose(options.verbose > 0);
        if let Some(identity) = load_identity(options)? {
            debug!("using client certificate authentication");
            builder = builder.identity(identity);
        }
        let client = builder
            .build()
            .map_err(|err| DasError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(&'static str, String)]) -> Result<Vec<u8>, DasError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .map_err(|err| DasError::Http(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "DAS request failed".to_string());
            return Err(DasError::Status { status, message });
        }
        let body = response
            .bytes()
            .map_err(|err| DasError::Http(err.to_string()))?;
        Ok(body.to_vec())
    }
}

fn load_identity(options: &TransportOptions) -> Result<Option<Identity>, DasError> {
    let key = options.key.as_deref().filter(|value| !value.is_empty());
    let cert = options.cert.as_deref().filter(|value| !value.is_empty());
    let (Some(key), Some(cert)) = (key, cert) else {
        return Ok(None);
    };
    let mut pem = read_file(&expand_home(key)?)?;
    pem.push(b'\n');
    pem.extend(read_file(&expand_home(cert)?)?);
    Identity::from_pem(&pem)
        .map(Some)
        .map_err(|err| DasError::Credentials(err.to_string()))
}

/// Sawtooth delay schedule: doubles up to the ceiling, then starts over.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    ceiling: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        Self {
            initial,
            ceiling,
            next: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let current = self.next;
        self.next = if current >= self.ceiling {
            self.initial
        } else {
            (current * 2).min(self.ceiling)
        };
        current
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, MAX_DELAY)
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DasQuery {
    pub input: String,
    pub idx: u32,
    pub limit: u32,
}

impl DasQuery {
    pub fn new(input: impl Into<String>, idx: u32, limit: u32) -> Self {
        Self {
            input: input.into(),
            idx,
            limit,
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("input", self.input.clone()),
            ("idx", self.idx.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Document(Value),
    Failed { reason: String },
}

impl QueryOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        QueryOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// The outcome as DAS itself would report it.
    pub fn to_json(&self) -> Value {
        match self {
            QueryOutcome::Document(document) => document.clone(),
            QueryOutcome::Failed { reason } => json!({"status": "fail", "reason": reason}),
        }
    }

    pub fn into_document(self) -> Result<Value, DasError> {
        match self {
            QueryOutcome::Document(document) => Ok(document),
            QueryOutcome::Failed { reason } => Err(DasError::QueryFailed(reason)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub host: String,
    pub threshold: Duration,
    pub include_service_headers: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            threshold: DEFAULT_THRESHOLD,
            include_service_headers: false,
        }
    }
}

pub struct DasClient<T: Transport, C: Clock = SystemClock> {
    url: String,
    settings: ClientSettings,
    transport: T,
    clock: C,
}

impl<T: Transport, C: Clock> std::fmt::Debug for DasClient<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DasClient")
            .field("url", &self.url)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, C: Clock> DasClient<T, C> {
    pub fn new(settings: ClientSettings, transport: T, clock: C) -> Result<Self, DasError> {
        validate_host(&settings.host)?;
        let url = format!("{}{CACHE_PATH}", settings.host.trim_end_matches('/'));
        Ok(Self {
            url,
            settings,
            transport,
            clock,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Runs one query to completion.
    ///
    /// Errors on the first request and unparsable final payloads are returned as
    /// `Err`. Transport errors while polling and the client timeout are reported as
    /// [`QueryOutcome::Failed`], leaving the decision to the caller.
    pub fn fetch(&self, query: &DasQuery) -> Result<QueryOutcome, DasError> {
        let mut params = query.params();
        debug!(url = %self.url, input = %query.input, "sending DAS query");
        let started = self.clock.now();
        let mut body = self.transport.get(&self.url, &params)?;

        let mut backoff = Backoff::default();
        while let Some(pid) = pending_token(&body) {
            let delay = backoff.next_delay();
            debug!(%pid, delay_secs = delay.as_secs(), "DAS job pending");
            self.clock.sleep(delay);

            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed > self.settings.threshold {
                return Ok(QueryOutcome::failed(format!(
                    "client timeout after {} sec",
                    elapsed.as_secs()
                )));
            }

            set_param(&mut params, "pid", pid);
            body = match self.transport.get(&self.url, &params) {
                Ok(body) => body,
                Err(err @ (DasError::Http(_) | DasError::Status { .. })) => {
                    debug!(error = %err, "DAS poll failed");
                    return Ok(QueryOutcome::failed(err.to_string()));
                }
                Err(err) => return Err(err),
            };
        }

        let document: Value = serde_json::from_slice(&body)
            .map_err(|err| DasError::MalformedResponse(err.to_string()))?;
        Ok(QueryOutcome::Document(normalize(
            document,
            self.settings.include_service_headers,
        )))
    }
}

pub fn validate_host(host: &str) -> Result<(), DasError> {
    if HOST_PATTERN.is_match(host) {
        Ok(())
    } else {
        Err(DasError::InvalidHost(host.to_string()))
    }
}

/// Returns the job id when `body` is a pending-job token rather than a payload.
pub fn pending_token(body: &[u8]) -> Option<String> {
    if !TOKEN_PATTERN.is_match(body) {
        return None;
    }
    std::str::from_utf8(body).ok().map(str::to_string)
}

fn set_param(params: &mut Vec<(&'static str, String)>, key: &'static str, value: String) {
    match params.iter_mut().find(|(name, _)| *name == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key, value)),
    }
}
