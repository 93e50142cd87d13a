use std::{io::Write, thread, time::Duration};

use tracing::warn;

use crate::{config::RetryPolicy, Error};

/// A failure below the HTTP status level (DNS, connect, timeout, reset, bad URL).
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
    /// Whether another attempt could succeed.
    pub retryable: bool,
}

impl TransportError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self { message: message.into(), retryable: true }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self { message: message.into(), retryable: false }
    }
}

/// Blocking HTTP GET. Streams the body into `sink` and returns the status code.
///
/// This is the only seam between the crate and the network; tests substitute
/// an in-memory implementation.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u16, TransportError>;
}

/// How a response status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Terminal,
}

/// Timeouts, throttling and server errors are worth retrying; other non-2xx codes are not.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        200..=299 => StatusClass::Success,
        408 | 429 | 500..=599 => StatusClass::Transient,
        _ => StatusClass::Terminal,
    }
}

/// Outcome of a single attempt inside [`retry_loop`].
pub(crate) enum Step<T> {
    Done(T),
    Retry(RetryCause),
    Fail(Error),
}

#[derive(Debug, Clone)]
pub(crate) enum RetryCause {
    Transient(String),
    Corrupted(String),
}

impl RetryCause {
    pub(crate) fn message(&self) -> &str {
        match self {
            RetryCause::Transient(m) | RetryCause::Corrupted(m) => m,
        }
    }
}

pub(crate) enum RetryError {
    Fatal(Error),
    Exhausted { attempts: u32, last: RetryCause },
}

/// Run `op` up to `policy.max_attempts` times, sleeping with exponential backoff between attempts.
pub(crate) fn retry_loop<T>(
    policy: &RetryPolicy,
    label: &str,
    mut op: impl FnMut(u32) -> Step<T>,
) -> std::result::Result<T, RetryError> {
    let attempts = policy.max_attempts.max(1);
    let mut last = RetryCause::Transient("no attempt made".into());

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay(attempt - 1);
            warn!(operation = label, attempt, delay_ms = delay.as_millis() as u64, error = last.message(), "retrying");
            if delay > Duration::ZERO { thread::sleep(delay) }
        }
        match op(attempt) {
            Step::Done(value) => return Ok(value),
            Step::Fail(err) => return Err(RetryError::Fatal(err)),
            Step::Retry(cause) => last = cause,
        }
    }

    Err(RetryError::Exhausted { attempts, last })
}

/// reqwest-backed fetcher with a per-request timeout.
#[cfg(feature = "download")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "download")]
impl HttpFetcher {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("censusgeo/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "download")]
impl Fetcher for HttpFetcher {
    fn get(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u16, TransportError> {
        fn classify(e: reqwest::Error) -> TransportError {
            if e.is_builder() || e.is_redirect() {
                TransportError::terminal(e.to_string())
            } else {
                TransportError::transient(e.to_string())
            }
        }

        let mut resp = self.client.get(url).send().map_err(classify)?;
        let status = resp.status().as_u16();
        std::io::copy(&mut resp, sink)
            .map_err(|e| TransportError::transient(format!("reading body of {url}: {e}")))?;
        Ok(status)
    }
}
