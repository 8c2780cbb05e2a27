//! Candidate probing
//!
//! A probe answers one question: does this URL currently resolve to a
//! loadable image? Probes are best-effort and bounded by a fixed timeout;
//! a probe that neither succeeds nor fails within the bound counts as a
//! failure.

use crate::error::{NetworkError, Result};
use async_trait::async_trait;
use log::{debug, trace, warn};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;

/// Default bound for existence probes
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default bound for preload probes (more generous, the image body may be
/// pulled into an edge cache as a side effect)
pub const DEFAULT_PRELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of probing one candidate URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The host confirmed an image at this URL
    Loadable,
    /// The request completed but the response could not be confirmed as an
    /// image (missing or non-image content type). Treated optimistically as
    /// valid: cover hosts routinely omit or mislabel content types.
    Opaque,
    /// The host answered with a failure status or the transport failed
    Unreachable,
    /// Neither success nor failure within the timeout bound
    TimedOut,
}

impl ProbeOutcome {
    /// Whether the candidate should be treated as a usable image source
    pub fn is_valid(&self) -> bool {
        matches!(self, ProbeOutcome::Loadable | ProbeOutcome::Opaque)
    }
}

/// Trait for candidate probing implementations
#[async_trait]
pub trait ImageProber: Send + Sync {
    /// Probe a single URL for loadability.
    ///
    /// Never returns an error: transport failures are an expected outcome,
    /// not an exceptional one.
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP-based prober using HEAD requests with a GET fallback for hosts that
/// reject HEAD.
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober with the default existence-test timeout
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_timeout(user_agent, DEFAULT_PROBE_TIMEOUT)
    }

    /// Create a prober with a custom timeout bound
    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| NetworkError::ClientBuild {
                message: e.to_string(),
            })?;

        Ok(Self { client, timeout })
    }

    fn classify_response(url: &str, status: StatusCode, content_type: Option<&str>) -> ProbeOutcome {
        if status.is_client_error() || status.is_server_error() {
            trace!("Probe of {url} rejected with status {status}");
            return ProbeOutcome::Unreachable;
        }

        match content_type {
            Some(ct) if ct.starts_with("image/") => ProbeOutcome::Loadable,
            Some(ct) => {
                trace!("Probe of {url} returned non-image content type '{ct}'");
                ProbeOutcome::Opaque
            }
            None => ProbeOutcome::Opaque,
        }
    }

    async fn probe_with_method(&self, url: &str, head: bool) -> std::result::Result<ProbeOutcome, reqwest::Error> {
        let request = if head {
            self.client.head(url)
        } else {
            // Range-limited GET keeps the fallback cheap on hosts that
            // reject HEAD outright.
            self.client.get(url).header(header::RANGE, "bytes=0-0")
        };

        let response = request.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        if head && (status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED)
        {
            debug!("Host rejected HEAD for {url}, retrying with ranged GET");
            return Box::pin(self.probe_with_method(url, false)).await;
        }

        Ok(Self::classify_response(url, status, content_type.as_deref()))
    }
}

#[async_trait]
impl ImageProber for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        // Local static assets are served by the application itself and are
        // always assumed present.
        if url.starts_with('/') {
            return ProbeOutcome::Loadable;
        }

        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                debug!("Refusing to probe malformed or non-http URL: {url}");
                return ProbeOutcome::Unreachable;
            }
        }

        match tokio::time::timeout(self.timeout, self.probe_with_method(url, true)).await {
            Ok(Ok(outcome)) => {
                debug!("Probe of {url}: {outcome:?}");
                outcome
            }
            Ok(Err(e)) => {
                warn!("Probe of {url} failed: {e}");
                ProbeOutcome::Unreachable
            }
            Err(_) => {
                warn!(
                    "Probe of {url} timed out after {}s",
                    self.timeout.as_secs()
                );
                ProbeOutcome::TimedOut
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_validity() {
        assert!(ProbeOutcome::Loadable.is_valid());
        assert!(ProbeOutcome::Opaque.is_valid());
        assert!(!ProbeOutcome::Unreachable.is_valid());
        assert!(!ProbeOutcome::TimedOut.is_valid());
    }

    #[test]
    fn test_classify_response_by_content_type() {
        let ok = StatusCode::OK;
        assert_eq!(
            HttpProber::classify_response("u", ok, Some("image/jpeg")),
            ProbeOutcome::Loadable
        );
        assert_eq!(
            HttpProber::classify_response("u", ok, Some("text/html")),
            ProbeOutcome::Opaque
        );
        assert_eq!(
            HttpProber::classify_response("u", ok, None),
            ProbeOutcome::Opaque
        );
        assert_eq!(
            HttpProber::classify_response("u", StatusCode::NOT_FOUND, Some("image/jpeg")),
            ProbeOutcome::Unreachable
        );
    }

    #[tokio::test]
    async fn test_local_placeholder_is_loadable_without_network() {
        let prober = HttpProber::new("coverfall-test").unwrap();
        assert_eq!(
            prober.probe("/images/placeholder-book.svg").await,
            ProbeOutcome::Loadable
        );
    }

    #[tokio::test]
    async fn test_unrecognized_scheme_is_unreachable() {
        let prober = HttpProber::new("coverfall-test").unwrap();
        assert_eq!(
            prober.probe("ftp://example.com/cover.jpg").await,
            ProbeOutcome::Unreachable
        );
        assert_eq!(prober.probe("not a url").await, ProbeOutcome::Unreachable);
    }
}
