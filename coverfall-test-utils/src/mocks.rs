//! Mock implementations of the resolver's collaborator seams
//!
//! Both mocks record every call, so tests can assert not only outcomes but
//! how many network operations a code path would have issued.

use async_trait::async_trait;
use coverfall_core::error::{Error, NetworkError, Result};
use coverfall_core::probe::{ImageProber, ProbeOutcome};
use coverfall_core::scrape::{VolumeHit, VolumeLookup};
use std::collections::HashMap;
use std::sync::Mutex;

/// Scriptable prober: configure outcomes per URL, with a default for
/// everything unconfigured.
///
/// # Examples
///
/// ```
/// use coverfall_test_utils::MockProber;
/// use coverfall_core::probe::{ImageProber, ProbeOutcome};
///
/// # async fn example() {
/// let prober = MockProber::failing();
/// prober.respond_with("https://example.com/good.jpg", ProbeOutcome::Loadable);
///
/// assert_eq!(
///     prober.probe("https://example.com/good.jpg").await,
///     ProbeOutcome::Loadable
/// );
/// assert_eq!(prober.call_count(), 1);
/// # }
/// ```
pub struct MockProber {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    default_outcome: ProbeOutcome,
    calls: Mutex<Vec<String>>,
}

impl MockProber {
    /// Prober whose unconfigured URLs probe as unreachable
    pub fn failing() -> Self {
        Self::with_default(ProbeOutcome::Unreachable)
    }

    /// Prober whose unconfigured URLs probe as loadable
    pub fn succeeding() -> Self {
        Self::with_default(ProbeOutcome::Loadable)
    }

    pub fn with_default(default_outcome: ProbeOutcome) -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            default_outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one exact URL
    pub fn respond_with(&self, url: &str, outcome: ProbeOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(url.to_string(), outcome);
    }

    /// Total number of probes issued
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every probed URL, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of probes issued against one exact URL
    pub fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl ImageProber for MockProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.calls.lock().unwrap().push(url.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(self.default_outcome)
    }
}

/// Scriptable volume lookup: configure hit lists per query, with optional
/// blanket failure.
pub struct MockVolumeLookup {
    responses: Mutex<HashMap<String, Vec<VolumeHit>>>,
    fail_all: bool,
    calls: Mutex<Vec<String>>,
}

impl MockVolumeLookup {
    /// Lookup that returns no hits for unconfigured queries
    pub fn empty() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            fail_all: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Lookup whose every call fails at the transport level
    pub fn unreachable() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            fail_all: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script the hits for one exact query string
    pub fn respond_with(&self, query: &str, hits: Vec<VolumeHit>) {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), hits);
    }

    /// Convenience: one hit carrying only a thumbnail URL
    pub fn respond_with_thumbnail(&self, query: &str, thumbnail: &str) {
        self.respond_with(
            query,
            vec![VolumeHit {
                title: None,
                authors: Vec::new(),
                thumbnail: Some(thumbnail.to_string()),
            }],
        );
    }

    /// Total number of searches issued
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every query issued, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VolumeLookup for MockVolumeLookup {
    async fn search(&self, query: &str) -> Result<Vec<VolumeHit>> {
        self.calls.lock().unwrap().push(query.to_string());

        if self.fail_all {
            return Err(Error::Network(NetworkError::transport(
                "mock://volumes",
                "mock lookup configured to fail",
            )));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}
