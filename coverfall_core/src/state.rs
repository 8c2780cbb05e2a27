//! Resolution state machine
//!
//! Each resolution walks `Initializing -> Loading -> {Loaded, Failed}`,
//! where `Failed` can swing back to `Loading` while candidates (or the
//! cache-busting retry budget) remain. The resolver applies the
//! transitions; this module defines the states and which moves are legal.

use crate::types::CandidateSource;
use std::fmt;

/// State of one in-flight resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveState {
    /// Candidate list not yet built
    Initializing,
    /// A candidate probe is in flight
    Loading {
        url: String,
        source: CandidateSource,
    },
    /// A candidate loaded; terminal
    Loaded {
        url: String,
        source: CandidateSource,
    },
    /// All candidates exhausted; terminal. Callers render a placeholder
    /// block rather than a broken image.
    Failed,
}

impl ResolveState {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolveState::Loaded { .. } | ResolveState::Failed)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ResolveState::Loaded { .. })
    }

    /// URL currently being attempted or settled on
    pub fn url(&self) -> Option<&str> {
        match self {
            ResolveState::Loading { url, .. } | ResolveState::Loaded { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: &ResolveState) -> bool {
        match (self, next) {
            // First attempt
            (ResolveState::Initializing, ResolveState::Loading { .. }) => true,
            // Empty candidate list degenerates straight to failure
            (ResolveState::Initializing, ResolveState::Failed) => true,
            // Probe settled
            (ResolveState::Loading { .. }, ResolveState::Loaded { .. }) => true,
            (ResolveState::Loading { .. }, ResolveState::Failed) => true,
            // Next candidate after a failure
            (ResolveState::Loading { .. }, ResolveState::Loading { .. }) => true,
            (ResolveState::Failed, ResolveState::Loading { .. }) => true,
            // Terminal success stays terminal
            (ResolveState::Loaded { .. }, _) => false,
            _ => false,
        }
    }
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveState::Initializing => write!(f, "initializing"),
            ResolveState::Loading { url, .. } => write!(f, "loading {url}"),
            ResolveState::Loaded { url, .. } => write!(f, "loaded {url}"),
            ResolveState::Failed => write!(f, "failed"),
        }
    }
}
