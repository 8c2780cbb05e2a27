//! Resolution observers
//!
//! Informational callbacks fired by the resolver: at most once per terminal
//! transition per attempted URL. Observers cannot halt or redirect the
//! pipeline; callers that do not care use [`NullObserver`].

use std::sync::Arc;

/// Trait for observing resolution progress
pub trait ResolveObserver: Send + Sync {
    /// A candidate URL loaded successfully
    fn on_image_loaded(&self, url: &str);

    /// A candidate URL definitively failed (after any cache-busting retry)
    fn on_image_error(&self, url: &str);
}

/// No-op observer for callers that do not care
pub struct NullObserver;

impl ResolveObserver for NullObserver {
    fn on_image_loaded(&self, _url: &str) {
        // No-op: discard notifications
    }

    fn on_image_error(&self, _url: &str) {
        // No-op
    }
}

/// Arc-wrapped observer for sharing across async tasks
pub struct SharedObserver {
    inner: Arc<dyn ResolveObserver>,
}

impl SharedObserver {
    pub fn new(observer: Arc<dyn ResolveObserver>) -> Self {
        Self { inner: observer }
    }
}

impl ResolveObserver for SharedObserver {
    fn on_image_loaded(&self, url: &str) {
        self.inner.on_image_loaded(url);
    }

    fn on_image_error(&self, url: &str) {
        self.inner.on_image_error(url);
    }
}
