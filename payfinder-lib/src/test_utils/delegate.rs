//! Delegate that records callbacks.

use std::sync::Mutex;

use crate::finder::{PaymentAppFinderDelegate, ResolvedApp};

/// One delegate callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DelegateEvent {
    /// `on_app_found`, with the package name.
    AppFound(String),
    /// `on_error_message`.
    ErrorMessage(String),
    /// `on_resolution_complete`.
    Complete,
}

/// Records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
    apps: Mutex<Vec<ResolvedApp>>,
}

impl RecordingDelegate {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Callbacks received so far.
    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Apps received so far.
    pub fn apps(&self) -> Vec<ResolvedApp> {
        self.apps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether `on_resolution_complete` was called.
    pub fn is_complete(&self) -> bool {
        self.events().contains(&DelegateEvent::Complete)
    }

    fn record(&self, event: DelegateEvent) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
    }
}

impl PaymentAppFinderDelegate for RecordingDelegate {
    fn on_app_found(&self, app: ResolvedApp) {
        self.record(DelegateEvent::AppFound(app.package_name().to_string()));
        self.apps.lock().unwrap_or_else(|e| e.into_inner()).push(app);
    }

    fn on_error_message(&self, message: String) {
        self.record(DelegateEvent::ErrorMessage(message));
    }

    fn on_resolution_complete(&self) {
        self.record(DelegateEvent::Complete);
    }
}
