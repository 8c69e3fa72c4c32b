//! Application state for the API server

use crate::{Config, MediaBroker};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// The broker serving every request
    pub broker: Arc<MediaBroker>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(broker: Arc<MediaBroker>, config: Arc<Config>) -> Self {
        Self { broker, config }
    }
}
