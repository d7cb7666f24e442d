//! services/bot/src/bot/state.rs
//!
//! Defines the application's shared state.

use crate::bot::delivery::MessageDelivery;
use crate::bot::pipeline::Pipeline;
use crate::config::Config;
use std::sync::Arc;

/// The shared application state, created once at startup and injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub delivery: Arc<MessageDelivery>,
    pub config: Arc<Config>,
}
