//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::chat::ChatRooms;
use drug_discovery_core::ports::{
    DatabaseService, LiteratureService, OtpDeliveryService, TextGenerationService,
};
use drug_discovery_core::retry::RetryPolicy;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub text_generator: Arc<dyn TextGenerationService>,
    pub literature: Arc<dyn LiteratureService>,
    pub otp_delivery: Arc<dyn OtpDeliveryService>,
    /// Applied to the variant-info call only; every other upstream call runs once.
    pub variant_retry: RetryPolicy,
    pub chat_rooms: Arc<ChatRooms>,
}
