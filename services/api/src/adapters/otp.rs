//! services/api/src/adapters/otp.rs
//!
//! Verification code delivery. Email/SMS gateways are external collaborators;
//! this adapter writes the code to the service log for local development.

use async_trait::async_trait;
use drug_discovery_core::ports::{OtpDeliveryService, PortResult};
use tracing::info;

#[derive(Clone, Default)]
pub struct LogOtpDelivery;

#[async_trait]
impl OtpDeliveryService for LogOtpDelivery {
    async fn deliver(&self, email: &str, code: &str) -> PortResult<()> {
        info!(email = email, "Verification code issued: {}", code);
        Ok(())
    }
}
