//! Provider module for Lipi
//!
//! This module contains the streaming generation abstraction, the
//! Server-Sent Events decoder and the Replicate implementation.

pub mod base;
pub mod replicate;
pub mod sse;

pub use base::{FragmentStream, GenerationRequest, Provider};
pub use replicate::ReplicateProvider;

use crate::config::ProviderConfig;
use crate::error::Result;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
///
/// # Returns
///
/// Returns a boxed provider instance
///
/// # Errors
///
/// Returns error if the configured model cannot be resolved or the HTTP
/// client fails to initialize
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>> {
    Ok(Box::new(ReplicateProvider::new(config.replicate.clone())?))
}
