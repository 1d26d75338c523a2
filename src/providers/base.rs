//! Base provider trait and common types for Lipi
//!
//! This module defines the Provider trait that the remote inference backend
//! implements, along with the request type and the fragment stream it
//! returns.

use crate::config::{GenerationConfig, REPETITION_PENALTY};
use crate::credential::ApiToken;
use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Lazy, finite, forward-only sequence of generated text fragments
///
/// Each item is either the next fragment or the error that ended the
/// stream. The end of the stream means the generation completed.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Input for one remote text-generation call
///
/// Field names match the model input keys on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully compiled prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Nucleus sampling mass
    pub top_p: f64,
    /// Maximum generated length
    pub max_length: u32,
    /// Repetition penalty, fixed at [`REPETITION_PENALTY`]
    pub repetition_penalty: f64,
}

impl GenerationRequest {
    /// Builds a request from a prompt and the session's sampling parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use lipi::config::GenerationConfig;
    /// use lipi::providers::GenerationRequest;
    ///
    /// let request = GenerationRequest::new("k cha Assistant: ", &GenerationConfig::default());
    /// assert_eq!(request.max_length, 120);
    /// assert_eq!(request.repetition_penalty, 1.0);
    /// ```
    pub fn new(prompt: impl Into<String>, generation: &GenerationConfig) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: generation.temperature,
            top_p: generation.top_p,
            max_length: generation.max_length,
            repetition_penalty: REPETITION_PENALTY,
        }
    }
}

/// Remote text-generation backend
///
/// A call either fails before streaming starts (the `Err` of
/// `stream_generation`) or returns a [`FragmentStream`] that may itself end
/// with an error item.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Starts a streaming generation for `request`, authorized by `token`
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or is rejected
    async fn stream_generation(
        &self,
        request: &GenerationRequest,
        token: &ApiToken,
    ) -> Result<FragmentStream>;

    /// Identifier of the model this provider runs
    fn model(&self) -> &str;
}
