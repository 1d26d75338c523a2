//! Test utilities for Lipi
//!
//! This module provides a scripted stand-in for the remote provider,
//! credential helpers, and assertion helpers shared by unit tests.

use crate::credential::{ApiToken, TOKEN_LENGTH, TOKEN_PREFIX};
use crate::error::{LipiError, Result};
use crate::providers::{FragmentStream, GenerationRequest, Provider};
use async_trait::async_trait;
use std::sync::Mutex;

/// A well-formed token that passes the shape check
pub fn valid_token_text() -> String {
    format!(
        "{}{}",
        TOKEN_PREFIX,
        "a".repeat(TOKEN_LENGTH - TOKEN_PREFIX.len())
    )
}

/// Parsed form of [`valid_token_text`]
pub fn valid_token() -> ApiToken {
    ApiToken::parse(valid_token_text()).expect("valid test token")
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T: std::fmt::Debug>(result: Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!(
            "Expected error containing '{}' but got Ok({:?})",
            expected, value
        ),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
provider:
  replicate:
    api_base: http://localhost:9/v1
    model: meta/meta-llama-3-8b-instruct
generation:
  temperature: 0.5
  top_p: 0.8
  max_length: 64
chat:
  show_thinking: false
"#
    .to_string()
}

#[derive(Debug, Clone)]
enum Script {
    Fragments(Vec<String>),
    FailBeforeStart(String),
    FailAfter(Vec<String>, String),
}

/// Provider that replays a fixed script instead of calling the network
///
/// Every request it receives is recorded for later inspection.
#[derive(Debug)]
pub struct ScriptedProvider {
    script: Script,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Streams `fragments` in order, then completes
    pub fn streaming(fragments: &[&str]) -> Self {
        Self::with_script(Script::Fragments(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    /// Fails the call before any fragment is produced
    pub fn failing_before_start(message: &str) -> Self {
        Self::with_script(Script::FailBeforeStart(message.to_string()))
    }

    /// Streams `fragments`, then yields an error item
    pub fn failing_after(fragments: &[&str], message: &str) -> Self {
        Self::with_script(Script::FailAfter(
            fragments.iter().map(|f| f.to_string()).collect(),
            message.to_string(),
        ))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn stream_generation(
        &self,
        request: &GenerationRequest,
        _token: &ApiToken,
    ) -> Result<FragmentStream> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());

        let items: Vec<Result<String>> = match &self.script {
            Script::Fragments(fragments) => fragments.iter().cloned().map(Ok).collect(),
            Script::FailBeforeStart(message) => {
                return Err(LipiError::Provider(message.clone()).into())
            }
            Script::FailAfter(fragments, message) => fragments
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(
                    LipiError::Provider(message.clone()).into()
                )))
                .collect(),
        };

        Ok(Box::pin(futures::stream::iter(items)))
    }

    fn model(&self) -> &str {
        "scripted/model"
    }
}
