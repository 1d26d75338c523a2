//! Chat session state and the response streamer
//!
//! A [`Session`] owns one transcript, the sampling parameters and the
//! credential for a single conversation. [`Session::respond`] compiles the
//! prompt, streams the provider's fragments through a
//! [`ResponseAccumulator`], and commits the assistant turn only once the
//! stream has ended cleanly.

use crate::config::GenerationConfig;
use crate::credential::ApiToken;
use crate::error::{LipiError, Result};
use crate::prompt::compile_prompt;
use crate::providers::{GenerationRequest, Provider};
use crate::transcript::{Transcript, Turn};
use futures::StreamExt;

/// Concatenates streamed fragments in arrival order
///
/// # Examples
///
/// ```
/// use lipi::session::ResponseAccumulator;
///
/// let mut acc = ResponseAccumulator::new();
/// assert_eq!(acc.push("म"), "म");
/// assert_eq!(acc.push("लाई"), "मलाई");
/// assert_eq!(acc.into_text(), "मलाई");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseAccumulator {
    text: String,
}

impl ResponseAccumulator {
    /// Creates an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `fragment` and returns the text displayed so far
    pub fn push(&mut self, fragment: &str) -> &str {
        self.text.push_str(fragment);
        &self.text
    }

    /// Text displayed so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the accumulator, returning the final text
    pub fn into_text(self) -> String {
        self.text
    }
}

/// One conversation: transcript, sampling parameters and credential
///
/// Sessions are independent values; several may exist side by side.
#[derive(Debug, Clone)]
pub struct Session {
    transcript: Transcript,
    generation: GenerationConfig,
    credential: Option<ApiToken>,
}

impl Session {
    /// Starts a session whose transcript holds only the default greeting
    ///
    /// # Examples
    ///
    /// ```
    /// use lipi::config::GenerationConfig;
    /// use lipi::session::Session;
    ///
    /// let session = Session::new(GenerationConfig::default(), None);
    /// assert_eq!(session.transcript().len(), 1);
    /// assert!(!session.has_credential());
    /// ```
    pub fn new(generation: GenerationConfig, credential: Option<ApiToken>) -> Self {
        Self {
            transcript: Transcript::new(),
            generation,
            credential,
        }
    }

    /// Replaces the greeting used now and after every reset
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.transcript = Transcript::with_greeting(greeting);
        self
    }

    /// Read-only view of the transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Sampling parameters used for every call
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    /// Mutable access to the sampling parameters
    pub fn generation_mut(&mut self) -> &mut GenerationConfig {
        &mut self.generation
    }

    /// Installs the credential used for subsequent calls
    pub fn set_credential(&mut self, token: ApiToken) {
        self.credential = Some(token);
    }

    /// Whether a credential is present, i.e. input is enabled
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Clears the conversation back to the single greeting turn
    ///
    /// Parameters and credential are kept.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting transcript ({} turns)", self.transcript.len());
        self.transcript.reset();
    }

    /// Records the user's utterance
    pub fn submit(&mut self, utterance: &str) {
        self.transcript.append(Turn::user(utterance));
    }

    /// Generates and commits the assistant reply to `utterance`
    ///
    /// `render` is called with the full text displayed so far after every
    /// fragment. The assistant turn is appended only after the stream ends
    /// without error; on any failure the transcript is left as it was.
    ///
    /// # Errors
    ///
    /// Returns `LipiError::ResponseNotOwed` when the transcript already ends
    /// with an assistant turn, `LipiError::MissingCredentials` when no
    /// credential is set, `LipiError::InvalidParameter` when the sampling parameters are out of
    /// range, and any error raised by the provider before or during streaming
    pub async fn respond<F>(
        &mut self,
        provider: &dyn Provider,
        utterance: &str,
        mut render: F,
    ) -> Result<&Turn>
    where
        F: FnMut(&str),
    {
        if !self.transcript.response_owed() {
            return Err(LipiError::ResponseNotOwed.into());
        }
        let token = self
            .credential
            .as_ref()
            .ok_or_else(|| LipiError::MissingCredentials("replicate".to_string()))?;
        self.generation.validate()?;

        let prompt = compile_prompt(&self.transcript, utterance);
        let request = GenerationRequest::new(prompt, &self.generation);
        let mut fragments = provider.stream_generation(&request, token).await?;

        let mut accumulator = ResponseAccumulator::new();
        let mut count = 0usize;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            count += 1;
            render(accumulator.push(&fragment));
        }

        tracing::debug!(
            "Generation complete: {} fragments, {} bytes",
            count,
            accumulator.text().len()
        );
        self.transcript
            .append(Turn::assistant(accumulator.into_text()));
        Ok(self.transcript.last())
    }

    /// Submits `utterance` and then responds to it
    ///
    /// # Errors
    ///
    /// Same as [`Session::respond`]; the user turn stays recorded either way
    pub async fn ask<F>(
        &mut self,
        provider: &dyn Provider,
        utterance: &str,
        render: F,
    ) -> Result<&Turn>
    where
        F: FnMut(&str),
    {
        self.submit(utterance);
        self.respond(provider, utterance, render).await
    }
}
