//! Transcript store for a chat session
//!
//! A [`Transcript`] is the ordered, append-only history of [`Turn`]s for one
//! session. It always begins with a synthetic assistant greeting, and its
//! order is replayed verbatim into the prompt sent to the model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Greeting turn that opens every transcript
pub const GREETING: &str = "What can I transliterate to Nepali language for you today?";

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text entered by the person at the terminal
    User,
    /// Text produced by the model (or the greeting)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the transcript
///
/// Turns are immutable once created; the fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Creates a turn with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use lipi::transcript::{Role, Turn};
    ///
    /// let turn = Turn::user("mero naam");
    /// assert_eq!(turn.role(), Role::User);
    /// assert_eq!(turn.content(), "mero naam");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Role of the author
    pub fn role(&self) -> Role {
        self.role
    }

    /// Text of the turn
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Ordered history of turns for one session
///
/// # Examples
///
/// ```
/// use lipi::transcript::{Transcript, Turn, GREETING};
///
/// let mut transcript = Transcript::new();
/// assert_eq!(transcript.last().content(), GREETING);
///
/// transcript.append(Turn::user("namaste"));
/// assert!(transcript.response_owed());
///
/// transcript.reset();
/// assert_eq!(transcript.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    greeting: String,
    turns: Vec<Turn>,
}

impl Transcript {
    /// Creates a transcript holding only the default greeting turn
    pub fn new() -> Self {
        Self::with_greeting(GREETING)
    }

    /// Creates a transcript that opens (and resets to) a custom greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            turns: vec![Turn::assistant(greeting.clone())],
            greeting,
        }
    }

    /// Discards every turn and reinstates the greeting
    pub fn reset(&mut self) {
        self.turns.clear();
        self.turns.push(Turn::assistant(self.greeting.clone()));
        tracing::debug!("Transcript reset to greeting");
    }

    /// Text of the greeting turn
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Appends a turn to the end of the transcript
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Returns the most recent turn
    ///
    /// The transcript is never empty, so this is the greeting right after a
    /// reset.
    pub fn last(&self) -> &Turn {
        // `new` and `reset` both leave exactly one turn, and nothing removes turns.
        &self.turns[self.turns.len() - 1]
    }

    /// Whether the model still owes a reply to the last turn
    pub fn response_owed(&self) -> bool {
        self.last().role() != Role::Assistant
    }

    /// All turns in insertion order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns, greeting included
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always `false`; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Iterates over the turns in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
