//! Replicate API token handling
//!
//! Tokens are only shape-checked locally: a `r8_` prefix and exactly 40
//! characters. Whether the token is actually valid is for the remote service
//! to decide.

use crate::error::LipiError;
use std::fmt;
use std::str::FromStr;

/// Prefix every Replicate API token starts with
pub const TOKEN_PREFIX: &str = "r8_";

/// Exact length of a Replicate API token, in characters
pub const TOKEN_LENGTH: usize = 40;

/// Whether `candidate` has the shape of a Replicate API token
///
/// # Examples
///
/// ```
/// use lipi::credential::is_well_formed;
///
/// assert!(is_well_formed(&format!("r8_{}", "a".repeat(37))));
/// assert!(!is_well_formed("r8_short"));
/// ```
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.starts_with(TOKEN_PREFIX) && candidate.chars().count() == TOKEN_LENGTH
}

/// A shape-checked bearer token
///
/// The value is never shown by `Debug` or `Display`; use [`ApiToken::expose`]
/// when building the authorization header.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Accepts `raw` if it has the shape of a Replicate token
    ///
    /// Surrounding whitespace is not trimmed here; callers reading from a
    /// terminal trim first.
    ///
    /// # Errors
    ///
    /// Returns `LipiError::InvalidCredential` if the prefix or length is wrong
    pub fn parse(raw: impl Into<String>) -> Result<Self, LipiError> {
        let raw = raw.into();
        if is_well_formed(&raw) {
            return Ok(Self(raw));
        }
        let reason = if !raw.starts_with(TOKEN_PREFIX) {
            format!("token must start with '{}'", TOKEN_PREFIX)
        } else {
            format!(
                "token must be {} characters long, got {}",
                TOKEN_LENGTH,
                raw.chars().count()
            )
        };
        Err(LipiError::InvalidCredential(reason))
    }

    /// The raw token, for the `Authorization` header only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl FromStr for ApiToken {
    type Err = LipiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiToken").field(&"<redacted>").finish()
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", TOKEN_PREFIX)
    }
}
