//! Lipi - Romanized Nepali to Devanagari transliteration chat library
//!
//! This library provides a terminal chat front end for a hosted language
//! model that has been instructed to transliterate Romanized Nepali into
//! Devanagari script.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `transcript`: Ordered log of user and assistant turns
//! - `prompt`: Flattens the instruction and transcript into one prompt
//! - `session`: Per-conversation state and the response streamer
//! - `providers`: Streaming generation abstraction and the Replicate backend
//! - `credential`: Shape-checked API token
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Handlers behind the CLI subcommands
//!
//! # Example
//!
//! ```no_run
//! use lipi::{create_provider, ApiToken, Config, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider)?;
//!     let token = ApiToken::parse(std::env::var("REPLICATE_API_TOKEN")?)?;
//!     let mut session = Session::new(config.generation, Some(token));
//!
//!     let reply = session
//!         .ask(provider.as_ref(), "mero naam tara ho", |text| println!("{}", text))
//!         .await?;
//!     println!("final: {}", reply.content());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod credential;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod transcript;

// Re-export commonly used types
pub use config::Config;
pub use credential::ApiToken;
pub use error::{LipiError, Result};
pub use providers::{create_provider, Provider};
pub use session::Session;
pub use transcript::{Role, Transcript, Turn};

#[cfg(test)]
pub mod test_utils;
