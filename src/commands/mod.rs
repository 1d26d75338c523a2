/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`: Interactive transliteration chat
- `once`: Transliterate a single piece of text
- `params`: Print the effective model and generation parameters

The helpers below are shared by those handlers: credential resolution,
parameter formatting and incremental rendering of streamed output.
*/

use crate::config::{GenerationConfig, ReplicateConfig, REPETITION_PENALTY};
use crate::credential::ApiToken;
use crate::error::{LipiError, Result};
use crate::providers::create_provider;
use crate::session::Session;
use crate::transcript::{Transcript, Turn};
use colored::Colorize;
use std::io::Write;

// Special commands parser for the chat loop
pub mod special_commands;

/// Title shown at the top of the chat
pub const BANNER_TITLE: &str = "Llama3 based Transliteration Bot / 以 Llama3 為基礎的音譯機器人";

const THINKING: &str = "Thinking...";
const CLEAR_LINE: &str = "\r\x1b[2K";

/// State of the token supplied through config or environment
#[derive(Debug)]
pub enum ConfiguredCredential {
    /// A well-formed token is available
    Ready(ApiToken),
    /// A token was supplied but has the wrong shape
    Malformed(LipiError),
    /// No token was supplied
    Missing,
}

/// Checks the token supplied ahead of time, if any
///
/// Surrounding whitespace is trimmed before the shape check.
pub fn configured_credential(replicate: &ReplicateConfig) -> ConfiguredCredential {
    match replicate.api_token.as_deref().map(str::trim) {
        None | Some("") => ConfiguredCredential::Missing,
        Some(raw) => match ApiToken::parse(raw) {
            Ok(token) => ConfiguredCredential::Ready(token),
            Err(e) => ConfiguredCredential::Malformed(e),
        },
    }
}

/// Formats the model and sampling parameters, one per line
///
/// # Examples
///
/// ```
/// use lipi::commands::format_params;
/// use lipi::config::GenerationConfig;
///
/// let text = format_params("meta/meta-llama-3-8b-instruct", &GenerationConfig::default());
/// assert!(text.contains("Max Length:         120"));
/// ```
pub fn format_params(model: &str, generation: &GenerationConfig) -> String {
    format!(
        "Model:              {}\n\
         Temperature:        {}\n\
         Top P:              {}\n\
         Max Length:         {}\n\
         Repetition Penalty: {:.1}",
        model, generation.temperature, generation.top_p, generation.max_length, REPETITION_PENALTY
    )
}

fn print_turn(turn: &Turn) {
    let label = format!("{}:", turn.role());
    println!("{} {}", label.cyan().bold(), turn.content());
}

fn print_history(transcript: &Transcript) {
    println!();
    for turn in transcript {
        print_turn(turn);
    }
    println!();
}

/// Writes streamed output incrementally
///
/// The session reports the full text displayed so far; only the part not yet
/// written is printed, and the writer is flushed after every fragment.
pub struct StreamPrinter<W: Write> {
    out: W,
    label: String,
    placeholder: bool,
    started: bool,
    printed: usize,
}

impl<W: Write> StreamPrinter<W> {
    /// Creates a printer that prefixes the response with `label`
    ///
    /// With `placeholder` set, `Thinking...` is shown until the first
    /// fragment arrives.
    pub fn new(out: W, label: impl Into<String>, placeholder: bool) -> Self {
        Self {
            out,
            label: label.into(),
            placeholder,
            started: false,
            printed: 0,
        }
    }

    /// Shows the placeholder, if enabled
    pub fn begin(&mut self) {
        if self.placeholder {
            self.write(THINKING);
        }
    }

    /// Prints whatever part of `text` has not been printed yet
    pub fn render(&mut self, text: &str) {
        if !self.started {
            self.started = true;
            if self.placeholder {
                self.write(CLEAR_LINE);
            }
            let label = std::mem::take(&mut self.label);
            self.write(&label);
        }
        if let Some(delta) = text.get(self.printed..) {
            self.write(delta);
        }
        self.printed = text.len();
    }

    /// Ends the response line
    pub fn finish(&mut self) {
        if self.placeholder && !self.started {
            self.write(CLEAR_LINE);
        } else if self.started {
            self.write("\n");
        }
    }

    /// Returns the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            tracing::warn!("Failed to write response output: {}", e);
        }
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Creates the provider and a session, makes sure a well-formed API
    //! token is available, then runs a readline loop that either handles a
    //! special command or sends the line to the model and streams the
    //! reply.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use crate::config::Config;
    use dialoguer::Password;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    const CREDENTIALS_ACCEPTED: &str = "Proceed to entering your text to transliterate!";
    const CREDENTIALS_NEEDED: &str = "Please enter your credentials!";
    const CREDENTIALS_PRESET: &str = "API key already provided!";

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration (consumed)
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be created, the terminal cannot
    /// be read, or token entry is aborted
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let provider = create_provider(&config.provider)?;
        let mut session =
            Session::new(config.generation, None).with_greeting(config.chat.greeting.clone());

        let mut rl = DefaultEditor::new().map_err(LipiError::Readline)?;

        print_welcome_banner(provider.model(), session.generation());

        match configured_credential(&config.provider.replicate) {
            ConfiguredCredential::Ready(token) => {
                println!("{}", CREDENTIALS_PRESET.green());
                session.set_credential(token);
            }
            ConfiguredCredential::Malformed(e) => {
                tracing::warn!("Configured API token ignored: {}", e);
                prompt_for_credential(&mut session)?;
            }
            ConfiguredCredential::Missing => prompt_for_credential(&mut session)?,
        }

        println!();
        print_turn(session.transcript().last());
        println!();

        loop {
            match rl.readline(&format!("{} ", ">>".bold())) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Reset) => {
                            session.reset();
                            println!("{}\n", "Chat history cleared".green());
                            print_turn(session.transcript().last());
                            println!();
                            continue;
                        }
                        Ok(SpecialCommand::History) => {
                            print_history(session.transcript());
                            continue;
                        }
                        Ok(SpecialCommand::ShowParams) => {
                            println!("\n{}\n", format_params(provider.model(), session.generation()));
                            continue;
                        }
                        Ok(SpecialCommand::Set { name, value }) => {
                            match session.generation_mut().set(&name, &value) {
                                Ok(()) => println!("{}\n", format!("Set {} to {}", name, value).green()),
                                Err(e) => eprintln!("{}\n", e.to_string().red()),
                            }
                            continue;
                        }
                        Ok(SpecialCommand::Token) => {
                            prompt_for_credential(&mut session)?;
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)
                        .map_err(LipiError::Readline)?;

                    let label = format!("{} ", "assistant:".cyan().bold());
                    let mut printer =
                        StreamPrinter::new(std::io::stdout(), label, config.chat.show_thinking);
                    printer.begin();
                    let result = session
                        .ask(provider.as_ref(), trimmed, |text| printer.render(text))
                        .await
                        .map(|_| ());
                    printer.finish();

                    match result {
                        Ok(()) => println!(),
                        Err(e) => {
                            tracing::error!("Generation failed: {:#}", e);
                            eprintln!("{}\n", format!("Error: {}", e).red());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Asks for a token with hidden input until a well-formed one is entered
    fn prompt_for_credential(session: &mut Session) -> Result<()> {
        loop {
            println!("{}", CREDENTIALS_NEEDED.yellow());
            let entered = Password::new()
                .with_prompt("Replicate API token")
                .allow_empty_password(true)
                .interact()
                .map_err(|dialoguer::Error::IO(e)| LipiError::Io(e))?;

            match ApiToken::parse(entered.trim()) {
                Ok(token) => {
                    session.set_credential(token);
                    println!("{}", CREDENTIALS_ACCEPTED.green());
                    return Ok(());
                }
                Err(e) => tracing::debug!("Rejected entered token: {}", e),
            }
        }
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(model: &str, generation: &GenerationConfig) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("  {}", BANNER_TITLE.bold());
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("{}\n", format_params(model, generation).dimmed());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }
}

// One-shot command handler
pub mod once {
    //! Transliterates one piece of text and exits.

    use super::*;
    use crate::config::Config;
    use anyhow::Context;

    /// Run a single transliteration and stream it to stdout
    ///
    /// # Errors
    ///
    /// Returns error without touching the network if the text is blank or no
    /// well-formed token is configured; otherwise returns any provider error
    pub async fn run_once(config: Config, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            anyhow::bail!("Nothing to transliterate: the text is empty");
        }

        let token = match configured_credential(&config.provider.replicate) {
            ConfiguredCredential::Ready(token) => token,
            ConfiguredCredential::Malformed(e) => {
                return Err(e).context("Check REPLICATE_API_TOKEN or provider.replicate.api_token")
            }
            ConfiguredCredential::Missing => {
                return Err(LipiError::MissingCredentials("replicate".to_string()))
                    .context("Set REPLICATE_API_TOKEN or provider.replicate.api_token")
            }
        };

        let provider = create_provider(&config.provider)?;
        let mut session = Session::new(config.generation, Some(token))
            .with_greeting(config.chat.greeting.clone());

        let mut printer = StreamPrinter::new(std::io::stdout(), "", false);
        let result = session
            .ask(provider.as_ref(), text, |fragment| printer.render(fragment))
            .await
            .map(|_| ());
        printer.finish();
        result
    }
}

// Parameter inspection handler
pub mod params {
    //! Prints the effective configuration without contacting the network.

    use super::*;
    use crate::config::Config;

    /// Render the effective model, endpoint, token state and parameters
    pub fn describe(config: &Config) -> Result<String> {
        let replicate = &config.provider.replicate;
        let model_id = replicate.model_id()?;
        let token_state = match configured_credential(replicate) {
            ConfiguredCredential::Ready(_) => "provided".to_string(),
            ConfiguredCredential::Malformed(e) => format!("malformed ({})", e),
            ConfiguredCredential::Missing => "missing".to_string(),
        };

        Ok(format!(
            "{}\nModel Alias:        {}\nAPI Base:           {}\nAPI Token:          {}",
            format_params(&model_id, &config.generation),
            replicate.model,
            replicate.api_base,
            token_state
        ))
    }

    /// Print the effective parameters
    pub fn run_params(config: &Config) -> Result<()> {
        println!("{}", describe(config)?);
        Ok(())
    }
}
