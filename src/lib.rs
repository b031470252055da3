//! Library root for `trigger-bot`.
//!
//! Trigger-bot is a small convenience layer over a chat platform client:
//! - Messages carrying a configured prefix and/or suffix are treated as commands
//! - The first word of a command is looked up against exact triggers, then patterns
//! - The matching action (or the default action) replies and/or reacts
//!
//! The bot integrates with Slack for chat. The architecture is built around
//! a chat client trait so the dispatcher can run against any platform.
//!
//! ```no_run
//! # async fn run(chat: trigger_bot::service::chat::ChatClient) -> trigger_bot::base::types::Void {
//! use trigger_bot::{
//!     bot::{Bot, BotOptions},
//!     interaction::{action::{Action, Producer}, registry::Trigger},
//! };
//!
//! let bot = Bot::new(chat, BotOptions { prefix: Some("!".into()), ..Default::default() })?;
//!
//! bot.register_action("ping", "pong");
//! bot.register_action(Trigger::pattern("^ro+ll$")?, Producer::from_fn(|_, args| Some(format!("rolling {args}"))));
//! bot.set_default_action(Action::new().with_reaction("shrug"));
//!
//! bot.start().await
//! # }
//! ```

pub mod base;
pub mod bot;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the trigger-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the chat client and the bot
/// - Starts listening for messages
pub async fn start(config: Config) -> Void {
    info!("Starting trigger-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow::anyhow!("A crypto provider is already installed."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
