//! Runtime services and shared state for the trigger-bot.

use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    bot::Bot,
    service::chat::ChatClient,
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the chat client and the bot built on
/// top of it. It is designed to be trivially cloneable, allowing it to be
/// passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The bot, with every configured trigger registered.
    pub bot: Bot,
}

impl Runtime {
    /// Create a new runtime instance backed by Slack.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        Self::with_chat(config, chat)
    }

    /// Create a new runtime instance on top of an existing chat client.
    pub fn with_chat(config: Config, chat: ChatClient) -> Res<Self> {
        let bot = Bot::from_config(chat.clone(), &config)?;

        Ok(Self { config, chat, bot })
    }

    /// Apply the configured presence, then listen until the chat client stops.
    pub async fn start(&self) -> Void {
        if !self.config.presence.is_empty() {
            info!("Setting presence ...");
            self.bot.set_presence(self.config.presence.clone()).await?;
        }

        self.bot.start().await
    }
}
