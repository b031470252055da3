//! Chat service integration for trigger-bot.
//!
//! This module provides functionality for interacting with chat platforms like Slack:
//! - Receiving messages
//! - Sending replies and reactions
//! - Setting the bot's presence
//!
//! It defines the `GenericChatClient` trait that can be implemented for different
//! chat services, with a default implementation for Slack.

pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{IncomingMessage, Presence, Void};

// Traits.

/// Receives every inbound message the chat client delivers.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one message. Implementations must not fail; anything that can
    /// go wrong is dealt with inside.
    async fn handle_message(&self, message: IncomingMessage);
}

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality the bot needs from a chat
/// platform. Implementing this trait allows different chat services to be
/// used with the trigger-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Messages authored by this user are never handed to the handler.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Subscribes `handler` to the platform's message-received event and runs
    /// until the listener shuts down.
    async fn start(&self, handler: Arc<dyn MessageHandler>) -> Void;

    /// Reply to a message.
    ///
    /// The reply lands in the message's thread when it has one, and in the
    /// channel otherwise.
    async fn reply(&self, message: &IncomingMessage, text: &str) -> Void;

    /// React to a message with an emoji.
    async fn react(&self, message: &IncomingMessage, emoji: &str) -> Void;

    /// Set the bot's presence.
    async fn set_presence(&self, presence: &Presence) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
