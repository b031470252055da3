//! The bot: a trigger registry wired to a chat client.

use std::{
    sync::{Arc, Mutex, PoisonError, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{IncomingMessage, Presence, Res, Void},
    },
    interaction::{
        action::{Action, execute_action},
        command::CommandParser,
        registry::{Trigger, TriggerRegistry},
    },
    service::chat::{ChatClient, MessageHandler},
};

/// Options accepted by [`Bot::new`].
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Text a command must start with.
    pub prefix: Option<String>,
    /// Text a command must end with.
    pub suffix: Option<String>,
    /// Compare markers and trigger words ignoring ASCII case; match patterns case-insensitively.
    pub ignore_case: bool,
    /// Time between presence changes when rotating several presences.
    pub presence_interval: Duration,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            suffix: None,
            ignore_case: false,
            presence_interval: Duration::from_secs(60),
        }
    }
}

impl From<&Config> for BotOptions {
    fn from(config: &Config) -> Self {
        Self {
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
            ignore_case: config.ignore_case,
            presence_interval: Duration::from_secs(config.presence_interval_secs),
        }
    }
}

/// A chat bot that answers triggers with replies and reactions.
///
/// It is designed to be trivially cloneable; clones share the same registry.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

struct BotInner {
    chat: ChatClient,
    parser: CommandParser,
    registry: RwLock<TriggerRegistry>,
    default_action: RwLock<Action>,
    presence_interval: Duration,
    presence_rotation: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for BotInner {
    fn drop(&mut self) {
        if let Some(rotation) = self.presence_rotation.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            rotation.abort();
        }
    }
}

impl Bot {
    /// Creates a bot on top of `chat`.
    ///
    /// Fails if neither a prefix nor a suffix is configured, or if the
    /// presence interval is zero.
    pub fn new(chat: ChatClient, options: BotOptions) -> Res<Self> {
        let parser = CommandParser::new(options.prefix, options.suffix, options.ignore_case)?;

        if options.presence_interval.is_zero() {
            return Err(anyhow::anyhow!("Presence interval must be greater than zero."));
        }

        Ok(Self {
            inner: Arc::new(BotInner {
                chat,
                parser,
                registry: RwLock::new(TriggerRegistry::new(options.ignore_case)),
                default_action: RwLock::new(Action::new()),
                presence_interval: options.presence_interval,
                presence_rotation: Mutex::new(None),
            }),
        })
    }

    /// Creates a bot from the application configuration.
    ///
    /// Registers every configured trigger and the configured default action.
    pub fn from_config(chat: ChatClient, config: &Config) -> Res<Self> {
        let bot = Self::new(chat, BotOptions::from(config))?;

        for entry in &config.triggers {
            let trigger = Trigger::try_from(entry)?;
            bot.register_action(trigger, Action::from(&entry.action()));
        }

        if let Some(default_action) = &config.default_action {
            bot.set_default_action(Action::from(default_action));
        }

        Ok(bot)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.inner.parser.prefix()
    }

    pub fn suffix(&self) -> Option<&str> {
        self.inner.parser.suffix()
    }

    /// Registers `action` under `trigger` and returns the trigger.
    ///
    /// A bare string or producer is shorthand for a reply-only action.
    pub fn register_action(&self, trigger: impl Into<Trigger>, action: impl Into<Action>) -> Trigger {
        let trigger = self.inner.registry.write().unwrap_or_else(PoisonError::into_inner).register(trigger.into(), action.into());

        info!("Created a new action, trigger: {}", trigger);

        trigger
    }

    /// Removes `trigger`, returning it if it was registered.
    pub fn remove_action(&self, trigger: impl Into<Trigger>) -> Option<Trigger> {
        let trigger = trigger.into();
        let removed = self.inner.registry.write().unwrap_or_else(PoisonError::into_inner).remove(&trigger);

        match &removed {
            Some(removed) => info!("Removed an action, trigger: {}", removed),
            None => debug!("No action to remove, trigger: {}", trigger),
        }

        removed
    }

    /// Sets the action used when no trigger matches.
    pub fn set_default_action(&self, action: impl Into<Action>) {
        *self.inner.default_action.write().unwrap_or_else(PoisonError::into_inner) = action.into();
    }

    pub fn default_action(&self) -> Action {
        self.inner.default_action.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether anything is registered under `trigger`.
    pub fn has_action(&self, trigger: impl Into<Trigger>) -> bool {
        self.inner.registry.read().unwrap_or_else(PoisonError::into_inner).contains(&trigger.into())
    }

    /// All registered triggers.
    pub fn triggers(&self) -> Vec<Trigger> {
        self.inner.registry.read().unwrap_or_else(PoisonError::into_inner).triggers()
    }

    /// Shows `presences`.
    ///
    /// A single presence is applied immediately. Several are rotated, one per
    /// presence interval, starting with the first. Any previous rotation is
    /// stopped. An empty list is an error.
    #[instrument(skip_all)]
    pub async fn set_presence(&self, presences: impl IntoIterator<Item = Presence>) -> Void {
        let presences: Vec<Presence> = presences.into_iter().collect();

        if presences.is_empty() {
            return Err(anyhow::anyhow!("At least one presence is required."));
        }

        self.stop_presence_rotation();

        if let [presence] = presences.as_slice() {
            return self.inner.chat.set_presence(presence).await;
        }

        info!("Rotating {} presences ...", presences.len());

        let chat = self.inner.chat.clone();
        let mut interval = tokio::time::interval(self.inner.presence_interval);

        let rotation = tokio::spawn(
            async move {
                for presence in presences.iter().cycle() {
                    interval.tick().await;

                    if let Err(err) = chat.set_presence(presence).await {
                        error!("Error while setting presence: {}", err);
                    }
                }
            }
            .in_current_span(),
        );

        *self.inner.presence_rotation.lock().unwrap_or_else(PoisonError::into_inner) = Some(rotation);

        Ok(())
    }

    /// Whether a presence rotation is currently running.
    pub fn is_rotating_presence(&self) -> bool {
        self.inner
            .presence_rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|rotation| !rotation.is_finished())
    }

    fn stop_presence_rotation(&self) {
        if let Some(rotation) = self.inner.presence_rotation.lock().unwrap_or_else(PoisonError::into_inner).take() {
            rotation.abort();
        }
    }

    /// Subscribes the bot to the chat client and runs until the client stops.
    pub async fn start(&self) -> Void {
        info!("Listening for messages with {} trigger(s) registered ...", self.triggers().len());

        self.inner.chat.start(Arc::new(self.clone())).await
    }

    /// Parses, resolves and executes `message`.
    ///
    /// Returns `false` if the message was not a command.
    #[instrument(skip_all, fields(channel_id = %message.channel_id))]
    pub async fn dispatch(&self, message: &IncomingMessage) -> bool {
        let Some(command) = self.inner.parser.parse(&message.text) else {
            return false;
        };

        // Clone the action out so no lock is held while it runs.
        let action = self.inner.registry.read().unwrap_or_else(PoisonError::into_inner).resolve(command.trigger).cloned();

        let action = match action {
            Some(action) => {
                debug!("Matched trigger `{}`.", command.trigger);
                action
            }
            None => {
                debug!("No trigger matched `{}`; using the default action.", command.trigger);
                self.default_action()
            }
        };

        execute_action(&self.inner.chat, message, command.args, &action).await;

        true
    }
}

#[async_trait]
impl MessageHandler for Bot {
    async fn handle_message(&self, message: IncomingMessage) {
        self.dispatch(&message).await;
    }
}

// Tests.
