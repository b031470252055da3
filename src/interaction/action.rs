//! Actions: what the bot does once a trigger has been resolved.
//!
//! An [`Action`] carries an optional reply producer and an optional reaction
//! producer. Each producer is either a literal value or a function of the
//! incoming message and the trailing arguments.

use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::{FutureExt, future::BoxFuture};
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{
        config::ActionConfig,
        types::{IncomingMessage, Res, Void},
    },
    service::chat::ChatClient,
};

// Type aliases.

type ProducerFn = Arc<dyn Fn(IncomingMessage, String) -> BoxFuture<'static, Res<Option<String>>> + Send + Sync>;

// Structs.

/// Produces the text of a reply, or the name of a reaction emoji.
///
/// Function producers may return `Ok(None)` to decline, in which case nothing
/// is sent for that half of the action.
#[derive(Clone)]
pub enum Producer {
    /// A fixed value.
    Text(String),
    /// A value computed from the message and its arguments.
    Func(ProducerFn),
}

impl Producer {
    /// A producer that always yields `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A producer backed by an infallible synchronous function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&IncomingMessage, &str) -> Option<String> + Send + Sync + 'static,
    {
        Self::try_from_fn(move |message, args| Ok(f(message, args)))
    }

    /// A producer backed by a fallible synchronous function.
    pub fn try_from_fn<F>(f: F) -> Self
    where
        F: Fn(&IncomingMessage, &str) -> Res<Option<String>> + Send + Sync + 'static,
    {
        Self::Func(Arc::new(move |message: IncomingMessage, args: String| {
            let f_result = f(&message, &args);
            futures::future::ready(f_result).boxed()
        }))
    }

    /// A producer backed by an async function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(IncomingMessage, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Res<Option<String>>> + Send + 'static,
    {
        Self::Func(Arc::new(move |message: IncomingMessage, args: String| f(message, args).boxed()))
    }

    /// Runs the producer for `message`.
    pub async fn produce(&self, message: &IncomingMessage, args: &str) -> Res<Option<String>> {
        match self {
            Self::Text(text) => Ok(Some(text.clone())),
            Self::Func(f) => f(message.clone(), args.to_string()).await,
        }
    }

    /// Whether two producers are the same value (same text, or the same function).
    pub fn same_as(&self, other: &Producer) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Func(a), Self::Func(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for Producer {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Producer {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A pair of optional reply and reaction producers.
#[derive(Debug, Clone, Default)]
pub struct Action {
    pub reply: Option<Producer>,
    pub reaction: Option<Producer>,
}

impl Action {
    /// An action that does nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: impl Into<Producer>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    pub fn with_reaction(mut self, reaction: impl Into<Producer>) -> Self {
        self.reaction = Some(reaction.into());
        self
    }

    /// Whether the action has neither a reply nor a reaction.
    pub fn is_empty(&self) -> bool {
        self.reply.is_none() && self.reaction.is_none()
    }
}

/// A bare producer is shorthand for a reply-only action.
impl From<Producer> for Action {
    fn from(reply: Producer) -> Self {
        Self::new().with_reply(reply)
    }
}

impl From<&str> for Action {
    fn from(reply: &str) -> Self {
        Self::new().with_reply(reply)
    }
}

impl From<String> for Action {
    fn from(reply: String) -> Self {
        Self::new().with_reply(reply)
    }
}

impl From<&ActionConfig> for Action {
    fn from(config: &ActionConfig) -> Self {
        Self {
            reply: config.reply.clone().map(Producer::Text),
            reaction: config.reaction.clone().map(Producer::Text),
        }
    }
}

// Execution.

/// Executes `action` against `message`.
///
/// The reaction is applied first, then the reply. The two halves are
/// independent: an error or panic in either one is logged and swallowed, and
/// never reaches the caller.
#[instrument(skip_all, fields(channel_id = %message.channel_id, message_id = %message.message_id))]
pub async fn execute_action(chat: &ChatClient, message: &IncomingMessage, args: &str, action: &Action) {
    info!("Executing action ...");

    if let Some(reaction) = &action.reaction {
        let step = async {
            if let Some(emoji) = reaction.produce(message, args).await? {
                chat.react(message, &emoji).await?;
            }
            Void::Ok(())
        };

        contain("reaction", step.in_current_span()).await;
    }

    if let Some(reply) = &action.reply {
        let step = async {
            if let Some(text) = reply.produce(message, args).await? {
                chat.reply(message, &text).await?;
            }
            Void::Ok(())
        };

        contain("reply", step.in_current_span()).await;
    }
}

/// Awaits `step`, logging (and discarding) any error or panic it raises.
async fn contain<F>(kind: &str, step: F)
where
    F: Future<Output = Void>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(Ok(())) => debug!("Completed {kind}."),
        Ok(Err(err)) => error!("Error while producing {kind}: {err:#}"),
        Err(panic) => error!("Panic while producing {kind}: {}", panic_message(panic.as_ref())),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> IncomingMessage {
        IncomingMessage::new("C1", "1.1", "!roll 2d6")
    }

    #[tokio::test]
    async fn text_producer_yields_its_text() {
        let producer = Producer::text("hello");
        assert_eq!(producer.produce(&message(), "").await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn function_producers_see_message_and_args() {
        let producer = Producer::from_fn(|message, args| Some(format!("{}:{}", message.channel_id, args)));
        assert_eq!(producer.produce(&message(), "2d6").await.unwrap(), Some("C1:2d6".to_string()));

        let producer = Producer::from_async(|_, args| async move { Ok(Some(args.to_uppercase())) });
        assert_eq!(producer.produce(&message(), "abc").await.unwrap(), Some("ABC".to_string()));
    }

    #[tokio::test]
    async fn fallible_producer_surfaces_error() {
        let producer = Producer::try_from_fn(|_, _| Err(anyhow::anyhow!("idk")));
        assert!(producer.produce(&message(), "").await.is_err());
    }

    #[test]
    fn bare_values_become_reply_only_actions() {
        let action = Action::from("pong");
        assert!(action.reaction.is_none());
        assert!(action.reply.unwrap().same_as(&Producer::text("pong")));

        let producer = Producer::from_fn(|_, _| None);
        let action = Action::from(producer.clone());
        assert!(action.reply.unwrap().same_as(&producer));
    }

    #[test]
    fn action_from_config() {
        let config = ActionConfig {
            reply: None,
            reaction: Some("wave".to_string()),
        };
        let action = Action::from(&config);

        assert!(action.reply.is_none());
        assert!(action.reaction.unwrap().same_as(&Producer::text("wave")));
        assert!(Action::from(&ActionConfig::default()).is_empty());
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
