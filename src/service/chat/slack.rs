//! Slack implementation of the chat client, via `slack-morphism` socket mode.

use crate::{
    base::{
        config::Config,
        types::{IncomingMessage, Presence, PresenceStatus, Res, Void},
    },
    service::chat::MessageHandler,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    handler: Arc<dyn MessageHandler>,
    bot_user_id: String,
}

/// Slack client implementation.
#[derive(Clone)]
pub struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, handler: Arc<dyn MessageHandler>) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState {
            handler,
            bot_user_id: self.bot_user_id.clone(),
        }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, message), fields(channel_id = %message.channel_id))]
    async fn reply(&self, message: &IncomingMessage, text: &str) -> Void {
        let content = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(message.channel_id.clone()), content).with_link_names(true);

        if let Some(thread_ts) = message.reply_thread() {
            request = request.with_thread_ts(SlackTs(thread_ts.to_string()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, message), fields(channel_id = %message.channel_id))]
    async fn react(&self, message: &IncomingMessage, emoji: &str) -> Void {
        let request = SlackApiReactionsAddRequest {
            channel: SlackChannelId(message.channel_id.clone()),
            name: SlackReactionName(normalize_emoji(emoji)),
            timestamp: SlackTs(message.message_id.clone()),
        };

        let session = self.client.open_session(&self.bot_token);

        let _ = session.reactions_add(&request).await.map_err(|e| anyhow::anyhow!("Failed to react to message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_presence(&self, presence: &Presence) -> Void {
        // Slack has no activity line for bot users, so only the status is sent.
        if let Some(activity) = &presence.activity {
            debug!("Slack does not display activities; ignoring `{}`.", activity);
        }

        let request = SlackApiUsersSetPresenceRequest::new(slack_presence(presence.status).to_string());

        let session = self.client.open_session(&self.bot_token);

        let _ = session.users_set_presence(&request).await.map_err(|e| anyhow::anyhow!("Failed to set presence: {}", e))?;

        Ok(())
    }
}

// Helpers.

/// Slack reaction names are bare; accept the `:name:` form users type.
fn normalize_emoji(emoji: &str) -> String {
    emoji.trim().trim_matches(':').to_string()
}

fn slack_presence(status: PresenceStatus) -> &'static str {
    match status {
        PresenceStatus::Online => "auto",
        PresenceStatus::Away => "away",
    }
}

/// Undoes Slack's escaping of `&`, `<` and `>` in message text.
fn unescape_text(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Whether a message subtype is still something a user typed.
///
/// Plain messages have no subtype. Edits, deletions, joins, bot posts and the
/// other system subtypes never trigger.
fn user_authored(subtype: Option<&SlackMessageEventType>) -> bool {
    matches!(
        subtype,
        None | Some(SlackMessageEventType::FileShare | SlackMessageEventType::ThreadBroadcast | SlackMessageEventType::MeMessage)
    )
}

/// Converts a Slack message event into an [`IncomingMessage`].
///
/// Returns `None` for events without a channel or text.
fn incoming_message(event: &SlackMessageEvent) -> Option<IncomingMessage> {
    let channel_id = event.origin.channel.as_ref()?.0.clone();
    let text = event.content.as_ref()?.text.as_deref()?;

    Some(IncomingMessage {
        channel_id,
        message_id: event.origin.ts.0.clone(),
        thread_id: event.origin.thread_ts.as_ref().map(|ts| ts.0.clone()),
        user_id: event.sender.user.as_ref().map(|user| user.0.clone()),
        text: unescape_text(text),
    })
}

/// The message to hand to the bot, if `event` should trigger at all.
///
/// Skips system subtypes, messages from the bot itself or any other bot, and
/// events without a channel or text.
fn dispatchable(event: &SlackMessageEvent, bot_user_id: &str) -> Option<IncomingMessage> {
    if !user_authored(event.subtype.as_ref()) {
        debug!("Skipping message event with subtype {:?}.", event.subtype);
        return None;
    }

    let from_self = event.sender.user.as_ref().is_some_and(|user| user.0 == bot_user_id);
    if from_self || event.sender.bot_id.is_some() {
        debug!("Skipping message event from a bot.");
        return None;
    }

    let message = incoming_message(event);
    if message.is_none() {
        warn!("Skipping message event without a channel or text.");
    }

    message
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text("No app commands are currently supported.".into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (handler, bot_user_id) = {
        let states = states.read().await;
        let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;
        (user_state.handler.clone(), user_state.bot_user_id.clone())
    };

    match event_callback.event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            let Some(message) = dispatchable(&slack_message_event, &bot_user_id) else {
                return Ok(());
            };

            info!("Received message event ...");
            handler.handle_message(message).await;
        }
        SlackEventCallbackBody::AppMention(_) => {
            // Mentions also arrive as plain message events.
            debug!("Ignoring app mention event.");
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emoji_names_lose_their_colons() {
        assert_eq!(normalize_emoji(":thumbsup:"), "thumbsup");
        assert_eq!(normalize_emoji(" wave "), "wave");
        assert_eq!(normalize_emoji("nerd_face"), "nerd_face");
    }

    #[test]
    fn presence_maps_to_slack_values() {
        assert_eq!(slack_presence(PresenceStatus::Online), "auto");
        assert_eq!(slack_presence(PresenceStatus::Away), "away");
    }

    fn event(json: serde_json::Value) -> SlackMessageEvent {
        serde_json::from_value(json).expect("Failed to parse message event")
    }

    #[test]
    fn text_is_unescaped() {
        assert_eq!(unescape_text("&lt;roll 1 &amp;&amp; 2&gt;"), "<roll 1 && 2>");
        assert_eq!(unescape_text("&amp;lt;"), "&lt;");
        assert_eq!(unescape_text("plain"), "plain");
    }

    #[test]
    fn incoming_message_carries_unescaped_text() {
        let message = incoming_message(&event(serde_json::json!({
            "type": "message",
            "channel": "C01TEST",
            "user": "U54321",
            "text": "&lt;roll 1 &amp;&amp; 2",
            "ts": "1234567890.123456",
            "thread_ts": "1234567890.000001",
        })))
        .unwrap();

        assert_eq!(message.text, "<roll 1 && 2");
        assert_eq!(message.channel_id, "C01TEST");
        assert_eq!(message.message_id, "1234567890.123456");
        assert_eq!(message.thread_id.as_deref(), Some("1234567890.000001"));
        assert_eq!(message.user_id.as_deref(), Some("U54321"));

        let parser = crate::interaction::command::CommandParser::new(Some("<".to_string()), None, false).unwrap();
        let command = parser.parse(&message.text).unwrap();
        assert_eq!((command.trigger, command.args), ("roll", "1 && 2"));
    }

    #[test]
    fn plain_user_messages_are_dispatched() {
        let message = dispatchable(
            &event(serde_json::json!({ "type": "message", "channel": "C1", "user": "U2", "text": "!ping", "ts": "1.1" })),
            "UBOT",
        );

        assert_eq!(message.map(|m| m.text).as_deref(), Some("!ping"));
    }

    #[test]
    fn user_authored_subtypes_are_dispatched() {
        for subtype in ["file_share", "thread_broadcast", "me_message"] {
            let message = dispatchable(
                &event(serde_json::json!({ "type": "message", "subtype": subtype, "channel": "C1", "user": "U2", "text": "!ping", "ts": "1.1" })),
                "UBOT",
            );

            assert!(message.is_some(), "{subtype} should be dispatched");
        }
    }

    #[test]
    fn own_and_bot_messages_are_skipped() {
        let own = event(serde_json::json!({ "type": "message", "channel": "C1", "user": "UBOT", "text": "!ping", "ts": "1.1" }));
        assert!(dispatchable(&own, "UBOT").is_none());

        let other_bot = event(serde_json::json!({ "type": "message", "channel": "C1", "bot_id": "B99", "text": "!ping", "ts": "1.2" }));
        assert!(dispatchable(&other_bot, "UBOT").is_none());
    }

    #[test]
    fn edits_and_deletions_are_skipped() {
        let edited = event(serde_json::json!({ "type": "message", "subtype": "message_changed", "channel": "C1", "text": "!ping", "ts": "1.3", "hidden": true }));
        assert!(dispatchable(&edited, "UBOT").is_none());

        let deleted = event(serde_json::json!({ "type": "message", "subtype": "message_deleted", "channel": "C1", "ts": "1.4", "deleted_ts": "1.1", "hidden": true }));
        assert!(dispatchable(&deleted, "UBOT").is_none());
    }

    #[test]
    fn events_without_text_are_skipped() {
        let no_text = event(serde_json::json!({ "type": "message", "channel": "C1", "user": "U2", "ts": "1.5" }));
        assert!(dispatchable(&no_text, "UBOT").is_none());
    }
}
