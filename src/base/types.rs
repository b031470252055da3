pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// A chat message as seen by the trigger dispatcher.
///
/// This is platform neutral: chat clients translate their native events into
/// this shape before handing them to a [`MessageHandler`](crate::service::chat::MessageHandler).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingMessage {
    /// The channel the message was posted in.
    pub channel_id: String,
    /// The platform identifier of the message itself (the Slack `ts`).
    pub message_id: String,
    /// The thread the message belongs to, if any.
    pub thread_id: Option<String>,
    /// The author of the message, if known.
    pub user_id: Option<String>,
    /// The raw message text.
    pub text: String,
}

impl IncomingMessage {
    /// Creates a top-level message in `channel_id` with the given text.
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// The thread a reply to this message should land in.
    pub fn reply_thread(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }
}

/// Availability shown next to the bot's name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    #[default]
    Online,
    Away,
}

/// A presence the bot can display.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct Presence {
    #[serde(default)]
    pub status: PresenceStatus,
    /// Free-form activity text (e.g. "answering !help").
    #[serde(default)]
    pub activity: Option<String>,
}

impl Presence {
    pub fn new(status: PresenceStatus, activity: impl Into<String>) -> Self {
        Self {
            status,
            activity: Some(activity.into()),
        }
    }
}
