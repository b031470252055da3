//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::interaction::registry::Trigger;

use super::types::{Presence, Res};

/// Default seconds between presence changes when rotating several presences.
fn default_presence_interval_secs() -> u64 {
    60
}

/// Configuration for the trigger-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Text a message must start with to be treated as a command (`PREFIX`).
    #[serde(default)]
    pub prefix: Option<String>,
    /// Text a message must end with to be treated as a command (`SUFFIX`).
    #[serde(default)]
    pub suffix: Option<String>,
    /// Compare the prefix, suffix and trigger words ignoring ASCII case, and
    /// match trigger patterns case-insensitively (`IGNORE_CASE`).
    #[serde(default)]
    pub ignore_case: bool,
    /// Seconds between presence changes when several are configured (`PRESENCE_INTERVAL_SECS`).
    #[serde(default = "default_presence_interval_secs")]
    pub presence_interval_secs: u64,
    /// Presences to show; several rotate on `presence_interval_secs`.
    #[serde(default)]
    pub presence: Vec<Presence>,
    /// Statically configured triggers.
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    /// Action taken when no trigger matches.
    #[serde(default)]
    pub default_action: Option<ActionConfig>,
}

/// A reply and/or reaction, both optional.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ActionConfig {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub reaction: Option<String>,
}

/// One `[[triggers]]` entry. Exactly one of `trigger`, `triggers` or
/// `pattern` must be set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TriggerConfig {
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub reaction: Option<String>,
}

impl TriggerConfig {
    pub fn action(&self) -> ActionConfig {
        ActionConfig {
            reply: self.reply.clone(),
            reaction: self.reaction.clone(),
        }
    }
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("TRIGGER_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        Self::build(cfg)
    }

    /// Load configuration from a TOML string, ignoring the environment.
    pub fn from_toml(toml: &str) -> Res<Self> {
        let cfg = config::Config::builder().add_source(config::File::from_str(toml, config::FileFormat::Toml));

        Self::build(cfg)
    }

    fn build(cfg: config::ConfigBuilder<config::builder::DefaultState>) -> Res<Self> {
        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    fn validate(&self) -> Res<()> {
        let has_prefix = self.prefix.as_deref().is_some_and(|p| !p.is_empty());
        let has_suffix = self.suffix.as_deref().is_some_and(|s| !s.is_empty());

        if !has_prefix && !has_suffix {
            return Err(anyhow::anyhow!("You need to provide at least one of the following: prefix or suffix."));
        }

        if self.presence_interval_secs == 0 {
            return Err(anyhow::anyhow!("Presence interval must be at least one second."));
        }

        for entry in &self.triggers {
            Trigger::try_from(entry)?;
        }

        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::PresenceStatus;

    #[test]
    fn loads_full_config() {
        let config = Config::from_toml(
            r#"
            slack_app_token = "xapp-test"
            slack_bot_token = "xoxb-test"
            prefix = "!"
            ignore_case = true

            presence = [
                { status = "online", activity = "answering !help" },
                { status = "away" },
            ]

            [[triggers]]
            trigger = "ping"
            reply = "pong"

            [[triggers]]
            triggers = ["hi", "hello"]
            reaction = ":wave:"

            [[triggers]]
            pattern = "^ro+ll$"
            reply = "rolling"
            reaction = "game_die"

            [default_action]
            reply = "Unknown command."
            "#,
        )
        .unwrap();

        assert_eq!(config.prefix.as_deref(), Some("!"));
        assert_eq!(config.suffix, None);
        assert!(config.ignore_case);
        assert_eq!(config.presence_interval_secs, 60);
        assert_eq!(config.presence, vec![Presence::new(PresenceStatus::Online, "answering !help"), Presence { status: PresenceStatus::Away, activity: None }]);
        assert_eq!(config.triggers.len(), 3);
        assert_eq!(config.triggers[1].triggers, vec!["hi".to_string(), "hello".to_string()]);
        assert_eq!(
            config.triggers[2].action(),
            ActionConfig {
                reply: Some("rolling".to_string()),
                reaction: Some("game_die".to_string()),
            }
        );
        assert_eq!(config.default_action.as_ref().and_then(|a| a.reply.as_deref()), Some("Unknown command."));
    }

    #[test]
    fn requires_prefix_or_suffix() {
        let result = Config::from_toml(
            r#"
            slack_app_token = "xapp-test"
            slack_bot_token = "xoxb-test"
            "#,
        );
        assert!(result.is_err());

        let result = Config::from_toml(
            r#"
            slack_app_token = "xapp-test"
            slack_bot_token = "xoxb-test"
            prefix = ""
            suffix = "?"
            "#,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_bad_triggers() {
        let result = Config::from_toml(
            r#"
            slack_app_token = "xapp-test"
            slack_bot_token = "xoxb-test"
            prefix = "!"

            [[triggers]]
            pattern = "(unclosed"
            reply = "x"
            "#,
        );
        assert!(result.is_err());

        let result = Config::from_toml(
            r#"
            slack_app_token = "xapp-test"
            slack_bot_token = "xoxb-test"
            prefix = "!"

            [[triggers]]
            reply = "no trigger at all"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_presence_interval() {
        let result = Config::from_toml(
            r#"
            slack_app_token = "xapp-test"
            slack_bot_token = "xoxb-test"
            prefix = "!"
            presence_interval_secs = 0
            "#,
        );
        assert!(result.is_err());
    }
}
