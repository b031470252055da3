//! Splits message text into a trigger word and its arguments.

use crate::base::types::Res;

/// A message that carried the bot's prefix and/or suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    /// The first whitespace-delimited word after stripping.
    pub trigger: &'a str,
    /// Everything after the trigger, trimmed.
    pub args: &'a str,
}

/// Recognizes commands by prefix and/or suffix.
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: Option<String>,
    suffix: Option<String>,
    ignore_case: bool,
}

impl CommandParser {
    /// Creates a parser. Empty strings count as unset, and at least one of
    /// `prefix` or `suffix` must remain.
    pub fn new(prefix: Option<String>, suffix: Option<String>, ignore_case: bool) -> Res<Self> {
        let prefix = prefix.filter(|p| !p.is_empty());
        let suffix = suffix.filter(|s| !s.is_empty());

        if prefix.is_none() && suffix.is_none() {
            return Err(anyhow::anyhow!("You need to provide at least one of the following: prefix or suffix."));
        }

        Ok(Self { prefix, suffix, ignore_case })
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Parses `text`, or returns `None` when it carries neither the prefix nor
    /// the suffix. Only the marker(s) actually present are stripped.
    pub fn parse<'a>(&self, text: &'a str) -> Option<Command<'a>> {
        let after_prefix = self.prefix.as_deref().and_then(|prefix| strip_prefix(text, prefix, self.ignore_case));
        let body = after_prefix.unwrap_or(text);
        let before_suffix = self.suffix.as_deref().and_then(|suffix| strip_suffix(body, suffix, self.ignore_case));

        if after_prefix.is_none() && before_suffix.is_none() {
            return None;
        }

        let body = before_suffix.unwrap_or(body).trim();

        let (trigger, args) = match body.split_once(char::is_whitespace) {
            Some((trigger, rest)) => (trigger, rest.trim()),
            None => (body, ""),
        };

        Some(Command { trigger, args })
    }
}

fn strip_prefix<'a>(text: &'a str, prefix: &str, ignore_case: bool) -> Option<&'a str> {
    if !ignore_case {
        return text.strip_prefix(prefix);
    }

    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) { text.get(prefix.len()..) } else { None }
}

fn strip_suffix<'a>(text: &'a str, suffix: &str, ignore_case: bool) -> Option<&'a str> {
    if !ignore_case {
        return text.strip_suffix(suffix);
    }

    let split = text.len().checked_sub(suffix.len())?;
    let tail = text.get(split..)?;
    if tail.eq_ignore_ascii_case(suffix) { text.get(..split) } else { None }
}

// Tests.
