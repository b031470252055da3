//! The trigger registry: exact trigger words plus an ordered list of patterns.

use std::{collections::HashMap, fmt};

use regex::{Regex, RegexBuilder};

use crate::{
    base::{config::TriggerConfig, types::Err},
    interaction::action::Action,
};

// Structs.

/// What a message's leading word is matched against.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// A single exact word.
    Exact(String),
    /// Several exact words sharing one action.
    Any(Vec<String>),
    /// A regular expression, tried after the exact words.
    Pattern(Regex),
}

impl Trigger {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }
}

/// Patterns compare by their source text.
impl PartialEq for Trigger {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Any(a), Self::Any(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for Trigger {}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(word) => write!(f, "{word}"),
            Self::Any(words) => write!(f, "[{}]", words.join(", ")),
            Self::Pattern(pattern) => write!(f, "/{}/", pattern.as_str()),
        }
    }
}

impl From<&str> for Trigger {
    fn from(word: &str) -> Self {
        Self::Exact(word.to_string())
    }
}

impl From<String> for Trigger {
    fn from(word: String) -> Self {
        Self::Exact(word)
    }
}

impl From<Regex> for Trigger {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Vec<String>> for Trigger {
    fn from(words: Vec<String>) -> Self {
        Self::Any(words)
    }
}

impl From<Vec<&str>> for Trigger {
    fn from(words: Vec<&str>) -> Self {
        Self::Any(words.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Trigger {
    fn from(words: [&str; N]) -> Self {
        Self::Any(words.into_iter().map(str::to_string).collect())
    }
}

impl TryFrom<&TriggerConfig> for Trigger {
    type Error = Err;

    fn try_from(config: &TriggerConfig) -> Result<Self, Self::Error> {
        match (&config.trigger, config.triggers.is_empty(), &config.pattern) {
            (Some(word), true, None) => Ok(Self::Exact(word.clone())),
            (None, false, None) => Ok(Self::Any(config.triggers.clone())),
            (None, true, Some(pattern)) => Self::pattern(pattern).map_err(|e| anyhow::anyhow!("Invalid trigger pattern `{pattern}`: {e}")),
            _ => Err(anyhow::anyhow!("Each trigger entry must set exactly one of `trigger`, `triggers` or `pattern`.")),
        }
    }
}

/// Registered triggers and their actions.
///
/// Exact words are looked up first; patterns are then tried in registration
/// order and the first match wins.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    ignore_case: bool,
    exact: HashMap<String, Action>,
    patterns: Vec<(Regex, Action)>,
}

impl TriggerRegistry {
    /// Creates an empty registry. With `ignore_case`, exact words are compared
    /// ASCII case-insensitively and patterns match case-insensitively.
    pub fn new(ignore_case: bool) -> Self {
        Self {
            ignore_case,
            ..Default::default()
        }
    }

    /// Registers `action` under `trigger`, silently replacing any action
    /// already registered for the same exact word. Patterns are appended.
    pub fn register(&mut self, trigger: Trigger, action: Action) -> Trigger {
        match &trigger {
            Trigger::Exact(word) => {
                let key = self.key(word);
                self.exact.insert(key, action);
            }
            Trigger::Any(words) => {
                for word in words {
                    let key = self.key(word);
                    self.exact.insert(key, action.clone());
                }
            }
            Trigger::Pattern(pattern) => {
                let pattern = self.compile(pattern);
                self.patterns.push((pattern, action));
            }
        }

        trigger
    }

    /// Removes `trigger`, returning it if anything was registered under it.
    ///
    /// For [`Trigger::Any`], the returned trigger lists only the words that
    /// were actually present.
    pub fn remove(&mut self, trigger: &Trigger) -> Option<Trigger> {
        match trigger {
            Trigger::Exact(word) => {
                let key = self.key(word);
                self.exact.remove(&key).map(|_| trigger.clone())
            }
            Trigger::Any(words) => {
                let mut removed = Vec::new();
                for word in words {
                    let key = self.key(word);
                    if self.exact.remove(&key).is_some() {
                        removed.push(word.clone());
                    }
                }

                (!removed.is_empty()).then_some(Trigger::Any(removed))
            }
            Trigger::Pattern(pattern) => {
                let before = self.patterns.len();
                self.patterns.retain(|(existing, _)| existing.as_str() != pattern.as_str());

                (self.patterns.len() != before).then(|| trigger.clone())
            }
        }
    }

    /// Finds the action for `candidate`: exact words first, then patterns.
    pub fn resolve(&self, candidate: &str) -> Option<&Action> {
        self.exact
            .get(&self.key(candidate))
            .or_else(|| self.patterns.iter().find(|(pattern, _)| pattern.is_match(candidate)).map(|(_, action)| action))
    }

    /// Whether anything is registered under `trigger`.
    pub fn contains(&self, trigger: &Trigger) -> bool {
        match trigger {
            Trigger::Exact(word) => self.exact.contains_key(&self.key(word)),
            Trigger::Any(words) => words.iter().any(|word| self.exact.contains_key(&self.key(word))),
            Trigger::Pattern(pattern) => self.patterns.iter().any(|(existing, _)| existing.as_str() == pattern.as_str()),
        }
    }

    /// All registered triggers: exact words (sorted), then patterns in order.
    pub fn triggers(&self) -> Vec<Trigger> {
        let mut words: Vec<&String> = self.exact.keys().collect();
        words.sort();

        words
            .into_iter()
            .map(|word| Trigger::Exact(word.clone()))
            .chain(self.patterns.iter().map(|(pattern, _)| Trigger::Pattern(pattern.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds `pattern` case-insensitively when the registry ignores case.
    /// The source text is unchanged, so removal by source still works.
    fn compile(&self, pattern: &Regex) -> Regex {
        if !self.ignore_case {
            return pattern.clone();
        }

        RegexBuilder::new(pattern.as_str()).case_insensitive(true).build().unwrap_or_else(|_| pattern.clone())
    }

    fn key(&self, word: &str) -> String {
        if self.ignore_case { word.to_ascii_lowercase() } else { word.to_string() }
    }
}

// Tests.
