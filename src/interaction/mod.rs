//! Message handling for trigger-bot.
//!
//! This module provides the pieces the bot dispatches with:
//! - Parsing prefixed/suffixed messages into a trigger and its arguments
//! - Registering triggers (exact words and patterns) against actions
//! - Executing reply/reaction actions without letting failures escape

pub mod action;
pub mod command;
pub mod registry;
