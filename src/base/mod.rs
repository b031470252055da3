//! Core components and types for the trigger-bot.
//!
//! This module contains the fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Common types and result handling.

pub mod config;
pub mod types;
