//! Service integrations for external APIs and clients.
//!
//! Chat services (e.g., Slack) live here. Each service module defines both a
//! generic trait and a concrete implementation, allowing for extensibility
//! and easy testing.

pub mod chat;
