//! Slack Integration - Socket Mode bot interface
//!
//! This crate provides the Slack interface for pulse:
//! - **Socket Mode** (`socket`) - WebSocket connection to Slack (no public URL needed)
//! - **Decoding** (`decode`) - Raw socket frames to typed survey events
//! - **Events** (`events`) - Thread messages and form interactions, dispatched to handlers
//! - **Block Kit** (`blocks`) - Survey offer, feedback form, and confirmation messages
//! - **Web API** (`api`) - Outbound chat calls over the bot token
//!
//! # Getting Started
//!
//! 1. Create a Slack app at https://api.slack.com/apps
//! 2. Enable Socket Mode and subscribe to message events
//! 3. Set env vars: `PULSE_SLACK_APP_TOKEN`, `PULSE_SLACK_BOT_TOKEN`
//!
//! # Architecture
//!
//! ```text
//! Slack Frames → decode_envelope → EventDispatcher → Handlers → Survey Engines
//!                                                       ↓
//!                                           Block Kit UI ← ChatGateway
//! ```
//!
//! # Key Types
//!
//! - `SocketModeRunner` - WebSocket event loop with reconnection logic
//! - `EventDispatcher` - Routes survey events to appropriate handlers
//! - `MessageBuilder` - Constructs rich Slack messages
//! - `ChatGateway` - Trait over the outbound Web API surface

pub mod api;
pub mod blocks;
pub mod decode;
pub mod events;
pub mod socket;
