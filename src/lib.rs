//! Socratic - a terminal client for Socratic dialogue
//!
//! The conversation controller owns the local transcript and coordinates one
//! request/response exchange at a time with the remote `/chat` service.

pub mod app;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;
pub mod transport;
pub mod ui;

pub use config::Config;
pub use controller::{ConversationController, Exchange, Resolution};
pub use error::ExchangeError;
pub use events::{ConversationEvent, ConversationRole, Turn};
pub use state::ConversationState;
pub use transport::{ChatReply, ChatTransport, HttpTransport};
