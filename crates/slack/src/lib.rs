//! Slack integration for the barkeep bot.
//!
//! - **Session** (`socket`) - transport trait, session runner and its state
//! - **RTM** (`rtm`, `web`) - Slack websocket transport and Web API client
//! - **Commands** (`commands`) - exact-phrase command table
//! - **Events** (`events`) - RTM frame classification and bot addressing
//! - **Attachments** (`blocks`) - rich message builders
//! - **Responder** (`responder`) - routes commands to the finance and events sources
//!
//! # Architecture
//!
//! ```text
//! RtmTransport → SessionRunner → Responder → FinanceSource / EventFeed
//!                                    ↓
//!                 plain reply / attachment ← MoneyFormatter, schedule
//! ```

pub mod blocks;
pub mod commands;
pub mod events;
pub mod responder;
pub mod rtm;
pub mod socket;
pub mod web;

pub use responder::Responder;
pub use rtm::RtmTransport;
pub use socket::{ChatTransport, ReconnectPolicy, SessionError, SessionRunner, SessionState};
pub use web::SlackWebClient;
