//! Chat platform transport: webhook signature verification and the
//! outbound API surface the pipeline needs (thread replies, ephemeral
//! notices, reactions, message reads, user display lookup).

pub mod api;
pub mod client;
pub mod signature;

pub use api::{ChatApi, ChatError, MessageReceipt, PickerStyle, UserDisplay};
pub use client::HttpChatClient;
