//! Normalized chat events and the cheap intake filters.
//!
//! The webhook handler normalizes the transport payload into a
//! [`ChatEvent`] before anything else runs. [`pre_filter`] applies the
//! ordered, stateless rejection rules; workspace/channel-state filters
//! need database rows and live in the pipeline crate.

use serde::{Deserialize, Serialize};

/// A normalized message event from the chat platform.
///
/// `message_id` doubles as the thread anchor: replies to the generated
/// artifact are posted into the thread rooted at this message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Platform team/workspace identifier.
    pub team_id: String,
    /// Platform channel identifier.
    pub channel_id: String,
    /// Platform message identifier (thread anchor).
    pub message_id: String,
    /// Author's platform user id.
    pub user_id: String,
    /// Raw message text.
    pub text: String,
    /// Present when this message is a reply inside an existing thread.
    pub thread_root_id: Option<String>,
    /// Present on edits, deletions, bot messages, joins, etc.
    pub subtype: Option<String>,
}

impl ChatEvent {
    /// True when this event is a reply inside an existing thread
    /// (as opposed to a new top-level message).
    pub fn is_thread_reply(&self) -> bool {
        self.thread_root_id
            .as_deref()
            .is_some_and(|root| root != self.message_id)
    }
}

/// Why an event was silently dropped before any real work.
///
/// None of these are errors; the handler acks and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    /// Authored by the bot itself.
    SelfMessage,
    /// Carries an edit/delete/bot subtype.
    HasSubtype,
    /// A thread reply that does not mention the bot.
    UnaddressedThreadReply,
}

/// True when `text` contains a mention of `user_id` in the platform's
/// `<@UXXXX>` mention syntax.
pub fn mentions_user(text: &str, user_id: &str) -> bool {
    text.contains(&format!("<@{user_id}>"))
}

/// Apply the stateless intake filters, in order. Returns the first
/// matching reason, or `None` when the event should proceed.
pub fn pre_filter(event: &ChatEvent, bot_user_id: &str) -> Option<FilterReason> {
    if event.user_id == bot_user_id {
        return Some(FilterReason::SelfMessage);
    }
    if event.subtype.is_some() {
        return Some(FilterReason::HasSubtype);
    }
    if event.is_thread_reply() && !mentions_user(&event.text, bot_user_id) {
        return Some(FilterReason::UnaddressedThreadReply);
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> ChatEvent {
        ChatEvent {
            team_id: "T1".into(),
            channel_id: "C1".into(),
            message_id: "1700000000.000100".into(),
            user_id: "U_HUMAN".into(),
            text: "what a day".into(),
            thread_root_id: None,
            subtype: None,
        }
    }

    #[test]
    fn plain_message_passes() {
        assert_eq!(pre_filter(&event(), "U_BOT"), None);
    }

    #[test]
    fn bot_own_message_is_filtered() {
        let mut e = event();
        e.user_id = "U_BOT".into();
        assert_eq!(pre_filter(&e, "U_BOT"), Some(FilterReason::SelfMessage));
    }

    #[test]
    fn edit_subtype_is_filtered() {
        let mut e = event();
        e.subtype = Some("message_changed".into());
        assert_eq!(pre_filter(&e, "U_BOT"), Some(FilterReason::HasSubtype));
    }

    #[test]
    fn thread_reply_without_mention_is_filtered() {
        let mut e = event();
        e.thread_root_id = Some("1699999999.000001".into());
        assert_eq!(
            pre_filter(&e, "U_BOT"),
            Some(FilterReason::UnaddressedThreadReply)
        );
    }

    #[test]
    fn thread_reply_with_mention_passes() {
        let mut e = event();
        e.thread_root_id = Some("1699999999.000001".into());
        e.text = "<@U_BOT> another one please".into();
        assert_eq!(pre_filter(&e, "U_BOT"), None);
    }

    #[test]
    fn thread_root_equal_to_message_id_is_not_a_reply() {
        // Some transports echo thread_ts == ts on the root message itself.
        let mut e = event();
        e.thread_root_id = Some(e.message_id.clone());
        assert!(!e.is_thread_reply());
        assert_eq!(pre_filter(&e, "U_BOT"), None);
    }

    #[test]
    fn mention_matching_is_exact() {
        assert!(mentions_user("hey <@U_BOT> do it", "U_BOT"));
        assert!(!mentions_user("hey U_BOT do it", "U_BOT"));
        assert!(!mentions_user("hey <@U_BOTX> do it", "U_BOT"));
    }
}
