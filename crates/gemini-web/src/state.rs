//! Conversation continuation state
//!
//! The provider threads a conversation through three identifiers returned
//! with every answer. The client carries them into the next request; the
//! caller can snapshot, restore or reset the triple to branch or resume
//! conversations deterministically.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::REQUEST_ID_STEP;

/// The continuation triple plus the monotonic `_reqid` counter.
///
/// Identifiers sent on request N+1 must equal those decoded from the answer
/// of request N; empty strings signal a fresh conversation server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub conversation_id: String,
    pub response_id: String,
    pub choice_id: String,
    request_id: u64,
}

impl ConversationState {
    /// Fresh state with a randomized 4-digit request-id seed.
    pub fn new() -> Self {
        Self {
            request_id: rand::thread_rng().gen_range(1000..10000),
            ..Self::default()
        }
    }

    /// Fresh state resuming a known conversation id.
    pub fn resume(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Self::new()
        }
    }

    /// Current `_reqid` value to send on the wire.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// True until the first successful exchange (or when resuming without
    /// response/choice ids).
    pub fn is_new(&self) -> bool {
        self.conversation_id.is_empty()
    }

    /// Overwrites the triple with the identifiers decoded from an answer.
    /// The choice id is the first draft's id, the provider's default
    /// "accepted" branch.
    pub fn advance(
        &mut self,
        conversation_id: impl Into<String>,
        response_id: impl Into<String>,
        choice_id: impl Into<String>,
    ) {
        self.conversation_id = conversation_id.into();
        self.response_id = response_id.into();
        self.choice_id = choice_id.into();
    }

    /// Continues the next turn from a different draft of the last answer.
    pub fn select_choice(&mut self, choice_id: impl Into<String>) {
        self.choice_id = choice_id.into();
    }

    /// Bumps the request counter by the fixed step after an exchange.
    pub fn bump_request_id(&mut self) {
        self.request_id += REQUEST_ID_STEP;
    }

    /// Starts a new conversation; the request counter keeps running.
    pub fn reset(&mut self) {
        self.conversation_id.clear();
        self.response_id.clear();
        self.choice_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_four_digits() {
        for _ in 0..100 {
            let state = ConversationState::new();
            assert!((1000..10000).contains(&state.request_id()));
        }
    }

    #[test]
    fn test_advance_and_bump() {
        let mut state = ConversationState::new();
        assert!(state.is_new());
        let seed = state.request_id();

        state.advance("c_1", "r_1", "rc_1");
        state.bump_request_id();
        assert!(!state.is_new());
        assert_eq!(state.conversation_id, "c_1");
        assert_eq!(state.response_id, "r_1");
        assert_eq!(state.choice_id, "rc_1");
        assert_eq!(state.request_id(), seed + REQUEST_ID_STEP);

        state.bump_request_id();
        assert_eq!(state.request_id(), seed + 2 * REQUEST_ID_STEP);
    }

    #[test]
    fn test_select_choice_overrides_branch() {
        let mut state = ConversationState::new();
        state.advance("c_1", "r_1", "rc_1");
        state.select_choice("rc_2");
        assert_eq!(state.choice_id, "rc_2");
        assert_eq!(state.conversation_id, "c_1");
    }

    #[test]
    fn test_reset_keeps_counter() {
        let mut state = ConversationState::new();
        state.advance("c_1", "r_1", "rc_1");
        state.bump_request_id();
        let reqid = state.request_id();

        state.reset();
        assert!(state.is_new());
        assert!(state.choice_id.is_empty());
        assert_eq!(state.request_id(), reqid);
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut state = ConversationState::new();
        state.advance("c_9", "r_9", "rc_9");

        let snapshot = serde_json::to_string(&state).unwrap();
        let restored: ConversationState = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.request_id(), state.request_id());
    }

    #[test]
    fn test_resume_seeds_conversation() {
        let state = ConversationState::resume("c_42");
        assert_eq!(state.conversation_id, "c_42");
        assert!(state.response_id.is_empty());
    }
}
