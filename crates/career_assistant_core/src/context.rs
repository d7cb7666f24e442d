//! crates/career_assistant_core/src/context.rs
//!
//! Per-user conversation memory. Contexts are created lazily on a user's first
//! message and live for the lifetime of the process.

use crate::domain::{ConversationTurn, IntentType, Role, UserContext};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Default number of user/assistant exchanges kept per user.
pub const DEFAULT_HISTORY_DEPTH: usize = 5;

/// Holds one `UserContext` per user id.
///
/// The lock is only held for the duration of a map operation, never across an await.
pub struct ConversationStore {
    max_exchanges: usize,
    contexts: Mutex<HashMap<i64, UserContext>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl ConversationStore {
    pub fn new(max_exchanges: usize) -> Self {
        Self {
            max_exchanges,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns a copy of the user's context, creating an empty one if needed.
    pub fn snapshot(&self, user_id: i64) -> UserContext {
        self.lock()
            .entry(user_id)
            .or_insert_with(|| UserContext::new(user_id))
            .clone()
    }

    /// Appends a completed exchange, evicting the oldest turns beyond the depth limit.
    pub fn record_exchange(&self, user_id: i64, user_text: &str, assistant_text: &str) {
        let limit = self.max_exchanges * 2;
        let now = Utc::now();
        let mut contexts = self.lock();
        let context = contexts
            .entry(user_id)
            .or_insert_with(|| UserContext::new(user_id));

        context.history.push_back(ConversationTurn {
            role: Role::User,
            content: user_text.to_string(),
            timestamp: now,
        });
        context.history.push_back(ConversationTurn {
            role: Role::Assistant,
            content: assistant_text.to_string(),
            timestamp: now,
        });
        while context.history.len() > limit {
            context.history.pop_front();
        }
    }

    pub fn set_last_search_intent(&self, user_id: i64, intent: IntentType) {
        self.lock()
            .entry(user_id)
            .or_insert_with(|| UserContext::new(user_id))
            .last_search_intent = Some(intent);
    }

    pub fn set_preference(&self, user_id: i64, key: &str, value: &str) {
        self.lock()
            .entry(user_id)
            .or_insert_with(|| UserContext::new(user_id))
            .preferences
            .insert(key.to_string(), value.to_string());
    }

    /// Number of users with a context.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, UserContext>> {
        self.contexts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
