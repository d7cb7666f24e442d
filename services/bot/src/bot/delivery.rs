//! services/bot/src/bot/delivery.rs
//!
//! The Message Delivery Manager. Owns every outward `send`/`edit`, keeping messages
//! under the platform length limit, skipping edits whose content was already rendered
//! and spacing edits to the same message by a minimum interval.

use crate::config::DeliveryConfig;
use career_assistant_core::domain::MessageRef;
use career_assistant_core::ports::{ChatTransport, TransportError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Appended to any message that had to be cut.
pub const TRUNCATION_NOTICE: &str = "\n\n[...pesan terpotong]";

type ContentHash = [u8; 32];

/// What was last rendered into a message, and when.
struct RenderedState {
    hash: ContentHash,
    last_edit: Instant,
}

pub struct MessageDelivery {
    transport: Arc<dyn ChatTransport>,
    config: DeliveryConfig,
    cache: Mutex<HashMap<MessageRef, RenderedState>>,
}

impl MessageDelivery {
    pub fn new(transport: Arc<dyn ChatTransport>, config: DeliveryConfig) -> Self {
        Self {
            transport,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Sends a new message, truncated to the configured maximum.
    pub async fn send(&self, chat_id: i64, text: &str) -> Result<MessageRef, TransportError> {
        let rendered = truncate_for_delivery(text, self.config.max_length);
        let message_id = self.transport.send_message(chat_id, &rendered).await?;

        let message = MessageRef { chat_id, message_id };
        self.remember(message, content_hash(&rendered));
        Ok(message)
    }

    /// Replaces the text of an existing message.
    ///
    /// Returns `false` when the message is gone, cannot be edited or the platform is
    /// unreachable; the caller is expected to fall back to `send`.
    pub async fn edit(&self, chat_id: i64, message_id: i32, text: &str) -> bool {
        let message = MessageRef { chat_id, message_id };
        let mut limit = self.config.max_length;

        for attempt in 0..2 {
            let rendered = truncate_for_delivery(text, limit);
            let hash = content_hash(&rendered);

            let wait = {
                let cache = self.lock();
                match cache.get(&message) {
                    Some(state) if state.hash == hash => {
                        debug!(chat_id, message_id, "Edit skipped, content already rendered.");
                        return true;
                    }
                    Some(state) => self
                        .config
                        .min_edit_interval
                        .saturating_sub(state.last_edit.elapsed()),
                    None => Duration::ZERO,
                }
            };
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            match self.transport.edit_message(chat_id, message_id, &rendered).await {
                Ok(()) | Err(TransportError::NotModified) => {
                    self.remember(message, hash);
                    return true;
                }
                Err(TransportError::TooLong) if attempt == 0 => {
                    warn!(chat_id, message_id, limit, "Edit rejected as too long, retrying shorter.");
                    limit /= 2;
                }
                Err(e) => {
                    warn!(chat_id, message_id, error = %e, "Edit failed.");
                    return false;
                }
            }
        }
        false
    }

    /// Evicts cache entries whose last edit is older than the configured max age.
    /// Returns the number of evicted entries.
    pub fn cleanup(&self, now: Instant) -> usize {
        let max_age = self.config.cache_max_age;
        let mut cache = self.lock();
        let before = cache.len();
        cache.retain(|_, state| now.saturating_duration_since(state.last_edit) < max_age);
        before - cache.len()
    }

    /// Longest text, in characters, that reaches the chat unchanged.
    pub fn max_length(&self) -> usize {
        self.config.max_length
    }

    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    fn remember(&self, message: MessageRef, hash: ContentHash) {
        self.lock().insert(
            message,
            RenderedState {
                hash,
                last_edit: Instant::now(),
            },
        );
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MessageRef, RenderedState>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn content_hash(text: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Cuts `text` to at most `max_chars` characters, notice included.
///
/// The cut prefers the last whitespace or period inside the final 20% of the window;
/// a period is kept, whitespace is dropped.
pub fn truncate_for_delivery(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let notice_chars = TRUNCATION_NOTICE.chars().count();
    if max_chars <= notice_chars {
        return text.chars().take(max_chars).collect();
    }

    let window = max_chars - notice_chars;
    let head: String = text.chars().take(window).collect();
    let tail_start = head
        .char_indices()
        .nth(window - window / 5)
        .map(|(i, _)| i)
        .unwrap_or(head.len());

    let body = match head[tail_start..].rfind(|c: char| c.is_whitespace() || c == '.') {
        Some(offset) => {
            let cut = tail_start + offset;
            if head[cut..].starts_with('.') {
                &head[..cut + 1]
            } else {
                &head[..cut]
            }
        }
        None => head.as_str(),
    };

    format!("{}{}", body.trim_end(), TRUNCATION_NOTICE)
}
