//! crates/career_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the data store, the completion API and the chat platform.

use crate::domain::{ChatMessage, Course, Posting};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for data store operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Failures of the streaming completion call.
///
/// Malformed frames never show up here; they are skipped inside the stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("Network failure while talking to the completion API: {0}")]
    Network(String),
    #[error("Completion API timed out: {0}")]
    Timeout(String),
    #[error("Completion API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Completion request could not be built: {0}")]
    InvalidRequest(String),
}

/// Rejections and failures reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("message content unchanged")]
    NotModified,
    #[error("message not found")]
    NotFound,
    #[error("message cannot be edited")]
    CannotEdit,
    #[error("message is too long")]
    TooLong,
    #[error("network failure: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("chat platform error: {0}")]
    Other(String),
}

/// A finite, non-restartable sequence of text increments.
pub type IncrementStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Internship postings, most recent first.
///
/// `keyword` is matched case-insensitively as a substring of any text field,
/// `location` against the posting location; an empty string disables that filter.
#[async_trait]
pub trait InternshipRepository: Send + Sync {
    async fn search(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>>;

    /// Stores postings, silently skipping `(company, position)` duplicates.
    /// Returns the number of rows actually inserted.
    async fn save(&self, postings: &[Posting]) -> PortResult<u64>;
}

/// Job postings, most recent first. Same matching rules as internships.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn search(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>>;

    async fn save(&self, postings: &[Posting]) -> PortResult<u64>;
}

/// Course listings, most recent first. Courses have no location dimension.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn search(&self, keyword: &str, limit: usize) -> PortResult<Vec<Course>>;

    /// Skips `(title, duration)` duplicates.
    async fn save(&self, courses: &[Course]) -> PortResult<u64>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Starts a streamed completion.
    ///
    /// Errors before the body starts (connection, HTTP status) are returned directly;
    /// errors while reading the body end the stream with an `Err` item.
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<IncrementStream, CompletionError>;
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a new message and returns its id.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32, TransportError>;

    async fn edit_message(&self, chat_id: i64, message_id: i32, text: &str) -> Result<(), TransportError>;
}
