//! services/bot/src/bot/pipeline.rs
//!
//! The Pipeline Orchestrator. Runs one inbound message through
//! validation, extraction, search, prompting, streaming and delivery, and guarantees
//! the user always gets exactly one reply for the turn, even when a stage fails.

use crate::bot::delivery::MessageDelivery;
use crate::bot::replies;
use crate::config::PipelineConfig;
use career_assistant_core::context::ConversationStore;
use career_assistant_core::domain::{
    Category, ChatMessage, InboundMessage, IntentType, MessageRef, QueryDescriptor, Record,
    SearchResults,
};
use career_assistant_core::ports::{
    CompletionError, CompletionService, CourseRepository, InternshipRepository, JobRepository,
    PortError, PortResult, TransportError,
};
use career_assistant_core::{extractor, prompt};
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Characters of user input and reply kept in interaction logs.
const LOG_PREVIEW_CHARS: usize = 50;

//=========================================================================================
// States, Outcomes and Error Kinds
//=========================================================================================

/// The stages a message moves through. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Extracting,
    Searching,
    EmptyResult,
    Prompting,
    Streaming,
    Delivering,
    ErrorHandling,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Extracting => "extracting",
            Stage::Searching => "searching",
            Stage::EmptyResult => "empty_result",
            Stage::Prompting => "prompting",
            Stage::Streaming => "streaming",
            Stage::Delivering => "delivering",
            Stage::ErrorHandling => "error_handling",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// How a single message was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Empty, non-text or oversized input.
    Rejected,
    Greeted,
    /// A definite search found nothing; suggestions were sent.
    NoResults,
    /// The intent was unclear and no category had matches.
    NotUnderstood,
    /// The reply was generated by the completion API.
    Answered,
    Failed(ErrorKind),
}

/// User-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    MalformedRequest,
    InvalidInput,
    Generic,
}

impl ErrorKind {
    /// The text shown to the user. Never contains error details.
    pub fn user_message(self) -> String {
        let headline = match self {
            ErrorKind::Network => "🚨 Terjadi masalah koneksi. Tolong coba lagi nanti.",
            ErrorKind::Timeout => {
                "⏱️ Waktu respon habis. Mohon coba lagi dengan pertanyaan yang lebih sederhana."
            }
            ErrorKind::MalformedRequest => {
                "⚠️ Permintaan tidak dapat diproses oleh layanan AI. Coba ubah pertanyaanmu."
            }
            ErrorKind::InvalidInput => "✏️ Input tidak valid. Silakan coba input yang berbeda.",
            ErrorKind::Generic => "😓 Maaf, terjadi kesalahan.",
        };
        format!("{}\n\n{}", headline, replies::HELP_HINT)
    }
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error("repository failure: {0}")]
    Repository(#[from] PortError),
    #[error("completion failure: {0}")]
    Completion(#[from] CompletionError),
    #[error("delivery failure: {0}")]
    Transport(#[from] TransportError),
}

impl PipelineError {
    fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Repository(_) => ErrorKind::Generic,
            PipelineError::Completion(e) => match e {
                CompletionError::Network(_) => ErrorKind::Network,
                CompletionError::Timeout(_) => ErrorKind::Timeout,
                CompletionError::Http { status, .. } if (400..500).contains(status) => {
                    ErrorKind::MalformedRequest
                }
                CompletionError::Http { .. } => ErrorKind::Generic,
                CompletionError::InvalidRequest(_) => ErrorKind::InvalidInput,
            },
            PipelineError::Transport(e) => match e {
                TransportError::Network(_) => ErrorKind::Network,
                TransportError::Timeout(_) => ErrorKind::Timeout,
                _ => ErrorKind::Generic,
            },
        }
    }
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

/// The three category stores, grouped.
#[derive(Clone)]
pub struct Repositories {
    pub internships: Arc<dyn InternshipRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub courses: Arc<dyn CourseRepository>,
}

pub struct Pipeline {
    repositories: Repositories,
    completion: Arc<dyn CompletionService>,
    delivery: Arc<MessageDelivery>,
    contexts: Arc<ConversationStore>,
    config: PipelineConfig,
}

/// What has been shown to the user so far in this turn.
struct TurnReply {
    chat_id: i64,
    placeholder: Option<MessageRef>,
    shown: String,
}

/// Collects increments and decides when the placeholder should be refreshed.
struct Accumulator {
    text: String,
    pending: usize,
    last_flush: Instant,
    flush_every: usize,
    flush_interval: Duration,
}

impl Accumulator {
    fn new(flush_every: usize, flush_interval: Duration) -> Self {
        Self {
            text: String::new(),
            pending: 0,
            last_flush: Instant::now(),
            flush_every: flush_every.max(1),
            flush_interval,
        }
    }

    fn push(&mut self, increment: &str) {
        self.text.push_str(increment);
        self.pending += 1;
    }

    fn should_flush(&self) -> bool {
        self.pending >= self.flush_every || self.last_flush.elapsed() >= self.flush_interval
    }

    fn flushed(&mut self) {
        self.pending = 0;
        self.last_flush = Instant::now();
    }
}

impl Pipeline {
    pub fn new(
        repositories: Repositories,
        completion: Arc<dyn CompletionService>,
        delivery: Arc<MessageDelivery>,
        contexts: Arc<ConversationStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            repositories,
            completion,
            delivery,
            contexts,
            config,
        }
    }

    /// Handles one inbound message end to end. Never fails; failures are reported
    /// to the user and logged.
    pub async fn handle(&self, message: InboundMessage) -> Outcome {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "pipeline",
            %request_id,
            user_id = message.user_id,
            chat_id = message.chat_id
        );

        async move {
            let mut reply = TurnReply {
                chat_id: message.chat_id,
                placeholder: None,
                shown: String::new(),
            };
            let outcome = match self.execute(&message, &mut reply).await {
                Ok(outcome) => outcome,
                Err(e) => self.fail(e, &reply).await,
            };
            debug!(stage = %Stage::Done, ?outcome, "Message handled.");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        message: &InboundMessage,
        reply: &mut TurnReply,
    ) -> Result<Outcome, PipelineError> {
        debug!(stage = %Stage::Validating);
        let Some(text) = self.validate(message) else {
            info!(user_id = message.user_id, "Rejected input.");
            self.delivery
                .send(message.chat_id, &replies::rejected_input(self.config.max_input_length))
                .await?;
            return Ok(Outcome::Rejected);
        };

        debug!(stage = %Stage::Extracting);
        let query = extractor::extract(text);
        info!(
            intent = %query.intent,
            fields = ?query.fields,
            locations = ?query.locations,
            confidence = query.confidence,
            "Query extracted."
        );

        match query.intent {
            IntentType::Greeting => {
                self.reply_canned(message, text, replies::GREETING).await?;
                Ok(Outcome::Greeted)
            }
            IntentType::Internship => {
                self.answer_category(message, text, Category::Internship, &query, reply)
                    .await
            }
            IntentType::Job => {
                self.answer_category(message, text, Category::Job, &query, reply)
                    .await
            }
            IntentType::Course => {
                self.answer_category(message, text, Category::Course, &query, reply)
                    .await
            }
            IntentType::Unknown => self.answer_broad(message, text, &query, reply).await,
        }
    }

    /// Returns the trimmed text when it is acceptable input.
    fn validate<'a>(&self, message: &'a InboundMessage) -> Option<&'a str> {
        let text = message.text.as_deref()?.trim();
        if text.is_empty() || text.chars().count() > self.config.max_input_length {
            return None;
        }
        Some(text)
    }

    async fn answer_category(
        &self,
        message: &InboundMessage,
        text: &str,
        category: Category,
        query: &QueryDescriptor,
        reply: &mut TurnReply,
    ) -> Result<Outcome, PipelineError> {
        debug!(stage = %Stage::Searching, category = category.label());
        self.remember_preferences(message.user_id, query);
        let records = self.search(category, query, self.config.search_limit).await?;
        self.contexts
            .set_last_search_intent(message.user_id, query.intent);

        if records.is_empty() {
            debug!(stage = %Stage::EmptyResult, category = category.label());
            self.reply_canned(message, text, &replies::empty_result(category))
                .await?;
            return Ok(Outcome::NoResults);
        }

        let results = SearchResults {
            records,
            requested: self.config.search_limit,
        };
        self.stream_answer(message, text, query, &results, reply)
            .await
    }

    async fn answer_broad(
        &self,
        message: &InboundMessage,
        text: &str,
        query: &QueryDescriptor,
        reply: &mut TurnReply,
    ) -> Result<Outcome, PipelineError> {
        debug!(stage = %Stage::Searching, category = "all");
        let limit = self.config.broad_search_limit;
        let mut records = Vec::new();
        for category in Category::ALL {
            records.extend(self.search(category, query, limit).await?);
        }

        if records.is_empty() {
            self.reply_canned(message, text, replies::UNKNOWN).await?;
            return Ok(Outcome::NotUnderstood);
        }

        let results = SearchResults {
            records,
            requested: limit * Category::ALL.len(),
        };
        self.stream_answer(message, text, query, &results, reply)
            .await
    }

    async fn search(
        &self,
        category: Category,
        query: &QueryDescriptor,
        limit: usize,
    ) -> PortResult<Vec<Record>> {
        let keyword = query.search_keyword();
        let location = query.search_location();

        let records: Vec<Record> = match category {
            Category::Internship => self
                .repositories
                .internships
                .search(&keyword, location, limit)
                .await?
                .into_iter()
                .map(Record::Internship)
                .collect(),
            Category::Job => self
                .repositories
                .jobs
                .search(&keyword, location, limit)
                .await?
                .into_iter()
                .map(Record::Job)
                .collect(),
            Category::Course => self
                .repositories
                .courses
                .search(&keyword, limit)
                .await?
                .into_iter()
                .map(Record::Course)
                .collect(),
        };

        debug!(
            category = category.label(),
            keyword = %keyword,
            location,
            hits = records.len(),
            "Search finished."
        );
        Ok(records)
    }

    fn remember_preferences(&self, user_id: i64, query: &QueryDescriptor) {
        if !query.fields.is_empty() {
            self.contexts
                .set_preference(user_id, "bidang", &query.fields.join(", "));
        }
        if let Some(location) = query.locations.first() {
            self.contexts.set_preference(user_id, "lokasi", location);
        }
    }

    //=====================================================================================
    // Streaming
    //=====================================================================================

    async fn stream_answer(
        &self,
        message: &InboundMessage,
        text: &str,
        query: &QueryDescriptor,
        results: &SearchResults,
        reply: &mut TurnReply,
    ) -> Result<Outcome, PipelineError> {
        debug!(stage = %Stage::Prompting, records = results.records.len());
        let context = self.contexts.snapshot(message.user_id);
        let prompt = prompt::build(text, query.intent, query, results, &context);

        debug!(stage = %Stage::Streaming, prompt_chars = prompt.chars().count());
        let mut increments = self.completion.stream(vec![ChatMessage::user(prompt)]).await?;

        let (tx, mut rx) = mpsc::channel(64);
        let forwarder = tokio::spawn(async move {
            while let Some(item) = increments.next().await {
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        let mut accumulator =
            Accumulator::new(self.config.flush_every_increments, self.config.flush_interval);
        let streamed = self.consume(&mut rx, &mut accumulator, reply).await;
        drop(rx);
        if streamed.is_err() {
            forwarder.abort();
        }
        streamed?;

        debug!(stage = %Stage::Delivering);
        let mut answer = accumulator.text.trim().to_string();
        if answer.is_empty() {
            answer = crate::adapters::completion::NO_CONTENT.to_string();
        }
        self.deliver_final(reply, &answer).await?;

        self.contexts.record_exchange(message.user_id, text, &answer);
        log_interaction(message.user_id, text, &answer, "llm");
        Ok(Outcome::Answered)
    }

    /// Applies increments in arrival order, sending the placeholder on the first
    /// visible one and refreshing it as the accumulator asks.
    async fn consume(
        &self,
        rx: &mut mpsc::Receiver<Result<String, CompletionError>>,
        accumulator: &mut Accumulator,
        reply: &mut TurnReply,
    ) -> Result<(), PipelineError> {
        while let Some(item) = rx.recv().await {
            accumulator.push(&item?);

            match reply.placeholder {
                None if accumulator.text.trim().is_empty() => {}
                None => {
                    let sent = self.delivery.send(reply.chat_id, &accumulator.text).await?;
                    reply.placeholder = Some(sent);
                    reply.shown = accumulator.text.clone();
                    accumulator.flushed();
                }
                Some(placeholder) if accumulator.should_flush() => {
                    if self
                        .delivery
                        .edit(placeholder.chat_id, placeholder.message_id, &accumulator.text)
                        .await
                    {
                        reply.shown = accumulator.text.clone();
                    }
                    accumulator.flushed();
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    async fn deliver_final(&self, reply: &mut TurnReply, answer: &str) -> Result<(), PipelineError> {
        if let Some(placeholder) = reply.placeholder {
            if self
                .delivery
                .edit(placeholder.chat_id, placeholder.message_id, answer)
                .await
            {
                reply.shown = answer.to_string();
                return Ok(());
            }
            info!(
                chat_id = placeholder.chat_id,
                message_id = placeholder.message_id,
                "Final edit failed, sending the answer as a new message."
            );
        }

        let sent = self.delivery.send(reply.chat_id, answer).await?;
        reply.placeholder = Some(sent);
        reply.shown = answer.to_string();
        Ok(())
    }

    //=====================================================================================
    // Canned Replies and Error Handling
    //=====================================================================================

    async fn reply_canned(
        &self,
        message: &InboundMessage,
        text: &str,
        canned: &str,
    ) -> Result<(), PipelineError> {
        debug!(stage = %Stage::Delivering);
        self.delivery.send(message.chat_id, canned).await?;
        self.contexts.record_exchange(message.user_id, text, canned);
        log_interaction(message.user_id, text, canned, "canned");
        Ok(())
    }

    async fn fail(&self, error: PipelineError, reply: &TurnReply) -> Outcome {
        let kind = error.kind();
        error!(stage = %Stage::ErrorHandling, ?kind, error = %error, "Pipeline failed.");

        let notice = kind.user_message();
        let delivered = match reply.placeholder {
            Some(placeholder) => {
                let text =
                    replies::with_partial(&reply.shown, &notice, self.delivery.max_length());
                self.delivery
                    .edit(placeholder.chat_id, placeholder.message_id, &text)
                    .await
            }
            None => false,
        };

        if !delivered {
            if let Err(e) = self.delivery.send(reply.chat_id, &notice).await {
                error!(error = %e, "Could not deliver the error message.");
            }
        }
        Outcome::Failed(kind)
    }
}

fn log_interaction(user_id: i64, input: &str, answer: &str, source: &str) {
    info!(
        user_id,
        input = %preview(input),
        reply = %preview(answer),
        source,
        "Interaction completed."
    );
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
