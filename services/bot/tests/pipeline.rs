//! End-to-end runs of the pipeline against in-memory collaborators.

use async_trait::async_trait;
use bot_lib::bot::delivery::TRUNCATION_NOTICE;
use bot_lib::bot::replies;
use bot_lib::bot::{ErrorKind, MessageDelivery, Outcome, Pipeline, Repositories};
use bot_lib::config::{DeliveryConfig, PipelineConfig};
use career_assistant_core::context::ConversationStore;
use career_assistant_core::domain::{ChatMessage, Course, InboundMessage, IntentType, Posting};
use career_assistant_core::ports::{
    ChatTransport, CompletionError, CompletionService, CourseRepository, IncrementStream,
    InternshipRepository, JobRepository, PortError, PortResult, TransportError,
};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

//=========================================================================================
// Stubs
//=========================================================================================

#[derive(Default)]
struct StubPostings {
    postings: Vec<Posting>,
    fail: bool,
    queries: Mutex<Vec<(String, String)>>,
}

impl StubPostings {
    fn with(postings: Vec<Posting>) -> Self {
        Self {
            postings,
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn lookup(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>> {
        if self.fail {
            return Err(PortError::Unexpected("database is locked".to_string()));
        }
        self.queries
            .lock()
            .unwrap()
            .push((keyword.to_string(), location.to_string()));
        Ok(self.postings.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl InternshipRepository for StubPostings {
    async fn search(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>> {
        self.lookup(keyword, location, limit)
    }

    async fn save(&self, _postings: &[Posting]) -> PortResult<u64> {
        Ok(0)
    }
}

#[async_trait]
impl JobRepository for StubPostings {
    async fn search(&self, keyword: &str, location: &str, limit: usize) -> PortResult<Vec<Posting>> {
        self.lookup(keyword, location, limit)
    }

    async fn save(&self, _postings: &[Posting]) -> PortResult<u64> {
        Ok(0)
    }
}

#[derive(Default)]
struct StubCourses {
    courses: Vec<Course>,
}

#[async_trait]
impl CourseRepository for StubCourses {
    async fn search(&self, _keyword: &str, limit: usize) -> PortResult<Vec<Course>> {
        Ok(self.courses.iter().take(limit).cloned().collect())
    }

    async fn save(&self, _courses: &[Course]) -> PortResult<u64> {
        Ok(0)
    }
}

#[derive(Default)]
struct ScriptedCompletion {
    items: Vec<Result<String, CompletionError>>,
    refuse: Option<CompletionError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    fn increments(parts: &[&str]) -> Self {
        Self {
            items: parts.iter().map(|p| Ok(p.to_string())).collect(),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn stream(&self, messages: Vec<ChatMessage>) -> Result<IncrementStream, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .extend(messages.into_iter().map(|m| m.content));
        if let Some(e) = &self.refuse {
            return Err(e.clone());
        }
        Ok(Box::pin(futures::stream::iter(self.items.clone())))
    }
}

#[derive(Default)]
struct RecordingTransport {
    sends: Mutex<Vec<String>>,
    edits: Mutex<Vec<(i32, String)>>,
    reject_edits: bool,
}

impl RecordingTransport {
    fn sends(&self) -> Vec<String> {
        self.sends.lock().unwrap().clone()
    }

    fn edits(&self) -> Vec<(i32, String)> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, _chat_id: i64, text: &str) -> Result<i32, TransportError> {
        let mut sends = self.sends.lock().unwrap();
        sends.push(text.to_string());
        Ok(100 + sends.len() as i32)
    }

    async fn edit_message(&self, _chat_id: i64, message_id: i32, text: &str) -> Result<(), TransportError> {
        if self.reject_edits {
            return Err(TransportError::NotFound);
        }
        self.edits
            .lock()
            .unwrap()
            .push((message_id, text.to_string()));
        Ok(())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

struct Harness {
    pipeline: Pipeline,
    transport: Arc<RecordingTransport>,
    completion: Arc<ScriptedCompletion>,
    internships: Arc<StubPostings>,
    contexts: Arc<ConversationStore>,
}

fn harness(
    internships: StubPostings,
    courses: StubCourses,
    completion: ScriptedCompletion,
    transport: RecordingTransport,
) -> Harness {
    let transport = Arc::new(transport);
    let completion = Arc::new(completion);
    let internships = Arc::new(internships);
    let contexts = Arc::new(ConversationStore::default());
    let delivery = Arc::new(MessageDelivery::new(
        transport.clone(),
        DeliveryConfig::default(),
    ));

    let pipeline = Pipeline::new(
        Repositories {
            internships: internships.clone(),
            jobs: Arc::new(StubPostings::default()),
            courses: Arc::new(courses),
        },
        completion.clone(),
        delivery,
        contexts.clone(),
        PipelineConfig::default(),
    );

    Harness {
        pipeline,
        transport,
        completion,
        internships,
        contexts,
    }
}

fn message(text: Option<&str>) -> InboundMessage {
    InboundMessage {
        chat_id: 10,
        user_id: 77,
        message_id: 1,
        text: text.map(str::to_string),
    }
}

fn internship() -> Posting {
    Posting {
        source: "Glints".to_string(),
        company: "Tokopedia".to_string(),
        position: "Software Engineer Intern".to_string(),
        location: Some("Jakarta".to_string()),
        salary: None,
        deadline: Some("30 Juni".to_string()),
        job_type: None,
        scraped_at: Utc::now(),
    }
}

fn course() -> Course {
    Course {
        source: "Dicoding".to_string(),
        title: "Belajar Desain Grafis".to_string(),
        duration: Some("20 Jam".to_string()),
        module_count: Some("6".to_string()),
        level: None,
        scraped_at: Utc::now(),
    }
}

//=========================================================================================
// Scenarios
//=========================================================================================

#[tokio::test(start_paused = true)]
async fn empty_definite_search_sends_suggestions_without_calling_the_model() {
    let h = harness(
        StubPostings::default(),
        StubCourses::default(),
        ScriptedCompletion::increments(&["tidak dipakai"]),
        RecordingTransport::default(),
    );

    let outcome = h.pipeline.handle(message(Some("kursus blockchain"))).await;

    assert_eq!(outcome, Outcome::NoResults);
    assert_eq!(h.completion.calls(), 0);
    let sends = h.transport.sends();
    assert_eq!(sends.len(), 1);
    assert!(sends[0].contains("pencarian kursus"));
    assert_eq!(
        h.contexts.snapshot(77).last_search_intent,
        Some(IntentType::Course)
    );
}

#[tokio::test(start_paused = true)]
async fn streamed_increments_converge_into_one_message() {
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses::default(),
        ScriptedCompletion::increments(&["Hal", "o ", "dunia"]),
        RecordingTransport::default(),
    );

    let outcome = h
        .pipeline
        .handle(message(Some("Cari magang di bidang IT Jakarta")))
        .await;

    assert_eq!(outcome, Outcome::Answered);
    assert_eq!(h.transport.sends(), vec!["Hal".to_string()]);
    let edits = h.transport.edits();
    assert!(!edits.is_empty() && edits.len() <= 3);
    assert_eq!(edits.last().unwrap(), &(101, "Halo dunia".to_string()));

    assert_eq!(
        h.internships.queries.lock().unwrap().clone(),
        vec![("IT".to_string(), "Jakarta".to_string())]
    );
    let prompt = h.completion.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Software Engineer Intern"));
    assert!(prompt.contains("PERMINTAAN USER: \"Cari magang di bidang IT Jakarta\""));

    let context = h.contexts.snapshot(77);
    assert_eq!(context.history.len(), 2);
    assert_eq!(context.history[1].content, "Halo dunia");
    assert_eq!(context.preferences.get("bidang").map(String::as_str), Some("IT"));
    assert_eq!(context.preferences.get("lokasi").map(String::as_str), Some("Jakarta"));
}

#[tokio::test(start_paused = true)]
async fn timeouts_produce_one_friendly_message() {
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses::default(),
        ScriptedCompletion {
            refuse: Some(CompletionError::Timeout(
                "operation timed out after 30s (req-8f2c)".to_string(),
            )),
            ..Default::default()
        },
        RecordingTransport::default(),
    );

    let outcome = h.pipeline.handle(message(Some("cari magang IT"))).await;

    assert_eq!(outcome, Outcome::Failed(ErrorKind::Timeout));
    let sends = h.transport.sends();
    assert_eq!(sends, vec![ErrorKind::Timeout.user_message()]);
    assert!(!sends[0].contains("req-8f2c"));
    assert!(h.transport.edits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failure_mid_stream_keeps_the_partial_answer() {
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses::default(),
        ScriptedCompletion {
            items: vec![
                Ok("Ini beberapa magang".to_string()),
                Err(CompletionError::Network("connection reset".to_string())),
            ],
            ..Default::default()
        },
        RecordingTransport::default(),
    );

    let outcome = h.pipeline.handle(message(Some("cari magang"))).await;

    assert_eq!(outcome, Outcome::Failed(ErrorKind::Network));
    assert_eq!(h.transport.sends(), vec!["Ini beberapa magang".to_string()]);
    let edits = h.transport.edits();
    assert_eq!(edits.len(), 1);
    assert!(edits[0].1.starts_with("Ini beberapa magang\n\n"));
    assert!(edits[0].1.ends_with(&ErrorKind::Network.user_message()));
    assert!(!edits[0].1.contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn failure_after_an_oversized_answer_still_shows_the_error() {
    let long_answer = "kata ".repeat(900);
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses::default(),
        ScriptedCompletion {
            items: vec![
                Ok(long_answer),
                Err(CompletionError::Timeout("deadline exceeded".to_string())),
            ],
            ..Default::default()
        },
        RecordingTransport::default(),
    );

    let outcome = h.pipeline.handle(message(Some("cari magang"))).await;

    assert_eq!(outcome, Outcome::Failed(ErrorKind::Timeout));
    assert_eq!(h.transport.sends().len(), 1);
    let edits = h.transport.edits();
    assert_eq!(edits.len(), 1);
    let (message_id, text) = &edits[0];
    assert_eq!(*message_id, 101);
    assert!(text.chars().count() <= DeliveryConfig::default().max_length);
    assert!(text.starts_with("kata kata"));
    assert!(text.contains(TRUNCATION_NOTICE));
    assert!(text.ends_with(&ErrorKind::Timeout.user_message()));
}

#[tokio::test(start_paused = true)]
async fn lost_placeholder_falls_back_to_a_new_message() {
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses::default(),
        ScriptedCompletion::increments(&["Halo", " semua"]),
        RecordingTransport {
            reject_edits: true,
            ..Default::default()
        },
    );

    let outcome = h.pipeline.handle(message(Some("cari magang"))).await;

    assert_eq!(outcome, Outcome::Answered);
    assert_eq!(
        h.transport.sends(),
        vec!["Halo".to_string(), "Halo semua".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_input_is_rejected_before_any_work() {
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses::default(),
        ScriptedCompletion::increments(&["x"]),
        RecordingTransport::default(),
    );
    let too_long = "magang ".repeat(200);

    for text in [None, Some("   "), Some(too_long.as_str())] {
        assert_eq!(h.pipeline.handle(message(text)).await, Outcome::Rejected);
    }

    assert_eq!(h.completion.calls(), 0);
    assert!(h.internships.queries.lock().unwrap().is_empty());
    assert_eq!(
        h.transport.sends(),
        vec![replies::rejected_input(1000); 3]
    );
    assert!(h.contexts.snapshot(77).history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn greetings_get_the_canned_introduction() {
    let h = harness(
        StubPostings::default(),
        StubCourses::default(),
        ScriptedCompletion::default(),
        RecordingTransport::default(),
    );

    assert_eq!(h.pipeline.handle(message(Some("Halo!"))).await, Outcome::Greeted);
    assert_eq!(h.transport.sends(), vec![replies::GREETING.to_string()]);
    assert_eq!(h.completion.calls(), 0);
    assert_eq!(h.contexts.snapshot(77).history.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unclear_requests_search_every_category() {
    let h = harness(
        StubPostings::with(vec![internship()]),
        StubCourses {
            courses: vec![course()],
        },
        ScriptedCompletion::increments(&["Maksudnya yang mana?"]),
        RecordingTransport::default(),
    );

    let outcome = h
        .pipeline
        .handle(message(Some("desain grafis di bandung")))
        .await;

    assert_eq!(outcome, Outcome::Answered);
    let prompt = h.completion.prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("PERMINTAAN AMBIGU"));
    assert!(prompt.contains("Software Engineer Intern"));
    assert!(prompt.contains("Belajar Desain Grafis"));
    assert_eq!(
        h.internships.queries.lock().unwrap().clone(),
        vec![("Design".to_string(), "Bandung".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn unclear_requests_without_matches_get_the_usage_text() {
    let h = harness(
        StubPostings::default(),
        StubCourses::default(),
        ScriptedCompletion::default(),
        RecordingTransport::default(),
    );

    let outcome = h.pipeline.handle(message(Some("zzz qqq"))).await;

    assert_eq!(outcome, Outcome::NotUnderstood);
    assert_eq!(h.transport.sends(), vec![replies::UNKNOWN.to_string()]);
    assert_eq!(h.completion.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn repository_failures_become_a_generic_error() {
    let h = harness(
        StubPostings::failing(),
        StubCourses::default(),
        ScriptedCompletion::default(),
        RecordingTransport::default(),
    );

    let outcome = h.pipeline.handle(message(Some("cari magang IT"))).await;

    assert_eq!(outcome, Outcome::Failed(ErrorKind::Generic));
    let sends = h.transport.sends();
    assert_eq!(sends, vec![ErrorKind::Generic.user_message()]);
    assert!(!sends[0].contains("locked"));
}
