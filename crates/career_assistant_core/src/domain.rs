//! crates/career_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database, chat platform or serialization format.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

//=========================================================================================
// Intent and Query Descriptor
//=========================================================================================

/// The coarse category of what the user is asking for.
///
/// Declaration order matters: when two categories score the same number of
/// pattern matches, the one declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentType {
    Internship,
    Job,
    Course,
    Greeting,
    Unknown,
}

impl IntentType {
    /// The Indonesian label used in prompts and user-facing text.
    pub fn label(self) -> &'static str {
        match self {
            IntentType::Internship => "magang",
            IntentType::Job => "pekerjaan",
            IntentType::Course => "kursus",
            IntentType::Greeting => "sapaan",
            IntentType::Unknown => "tidak diketahui",
        }
    }

    /// Maps an intent onto the category store it searches, if any.
    pub fn category(self) -> Option<Category> {
        match self {
            IntentType::Internship => Some(Category::Internship),
            IntentType::Job => Some(Category::Job),
            IntentType::Course => Some(Category::Course),
            IntentType::Greeting | IntentType::Unknown => None,
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The structured form of a free-text user request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub intent: IntentType,
    /// Unique, in first-seen order.
    pub fields: Vec<String>,
    pub locations: Vec<String>,
    pub experience_level: Vec<String>,
    pub work_type: Vec<String>,
    /// Always within `0.0..=1.0`.
    pub confidence: f32,
}

impl QueryDescriptor {
    /// The keyword handed to repository searches: all fields, space separated.
    pub fn search_keyword(&self) -> String {
        self.fields.join(" ")
    }

    /// The location handed to repository searches: the first detected one.
    pub fn search_location(&self) -> &str {
        self.locations.first().map(String::as_str).unwrap_or("")
    }
}

//=========================================================================================
// Records
//=========================================================================================

/// The three independent data categories held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Internship,
    Job,
    Course,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Internship, Category::Job, Category::Course];

    pub fn label(self) -> &'static str {
        match self {
            Category::Internship => "magang",
            Category::Job => "pekerjaan",
            Category::Course => "kursus",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "internship" | "magang" => Ok(Category::Internship),
            "job" | "pekerjaan" => Ok(Category::Job),
            "course" | "kursus" => Ok(Category::Course),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// An internship or job posting. Unique by `(company, position)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub source: String,
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub deadline: Option<String>,
    /// Only populated for job postings.
    pub job_type: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// A course listing. Unique by `(title, duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub source: String,
    pub title: String,
    pub duration: Option<String>,
    pub module_count: Option<String>,
    pub level: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// One search hit, tagged with the category it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Internship(Posting),
    Job(Posting),
    Course(Course),
}

impl Record {
    pub fn category(&self) -> Category {
        match self {
            Record::Internship(_) => Category::Internship,
            Record::Job(_) => Category::Job,
            Record::Course(_) => Category::Course,
        }
    }
}

/// Records returned by the Searching stage, together with how many were asked for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub records: Vec<Record>,
    pub requested: usize,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when fewer records came back than were requested.
    pub fn is_scarce(&self) -> bool {
        self.records.len() < self.requested
    }
}

//=========================================================================================
// Conversation
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used by the completion API.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Name used when rendering history into a prompt.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Everything the bot remembers about one user for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub user_id: i64,
    /// Oldest first.
    pub history: VecDeque<ConversationTurn>,
    pub last_search_intent: Option<IntentType>,
    pub preferences: BTreeMap<String, String>,
}

impl UserContext {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            history: VecDeque::new(),
            last_search_intent: None,
            preferences: BTreeMap::new(),
        }
    }
}

/// A single message sent to the completion API.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

//=========================================================================================
// Chat Transport
//=========================================================================================

/// Identifies one message living in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// A message event delivered by the chat platform.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub user_id: i64,
    pub message_id: i32,
    /// `None` for stickers, photos and other non-text content.
    pub text: Option<String>,
}
