pub mod context;
pub mod domain;
pub mod extractor;
pub mod ports;
pub mod prompt;

pub use context::ConversationStore;
pub use domain::{
    Category, ChatMessage, ConversationTurn, Course, InboundMessage, IntentType, MessageRef,
    Posting, QueryDescriptor, Record, Role, SearchResults, UserContext,
};
pub use ports::{
    ChatTransport, CompletionError, CompletionService, CourseRepository, IncrementStream,
    InternshipRepository, JobRepository, PortError, PortResult, TransportError,
};
