pub mod completion;
pub mod db;
pub mod telegram;

pub use completion::SseCompletionAdapter;
pub use db::DbAdapter;
pub use telegram::TelegramTransport;
