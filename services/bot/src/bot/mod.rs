pub mod delivery;
pub mod handlers;
pub mod maintenance;
pub mod pipeline;
pub mod replies;
pub mod state;

pub use delivery::MessageDelivery;
pub use handlers::build_handler;
pub use pipeline::{ErrorKind, Outcome, Pipeline, Repositories};
pub use state::AppState;
