//! HTTP API: routes, handlers, state, and the streaming notifier.

pub mod error;
pub mod events;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

pub use routes::create_router;
pub use session::{CurrentUser, SessionRegistry};
pub use state::AppState;
