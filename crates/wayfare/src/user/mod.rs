//! User accounts: the account-lookup capability consumed by the chat core.

pub mod models;
pub mod repository;

pub use models::{CreateUserRequest, User};
pub use repository::UserRepository;
