//! User data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user account.
///
/// Password and policy handling are outside this service; accounts here are
/// plain records used for ownership checks and display.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Opaque account id (`usr_…`)
    pub id: String,
    /// Unique login name
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    /// When the account was created
    pub created_at: String,
}

/// Input for creating a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
}
