use serde::{Deserialize, Serialize};

use crate::users::repo_types::{NewUser, User};

/// Request body for batch registration.
#[derive(Debug, Deserialize)]
pub struct CreateUsersRequest {
    pub users: Vec<NewUser>,
}

/// Request body for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// A user record paired with a freshly issued token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}
