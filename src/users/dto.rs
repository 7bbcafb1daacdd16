use serde::{Deserialize, Serialize};

use super::repo::User;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Admin-side user creation; the password is plaintext until `User::register`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role_id: i64,
}

/// `password: None` keeps the stored hash.
#[derive(Debug, Clone, Deserialize)]
pub struct UserUpdate {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub role_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub role_name: String,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            role_name: u.role.role_name.clone(),
        }
    }
}
