use serde::{Deserialize, Serialize};

use crate::models::UserId;

// -- Session --

/// Key under which the session stores the authenticated user's id.
pub const CURR_USER_KEY: &str = "curr_user";

/// Claims carried by the signed session cookie.
///
/// `curr_user` is absent for anonymous sessions; its serialized name must
/// stay equal to [`CURR_USER_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_user: Option<UserId>,
    pub csrf: String,
    pub exp: usize,
}

// -- Auth forms --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Body of forms that only carry the CSRF token (follow, logout, delete).
#[derive(Debug, Default, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    pub csrf_token: Option<String>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub text: String,
    #[serde(default)]
    pub csrf_token: Option<String>,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct UserSearch {
    #[serde(default)]
    pub q: Option<String>,
}
