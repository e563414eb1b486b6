use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for registration. Missing fields decode as empty strings
/// and are rejected by the service.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Success body for register and login.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// One entry of `GET /users`. Only the name leaves the service.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserName {
    pub name: String,
}
