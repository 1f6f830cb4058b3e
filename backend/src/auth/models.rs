use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The caller, as established by the auth middleware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default)]
    pub role: Option<String>,
}
