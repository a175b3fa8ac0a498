use serde::{Deserialize, Serialize};

/// Body of the account creation call
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub email: String,
    pub namespace: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

// Passwords must never end up in logs
impl std::fmt::Debug for AccountInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountInfo")
            .field("email", &self.email)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Session token handed out by account creation and login
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenResponse {{ token: REDACTED }}")
    }
}
