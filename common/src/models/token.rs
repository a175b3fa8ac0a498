use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalTokenRequest {}

/// An OIDC identity token for the signed-in account
#[derive(Clone, Serialize, Deserialize)]
pub struct PersonalTokenResponse {
    pub jwt: String,
}
