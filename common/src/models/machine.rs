use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineAccountCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Grants push access to the namespace's repositories
    #[serde(default)]
    pub write: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MachineAccountCreateResponse {
    pub token: String,
}
