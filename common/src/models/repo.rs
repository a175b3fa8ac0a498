use serde::{Deserialize, Serialize};

/// Settings changes for a repository. Unset fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoSettingsApply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
}
