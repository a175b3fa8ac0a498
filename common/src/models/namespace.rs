use std::fmt::{Display, Formatter};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The service encodes an empty list as `null`
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListNamespaces {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub namespaces: Vec<NamespaceDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDetails {
    pub name: String,
    /// Balance in USD, kept as the decimal string the service sends
    pub credit: String,
    #[serde(default, rename = "repositories", deserialize_with = "null_as_empty")]
    pub repos: Vec<RepoDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoDetails {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, rename = "num_tags")]
    pub total_tags: u64,
}

impl Display for NamespaceDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[namespace]")?;
        writeln!(f, "   name: {}", self.name)?;
        writeln!(f, "credits: ${}", self.credit)?;
        write!(f, "  repos:")?;
        for repo in &self.repos {
            write!(f, "\n{repo}")?;
        }

        Ok(())
    }
}

impl Display for RepoDetails {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  - name: {}", self.name)?;
        writeln!(
            f,
            "    created_at: {}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )?;
        write!(f, "    tags: {}", self.total_tags)
    }
}
