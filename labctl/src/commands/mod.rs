pub mod account;
pub mod credit;
pub mod generate;
pub mod namespace;
pub mod oidc;
pub mod registry;
pub mod vcr;
pub mod verify;

use crate::error::UsageError;

/// Unwrap an optional flag, treating an empty value as missing
pub(crate) fn required(value: Option<String>, flag: &'static str) -> Result<String, UsageError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or(UsageError::MissingFlag(flag))
}
