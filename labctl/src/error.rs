/// Problems with what was asked for, found before any request is sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Please login first")]
    NotLoggedIn,
    #[error("{0} is required")]
    MissingFlag(&'static str),
    #[error("requires repository name as argument")]
    MissingRepoName,
    #[error("name must be in namespace/repo format")]
    InvalidRepoName,
    #[error("Set either -P or -R, not both")]
    ConflictingVisibility,
    #[error("number of US Dollars to add to namespace required")]
    MissingCredit,
}
