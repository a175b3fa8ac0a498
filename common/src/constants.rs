//! Shared constants used across lab47 crates

// URLs
pub const LAB47_API_URL: &str = "https://svc.lab47.dev";
/// Registry served by the default API origin
pub const VCR_SERVER: &str = "vcr.pub";
pub const VCR_AUTH_URL: &str = "https://vcr.pub";

pub const OIDC_ISSUER_URL: &str = "https://allow.pub";
pub const FULCIO_URL: &str = "https://fulcio.sigstore.dev";

/// Basic auth username that marks the password as a session token
pub const SESSION_TOKEN_USER: &str = "cytoken";

pub const USER_AGENT: &str = concat!("labctl/", env!("CARGO_PKG_VERSION"));

// Environment
/// Path to a PEM bundle that replaces the TUF-distributed Fulcio roots
pub const ROOT_FILE_ENV: &str = "SIGSTORE_ROOT_FILE";
/// Path to a PEM file with the Rekor public keys used alongside `ROOT_FILE_ENV`
pub const REKOR_KEY_ENV: &str = "SIGSTORE_REKOR_PUBLIC_KEY";

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/lab47";
pub const CONFIG_FILE_NAME: &str = "svc.toml";
