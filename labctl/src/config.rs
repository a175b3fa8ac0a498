use anyhow::{Context, Result};
use lab47_api_client::LabApiClient;
use lab47_common::config::{Config, ConfigManager, SessionConfig, SessionConfigManager};
use lab47_common::constants::LAB47_API_URL;
use tracing::trace;

use crate::args::{GlobalArgs, OutputMode};
use crate::error::UsageError;

/// Everything a command needs besides its own arguments: the session
/// credential from `svc.toml` and the resolved global options.
pub struct RequestContext {
    session: Config<SessionConfigManager, SessionConfig>,
    api_url: String,
    output_mode: OutputMode,
}

impl RequestContext {
    /// Load `svc.toml` from the configured home. A missing file is an empty session.
    pub fn load(globals: &GlobalArgs) -> Result<Self> {
        let mut session = Config::new(SessionConfigManager::new(globals.config_dir.clone())?);
        trace!(
            path = %session.manager.path().display(),
            "loading session configuration"
        );
        session
            .open_or_default()
            .context("error loading configuration")?;

        let api_url = match globals.api_url.as_deref() {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => LAB47_API_URL.to_string(),
        };
        trace!(%api_url, "resolved api url");

        Ok(Self {
            session,
            api_url,
            output_mode: globals.output_mode,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Host part of the API URL, for messages
    pub fn api_host(&self) -> String {
        url::Url::parse(&self.api_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_else(|| self.api_url.clone())
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn session(&self) -> Option<&SessionConfig> {
        self.session.as_ref()
    }

    /// The session token, or a usage error when nobody has logged in yet
    pub fn token(&self) -> Result<String, UsageError> {
        self.session()
            .map(|config| &config.account)
            .filter(|account| account.has_token())
            .map(|account| account.token.clone())
            .ok_or(UsageError::NotLoggedIn)
    }

    /// Replace the stored credential and write `svc.toml`
    pub fn save_credential(&mut self, email: String, token: String) -> Result<()> {
        let mut config = self.session.as_ref().cloned().unwrap_or_default();
        config.account.email = email;
        config.account.token = token;
        self.session.replace(config);

        self.session
            .save()
            .context("error saving configuration")
    }

    pub fn make_api_client(&self) -> Result<LabApiClient> {
        LabApiClient::new(self.api_url.clone(), None, None).context("error creating API client")
    }
}
