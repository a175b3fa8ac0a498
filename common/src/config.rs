use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::trace;

use crate::constants::{CONFIG_FILE_NAME, DEFAULT_CONFIG_DIR};

/// Helper trait for dispatching fs ops for different config files
pub trait ConfigManager: Sized {
    fn directory(&self) -> PathBuf;

    fn filename(&self) -> PathBuf;

    fn path(&self) -> PathBuf {
        self.directory().join(self.filename())
    }

    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Read and parse the file. A missing file is an error here; see
    /// [`ConfigManager::open_or_default`] for the lenient variant.
    fn open<C>(&self) -> Result<C>
    where
        C: DeserializeOwned,
    {
        let path = self.path();
        let config_string = fs::read_to_string(&path)
            .with_context(|| anyhow!("Unable to read configuration file: {}", path.display()))?;
        toml::from_str(config_string.as_str())
            .with_context(|| anyhow!("Invalid configuration file: {}", path.display()))
    }

    /// Like [`ConfigManager::open`], but a file that does not exist yet yields `C::default()`
    fn open_or_default<C>(&self) -> Result<C>
    where
        C: DeserializeOwned + Default,
    {
        let path = self.path();
        match fs::read_to_string(&path) {
            Ok(config_string) => toml::from_str(config_string.as_str())
                .with_context(|| anyhow!("Invalid configuration file: {}", path.display())),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "no configuration file, using defaults");
                Ok(C::default())
            }
            Err(error) => Err(error)
                .with_context(|| anyhow!("Unable to read configuration file: {}", path.display())),
        }
    }

    /// Write the file, creating its directory as needed. Both are restricted to
    /// the owner since the file holds a credential.
    fn save<C>(&self, config: &C) -> Result<()>
    where
        C: Serialize,
    {
        let path = self.path();
        let directory = path
            .parent()
            .ok_or_else(|| anyhow!("Configuration path has no parent: {}", path.display()))?;
        create_private_dir(directory)
            .with_context(|| anyhow!("Could not create directory: {}", directory.display()))?;

        let config_str =
            toml::to_string_pretty(config).context("Could not serialize the configuration")?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut config_file = options
            .open(&path)
            .with_context(|| anyhow!("Could not open the configuration file: {}", path.display()))?;

        // mode() only applies to newly created files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            config_file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        config_file
            .write_all(config_str.as_bytes())
            .with_context(|| {
                anyhow!(
                    "Could not write the configuration file: {}",
                    path.display()
                )
            })?;
        trace!(path = %path.display(), "saved configuration");

        Ok(())
    }
}

fn create_private_dir(directory: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(directory)
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = dirs::home_dir().ok_or_else(|| {
        anyhow!("Could not find a home directory. Your operating system may not be supported.")
    })?;

    Ok(home.join(rest))
}

/// Manages `svc.toml`, the file holding the session credential
pub struct SessionConfigManager {
    directory: PathBuf,
}

impl SessionConfigManager {
    /// `home` overrides the default `~/.config/lab47`
    pub fn new(home: Option<PathBuf>) -> Result<Self> {
        let directory = match home {
            Some(home) if !home.as_os_str().is_empty() => home,
            _ => PathBuf::from(DEFAULT_CONFIG_DIR),
        };

        Ok(Self {
            directory: expand_home(&directory)?,
        })
    }
}

impl ConfigManager for SessionConfigManager {
    fn directory(&self) -> PathBuf {
        self.directory.clone()
    }

    fn filename(&self) -> PathBuf {
        PathBuf::from(CONFIG_FILE_NAME)
    }
}

/// Schema of `svc.toml`
#[derive(Deserialize, Serialize, Default, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub account: AccountConfig,
}

/// The session credential: who is logged in and the token the service issued
#[derive(Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct AccountConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
}

impl AccountConfig {
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }
}

// Ensure we can't accidentaly log the token
impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("email", &self.email)
            .field("token", &"REDACTED")
            .finish()
    }
}

/// A handler for configuration files. The type parameter `M` is the [`ConfigManager`] which handles
/// indirection around file location and serde. The type parameter `C` is the configuration content.
///
/// # Usage
/// ```rust,no_run
/// # use lab47_common::config::{Config, SessionConfig, SessionConfigManager};
/// #
/// let mut config = Config::new(SessionConfigManager::new(None).unwrap());
/// config.open_or_default().unwrap();
/// let content: &SessionConfig = config.as_ref().unwrap();
/// ```
pub struct Config<M, C> {
    pub manager: M,
    config: Option<C>,
}

impl<M, C> Config<M, C>
where
    M: ConfigManager,
    C: Serialize + DeserializeOwned,
{
    /// Creates a new [`Config`] instance, without opening the underlying file
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            config: None,
        }
    }

    /// Opens the underlying config file, as handled by the [`ConfigManager`]
    pub fn open(&mut self) -> Result<()> {
        let config = self.manager.open()?;
        self.config = Some(config);
        Ok(())
    }

    /// Opens the underlying config file, falling back to the default content if it is absent
    pub fn open_or_default(&mut self) -> Result<()>
    where
        C: Default,
    {
        let config = self.manager.open_or_default()?;
        self.config = Some(config);
        Ok(())
    }

    /// Saves the current state of the config to the file managed by the [`ConfigManager`]
    pub fn save(&self) -> Result<()> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| anyhow!("Configuration has not been loaded"))?;
        self.manager.save(config)
    }

    /// Check if the file managed by the [`ConfigManager`] exists
    pub fn exists(&self) -> bool {
        self.manager.exists()
    }

    /// Replace the current config state with a new value.
    ///
    /// Does not persist the change to disk. Use [`Config::save`] for that.
    pub fn replace(&mut self, config: C) -> Option<C> {
        self.config.replace(config)
    }

    /// Get a mut ref to the underlying config state. Returns `None` if the config has not been
    /// opened.
    pub fn as_mut(&mut self) -> Option<&mut C> {
        self.config.as_mut()
    }

    /// Get a ref to the underlying config state. Returns `None` if the config has not been
    /// opened.
    pub fn as_ref(&self) -> Option<&C> {
        self.config.as_ref()
    }
}
