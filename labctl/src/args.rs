use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(version, next_help_heading = "Global options")]
pub struct LabctlArgs {
    #[command(flatten)]
    pub globals: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Global options")]
pub struct GlobalArgs {
    /// URL of the lab47 API to target
    #[arg(global = true, long, env = "LAB47_API_BASE")]
    pub api_url: Option<String>,
    /// Directory holding svc.toml (default: ~/.config/lab47)
    #[arg(global = true, long, env = "LAB47_HOME")]
    pub config_dir: Option<PathBuf>,
    /// Turn on tracing output for lab47 libraries. (WARNING: can print sensitive data)
    #[arg(global = true, long, env = "LAB47_DEBUG")]
    pub debug: bool,
    /// What format to print output in
    #[arg(
        global = true,
        long = "output",
        env = "LAB47_OUTPUT_MODE",
        default_value = "normal"
    )]
    pub output_mode: OutputMode,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Normal,
    Json,
}

/// CLI for svc.lab47.dev and the vcr.pub container registry
#[derive(Subcommand)]
pub enum Command {
    /// Create a new account on svc.lab47.dev
    CreateAccount(CreateAccountArgs),
    /// Log into svc.lab47.dev
    Login(LoginArgs),
    /// List available namespaces
    #[command(visible_alias = "ns")]
    Namespaces,
    /// Manage machine accounts
    #[command(subcommand)]
    MachineAccount(MachineAccountCommand),
    /// Manage namespace credits
    #[command(subcommand)]
    Credit(CreditCommand),
    /// Work with the vcr.pub registry
    #[command(subcommand)]
    Vcr(VcrCommand),
    /// Personal OIDC tokens and signing certificates
    #[command(subcommand)]
    Oidc(OidcCommand),
    /// Generate shell completions
    #[command(subcommand)]
    Generate(GenerateCommand),
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Account options")]
pub struct CreateAccountArgs {
    /// Email address for the account
    #[arg(short, long)]
    pub email: Option<String>,
    /// Initial namespace to reserve
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Password for the account (prompted for when missing)
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
#[command(next_help_heading = "Login options")]
pub struct LoginArgs {
    /// Email address for the account
    #[arg(short, long)]
    pub email: Option<String>,
    /// Password for the account (prompted for when missing)
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum MachineAccountCommand {
    /// Create a new machine account
    Create(MachineAccountCreateArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct MachineAccountCreateArgs {
    /// Namespace the account belongs to
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Name for the machine account (default: machine-<uuid>)
    #[arg(long)]
    pub name: Option<String>,
    /// Description of the machine account
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Allow the account to push to the namespace's repositories
    #[arg(long = "enable-write")]
    pub write: bool,
}

#[derive(Subcommand)]
pub enum CreditCommand {
    /// Add credit to a namespace
    Add(CreditAddArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct CreditAddArgs {
    /// Namespace to credit
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// How many US dollars to add in credits
    #[arg(short = 'd', long = "credit", default_value_t = 0)]
    pub dollars: i64,
}

#[derive(Subcommand)]
pub enum VcrCommand {
    /// Create a new repository on vcr.pub
    CreateRepo(CreateRepoArgs),
    /// Update repository settings
    UpdateRepo(UpdateRepoArgs),
    /// Log the local docker instance into vcr.pub
    DockerLogin,
    /// Print a kubernetes secret to access vcr.pub
    KubernetesSecret,
    /// Inspect images in a registry
    #[command(subcommand)]
    Util(VcrUtilCommand),
}

#[derive(Args, Clone, Debug, Default)]
pub struct CreateRepoArgs {
    /// Accepted for compatibility, the namespace is part of the name
    #[arg(short, long)]
    pub namespace: Option<String>,
    /// Repository name in namespace/repo format
    pub name: Option<String>,
}

#[derive(Args, Clone, Debug, Default)]
pub struct UpdateRepoArgs {
    /// Make the repository public
    #[arg(short = 'P', long)]
    pub public: bool,
    /// Make the repository private
    #[arg(short = 'R', long)]
    pub private: bool,
    /// Repository name in namespace/repo format
    pub name: Option<String>,
}

#[derive(Subcommand)]
pub enum VcrUtilCommand {
    /// Print the manifest for a given reference
    ReadManifest(RegistryArgs),
    /// Print the image config for a given reference
    ReadConfig(RegistryArgs),
    /// Verify the cosign signatures of a given reference
    VerifySig(RegistryArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct RegistryArgs {
    /// Username to authenticate with
    #[arg(short)]
    pub username: Option<String>,
    /// Password associated with the username
    #[arg(short)]
    pub password: Option<String>,
    /// Image reference, e.g. vcr.pub/acme/web:latest
    pub reference: String,
}

#[derive(Subcommand)]
pub enum OidcCommand {
    /// Print a personal OIDC token for the logged in account
    PersonalToken {
        /// Validate the token against the issuer's published keys
        #[arg(short = 'V', long)]
        validate: bool,
    },
    /// Request a short lived signing certificate from Fulcio
    FulcioCert,
}

#[derive(Subcommand)]
pub enum GenerateCommand {
    /// Generate shell completions
    Shell {
        /// The shell to generate shell completion for
        shell: Shell,
        /// Output to a file (stdout by default)
        #[arg(short, long)]
        output_file: Option<PathBuf>,
    },
}
