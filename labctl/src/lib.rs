pub mod args;
mod commands;
pub mod config;
pub mod error;
pub mod roots;

use anyhow::Result;
use tracing::trace;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

pub use crate::args::{Command, GlobalArgs, LabctlArgs, OutputMode};
use crate::args::{
    CreditCommand, GenerateCommand, MachineAccountCommand, OidcCommand, VcrCommand,
    VcrUtilCommand,
};
pub use crate::commands::credit::{wait_for_payment_callback, PaymentCallback, PaymentOutcome};
pub use crate::commands::oidc::{request_signing_cert, validate_token, SigningCert};
pub use crate::commands::vcr::{
    current_server, docker_config_json, kubernetes_secret, validate_repo_name,
};
use crate::config::RequestContext;

pub struct Labctl {
    ctx: RequestContext,
}

impl Labctl {
    pub fn new(globals: GlobalArgs) -> Result<Self> {
        let ctx = RequestContext::load(&globals)?;

        Ok(Self { ctx })
    }

    pub async fn run(mut self, cmd: Command) -> Result<()> {
        trace!("running labctl command");

        match cmd {
            Command::CreateAccount(args) => self.create_account(args).await,
            Command::Login(args) => self.login(args).await,
            Command::Namespaces => self.namespaces().await,
            Command::MachineAccount(MachineAccountCommand::Create(args)) => {
                self.machine_account_create(args).await
            }
            Command::Credit(CreditCommand::Add(args)) => self.credit_add(args).await,
            Command::Vcr(cmd) => match cmd {
                VcrCommand::CreateRepo(args) => self.create_repo(args).await,
                VcrCommand::UpdateRepo(args) => self.update_repo(args).await,
                VcrCommand::DockerLogin => self.docker_login().await,
                VcrCommand::KubernetesSecret => self.print_kubernetes_secret(),
                VcrCommand::Util(VcrUtilCommand::ReadManifest(args)) => {
                    self.read_manifest(args).await
                }
                VcrCommand::Util(VcrUtilCommand::ReadConfig(args)) => self.read_config(args).await,
                VcrCommand::Util(VcrUtilCommand::VerifySig(args)) => self.verify_sig(args).await,
            },
            Command::Oidc(OidcCommand::PersonalToken { validate }) => {
                self.personal_token(validate).await
            }
            Command::Oidc(OidcCommand::FulcioCert) => self.fulcio_cert().await,
            Command::Generate(GenerateCommand::Shell { shell, output_file }) => {
                self.complete(shell, output_file)
            }
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `debug` when set.
pub fn setup_tracing(debug: bool) {
    registry()
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .with(
            // let the user set RUST_LOG if they want to
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if debug {
                    EnvFilter::new("info,labctl=trace,lab47_api_client=trace,lab47_common=trace")
                } else {
                    EnvFilter::new("warn")
                }
            }),
        )
        .init();
}
