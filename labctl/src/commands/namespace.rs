use anyhow::{Context, Result};
use lab47_common::models::machine::MachineAccountCreateRequest;
use uuid::Uuid;

use crate::args::{MachineAccountCreateArgs, OutputMode};
use crate::commands::required;
use crate::Labctl;

impl Labctl {
    pub(crate) async fn namespaces(&self) -> Result<()> {
        let token = self.ctx.token()?;

        let (list, raw_json) = self
            .ctx
            .make_api_client()?
            .list_namespaces(&token)
            .await
            .context("error listing namespaces")?
            .into_parts();

        match self.ctx.output_mode() {
            OutputMode::Normal => {
                for namespace in list.namespaces {
                    println!("{namespace}");
                }
            }
            OutputMode::Json => println!("{raw_json}"),
        }

        Ok(())
    }

    pub(crate) async fn machine_account_create(
        &self,
        args: MachineAccountCreateArgs,
    ) -> Result<()> {
        let namespace = required(args.namespace, "namespace (-n)")?;
        let token = self.ctx.token()?;

        let name = args
            .name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(default_machine_name);

        if self.ctx.output_mode() == OutputMode::Normal {
            println!("Creating machine account '{name}'...");
        }

        let (account, raw_json) = self
            .ctx
            .make_api_client()?
            .create_machine_account(
                &token,
                &namespace,
                &MachineAccountCreateRequest {
                    name,
                    description: args.description,
                    write: args.write,
                },
            )
            .await
            .context("error creating machine account")?
            .into_parts();

        match self.ctx.output_mode() {
            OutputMode::Normal => {
                println!("Machine account created!");
                println!("Token for account: {}", account.token);
            }
            OutputMode::Json => println!("{raw_json}"),
        }

        Ok(())
    }
}

fn default_machine_name() -> String {
    format!("machine-{}", Uuid::new_v4())
}
