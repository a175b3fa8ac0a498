use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{theme::ColorfulTheme, Password};
use lab47_common::models::account::AccountInfo;

use crate::args::{CreateAccountArgs, LoginArgs, OutputMode};
use crate::commands::required;
use crate::Labctl;

impl Labctl {
    pub(crate) async fn create_account(&mut self, args: CreateAccountArgs) -> Result<()> {
        let email = required(args.email, "email (-e)")?;
        let namespace = required(args.namespace, "namespace (-n)")?;
        let password = match args.password.filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => prompt_password()?,
        };

        println!("Creating account...");

        let (token, raw_json) = self
            .ctx
            .make_api_client()?
            .create_account(&AccountInfo {
                email: email.clone(),
                namespace,
                password,
                new_password: None,
            })
            .await
            .context("error creating account")?
            .into_parts();

        tracing::debug!("Saving session configuration");
        self.ctx.save_credential(email, token.token)?;

        match self.ctx.output_mode() {
            OutputMode::Normal => println!("{}", "Account created and logged into!".bold()),
            OutputMode::Json => println!("{raw_json}"),
        }

        Ok(())
    }

    pub(crate) async fn login(&mut self, args: LoginArgs) -> Result<()> {
        let email = required(args.email, "email (-e)")?;
        let password = match args.password.filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => prompt_password()?,
        };

        let token = self
            .ctx
            .make_api_client()?
            .fetch_token(&email, &password)
            .await
            .context("error logging in")?
            .into_inner();

        tracing::debug!("Saving session configuration");
        self.ctx.save_credential(email, token.token)?;

        println!("Logged into {}!", self.ctx.api_host());

        Ok(())
    }
}

fn prompt_password() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter password")
        .validate_with(|input: &String| {
            if input.is_empty() {
                return Err("Empty password was provided");
            }
            Ok(())
        })
        .interact()
        .context("error reading password")
}
