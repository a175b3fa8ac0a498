use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use lab47_common::constants::{LAB47_API_URL, SESSION_TOKEN_USER, VCR_AUTH_URL, VCR_SERVER};
use lab47_common::models::repo::RepoSettingsApply;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::args::{CreateRepoArgs, UpdateRepoArgs};
use crate::error::UsageError;
use crate::Labctl;

/// A repository is addressed as `namespace/repo`, with exactly one slash
pub fn validate_repo_name(name: Option<&str>) -> Result<&str, UsageError> {
    let name = name
        .filter(|name| !name.is_empty())
        .ok_or(UsageError::MissingRepoName)?;

    if name.matches('/').count() != 1 {
        return Err(UsageError::InvalidRepoName);
    }

    Ok(name)
}

/// The registry that belongs to the API at `api_url`: `vcr.pub` for the
/// production service, otherwise whatever host serves the API.
pub fn current_server(api_url: &str) -> String {
    if api_url.trim_end_matches('/') == LAB47_API_URL {
        return VCR_SERVER.to_string();
    }

    match url::Url::parse(api_url) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => api_url.to_string(),
        },
        Err(_) => api_url.to_string(),
    }
}

/// Docker `config.json` content granting pull access to vcr.pub with the session token
pub fn docker_config_json(token: &str) -> String {
    let auth = STANDARD.encode(format!("{SESSION_TOKEN_USER}:{token}"));

    json!({
        "auths": {
            VCR_AUTH_URL: {
                "auth": auth,
            }
        }
    })
    .to_string()
}

/// A `kubernetes.io/dockerconfigjson` Secret named `vcr-pub`
pub fn kubernetes_secret(token: &str) -> String {
    let encoded = STANDARD.encode(docker_config_json(token));

    format!(
        "apiVersion: v1
kind: Secret
metadata:
  name: vcr-pub
data:
  .dockerconfigjson: {encoded}
type: kubernetes.io/dockerconfigjson"
    )
}

fn visibility(args: &UpdateRepoArgs) -> Result<RepoSettingsApply, UsageError> {
    let public = match (args.public, args.private) {
        (true, true) => return Err(UsageError::ConflictingVisibility),
        (true, false) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    };

    Ok(RepoSettingsApply { public })
}

impl Labctl {
    pub(crate) async fn create_repo(&self, args: CreateRepoArgs) -> Result<()> {
        let token = self.ctx.token()?;
        let full_name = validate_repo_name(args.name.as_deref())?;
        if let Some(namespace) = args.namespace {
            debug!(%namespace, "ignoring --namespace, the name carries it");
        }

        println!("Creating repository...");

        self.ctx
            .make_api_client()?
            .create_repo(&token, full_name)
            .await
            .context("error creating repository")?;

        println!("Repository created: {full_name}");

        Ok(())
    }

    pub(crate) async fn update_repo(&self, args: UpdateRepoArgs) -> Result<()> {
        let token = self.ctx.token()?;
        let full_name = validate_repo_name(args.name.as_deref())?;
        let settings = visibility(&args)?;

        println!("Updating repository settings...");
        match settings.public {
            Some(true) => println!("=> Setting visibility to public"),
            Some(false) => println!("=> Setting visibility to private"),
            None => {}
        }

        self.ctx
            .make_api_client()?
            .update_repo_settings(&token, full_name, &settings)
            .await
            .context("error updating repository settings")?;

        println!("Updated {full_name}!");

        Ok(())
    }

    pub(crate) async fn docker_login(&self) -> Result<()> {
        let token = self.ctx.token()?;
        let server = current_server(self.ctx.api_url());

        println!("Logging local docker into {server}...");

        // token goes through stdin so it never shows up in the process list
        let mut child = Command::new("docker")
            .args([
                "login",
                "-u",
                SESSION_TOKEN_USER,
                "--password-stdin",
                server.as_str(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("error running docker")?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("docker stdin was not captured"))?;
        stdin
            .write_all(token.as_bytes())
            .await
            .context("error passing the token to docker")?;
        drop(stdin);

        let status = child.wait().await.context("error waiting for docker")?;
        if !status.success() {
            return Err(anyhow!("docker login failed: {status}"));
        }

        Ok(())
    }

    pub(crate) fn print_kubernetes_secret(&self) -> Result<()> {
        let token = self.ctx.token()?;

        println!("{}", kubernetes_secret(&token));

        Ok(())
    }
}
