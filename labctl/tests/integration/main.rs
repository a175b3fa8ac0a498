mod account;
mod credit;
mod vcr;

use std::fs;
use std::path::Path;

use labctl::{Command, GlobalArgs, Labctl};

/// Runs a `labctl` command against `api_url` with its configuration under `home`.
async fn labctl_command(
    cmd: Command,
    home: &Path,
    api_url: &str,
) -> anyhow::Result<()> {
    Labctl::new(GlobalArgs {
        api_url: Some(api_url.to_string()),
        config_dir: Some(home.to_path_buf()),
        ..Default::default()
    })?
    .run(cmd)
    .await
}

/// Leaves a logged in session with token `tok-1` in `home`
fn write_session(home: &Path) {
    fs::write(
        home.join("svc.toml"),
        "[account]\nemail = \"dev@example.com\"\ntoken = \"tok-1\"\n",
    )
    .unwrap();
}

/// `Basic base64("cytoken:tok-1")`
const SESSION_AUTH: &str = "Basic Y3l0b2tlbjp0b2stMQ==";
