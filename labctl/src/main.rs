use anyhow::Result;
use clap::Parser;
use labctl::{setup_tracing, Labctl, LabctlArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = LabctlArgs::parse();

    setup_tracing(args.globals.debug);

    Labctl::new(args.globals)?.run(args.cmd).await
}
