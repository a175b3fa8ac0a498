use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::args::LabctlArgs;
use crate::Labctl;

/// Completion script for `shell`
pub(crate) fn completions(shell: Shell) -> Vec<u8> {
    let mut app = LabctlArgs::command();
    let mut output = Vec::new();

    generate(shell, &mut app, "labctl", &mut output);

    output
}

impl Labctl {
    pub(crate) fn complete(&self, shell: Shell, output_file: Option<PathBuf>) -> Result<()> {
        let output = completions(shell);

        match output_file {
            Some(path) => fs::File::create(&path)
                .and_then(|mut file| file.write_all(&output))
                .with_context(|| format!("error writing {}", path.display()))?,
            None => io::stdout().write_all(&output)?,
        };

        Ok(())
    }
}
