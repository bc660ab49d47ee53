use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};

pub mod extract;
pub mod info;

#[derive(clap::Subcommand)]
pub enum XtrCommands {
    /// Extract an XTR container into a directory
    Extract(extract::ExtractArgs),
    /// Describe the layout of an XTR container
    Info(info::InfoArgs),
}

impl XtrCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            XtrCommands::Extract(extract) => extract.handle(),
            XtrCommands::Info(info) => info.handle(),
        }
    }
}

/// Load a whole container into memory
fn read_container(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}
