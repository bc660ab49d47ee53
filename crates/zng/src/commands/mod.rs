pub mod xtr;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle XTR containers
    Xtr {
        #[command(subcommand)]
        command: xtr::XtrCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Xtr { command } => command.handle(),
        }
    }
}
