use anyhow::Result;
use clap::Parser;

use atelier::cli::{Cli, Commands};
use atelier::commands::projects;
use atelier::logging::init_logging;

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => projects::list(),
        Commands::Create { name, meta } => projects::create(name, meta),
        Commands::Activate { name } => projects::activate(name),
        Commands::Deactivate => projects::deactivate(),
        Commands::Copy { source, dest } => projects::copy(source, dest),
        Commands::Rename { old, new } => projects::rename(old, new),
        Commands::Delete {
            name,
            require_empty,
        } => projects::delete(name, require_empty),
        Commands::Status => projects::status(),
    }
}
