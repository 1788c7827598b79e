use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Manage named, isolated project workspaces")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all projects in the registry
    List,

    /// Create a new project
    Create {
        /// Name for the project
        name: String,

        /// Metadata entries as KEY=VALUE pairs
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// Make a project the active one
    Activate {
        /// Name of the project to activate
        name: String,
    },

    /// Clear the active-project selection
    Deactivate,

    /// Copy a project, data directory included
    Copy {
        /// Name of the project to copy
        source: String,

        /// Name for the copy
        dest: String,
    },

    /// Rename a project
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,
    },

    /// Delete a project and its data directory
    Delete {
        /// Name of the project to delete
        name: String,

        /// Refuse to delete unless the data directory is empty
        #[arg(long)]
        require_empty: bool,
    },

    /// Show the active project and registry location
    Status,
}
