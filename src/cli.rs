use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "typegraph")]
#[command(about = "Dependency-ordered type graphs")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the types a root depends on, leaves first
    Order {
        /// Root type (e.g. "app.models.Node" or "list[app.models.Node]")
        root: String,
        /// Schema files to load, in order
        #[arg(long = "schema", required = true)]
        schemas: Vec<PathBuf>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print every vertex of a root's graph with its predecessors
    Graph {
        /// Root type
        root: String,
        /// Schema files to load, in order
        #[arg(long = "schema", required = true)]
        schemas: Vec<PathBuf>,
    },

    /// List the named types defined by the schema files
    Types {
        /// Schema files to load, in order
        #[arg(long = "schema", required = true)]
        schemas: Vec<PathBuf>,
    },
}
