use clap::Parser;
use std::process;
use typegraph::cli::{Cli, Commands};
use typegraph::cli_handlers;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Order {
            root,
            schemas,
            json,
        } => cli_handlers::handle_order(&root, &schemas, json),
        Commands::Graph { root, schemas } => cli_handlers::handle_graph(&root, &schemas),
        Commands::Types { schemas } => cli_handlers::handle_types(&schemas),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
