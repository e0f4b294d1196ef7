//! keel CLI - per-target resolution for native build generators

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("keel=debug")
    } else {
        EnvFilter::new("keel=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut session = Session::open(cli.manifest_path.as_deref(), !cli.no_color)?;
    let json = cli.json;

    let result = match cli.command {
        Commands::Targets(args) => commands::targets::execute(&session, args, json),
        Commands::Properties(args) => commands::properties::execute(&session, args, json),
        Commands::Link(args) => commands::link::execute(&session, args, json),
        Commands::Closure(args) => commands::closure::execute(&session, args, json),
        Commands::Check(args) => commands::check::execute(&session, args, json),
        Commands::Trace(args) => commands::trace::execute(&mut session, args, json),
        Commands::Graph(args) => commands::graph::execute(&session, args, json),
    };
    result?;

    session.finish()
}
