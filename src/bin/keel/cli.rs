//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// keel - resolve targets, link graphs and usage requirements of a project
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to Keel.toml (defaults to the current directory)
    #[arg(long, global = true, env = "KEEL_MANIFEST")]
    pub manifest_path: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the targets of the project
    Targets(TargetsArgs),

    /// Show the resolved usage requirements and outputs of a target
    Properties(TargetArgs),

    /// Show the link implementation and link interface of a target
    Link(TargetArgs),

    /// Show the transitive link closure and linker language of a target
    Closure(TargetArgs),

    /// Resolve every target and report problems
    Check(CheckArgs),

    /// Trace generated-file dependencies of a target
    Trace(TraceArgs),

    /// Show the project link graph
    Graph(GraphArgs),
}

#[derive(Args)]
pub struct TargetsArgs {
    /// Include imported targets
    #[arg(long)]
    pub imported: bool,
}

#[derive(Args)]
pub struct TargetArgs {
    /// Target name or alias
    pub target: String,

    /// Configuration to resolve (defaults to the first one)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Compile language for language-dependent expressions
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Args)]
pub struct TraceArgs {
    /// Target name or alias
    pub target: String,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Configuration to resolve (defaults to the first one)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Print Graphviz DOT instead of the build order
    #[arg(long)]
    pub dot: bool,
}
