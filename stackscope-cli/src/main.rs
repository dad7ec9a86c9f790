//! Stackscope CLI - Command-line interface for Stackscope
//!
//! Browses the stacks in a local state directory and turns their resources
//! into positioned graphs.

use clap::{Parser, Subcommand};
use colored::Colorize;
use stackscope_graph::{GraphMode, RankDirection};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "stackscope")]
#[command(author = "Stackscope Contributors")]
#[command(version)]
#[command(about = "Explore deployed infrastructure stacks as graphs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// State directory containing .pulumi/stacks (overrides the config)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Stackscope in the current directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List projects and stacks
    Projects,

    /// Lay out a stack and print the graph as JSON
    Graph {
        /// Checkpoint file or project/stack
        stack: String,

        /// structural or dependency
        #[arg(short, long, default_value = "structural")]
        mode: GraphMode,

        /// Collapse a resource (id or name); repeatable
        #[arg(short, long)]
        collapse: Vec<String>,

        /// LR, RL, TB or BT
        #[arg(short, long)]
        direction: Option<RankDirection>,

        /// Write the graph to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show dependencies inferred between resources
    Deps {
        /// Checkpoint file or project/stack
        stack: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show one resource with its parent, children and dependencies
    Inspect {
        /// Checkpoint file or project/stack
        stack: String,

        /// Resource id or name
        resource: String,
    },

    /// Show a stack's exported outputs
    Outputs {
        /// Checkpoint file or project/stack
        stack: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        command => std::env::current_dir()
            .map_err(Into::into)
            .and_then(|root| commands::Context::load(&root, cli.state_dir))
            .and_then(|ctx| run(&ctx, command)),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(ctx: &commands::Context, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Init { path } => commands::init(&path),
        Commands::Projects => commands::projects(ctx),
        Commands::Graph {
            stack,
            mode,
            collapse,
            direction,
            output,
        } => commands::graph(
            ctx,
            &stack,
            commands::GraphOptions {
                mode,
                collapse,
                direction,
                output,
            },
        ),
        Commands::Deps { stack, json } => commands::deps(ctx, &stack, json),
        Commands::Inspect { stack, resource } => commands::inspect(ctx, &stack, &resource),
        Commands::Outputs { stack } => commands::outputs(ctx, &stack),
    }
}
