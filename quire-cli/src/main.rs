use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod error;
mod subcommands;

/// Resolve document paths, apply substitutions and number sections
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a system or web path, optionally jailed to a directory
    Resolve(subcommands::resolve::Args),

    /// Apply a substitution set to text
    Subs(subcommands::subs::Args),

    /// Print the numbered section outline of a document
    Outline(subcommands::outline::Args),
}

fn main() -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match &args.command {
        Command::Resolve(args) => subcommands::resolve::run(args),
        Command::Subs(args) => subcommands::subs::run(args),
        Command::Outline(args) => subcommands::outline::run(args),
    }
}
