use quire_core::{Error, PathResolver, ResolveOptions};

use crate::error;

/// Resolve a system path (or, with `--web`, a web path)
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Path to resolve
    pub target: String,

    /// Directory the target is relative to
    #[arg(long)]
    pub start: Option<String>,

    /// Absolute directory the resolved path must stay within
    #[arg(long)]
    pub jail: Option<String>,

    /// Fail instead of clamping paths that escape the jail
    #[arg(long, requires = "jail")]
    pub no_recover: bool,

    /// How the target is described in messages
    #[arg(long, default_value = "path")]
    pub target_name: String,

    /// Working directory for relative starts (defaults to the current directory)
    #[arg(long)]
    pub working_dir: Option<String>,

    /// Resolve as a web path: keep URIs and encode spaces
    #[arg(long, conflicts_with_all = ["jail", "no_recover"])]
    pub web: bool,
}

pub fn run(args: &Args) -> miette::Result<()> {
    let resolved = resolve(args).map_err(|e| error::display(&e))?;
    println!("{resolved}");
    Ok(())
}

#[tracing::instrument(level = "debug")]
fn resolve(args: &Args) -> Result<String, Error> {
    let resolver = PathResolver::new(None, args.working_dir.as_deref())?;
    if args.web {
        return Ok(resolver.web_path(&args.target, args.start.as_deref()));
    }
    let options = if args.no_recover {
        ResolveOptions::strict(&args.target_name)
    } else {
        ResolveOptions::recovering(&args.target_name)
    };
    resolver.resolve_system_path(
        Some(&args.target),
        args.start.as_deref(),
        args.jail.as_deref(),
        &options,
    )
}
