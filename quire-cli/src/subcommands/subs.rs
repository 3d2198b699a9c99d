use std::path::PathBuf;

use anyhow::Context;
use quire_core::{
    Document, Options, SafeMode,
    substitution::{Html5Converter, Substitutions, Substitutor, lookup_set},
};

use crate::error;

/// Apply a substitution set to text read from a file or stdin
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Input file (reads stdin when omitted)
    pub file: Option<PathBuf>,

    /// Substitution set to apply (pass, basic, header, normal, title, verbatim)
    #[arg(long, default_value = "normal")]
    pub set: String,

    /// Customize the set, e.g. `-macros,+callouts` or `quotes,attributes`
    #[arg(long)]
    pub subs: Option<String>,

    /// Set document attributes (`name=value`, `name`, or `name!` to unset)
    #[arg(short = 'a', long = "attribute")]
    pub attributes: Vec<String>,

    /// Safe mode used for path resolution
    #[arg(long, default_value = "unsafe")]
    pub safe_mode: SafeMode,

    /// Turn every line break into a hard break
    #[arg(long)]
    pub hardbreaks: bool,

    /// Base directory of the document
    #[arg(long)]
    pub base_dir: Option<String>,
}

pub fn run(args: &Args) -> miette::Result<()> {
    let input = super::read_input(args.file.as_deref()).map_err(|e| error::display(e.as_ref()))?;
    let output = substitute(args, &input).map_err(|e| error::display(e.as_ref()))?;
    println!("{output}");
    Ok(())
}

fn options(args: &Args) -> Options {
    let mut builder = Options::builder()
        .with_safe_mode(args.safe_mode)
        .with_attributes(super::build_attributes(&args.attributes));
    if let Some(base_dir) = &args.base_dir {
        builder = builder.with_base_dir(base_dir.clone());
    }
    if args.hardbreaks {
        builder = builder.with_hardbreaks();
    }
    builder.build()
}

#[tracing::instrument(level = "debug", skip(input))]
fn substitute(args: &Args, input: &str) -> anyhow::Result<String> {
    let mut document =
        Document::new(&options(args)).context("failed to set up document")?;
    let substitutions = match &args.subs {
        Some(spec) => Substitutions::resolve(spec, lookup_set(&args.set)),
        None => Substitutions::new(lookup_set(&args.set)),
    };
    tracing::debug!(?substitutions, "applying substitutions");
    let mut substitutor = Substitutor::new(&mut document, &Html5Converter);
    Ok(substitutor.apply(input.trim_end_matches('\n'), substitutions.as_slice()))
}
