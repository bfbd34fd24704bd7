//! schema-patch: add missing fields to Prisma models from a manifest

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use digiurban::{logging, schema};

#[derive(Parser, Debug)]
#[command(name = "schema-patch", version)]
#[command(about = "Insert missing model fields into a Prisma schema")]
struct Args {
    /// Prisma schema to patch in place
    #[arg(long, value_name = "PATH", default_value = "prisma/schema.prisma")]
    schema: PathBuf,

    /// JSON manifest of field additions
    #[arg(long, value_name = "PATH", default_value = "prisma/field-additions.json")]
    manifest: PathBuf,

    /// Report what would change without writing the schema
    #[arg(long)]
    dry_run: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn run(args: &Args) -> Result<()> {
    let report = schema::patch_file(&args.schema, &args.manifest, args.dry_run)
        .with_context(|| format!("Failed to patch {}", args.schema.display()))?;

    println!("{}", args.schema.display());
    println!("{}", report);
    if args.dry_run && report.changed() {
        println!("dry run: schema not written");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_cli_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
