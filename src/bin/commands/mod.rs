pub mod config;
pub mod continuum;
pub mod create;
pub mod info;
pub mod molecular;
pub mod species;
pub mod transfer;

use anyhow::Result;
use clap::Args;
use opacidb::database::{OpacityDatabase, OpacityDocument, OpacitySource};
use opacidb::lens::utils::{format_rows, OutputFormat};
use opacidb::OpacidbConfig;
use serde::Serialize;
use tabled::Tabled;

/// Which opacity file a query command reads
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Relational database file, defaults to the configured one
    #[clap(long, global = true)]
    pub db: Option<String>,

    /// Hierarchical JSON document to read instead of the database
    #[clap(long, global = true, conflicts_with = "db")]
    pub document: Option<String>,

    /// Read the configured hierarchical document instead of the database
    #[clap(long, short = 'H', global = true)]
    pub hierarchical: bool,
}

/// Open the opacity file selected by `args` for reading
pub(crate) fn open_source(
    config: &OpacidbConfig,
    args: &SourceArgs,
) -> Result<Box<dyn OpacitySource>> {
    if let Some(path) = &args.document {
        return Ok(Box::new(OpacityDocument::load(path)?));
    }
    if args.hierarchical {
        return Ok(Box::new(OpacityDocument::load(config.document_path())?));
    }

    let path = args.db.clone().unwrap_or_else(|| config.sqlite_path());
    Ok(Box::new(OpacityDatabase::open_read_only(&path)?))
}

/// Print rows in the requested format, exiting on failure
pub(crate) fn print_rows<T: Tabled + Serialize>(rows: &[T], format: OutputFormat) {
    match format_rows(rows, format) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

/// Unwrap a command result or report the error and exit
pub(crate) fn or_exit<T>(result: Result<T>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}
