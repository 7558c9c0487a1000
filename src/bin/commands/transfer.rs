use clap::Args;
use opacidb::database::{OpacityDatabase, OpacityDocument};
use opacidb::OpacidbConfig;

use super::or_exit;

/// Arguments for the Export command
#[derive(Args)]
pub struct ExportArgs {
    /// Relational database to read, defaults to the configured one
    #[clap(long)]
    pub db: Option<String>,

    /// Document to write, defaults to the configured one
    #[clap(short, long)]
    pub output: Option<String>,
}

/// Arguments for the Import command
#[derive(Args)]
pub struct ImportArgs {
    /// Document to read, defaults to the configured one
    #[clap(long)]
    pub document: Option<String>,

    /// Database to (re)create, defaults to the configured one
    #[clap(short, long)]
    pub output: Option<String>,
}

pub fn run_export(config: &OpacidbConfig, args: ExportArgs) {
    let db_path = args.db.unwrap_or_else(|| config.sqlite_path());
    let doc_path = args.output.unwrap_or_else(|| config.document_path());

    let db = or_exit(OpacityDatabase::open_read_only(&db_path));
    let doc = or_exit(OpacityDocument::from_source(&db));
    or_exit(doc.save(&doc_path));

    eprintln!(
        "exported {} continuum and {} molecular curves from {} to {}",
        doc.continuum_count(),
        doc.molecular_count(),
        db_path,
        doc_path
    );
}

pub fn run_import(config: &OpacidbConfig, args: ImportArgs) {
    let doc_path = args.document.unwrap_or_else(|| config.document_path());
    let db_path = match args.output {
        Some(path) => path,
        None => {
            or_exit(config.ensure_data_dir());
            config.sqlite_path()
        }
    };

    let doc = or_exit(OpacityDocument::load(&doc_path));
    let db = or_exit(doc.write_to_database(&db_path));
    let summary = or_exit(db.summary());

    eprintln!(
        "imported {} continuum and {} molecular curves from {} into {}",
        summary.continuum_count, summary.molecular_count, doc_path, db_path
    );
}
