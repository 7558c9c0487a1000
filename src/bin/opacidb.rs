use clap::{Parser, Subcommand};
use opacidb::lens::utils::OutputFormat;
use opacidb::OpacidbConfig;
use tracing::Level;

mod commands;

use commands::continuum::ContinuumArgs;
use commands::create::CreateArgs;
use commands::info::InfoArgs;
use commands::molecular::MolecularArgs;
use commands::species::SpeciesCommandArgs;
use commands::transfer::{ExportArgs, ImportArgs};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.opacidb/opacidb.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(long, short = 'F', global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a database filled with placeholder opacities
    Create(CreateArgs),

    /// Show the header and content summary of an opacity file
    Info(InfoArgs),

    /// Query continuum opacities (keyed by molecule and temperature)
    Continuum(ContinuumArgs),

    /// Query molecular opacities (keyed by molecule and grid point)
    Molecular(MolecularArgs),

    /// Resolve the continuum sources and absorbers an atmosphere needs
    Species(SpeciesCommandArgs),

    /// Write the relational database out as a hierarchical JSON document
    Export(ExportArgs),

    /// Rebuild the relational database from a hierarchical JSON document
    Import(ImportArgs),

    /// Show configuration and opacity file status
    Config(commands::config::ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level INFO or higher.
            .with_max_level(Level::INFO)
            .init();
    }

    let config = match OpacidbConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: unable to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let format = cli.format;
    match cli.command {
        Commands::Create(args) => commands::create::run(&config, args),
        Commands::Info(args) => commands::info::run(&config, args, format),
        Commands::Continuum(args) => commands::continuum::run(&config, args, format),
        Commands::Molecular(args) => commands::molecular::run(&config, args, format),
        Commands::Species(args) => commands::species::run(&config, args, format),
        Commands::Export(args) => commands::transfer::run_export(&config, args),
        Commands::Import(args) => commands::transfer::run_import(&config, args),
        Commands::Config(args) => commands::config::run(&config, args, format),
    }
}
