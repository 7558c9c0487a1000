use clap::{Args, Subcommand};
use opacidb::lens::opacity::{ContinuumGetArgs, OpacityLens};
use opacidb::lens::utils::OutputFormat;
use opacidb::OpacidbConfig;

use super::{open_source, or_exit, print_rows, SourceArgs};

/// Arguments for the Continuum command
#[derive(Args)]
pub struct ContinuumArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(subcommand)]
    pub command: ContinuumCommands,
}

#[derive(Subcommand)]
pub enum ContinuumCommands {
    /// List continuum molecules
    Molecules,

    /// List tabulated temperatures
    Temperatures {
        /// Only list this molecule's temperatures
        molecule: Option<String>,
    },

    /// Fetch the curve stored for a molecule and temperature
    Get(ContinuumGetArgs),
}

pub fn run(config: &OpacidbConfig, args: ContinuumArgs, output_format: OutputFormat) {
    let source = or_exit(open_source(config, &args.source));
    let lens = OpacityLens::new(source.as_ref());

    match args.command {
        ContinuumCommands::Molecules => {
            print_rows(&or_exit(lens.continuum_molecules()), output_format);
        }
        ContinuumCommands::Temperatures { molecule } => {
            let rows = or_exit(lens.continuum_temperatures(molecule.as_deref()));
            print_rows(&rows, output_format);
        }
        ContinuumCommands::Get(get_args) => match or_exit(lens.continuum_curve(&get_args)) {
            Some(curve) if get_args.samples => {
                print_rows(&or_exit(lens.curve_samples(&curve)), output_format);
            }
            Some(curve) => print_rows(&[curve], output_format),
            None => {
                eprintln!(
                    "no continuum curve for {} at T={}",
                    get_args.molecule, get_args.temperature
                );
            }
        },
    }
}
