use clap::{Args, Subcommand};
use opacidb::lens::opacity::{MolecularGetArgs, MolecularNearestArgs, OpacityLens};
use opacidb::lens::utils::OutputFormat;
use opacidb::OpacidbConfig;

use super::{open_source, or_exit, print_rows, SourceArgs};

/// Arguments for the Molecular command
#[derive(Args)]
pub struct MolecularArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(subcommand)]
    pub command: MolecularCommands,
}

#[derive(Subcommand)]
pub enum MolecularCommands {
    /// List molecules with molecular opacities
    Molecules,

    /// List a molecule's (pressure, temperature) grid points
    Grid {
        /// Molecule name, e.g. H2O
        molecule: String,
    },

    /// Fetch the curve stored for a molecule and grid point id
    Get(MolecularGetArgs),

    /// Resolve a (pressure, temperature) request to the nearest grid point
    Nearest(MolecularNearestArgs),
}

pub fn run(config: &OpacidbConfig, args: MolecularArgs, output_format: OutputFormat) {
    let source = or_exit(open_source(config, &args.source));
    let lens = OpacityLens::new(source.as_ref()).with_metric(config.distance_metric);

    match args.command {
        MolecularCommands::Molecules => {
            print_rows(&or_exit(lens.molecular_molecules()), output_format);
        }
        MolecularCommands::Grid { molecule } => {
            print_rows(&or_exit(lens.molecular_grid(&molecule)), output_format);
        }
        MolecularCommands::Get(get_args) => match or_exit(lens.molecular_curve(&get_args)) {
            Some(curve) if get_args.samples => {
                print_rows(&or_exit(lens.curve_samples(&curve)), output_format);
            }
            Some(curve) => print_rows(&[curve], output_format),
            None => {
                eprintln!(
                    "no molecular curve for {} at ptid {}",
                    get_args.molecule, get_args.ptid
                );
            }
        },
        MolecularCommands::Nearest(nearest_args) => match or_exit(lens.nearest(&nearest_args)) {
            Some((entry, curve)) => {
                print_rows(&[entry], output_format);
                if let Some(curve) = curve {
                    print_rows(&[curve], output_format);
                }
            }
            None => {
                eprintln!("no grid points for {}", nearest_args.molecule);
            }
        },
    }
}
