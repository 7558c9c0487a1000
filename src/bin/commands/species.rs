use clap::Args;
use opacidb::lens::opacity::{OpacityLens, SpeciesArgs};
use opacidb::lens::utils::OutputFormat;
use opacidb::OpacidbConfig;

use super::{open_source, or_exit, print_rows, SourceArgs};

/// Arguments for the Species command
#[derive(Args)]
pub struct SpeciesCommandArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    #[clap(flatten)]
    pub species: SpeciesArgs,
}

pub fn run(config: &OpacidbConfig, args: SpeciesCommandArgs, output_format: OutputFormat) {
    let source = or_exit(open_source(config, &args.source));
    let lens = OpacityLens::new(source.as_ref());

    let entries = or_exit(lens.species(&args.species));
    print_rows(&entries, output_format);

    let missing = entries.iter().filter(|e| !e.available).count();
    if missing > 0 {
        eprintln!("{} of {} entries have no data in this source", missing, entries.len());
    }
}
