use clap::Args;
use opacidb::lens::opacity::OpacityLens;
use opacidb::lens::utils::OutputFormat;
use opacidb::OpacidbConfig;

use super::{open_source, or_exit, print_rows, SourceArgs};

/// Arguments for the Info command
#[derive(Args)]
pub struct InfoArgs {
    #[clap(flatten)]
    pub source: SourceArgs,

    /// Also check every stored curve against the header grid length (database only)
    #[clap(long)]
    pub check: bool,
}

pub fn run(config: &OpacidbConfig, args: InfoArgs, output_format: OutputFormat) {
    let source = or_exit(open_source(config, &args.source));
    let lens = OpacityLens::new(source.as_ref());

    let mut entries = or_exit(lens.info());
    entries.extend(or_exit(lens.molecules()).into_iter().map(|m| {
        opacidb::lens::opacity::InfoEntry::new(
            &format!("{}/{}", m.table, m.molecule),
            format!("{} conditions", m.conditions),
        )
    }));
    print_rows(&entries, output_format);

    if args.check {
        run_check(config, &args.source, output_format);
    }
}

fn run_check(config: &OpacidbConfig, source: &SourceArgs, output_format: OutputFormat) {
    if source.document.is_some() || source.hierarchical {
        eprintln!("ERROR: grid consistency check reads the relational database only");
        std::process::exit(1);
    }

    let path = source.db.clone().unwrap_or_else(|| config.sqlite_path());
    let db = or_exit(opacidb::OpacityDatabase::open_read_only(&path));
    let report = or_exit(db.check_grid_consistency());

    if report.is_consistent() {
        eprintln!(
            "all {} curves match the {}-point wavenumber grid",
            report.checked, report.grid_len
        );
    } else {
        eprintln!(
            "{} of {} curves do not match the {}-point wavenumber grid:",
            report.mismatches.len(),
            report.checked,
            report.grid_len
        );
        let rows: Vec<MismatchRow> = report
            .mismatches
            .into_iter()
            .map(|m| MismatchRow {
                table: m.table.to_string(),
                molecule: m.molecule,
                key: m.key,
                samples: m.len,
            })
            .collect();
        print_rows(&rows, output_format);
        std::process::exit(1);
    }
}

#[derive(serde::Serialize, tabled::Tabled)]
struct MismatchRow {
    table: String,
    molecule: String,
    key: String,
    samples: usize,
}
