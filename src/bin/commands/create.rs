use anyhow::Result;
use clap::Args;
use opacidb::database::{OpacityDatabase, OpacityDocument, OpacityHeader, OpacityUnits};
use opacidb::OpacidbConfig;
use tracing::info;

use super::or_exit;

/// Continuum sources written when `--continuum` is not given
const DEFAULT_CONTINUUM: [&str; 8] = [
    "H2H2", "H2He", "H2N2", "H2H", "H2CH4", "H-bf", "H-ff", "H2-",
];

/// Arguments for the Create command
#[derive(Args)]
pub struct CreateArgs {
    /// Output file, defaults to the configured database (or document with --hierarchical)
    #[clap(short, long)]
    pub output: Option<String>,

    /// Write a hierarchical JSON document instead of a relational database
    #[clap(long, short = 'H')]
    pub hierarchical: bool,

    /// Lowest wavenumber of the grid
    #[clap(long, default_value_t = 200.0)]
    pub wno_min: f64,

    /// Highest wavenumber of the grid
    #[clap(long, default_value_t = 30000.0)]
    pub wno_max: f64,

    /// Number of wavenumber samples per curve
    #[clap(long, default_value_t = 1000)]
    pub wno_points: usize,

    /// Continuum molecules, comma separated
    #[clap(long, value_delimiter = ',')]
    pub continuum: Vec<String>,

    /// Molecules with molecular opacities, comma separated
    #[clap(long, value_delimiter = ',', default_value = "H2O,CH4,CO,CO2,NH3")]
    pub molecules: Vec<String>,

    /// Temperatures, comma separated
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "75,100,200,300,500,750,1000,1500,2000,3000"
    )]
    pub temperatures: Vec<f64>,

    /// Pressures of the molecular grid, comma separated
    #[clap(long, value_delimiter = ',', default_value = "0.000001,0.0001,0.01,1,100")]
    pub pressures: Vec<f64>,

    /// Value every placeholder curve is filled with
    #[clap(long, default_value_t = 1e-30)]
    pub fill: f64,

    /// Unit of the pressure axis
    #[clap(long, default_value = "bar")]
    pub pressure_unit: String,

    /// Unit of the temperature axis
    #[clap(long, default_value = "K")]
    pub temperature_unit: String,
}

impl CreateArgs {
    fn continuum_molecules(&self) -> Vec<String> {
        if self.continuum.is_empty() {
            DEFAULT_CONTINUUM.iter().map(|s| s.to_string()).collect()
        } else {
            self.continuum.clone()
        }
    }

    /// Molecular grid, temperature in the outer loop and pressure in the inner one
    fn pt_grid(&self) -> Vec<(f64, f64)> {
        self.temperatures
            .iter()
            .flat_map(|&t| self.pressures.iter().map(move |&p| (p, t)))
            .collect()
    }

    fn header(&self) -> Result<OpacityHeader> {
        let units = OpacityUnits {
            pressure: self.pressure_unit.clone(),
            temperature: self.temperature_unit.clone(),
            ..Default::default()
        };
        OpacityHeader::linear(self.wno_min, self.wno_max, self.wno_points, units)
    }
}

/// Write placeholder curves to `path`, returning the continuum and molecular
/// curve counts actually stored
fn write_placeholders(
    args: &CreateArgs,
    header: &OpacityHeader,
    path: &str,
    on_curve: impl Fn(&str),
) -> Result<(usize, usize)> {
    let continuum = args.continuum_molecules();
    let grid = args.pt_grid();
    let fill = vec![args.fill; header.grid_len()];
    let continuum_curve = |molecule: &str, _t: f64| -> Result<Vec<f64>> {
        on_curve(molecule);
        Ok(fill.clone())
    };
    let molecular_curve = |molecule: &str, _p: f64, _t: f64| -> Result<Vec<f64>> {
        on_curve(molecule);
        Ok(fill.clone())
    };

    if args.hierarchical {
        let mut doc = OpacityDocument::new(header);
        doc.insert_continuum_grid(&continuum, &args.temperatures, continuum_curve)?;
        doc.insert_molecular_grid(&args.molecules, &grid, molecular_curve)?;
        doc.save(path)?;
        // a repeated temperature overwrites its document key
        Ok((doc.continuum_count(), doc.molecular_count()))
    } else {
        let db = OpacityDatabase::create(path, header)?;
        let continuum_written =
            db.continuum()
                .insert_grid(&continuum, &args.temperatures, continuum_curve)?;
        let molecular_written = db
            .molecular()
            .insert_grid(&args.molecules, &grid, molecular_curve)?;
        Ok((continuum_written, molecular_written))
    }
}

pub fn run(config: &OpacidbConfig, args: CreateArgs) {
    let header = or_exit(args.header());
    let planned = args.continuum_molecules().len() * args.temperatures.len()
        + args.molecules.len() * args.pt_grid().len();

    let path = match &args.output {
        Some(path) => path.clone(),
        None => {
            or_exit(config.ensure_data_dir());
            if args.hierarchical {
                config.document_path()
            } else {
                config.sqlite_path()
            }
        }
    };

    let pb = indicatif::ProgressBar::new(planned as u64);
    if let Ok(sty) = indicatif::ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    ) {
        pb.set_style(sty.progress_chars("##-"));
    }

    let (continuum_written, molecular_written) =
        or_exit(write_placeholders(&args, &header, &path, |molecule| {
            pb.set_message(molecule.to_string());
            pb.inc(1);
        }));

    pb.finish_and_clear();
    info!(
        "placeholder population finished: {} curves",
        continuum_written + molecular_written
    );
    eprintln!(
        "created {} with {} continuum and {} molecular curves on a {}-point grid",
        path,
        continuum_written,
        molecular_written,
        header.grid_len()
    );
}
