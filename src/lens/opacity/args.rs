//! Opacity lens arguments
//!
//! These arguments are shared by the CLI (with clap derives when the `cli`
//! feature is enabled) and library callers (via serde).

use serde::{Deserialize, Serialize};

use crate::database::DistanceMetric;

/// Arguments for an exact continuum fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct ContinuumGetArgs {
    /// Continuum molecule name, e.g. H2H2 or H-bf
    pub molecule: String,

    /// Temperature of the stored curve
    pub temperature: f64,

    /// Print every wavenumber sample instead of a summary row
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub samples: bool,
}

impl ContinuumGetArgs {
    pub fn new(molecule: &str, temperature: f64) -> Self {
        Self {
            molecule: molecule.to_string(),
            temperature,
            samples: false,
        }
    }
}

/// Arguments for an exact molecular fetch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct MolecularGetArgs {
    /// Molecule name, e.g. H2O
    pub molecule: String,

    /// Grid point id of the stored curve
    pub ptid: u32,

    /// Print every wavenumber sample instead of a summary row
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub samples: bool,
}

impl MolecularGetArgs {
    pub fn new(molecule: &str, ptid: u32) -> Self {
        Self {
            molecule: molecule.to_string(),
            ptid,
            samples: false,
        }
    }
}

/// Arguments for resolving a (pressure, temperature) request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct MolecularNearestArgs {
    /// Molecule name, e.g. H2O
    pub molecule: String,

    /// Requested pressure
    pub pressure: f64,

    /// Requested temperature
    pub temperature: f64,

    /// Distance metric (raw or normalized); defaults to the configured one
    #[cfg_attr(feature = "cli", clap(long, short))]
    #[serde(default)]
    pub metric: Option<DistanceMetric>,

    /// Also fetch the curve stored at the resolved grid point
    #[cfg_attr(feature = "cli", clap(long))]
    #[serde(default)]
    pub fetch: bool,
}

impl MolecularNearestArgs {
    pub fn new(molecule: &str, pressure: f64, temperature: f64) -> Self {
        Self {
            molecule: molecule.to_string(),
            pressure,
            temperature,
            ..Default::default()
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn with_fetch(mut self) -> Self {
        self.fetch = true;
        self
    }
}

/// Arguments for resolving an atmosphere's species
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct SpeciesArgs {
    /// Species present in the atmosphere, e.g. H2 He H2O CH4
    #[cfg_attr(feature = "cli", clap(required = true))]
    pub species: Vec<String>,

    /// Free electrons are present (enables H-ff and H2- continuum)
    #[cfg_attr(feature = "cli", clap(long, short))]
    #[serde(default)]
    pub electrons: bool,
}

impl SpeciesArgs {
    pub fn new<S: AsRef<str>>(species: &[S]) -> Self {
        Self {
            species: species.iter().map(|s| s.as_ref().to_string()).collect(),
            electrons: false,
        }
    }

    pub fn with_electrons(mut self) -> Self {
        self.electrons = true;
        self
    }
}
