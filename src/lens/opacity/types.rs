//! Opacity lens types
//!
//! Row types returned by the opacity lens. Every type derives `Tabled` for
//! table and PSV output and `Serialize` for the JSON formats.

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// A molecule present in one of the tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct MoleculeEntry {
    pub table: String,
    pub molecule: String,
    /// Number of tabulated conditions (temperatures or grid points)
    pub conditions: usize,
}

/// A tabulated continuum temperature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct TemperatureEntry {
    pub molecule: String,
    pub temperature: f64,
}

/// A molecular (pressure, temperature) grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct GridPointEntry {
    pub molecule: String,
    pub ptid: u32,
    pub pressure: f64,
    pub temperature: f64,
}

/// A fetched opacity curve
///
/// Tables show the summary columns; JSON output carries the full curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct CurveEntry {
    pub molecule: String,
    /// `T=<temperature>` for continuum, `ptid=<ptid>` for molecular curves
    pub condition: String,
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    #[tabled(skip)]
    pub opacity: Vec<f64>,
}

impl CurveEntry {
    pub fn new(molecule: &str, condition: String, opacity: Vec<f64>) -> Self {
        let (min, max) = opacity
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let (min, max) = if opacity.is_empty() {
            (f64::NAN, f64::NAN)
        } else {
            (min, max)
        };

        Self {
            molecule: molecule.to_string(),
            condition,
            samples: opacity.len(),
            min,
            max,
            opacity,
        }
    }
}

/// One sample of a curve paired with its wavenumber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct CurveSample {
    pub index: usize,
    pub wavenumber: f64,
    pub opacity: f64,
}

/// Result of resolving a (pressure, temperature) request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct NearestEntry {
    pub molecule: String,
    pub requested_pressure: f64,
    pub requested_temperature: f64,
    pub ptid: u32,
    pub pressure: f64,
    pub temperature: f64,
    pub metric: String,
}

/// Role of a species once the atmosphere is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesKind {
    Continuum,
    Molecular,
}

impl std::fmt::Display for SpeciesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpeciesKind::Continuum => write!(f, "continuum"),
            SpeciesKind::Molecular => write!(f, "molecular"),
        }
    }
}

/// A continuum source or molecular absorber needed by an atmosphere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct SpeciesEntry {
    pub name: String,
    pub kind: SpeciesKind,
    /// Whether the opened source holds data for this name
    pub available: bool,
}

/// A field of the source's header and content summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct InfoEntry {
    pub field: String,
    pub value: String,
}

impl InfoEntry {
    pub fn new(field: &str, value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
