//! Opacity lens
//!
//! This module provides the opacity lens for browsing and querying an opacity
//! store. It works over any [`OpacitySource`], so the relational database and
//! the hierarchical document are handled the same way.

pub mod args;
pub mod types;

pub use args::{ContinuumGetArgs, MolecularGetArgs, MolecularNearestArgs, SpeciesArgs};
pub use types::{
    CurveEntry, CurveSample, GridPointEntry, InfoEntry, MoleculeEntry, NearestEntry,
    SpeciesEntry, SpeciesKind, TemperatureEntry,
};

use crate::database::{DistanceMetric, OpacitySource};
use crate::species::resolve_species;
use anyhow::{anyhow, Result};

/// Opacity lens for querying an opacity store
///
/// This lens provides high-level operations for:
/// - Listing molecules and their tabulated conditions
/// - Exact curve fetches and nearest grid point resolution
/// - Checking which species an atmosphere needs
pub struct OpacityLens<'a> {
    source: &'a dyn OpacitySource,
    metric: DistanceMetric,
}

impl<'a> OpacityLens<'a> {
    /// Create a new opacity lens using the raw distance metric
    pub fn new(source: &'a dyn OpacitySource) -> Self {
        Self {
            source,
            metric: DistanceMetric::default(),
        }
    }

    /// Set the metric used when a request does not name one
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Header and content summary of the source
    pub fn info(&self) -> Result<Vec<InfoEntry>> {
        let mut entries = Vec::new();

        match self.source.header()? {
            Some(header) => {
                let grid = &header.wavenumber_grid;
                entries.push(InfoEntry::new("grid_points", grid.len()));
                if let (Some(first), Some(last)) = (grid.first(), grid.last()) {
                    entries.push(InfoEntry::new("wavenumber_min", first));
                    entries.push(InfoEntry::new("wavenumber_max", last));
                }
                entries.push(InfoEntry::new("pressure_unit", header.units.pressure));
                entries.push(InfoEntry::new("temperature_unit", header.units.temperature));
                entries.push(InfoEntry::new("continuum_unit", header.units.continuum));
                entries.push(InfoEntry::new("molecular_unit", header.units.molecular));
            }
            None => entries.push(InfoEntry::new("header", "missing")),
        }

        let continuum = self.source.continuum_molecules()?;
        entries.push(InfoEntry::new("continuum_molecules", continuum.join(",")));
        let molecular = self.source.molecular_molecules()?;
        entries.push(InfoEntry::new("molecular_molecules", molecular.join(",")));

        Ok(entries)
    }

    /// Molecules of both tables with their condition counts
    pub fn molecules(&self) -> Result<Vec<MoleculeEntry>> {
        let mut entries = self.continuum_molecules()?;
        entries.extend(self.molecular_molecules()?);
        Ok(entries)
    }

    pub fn continuum_molecules(&self) -> Result<Vec<MoleculeEntry>> {
        self.source
            .continuum_molecules()?
            .into_iter()
            .map(|molecule| {
                Ok(MoleculeEntry {
                    table: "continuum".to_string(),
                    conditions: self.source.continuum_temperatures(&molecule)?.len(),
                    molecule,
                })
            })
            .collect()
    }

    pub fn molecular_molecules(&self) -> Result<Vec<MoleculeEntry>> {
        self.source
            .molecular_molecules()?
            .into_iter()
            .map(|molecule| {
                Ok(MoleculeEntry {
                    table: "molecular".to_string(),
                    conditions: self.source.molecular_grid(&molecule)?.len(),
                    molecule,
                })
            })
            .collect()
    }

    /// Tabulated continuum temperatures, for one molecule or all of them
    pub fn continuum_temperatures(&self, molecule: Option<&str>) -> Result<Vec<TemperatureEntry>> {
        let molecules = match molecule {
            Some(m) => vec![m.to_string()],
            None => self.source.continuum_molecules()?,
        };

        let mut entries = Vec::new();
        for molecule in molecules {
            for temperature in self.source.continuum_temperatures(&molecule)? {
                entries.push(TemperatureEntry {
                    molecule: molecule.clone(),
                    temperature,
                });
            }
        }
        Ok(entries)
    }

    /// A molecule's grid points in ptid order
    pub fn molecular_grid(&self, molecule: &str) -> Result<Vec<GridPointEntry>> {
        Ok(self
            .source
            .molecular_grid(molecule)?
            .into_iter()
            .map(|p| GridPointEntry {
                molecule: molecule.to_string(),
                ptid: p.ptid,
                pressure: p.pressure,
                temperature: p.temperature,
            })
            .collect())
    }

    /// Exact continuum fetch; `None` when nothing is stored for the key
    pub fn continuum_curve(&self, args: &ContinuumGetArgs) -> Result<Option<CurveEntry>> {
        Ok(self
            .source
            .continuum_curve(&args.molecule, args.temperature)?
            .map(|opacity| {
                CurveEntry::new(&args.molecule, format!("T={}", args.temperature), opacity)
            }))
    }

    /// Exact molecular fetch; `None` when the molecule has no such ptid
    pub fn molecular_curve(&self, args: &MolecularGetArgs) -> Result<Option<CurveEntry>> {
        Ok(self
            .source
            .molecular_curve(&args.molecule, args.ptid)?
            .map(|opacity| CurveEntry::new(&args.molecule, format!("ptid={}", args.ptid), opacity)))
    }

    /// Resolve a (pressure, temperature) request to the nearest grid point
    ///
    /// With `args.fetch` the curve stored at that point is returned too.
    pub fn nearest(
        &self,
        args: &MolecularNearestArgs,
    ) -> Result<Option<(NearestEntry, Option<CurveEntry>)>> {
        let metric = args.metric.unwrap_or(self.metric);
        let point = match self.source.nearest_grid_point(
            &args.molecule,
            args.pressure,
            args.temperature,
            metric,
        )? {
            Some(point) => point,
            None => return Ok(None),
        };

        let entry = NearestEntry {
            molecule: args.molecule.clone(),
            requested_pressure: args.pressure,
            requested_temperature: args.temperature,
            ptid: point.ptid,
            pressure: point.pressure,
            temperature: point.temperature,
            metric: metric.to_string(),
        };

        let curve = if args.fetch {
            self.molecular_curve(&MolecularGetArgs::new(&args.molecule, point.ptid))?
        } else {
            None
        };

        Ok(Some((entry, curve)))
    }

    /// Pair each sample of `curve` with the header's wavenumber
    pub fn curve_samples(&self, curve: &CurveEntry) -> Result<Vec<CurveSample>> {
        let header = self
            .source
            .header()?
            .ok_or_else(|| anyhow!("Opacity source has no header"))?;

        Ok(curve
            .opacity
            .iter()
            .enumerate()
            .map(|(index, &opacity)| CurveSample {
                index,
                wavenumber: header
                    .wavenumber_grid
                    .get(index)
                    .copied()
                    .unwrap_or(f64::NAN),
                opacity,
            })
            .collect())
    }

    /// Continuum sources and molecular absorbers an atmosphere needs
    ///
    /// `available` tells whether the source holds data under each name.
    pub fn species(&self, args: &SpeciesArgs) -> Result<Vec<SpeciesEntry>> {
        let split = resolve_species(&args.species, args.electrons);
        let continuum = self.source.continuum_molecules()?;
        let molecular = self.source.molecular_molecules()?;

        let mut entries: Vec<SpeciesEntry> = split
            .continuum
            .into_iter()
            .map(|name| SpeciesEntry {
                available: continuum.contains(&name),
                name,
                kind: SpeciesKind::Continuum,
            })
            .collect();
        entries.extend(split.molecular.into_iter().map(|name| SpeciesEntry {
            available: molecular.contains(&name),
            name,
            kind: SpeciesKind::Molecular,
        }));

        Ok(entries)
    }
}
