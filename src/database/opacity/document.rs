//! Hierarchical opacity document
//!
//! The hierarchical form keeps the whole opacity set in one JSON file: a
//! flat attribute set for the global metadata, then one nested entry per
//! molecule and condition.
//!
//! ```text
//! attrs      { wavenumber_grid, pressure_unit, temperature_unit, ... }
//! continuum  { <molecule> { <temperature> [f64...] } }
//! molecular  { <molecule> { <temperature> { <pressure> { ptid, opacity } } } }
//! ```
//!
//! Condition keys are the shortest decimal text that parses back to the
//! same `f64` (see [`condition_key`]). Curves are plain number arrays, with
//! non-finite samples written as hex bit patterns so they read back exactly.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use super::continuum::ContinuumRecord;
use super::header::{OpacityHeader, OpacityUnits};
use super::molecular::{following_ptid, MolecularRecord};
use super::pt_grid::GridPoint;
use super::{OpacityDatabase, OpacitySource};

/// Render a condition value as a document key
///
/// `300.0` becomes `"300"`, `0.001` stays `"0.001"`; the text always parses
/// back to the identical value.
pub fn condition_key(value: f64) -> String {
    value.to_string()
}

fn parse_condition_key(key: &str) -> Result<f64> {
    key.parse::<f64>()
        .map_err(|e| anyhow!("Invalid condition key '{}': {}", key, e))
}

/// Global attributes of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAttrs {
    #[serde(with = "super::samples")]
    pub wavenumber_grid: Vec<f64>,
    pub pressure_unit: String,
    pub temperature_unit: String,
    pub continuum_unit: String,
    pub molecular_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl DocumentAttrs {
    fn from_header(header: &OpacityHeader) -> Self {
        Self {
            wavenumber_grid: header.wavenumber_grid.clone(),
            pressure_unit: header.units.pressure.clone(),
            temperature_unit: header.units.temperature.clone(),
            continuum_unit: header.units.continuum.clone(),
            molecular_unit: header.units.molecular.clone(),
            created_at: Some(Utc::now()),
        }
    }

    fn to_header(&self) -> OpacityHeader {
        OpacityHeader::new(
            self.wavenumber_grid.clone(),
            OpacityUnits {
                pressure: self.pressure_unit.clone(),
                temperature: self.temperature_unit.clone(),
                continuum: self.continuum_unit.clone(),
                molecular: self.molecular_unit.clone(),
            },
        )
    }
}

/// A molecular curve stored at one (temperature, pressure) entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolecularEntry {
    pub ptid: u32,
    #[serde(with = "super::samples")]
    pub opacity: Vec<f64>,
}

type ContinuumGroups = BTreeMap<String, BTreeMap<String, Vec<f64>>>;
type MolecularGroups = BTreeMap<String, BTreeMap<String, BTreeMap<String, MolecularEntry>>>;

/// Hierarchical (single JSON file) opacity store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpacityDocument {
    pub attrs: DocumentAttrs,
    #[serde(default, with = "super::samples::groups")]
    pub continuum: ContinuumGroups,
    #[serde(default)]
    pub molecular: MolecularGroups,
}

impl OpacityDocument {
    /// Start an empty document with the given header
    pub fn new(header: &OpacityHeader) -> Self {
        Self {
            attrs: DocumentAttrs::from_header(header),
            continuum: BTreeMap::new(),
            molecular: BTreeMap::new(),
        }
    }

    /// Load a document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read opacity document {:?}: {}", path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse opacity document {:?}: {}", path, e))
    }

    /// Write the document to disk, replacing any existing file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string(self)
            .map_err(|e| anyhow!("Failed to serialize opacity document: {}", e))?;
        fs::write(path, content)
            .map_err(|e| anyhow!("Failed to write opacity document {:?}: {}", path, e))?;

        info!(
            "Saved opacity document to {:?} ({} continuum, {} molecular curves)",
            path,
            self.continuum_count(),
            self.molecular_count()
        );
        Ok(())
    }

    pub fn continuum_count(&self) -> usize {
        self.continuum.values().map(|temps| temps.len()).sum()
    }

    pub fn molecular_count(&self) -> usize {
        self.molecular
            .values()
            .flat_map(|temps| temps.values())
            .map(|pressures| pressures.len())
            .sum()
    }

    /// Store a continuum curve, replacing an existing one at the same key
    pub fn insert_continuum(&mut self, molecule: &str, temperature: f64, opacity: Vec<f64>) {
        self.continuum
            .entry(molecule.to_string())
            .or_default()
            .insert(condition_key(temperature), opacity);
    }

    /// Store one continuum curve per (molecule, temperature) combination
    pub fn insert_continuum_grid<S, F>(
        &mut self,
        molecules: &[S],
        temperatures: &[f64],
        mut curve: F,
    ) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(&str, f64) -> Result<Vec<f64>>,
    {
        let mut inserted = 0;
        for molecule in molecules {
            let molecule = molecule.as_ref();
            for &temperature in temperatures {
                let opacity = curve(molecule, temperature)?;
                self.insert_continuum(molecule, temperature, opacity);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Store a molecular curve under an explicit ptid
    pub fn insert_molecular(
        &mut self,
        molecule: &str,
        ptid: u32,
        pressure: f64,
        temperature: f64,
        opacity: Vec<f64>,
    ) {
        self.molecular
            .entry(molecule.to_string())
            .or_default()
            .entry(condition_key(temperature))
            .or_default()
            .insert(condition_key(pressure), MolecularEntry { ptid, opacity });
    }

    /// Store one molecular curve per molecule and grid point
    ///
    /// Ptids follow the same contract as the relational writer: per molecule,
    /// in `grid` order, continuing after the highest existing ptid, with
    /// already known points skipped.
    pub fn insert_molecular_grid<S, F>(
        &mut self,
        molecules: &[S],
        grid: &[(f64, f64)],
        mut curve: F,
    ) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(&str, f64, f64) -> Result<Vec<f64>>,
    {
        let mut inserted = 0;
        for molecule in molecules {
            let molecule = molecule.as_ref();
            let existing = self.grid_points(molecule)?;
            let mut last_ptid = existing.iter().map(|p| p.ptid).max().unwrap_or(0);
            let mut seen: HashSet<(String, String)> = existing
                .iter()
                .map(|p| (condition_key(p.temperature), condition_key(p.pressure)))
                .collect();

            for &(pressure, temperature) in grid {
                if !seen.insert((condition_key(temperature), condition_key(pressure))) {
                    warn!(
                        "Skipping duplicate grid point ({}, {}) for {}",
                        pressure, temperature, molecule
                    );
                    continue;
                }
                let ptid = following_ptid(last_ptid, molecule)?;
                let opacity = curve(molecule, pressure, temperature)?;
                self.insert_molecular(molecule, ptid, pressure, temperature, opacity);
                last_ptid = ptid;
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn grid_points(&self, molecule: &str) -> Result<Vec<GridPoint>> {
        let mut points = Vec::new();
        if let Some(temps) = self.molecular.get(molecule) {
            for (t_key, pressures) in temps {
                let temperature = parse_condition_key(t_key)?;
                for (p_key, entry) in pressures {
                    points.push(GridPoint {
                        ptid: entry.ptid,
                        pressure: parse_condition_key(p_key)?,
                        temperature,
                    });
                }
            }
        }
        points.sort_by_key(|p| p.ptid);
        Ok(points)
    }

    /// Copy every header field and curve of another source into a new document
    ///
    /// Ptids are carried over unchanged.
    pub fn from_source(source: &dyn OpacitySource) -> Result<Self> {
        let header = source
            .header()?
            .ok_or_else(|| anyhow!("Source has no header to export"))?;
        let mut document = Self::new(&header);

        for molecule in source.continuum_molecules()? {
            for temperature in source.continuum_temperatures(&molecule)? {
                if let Some(opacity) = source.continuum_curve(&molecule, temperature)? {
                    document.insert_continuum(&molecule, temperature, opacity);
                }
            }
        }

        for molecule in source.molecular_molecules()? {
            for point in source.molecular_grid(&molecule)? {
                if let Some(opacity) = source.molecular_curve(&molecule, point.ptid)? {
                    document.insert_molecular(
                        &molecule,
                        point.ptid,
                        point.pressure,
                        point.temperature,
                        opacity,
                    );
                }
            }
        }

        Ok(document)
    }

    /// Write this document into a relational database, recreating it
    ///
    /// Every condition key is parsed before the target is touched, so a
    /// malformed document leaves an existing database as it was. Molecular
    /// rows are written in ptid order so the row order matches the original
    /// insertion order.
    pub fn write_to_database(&self, path: &str) -> Result<OpacityDatabase> {
        let (continuum, molecular) = self.records()?;

        let db = OpacityDatabase::create(path, &self.attrs.to_header())?;
        {
            let tx = db
                .connection()
                .unchecked_transaction()
                .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;
            for record in &continuum {
                db.continuum()
                    .insert(&record.molecule, record.temperature, &record.opacity)?;
            }
            for record in &molecular {
                db.molecular().insert(
                    record.ptid,
                    &record.molecule,
                    record.pressure,
                    record.temperature,
                    &record.opacity,
                )?;
            }
            tx.commit()
                .map_err(|e| anyhow!("Failed to commit transaction: {}", e))?;
        }

        info!(
            "Wrote {} continuum and {} molecular curves to {}",
            continuum.len(),
            molecular.len(),
            path
        );
        Ok(db)
    }

    /// Every curve as flat records, continuum by ascending temperature and
    /// molecular by ptid
    fn records(&self) -> Result<(Vec<ContinuumRecord>, Vec<MolecularRecord>)> {
        let mut continuum = Vec::with_capacity(self.continuum_count());
        for (molecule, temps) in &self.continuum {
            let mut keyed = temps
                .iter()
                .map(|(key, opacity)| Ok((parse_condition_key(key)?, opacity)))
                .collect::<Result<Vec<(f64, &Vec<f64>)>>>()?;
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            continuum.extend(keyed.into_iter().map(|(temperature, opacity)| {
                ContinuumRecord {
                    molecule: molecule.clone(),
                    temperature,
                    opacity: opacity.clone(),
                }
            }));
        }

        let mut molecular = Vec::with_capacity(self.molecular_count());
        for molecule in self.molecular.keys() {
            for point in self.grid_points(molecule)? {
                if let Some(opacity) = self.molecular_curve(molecule, point.ptid)? {
                    molecular.push(MolecularRecord {
                        ptid: point.ptid,
                        molecule: molecule.clone(),
                        pressure: point.pressure,
                        temperature: point.temperature,
                        opacity,
                    });
                }
            }
        }

        Ok((continuum, molecular))
    }
}

impl OpacitySource for OpacityDocument {
    fn header(&self) -> Result<Option<OpacityHeader>> {
        Ok(Some(self.attrs.to_header()))
    }

    fn continuum_molecules(&self) -> Result<Vec<String>> {
        Ok(self.continuum.keys().cloned().collect())
    }

    fn continuum_temperatures(&self, molecule: &str) -> Result<Vec<f64>> {
        let mut temperatures = match self.continuum.get(molecule) {
            Some(temps) => temps
                .keys()
                .map(|k| parse_condition_key(k))
                .collect::<Result<Vec<f64>>>()?,
            None => Vec::new(),
        };
        temperatures.sort_by(|a, b| a.total_cmp(b));
        Ok(temperatures)
    }

    fn continuum_curve(&self, molecule: &str, temperature: f64) -> Result<Option<Vec<f64>>> {
        Ok(self
            .continuum
            .get(molecule)
            .and_then(|temps| temps.get(&condition_key(temperature)))
            .cloned())
    }

    fn molecular_molecules(&self) -> Result<Vec<String>> {
        Ok(self.molecular.keys().cloned().collect())
    }

    fn molecular_grid(&self, molecule: &str) -> Result<Vec<GridPoint>> {
        self.grid_points(molecule)
    }

    fn molecular_curve(&self, molecule: &str, ptid: u32) -> Result<Option<Vec<f64>>> {
        Ok(self.molecular.get(molecule).and_then(|temps| {
            temps
                .values()
                .flat_map(|pressures| pressures.values())
                .find(|entry| entry.ptid == ptid)
                .map(|entry| entry.opacity.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::opacity::DistanceMetric;

    fn header() -> OpacityHeader {
        OpacityHeader::linear(100.0, 1000.0, 10, OpacityUnits::default()).unwrap()
    }

    fn pt_grid() -> Vec<(f64, f64)> {
        vec![(1e-3, 300.0), (1.0, 300.0), (1e-3, 1000.0), (1.0, 1000.0)]
    }

    #[test]
    fn test_condition_key() {
        assert_eq!(condition_key(300.0), "300");
        assert_eq!(condition_key(0.001), "0.001");
        assert_eq!(condition_key(1e-30), "0.000000000000000000000000000001");
        for v in [300.0, 0.1 + 0.2, 1e-30, 1234.5678] {
            assert_eq!(parse_condition_key(&condition_key(v)).unwrap(), v);
        }
    }

    #[test]
    fn test_h2h2_scenario() {
        let mut doc = OpacityDocument::new(&header());
        doc.insert_continuum("H2H2", 300.0, vec![1e-30; 1000]);

        let curve = doc.continuum_curve("H2H2", 300.0).unwrap().unwrap();
        assert_eq!(curve, vec![1e-30; 1000]);
        assert!(doc.continuum_curve("H2H2", 999.0).unwrap().is_none());
        assert!(doc.continuum_curve("H2N2", 300.0).unwrap().is_none());
    }

    #[test]
    fn test_ptids_follow_grid_order() {
        let mut doc = OpacityDocument::new(&header());
        let inserted = doc
            .insert_molecular_grid(&["H2O"], &pt_grid(), |_, p, t| Ok(vec![p, t]))
            .unwrap();
        assert_eq!(inserted, 4);

        let points = doc.molecular_grid("H2O").unwrap();
        let ptids: Vec<u32> = points.iter().map(|p| p.ptid).collect();
        assert_eq!(ptids, vec![1, 2, 3, 4]);
        assert_eq!((points[2].pressure, points[2].temperature), (1e-3, 1000.0));

        assert_eq!(
            doc.molecular_curve("H2O", 3).unwrap().unwrap(),
            vec![1e-3, 1000.0]
        );
        assert!(doc.molecular_curve("H2O", 5).unwrap().is_none());
    }

    #[test]
    fn test_nearest_on_document() {
        let mut doc = OpacityDocument::new(&header());
        doc.insert_molecular_grid(&["CO"], &pt_grid(), |_, _, _| Ok(vec![0.0]))
            .unwrap();

        let point = doc
            .nearest_grid_point("CO", 1.0, 1000.0, DistanceMetric::Raw)
            .unwrap()
            .unwrap();
        assert_eq!(point.ptid, 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opacities.json");

        let mut doc = OpacityDocument::new(&header());
        doc.insert_continuum_grid(&["H2H2", "H-bf"], &[300.0, 600.0], |_, t| {
            Ok(vec![t * 1e-30; 10])
        })
        .unwrap();
        doc.insert_molecular_grid(&["H2O"], &pt_grid(), |_, p, _| Ok(vec![p; 10]))
            .unwrap();
        doc.save(&path).unwrap();

        let loaded = OpacityDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.continuum_count(), 4);
        assert_eq!(loaded.molecular_count(), 4);
        assert_eq!(
            loaded.continuum_temperatures("H2H2").unwrap(),
            vec![300.0, 600.0]
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OpacityDocument::load(dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn test_database_round_trip_preserves_ptids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converted.db");

        let db = OpacityDatabase::create_in_memory(&header()).unwrap();
        db.continuum()
            .insert_grid(&["H2He"], &[75.0, 300.0], |_, t| Ok(vec![t; 10]))
            .unwrap();
        // Grid deliberately not sorted so ptid order differs from key order
        db.molecular()
            .insert_grid(&["CH4"], &[(10.0, 900.0), (0.1, 300.0), (1.0, 600.0)], |_, p, t| {
                Ok(vec![p * t; 10])
            })
            .unwrap();

        let doc = OpacityDocument::from_source(&db).unwrap();
        assert_eq!(doc.continuum_count(), 2);
        assert_eq!(doc.molecular_grid("CH4").unwrap(), db.molecular().grid("CH4").unwrap());

        let copy = doc.write_to_database(path.to_str().unwrap()).unwrap();
        assert_eq!(copy.molecular().grid("CH4").unwrap(), db.molecular().grid("CH4").unwrap());
        assert_eq!(
            copy.molecular().get("CH4", 1).unwrap().unwrap(),
            vec![9000.0; 10]
        );
        assert_eq!(
            copy.continuum().get("H2He", 75.0).unwrap().unwrap(),
            vec![75.0; 10]
        );
        assert_eq!(copy.headers().get().unwrap(), db.headers().get().unwrap());
        assert!(copy.check_grid_consistency().unwrap().is_consistent());
    }

    #[test]
    fn test_non_finite_samples_survive_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        let db = OpacityDatabase::create_in_memory(&header()).unwrap();
        db.continuum()
            .insert("H-bf", 300.0, &[0.0, f64::INFINITY, f64::NAN])
            .unwrap();
        db.molecular()
            .insert(1, "H2O", 1.0, 300.0, &[f64::NEG_INFINITY, 1e-30])
            .unwrap();

        let doc = OpacityDocument::from_source(&db).unwrap();
        doc.save(&path).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("null"));

        let loaded = OpacityDocument::load(&path).unwrap();
        let curve = loaded.continuum_curve("H-bf", 300.0).unwrap().unwrap();
        let bits: Vec<u64> = curve.iter().map(|v| v.to_bits()).collect();
        let expected: Vec<u64> = [0.0, f64::INFINITY, f64::NAN]
            .iter()
            .map(|v| v.to_bits())
            .collect();
        assert_eq!(bits, expected);
        assert_eq!(
            loaded.molecular_curve("H2O", 1).unwrap().unwrap(),
            vec![f64::NEG_INFINITY, 1e-30]
        );
    }

    #[test]
    fn test_bad_key_leaves_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opacities.db");
        let path = path.to_str().unwrap();

        {
            let db = OpacityDatabase::create(path, &header()).unwrap();
            db.continuum().insert("H2H2", 300.0, &[1e-30; 10]).unwrap();
        }

        let mut doc = OpacityDocument::new(&header());
        doc.continuum
            .entry("H2H2".to_string())
            .or_default()
            .insert("warm".to_string(), vec![0.0; 10]);
        assert!(doc.write_to_database(path).is_err());

        let db = OpacityDatabase::open_read_only(path).unwrap();
        assert_eq!(
            db.continuum().get("H2H2", 300.0).unwrap().unwrap(),
            vec![1e-30; 10]
        );
    }

    #[test]
    fn test_exhausted_ptid_space_is_an_error() {
        let mut doc = OpacityDocument::new(&header());
        doc.insert_molecular("H2O", u32::MAX, 1.0, 300.0, vec![0.0]);

        let result = doc.insert_molecular_grid(&["H2O"], &[(2.0, 300.0)], |_, _, _| Ok(vec![0.0]));
        assert!(result.is_err());
        assert_eq!(doc.molecular_count(), 1);
    }

    #[test]
    fn test_from_source_requires_header() {
        let db = OpacityDatabase::open_in_memory().unwrap();
        assert!(OpacityDocument::from_source(&db).is_err());
    }
}
