//! Molecular repository
//!
//! Molecular opacities are tabulated per molecule on a (pressure,
//! temperature) grid. Each grid point of a molecule carries a `ptid`
//! assigned in insertion order starting at 1, which is the key curves are
//! fetched by. Requests for an arbitrary (pressure, temperature) are first
//! resolved to the nearest ptid.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::pt_grid::{DistanceMetric, GridPoint, PtGrid};
use crate::database::core::blob::{decode_f64s, encode_f64s, sample_count};

/// A stored molecular opacity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MolecularRecord {
    pub ptid: u32,
    pub molecule: String,
    pub pressure: f64,
    pub temperature: f64,
    pub opacity: Vec<f64>,
}

/// Repository for the molecular relation
pub struct MolecularRepository<'a> {
    conn: &'a Connection,
}

impl<'a> MolecularRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Check if the molecular table holds no curves
    pub fn is_empty(&self) -> bool {
        self.count().map(|c| c == 0).unwrap_or(true)
    }

    /// Get the count of stored curves
    pub fn count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM molecular", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get molecular count: {}", e))?;
        Ok(count)
    }

    /// Insert a single curve under an explicit ptid
    ///
    /// Used when copying data whose ptids are already assigned. Keeping the
    /// ptid ↔ (pressure, temperature) mapping one-to-one is up to the caller.
    pub fn insert(
        &self,
        ptid: u32,
        molecule: &str,
        pressure: f64,
        temperature: f64,
        opacity: &[f64],
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO molecular (ptid, molecule, pressure, temperature, opacity)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![ptid, molecule, pressure, temperature, encode_f64s(opacity)],
            )
            .map_err(|e| anyhow!("Failed to insert molecular curve for {}: {}", molecule, e))?;
        Ok(())
    }

    /// Insert one curve for every molecule at every (pressure, temperature) grid point
    ///
    /// Ptids are assigned per molecule in the order `grid` is enumerated,
    /// continuing after the molecule's highest existing ptid (1 for a fresh
    /// molecule). Grid points already present for a molecule, or repeated
    /// within `grid`, are skipped so each pair keeps exactly one ptid.
    /// All rows are committed in a single transaction; returns the number of
    /// rows written.
    pub fn insert_grid<S, F>(&self, molecules: &[S], grid: &[(f64, f64)], mut curve: F) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(&str, f64, f64) -> Result<Vec<f64>>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;

        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO molecular (ptid, molecule, pressure, temperature, opacity)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| anyhow!("Failed to prepare statement: {}", e))?;

            for molecule in molecules {
                let molecule = molecule.as_ref();
                let existing = self.grid(molecule)?;
                let mut last_ptid = existing.iter().map(|p| p.ptid).max().unwrap_or(0);
                let mut seen: HashSet<(u64, u64)> = existing
                    .iter()
                    .map(|p| pt_key(p.pressure, p.temperature))
                    .collect();

                for &(pressure, temperature) in grid {
                    if !seen.insert(pt_key(pressure, temperature)) {
                        warn!(
                            "Skipping duplicate grid point ({}, {}) for {}",
                            pressure, temperature, molecule
                        );
                        continue;
                    }

                    let ptid = following_ptid(last_ptid, molecule)?;
                    let opacity = curve(molecule, pressure, temperature)?;
                    stmt.execute(rusqlite::params![
                        ptid,
                        molecule,
                        pressure,
                        temperature,
                        encode_f64s(&opacity)
                    ])?;
                    last_ptid = ptid;
                    inserted += 1;
                }
                debug!("Inserted molecular grid for {} up to ptid {}", molecule, last_ptid);
            }
        }

        tx.commit()
            .map_err(|e| anyhow!("Failed to commit transaction: {}", e))?;

        info!("Molecular population finished: {} curves", inserted);
        Ok(inserted)
    }

    /// Distinct molecule names, sorted
    pub fn molecules(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT molecule FROM molecular ORDER BY molecule")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| anyhow!("Failed to list molecular molecules: {}", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to decode molecular row: {}", e))
    }

    /// A molecule's grid points in ptid order (empty for an unknown molecule)
    pub fn grid(&self, molecule: &str) -> Result<Vec<GridPoint>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT ptid, pressure, temperature FROM molecular
             WHERE molecule = ?1 ORDER BY ptid",
        )?;
        let rows = stmt
            .query_map([molecule], |row| {
                Ok(GridPoint {
                    ptid: row.get(0)?,
                    pressure: row.get(1)?,
                    temperature: row.get(2)?,
                })
            })
            .map_err(|e| anyhow!("Failed to read grid for {}: {}", molecule, e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to decode molecular row: {}", e))
    }

    /// Distinct (pressure, temperature) pairs over all molecules
    pub fn pt_pairs(&self) -> Result<Vec<(f64, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT pressure, temperature FROM molecular ORDER BY temperature, pressure",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)))
            .map_err(|e| anyhow!("Failed to list pressure-temperature pairs: {}", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to decode molecular row: {}", e))
    }

    /// Exact-match fetch of a curve by ptid
    ///
    /// Returns `None` when the molecule has no such ptid.
    pub fn get(&self, molecule: &str, ptid: u32) -> Result<Option<Vec<f64>>> {
        let result = self.conn.query_row(
            "SELECT opacity FROM molecular WHERE molecule = ?1 AND ptid = ?2
             ORDER BY id LIMIT 1",
            rusqlite::params![molecule, ptid],
            |row| row.get::<_, Vec<u8>>(0),
        );

        match result {
            Ok(bytes) => Ok(Some(decode_f64s(&bytes)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to fetch molecular curve: {}", e)),
        }
    }

    /// Resolve a requested (pressure, temperature) to the molecule's nearest grid point
    pub fn nearest(
        &self,
        molecule: &str,
        pressure: f64,
        temperature: f64,
        metric: DistanceMetric,
    ) -> Result<Option<GridPoint>> {
        let grid = PtGrid::new(self.grid(molecule)?);
        Ok(grid.nearest(pressure, temperature, metric).copied())
    }

    /// Resolve the nearest grid point and fetch its curve
    pub fn fetch_nearest(
        &self,
        molecule: &str,
        pressure: f64,
        temperature: f64,
        metric: DistanceMetric,
    ) -> Result<Option<MolecularRecord>> {
        let point = match self.nearest(molecule, pressure, temperature, metric)? {
            Some(point) => point,
            None => return Ok(None),
        };

        Ok(self.get(molecule, point.ptid)?.map(|opacity| MolecularRecord {
            ptid: point.ptid,
            molecule: molecule.to_string(),
            pressure: point.pressure,
            temperature: point.temperature,
            opacity,
        }))
    }

    /// Every stored curve, ordered by insertion
    pub fn all(&self) -> Result<Vec<MolecularRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT ptid, molecule, pressure, temperature, opacity FROM molecular ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, Vec<u8>>(4)?,
                ))
            })
            .map_err(|e| anyhow!("Failed to read molecular curves: {}", e))?;

        let mut records = Vec::new();
        for row in rows {
            let (ptid, molecule, pressure, temperature, bytes) = row?;
            records.push(MolecularRecord {
                ptid,
                molecule,
                pressure,
                temperature,
                opacity: decode_f64s(&bytes)?,
            });
        }
        Ok(records)
    }

    /// Sample count of every stored curve as `(molecule, ptid, len)`
    pub fn curve_lengths(&self) -> Result<Vec<(String, u32, usize)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT molecule, ptid, opacity FROM molecular ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| anyhow!("Failed to read molecular curve lengths: {}", e))?;

        let mut lengths = Vec::new();
        for row in rows {
            let (molecule, ptid, bytes) = row?;
            lengths.push((molecule, ptid, sample_count(&bytes)?));
        }
        Ok(lengths)
    }
}

/// The ptid assigned after `last`, failing once the id space is used up
pub(super) fn following_ptid(last: u32, molecule: &str) -> Result<u32> {
    last.checked_add(1)
        .ok_or_else(|| anyhow!("No ptid left for {} after {}", molecule, last))
}

/// Bit-level key for a (pressure, temperature) pair
fn pt_key(pressure: f64, temperature: f64) -> (u64, u64) {
    (pressure.to_bits(), temperature.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::{DatabaseConn, SchemaManager};

    fn setup_test_db() -> DatabaseConn {
        let db = DatabaseConn::open_in_memory().unwrap();
        SchemaManager::new(&db.conn).initialize().unwrap();
        db
    }

    fn pt_grid() -> Vec<(f64, f64)> {
        let mut grid = Vec::new();
        for t in [300.0, 600.0, 1200.0] {
            for p in [1e-3, 1.0, 100.0] {
                grid.push((p, t));
            }
        }
        grid
    }

    #[test]
    fn test_is_empty() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        assert!(repo.is_empty());
        assert!(repo.grid("H2O").unwrap().is_empty());
    }

    #[test]
    fn test_ptid_bijection_in_insertion_order() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        let grid = pt_grid();

        let inserted = repo
            .insert_grid(&["H2O", "CH4"], &grid, |_, p, t| Ok(vec![p * t; 3]))
            .unwrap();
        assert_eq!(inserted, 18);

        for molecule in ["H2O", "CH4"] {
            let points = repo.grid(molecule).unwrap();
            let ptids: Vec<u32> = points.iter().map(|p| p.ptid).collect();
            assert_eq!(ptids, (1..=9).collect::<Vec<u32>>());
            for (point, &(p, t)) in points.iter().zip(grid.iter()) {
                assert_eq!(point.pressure, p);
                assert_eq!(point.temperature, t);
            }
        }
    }

    #[test]
    fn test_round_trip_by_ptid() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert_grid(&["CO2"], &pt_grid(), |_, p, t| Ok(vec![p, t, p / t]))
            .unwrap();

        // ptid 5 is (1.0 bar, 600 K)
        let curve = repo.get("CO2", 5).unwrap().unwrap();
        assert_eq!(curve, vec![1.0, 600.0, 1.0 / 600.0]);

        assert!(repo.get("CO2", 10).unwrap().is_none());
        assert!(repo.get("NH3", 1).unwrap().is_none());
    }

    #[test]
    fn test_nearest_existing_point_is_itself() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert_grid(&["H2O"], &pt_grid(), |_, _, _| Ok(vec![0.0]))
            .unwrap();

        for point in repo.grid("H2O").unwrap() {
            let found = repo
                .nearest("H2O", point.pressure, point.temperature, DistanceMetric::Raw)
                .unwrap()
                .unwrap();
            assert_eq!(found.ptid, point.ptid);
        }
    }

    #[test]
    fn test_fetch_nearest() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert_grid(&["H2O"], &pt_grid(), |_, p, t| Ok(vec![p, t]))
            .unwrap();

        let record = repo
            .fetch_nearest("H2O", 0.9, 620.0, DistanceMetric::Raw)
            .unwrap()
            .unwrap();
        assert_eq!(record.ptid, 5);
        assert_eq!(record.opacity, vec![1.0, 600.0]);

        assert!(repo
            .fetch_nearest("TiO", 1.0, 600.0, DistanceMetric::Raw)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);

        let inserted = repo
            .insert_grid(&["H2O"], &[(1.0, 300.0), (1.0, 300.0), (2.0, 300.0)], |_, _, _| {
                Ok(vec![0.0])
            })
            .unwrap();
        assert_eq!(inserted, 2);

        // A second call continues numbering and ignores known points
        let inserted = repo
            .insert_grid(&["H2O"], &[(2.0, 300.0), (3.0, 300.0)], |_, _, _| Ok(vec![0.0]))
            .unwrap();
        assert_eq!(inserted, 1);

        let ptids: Vec<u32> = repo.grid("H2O").unwrap().iter().map(|p| p.ptid).collect();
        assert_eq!(ptids, vec![1, 2, 3]);
    }

    #[test]
    fn test_exhausted_ptid_space_is_an_error() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert(u32::MAX, "H2O", 1.0, 300.0, &[0.0]).unwrap();

        let result = repo.insert_grid(&["H2O"], &[(2.0, 300.0)], |_, _, _| Ok(vec![0.0]));
        assert!(result.is_err());
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(following_ptid(41, "H2O").unwrap(), 42);
    }

    #[test]
    fn test_undecodable_grid_row_is_an_error() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert_grid(&["H2O"], &[(1.0, 300.0), (2.0, 300.0)], |_, _, _| Ok(vec![0.0]))
            .unwrap();
        // NULL pressure, as SQLite stores a NaN
        db.conn
            .execute("UPDATE molecular SET pressure = NULL WHERE ptid = 2", [])
            .unwrap();
        assert!(repo.grid("H2O").is_err());
        assert!(repo.nearest("H2O", 1.0, 300.0, DistanceMetric::Raw).is_err());

        // ptid outside the u32 range
        db.conn
            .execute(
                "INSERT INTO molecular (ptid, molecule, pressure, temperature, opacity)
                 VALUES (5000000000, 'CO', 1.0, 300.0, x'')",
                [],
            )
            .unwrap();
        assert!(repo.grid("CO").is_err());
    }

    #[test]
    fn test_pt_pairs_distinct() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert_grid(&["H2O", "CH4"], &pt_grid(), |_, _, _| Ok(vec![0.0]))
            .unwrap();

        let pairs = repo.pt_pairs().unwrap();
        assert_eq!(pairs.len(), 9);
        assert_eq!(pairs[0], (1e-3, 300.0));
    }

    #[test]
    fn test_curve_lengths() {
        let db = setup_test_db();
        let repo = MolecularRepository::new(&db.conn);
        repo.insert(1, "H2O", 1.0, 300.0, &[0.0; 10]).unwrap();

        assert_eq!(
            repo.curve_lengths().unwrap(),
            vec![("H2O".to_string(), 1, 10)]
        );
        assert_eq!(repo.all().unwrap()[0].opacity.len(), 10);
    }
}
