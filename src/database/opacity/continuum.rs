//! Continuum repository
//!
//! Continuum opacities (collision-induced absorption and few-body sources
//! such as H- bound-free) are tabulated per molecule name and temperature.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::core::blob::{decode_f64s, encode_f64s, sample_count};

/// A stored continuum opacity curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuumRecord {
    pub molecule: String,
    pub temperature: f64,
    pub opacity: Vec<f64>,
}

/// Repository for the continuum relation
pub struct ContinuumRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ContinuumRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Check if the continuum table holds no curves
    pub fn is_empty(&self) -> bool {
        self.count().map(|c| c == 0).unwrap_or(true)
    }

    /// Get the count of stored curves
    pub fn count(&self) -> Result<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM continuum", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get continuum count: {}", e))?;
        Ok(count)
    }

    /// Insert a single curve
    ///
    /// The curve length is not checked against the header grid.
    pub fn insert(&self, molecule: &str, temperature: f64, opacity: &[f64]) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO continuum (molecule, temperature, opacity) VALUES (?1, ?2, ?3)",
                rusqlite::params![molecule, temperature, encode_f64s(opacity)],
            )
            .map_err(|e| anyhow!("Failed to insert continuum curve for {}: {}", molecule, e))?;
        Ok(())
    }

    /// Insert one curve for every (molecule, temperature) combination
    ///
    /// `curve` supplies the opacity for each combination. Molecules are the
    /// outer loop and temperatures the inner one. All rows are committed in
    /// a single transaction; returns the number of rows written.
    pub fn insert_grid<S, F>(&self, molecules: &[S], temperatures: &[f64], mut curve: F) -> Result<usize>
    where
        S: AsRef<str>,
        F: FnMut(&str, f64) -> Result<Vec<f64>>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))?;

        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO continuum (molecule, temperature, opacity) VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| anyhow!("Failed to prepare statement: {}", e))?;

            for molecule in molecules {
                let molecule = molecule.as_ref();
                for &temperature in temperatures {
                    let opacity = curve(molecule, temperature)?;
                    stmt.execute(rusqlite::params![
                        molecule,
                        temperature,
                        encode_f64s(&opacity)
                    ])?;
                    inserted += 1;
                }
                debug!(
                    "Inserted {} continuum curves for {}",
                    temperatures.len(),
                    molecule
                );
            }
        }

        tx.commit()
            .map_err(|e| anyhow!("Failed to commit transaction: {}", e))?;

        info!("Continuum population finished: {} curves", inserted);
        Ok(inserted)
    }

    /// Distinct molecule names, sorted
    pub fn molecules(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT molecule FROM continuum ORDER BY molecule")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| anyhow!("Failed to list continuum molecules: {}", e))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to decode continuum row: {}", e))
    }

    /// Distinct temperatures in ascending order
    ///
    /// With `Some(molecule)` only that molecule's temperatures are listed;
    /// an unknown molecule gives an empty list.
    pub fn temperatures(&self, molecule: Option<&str>) -> Result<Vec<f64>> {
        let rows: Vec<f64> = match molecule {
            Some(m) => {
                let mut stmt = self.conn.prepare(
                    "SELECT DISTINCT temperature FROM continuum WHERE molecule = ?1 ORDER BY temperature",
                )?;
                let rows = stmt
                    .query_map([m], |row| row.get::<_, f64>(0))
                    .map_err(|e| anyhow!("Failed to list continuum temperatures: {}", e))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| anyhow!("Failed to decode continuum row: {}", e))?
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT DISTINCT temperature FROM continuum ORDER BY temperature")?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, f64>(0))
                    .map_err(|e| anyhow!("Failed to list continuum temperatures: {}", e))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| anyhow!("Failed to decode continuum row: {}", e))?
            }
        };
        Ok(rows)
    }

    /// Exact-match fetch of a curve
    ///
    /// Returns `None` when no curve was stored for this key.
    pub fn get(&self, molecule: &str, temperature: f64) -> Result<Option<Vec<f64>>> {
        let result = self.conn.query_row(
            "SELECT opacity FROM continuum WHERE molecule = ?1 AND temperature = ?2
             ORDER BY id LIMIT 1",
            rusqlite::params![molecule, temperature],
            |row| row.get::<_, Vec<u8>>(0),
        );

        match result {
            Ok(bytes) => Ok(Some(decode_f64s(&bytes)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(anyhow!("Failed to fetch continuum curve: {}", e)),
        }
    }

    /// Every stored curve, ordered by insertion
    pub fn all(&self) -> Result<Vec<ContinuumRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT molecule, temperature, opacity FROM continuum ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| anyhow!("Failed to read continuum curves: {}", e))?;

        let mut records = Vec::new();
        for row in rows {
            let (molecule, temperature, bytes) = row?;
            records.push(ContinuumRecord {
                molecule,
                temperature,
                opacity: decode_f64s(&bytes)?,
            });
        }
        Ok(records)
    }

    /// Sample count of every stored curve as `(molecule, temperature, len)`
    pub fn curve_lengths(&self) -> Result<Vec<(String, f64, usize)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT molecule, temperature, opacity FROM continuum ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                ))
            })
            .map_err(|e| anyhow!("Failed to read continuum curve lengths: {}", e))?;

        let mut lengths = Vec::new();
        for row in rows {
            let (molecule, temperature, bytes) = row?;
            lengths.push((molecule, temperature, sample_count(&bytes)?));
        }
        Ok(lengths)
    }
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

    #[test]
    fn test_is_empty() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);
        assert!(repo.is_empty());
        assert!(repo.molecules().unwrap().is_empty());
    }

    #[test]
    fn test_h2h2_scenario() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);

        let curve = vec![1e-30; 1000];
        repo.insert("H2H2", 300.0, &curve).unwrap();

        let fetched = repo.get("H2H2", 300.0).unwrap().unwrap();
        assert_eq!(fetched.len(), 1000);
        assert!(fetched
            .iter()
            .zip(curve.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits()));

        assert!(repo.get("H2H2", 999.0).unwrap().is_none());
        assert!(repo.get("H2He", 300.0).unwrap().is_none());
    }

    #[test]
    fn test_insert_grid() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);

        let molecules = ["H2H2", "H2He"];
        let temperatures = [75.0, 300.0, 1000.0];
        let inserted = repo
            .insert_grid(&molecules, &temperatures, |molecule, t| {
                let base = if molecule == "H2H2" { 1.0 } else { 2.0 };
                Ok(vec![base * t; 4])
            })
            .unwrap();

        assert_eq!(inserted, 6);
        assert_eq!(repo.count().unwrap(), 6);
        assert_eq!(repo.molecules().unwrap(), vec!["H2H2", "H2He"]);
        assert_eq!(
            repo.temperatures(Some("H2He")).unwrap(),
            vec![75.0, 300.0, 1000.0]
        );
        assert_eq!(repo.get("H2He", 75.0).unwrap().unwrap(), vec![150.0; 4]);
        assert!(repo.temperatures(Some("H2CH4")).unwrap().is_empty());
    }

    #[test]
    fn test_failed_supplier_rolls_back() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);

        let result = repo.insert_grid(&["H2H2"], &[100.0, 200.0], |_, t| {
            if t > 150.0 {
                Err(anyhow!("no data"))
            } else {
                Ok(vec![0.0])
            }
        });

        assert!(result.is_err());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_temperatures_distinct_across_molecules() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);
        repo.insert("H2H2", 500.0, &[1.0]).unwrap();
        repo.insert("H2He", 500.0, &[1.0]).unwrap();
        repo.insert("H-bf", 200.0, &[1.0]).unwrap();

        assert_eq!(repo.temperatures(None).unwrap(), vec![200.0, 500.0]);
    }

    #[test]
    fn test_undecodable_temperature_is_an_error() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);
        repo.insert("H2H2", 300.0, &[1.0]).unwrap();
        db.conn
            .execute(
                "INSERT INTO continuum (molecule, temperature, opacity) VALUES ('H2H2', NULL, x'')",
                [],
            )
            .unwrap();

        assert!(repo.temperatures(Some("H2H2")).is_err());
        assert!(repo.temperatures(None).is_err());
    }

    #[test]
    fn test_all_and_lengths() {
        let db = setup_test_db();
        let repo = ContinuumRepository::new(&db.conn);
        repo.insert("H2H2", 100.0, &[1.0, 2.0]).unwrap();
        repo.insert("H2N2", 100.0, &[3.0]).unwrap();

        let all = repo.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].molecule, "H2H2");
        assert_eq!(all[1].opacity, vec![3.0]);

        let lengths = repo.curve_lengths().unwrap();
        assert_eq!(lengths[0], ("H2H2".to_string(), 100.0, 2));
        assert_eq!(lengths[1], ("H2N2".to_string(), 100.0, 1));
    }
}
