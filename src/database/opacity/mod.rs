//! Opacity database storage
//!
//! This module provides the opacity store in its two on-disk forms:
//! - Relational: an SQLite file with `header`, `continuum` and `molecular` tables
//! - Hierarchical: a single JSON document with nested per-molecule entries
//!
//! Both forms implement [`OpacitySource`], the read interface used by the
//! lens and the command-line tool.

mod continuum;
mod document;
mod header;
mod molecular;
mod pt_grid;
mod samples;

pub use continuum::{ContinuumRecord, ContinuumRepository};
pub use document::{condition_key, DocumentAttrs, MolecularEntry, OpacityDocument};
pub use header::{HeaderRepository, OpacityHeader, OpacityUnits};
pub use molecular::{MolecularRecord, MolecularRepository};
pub use pt_grid::{DistanceMetric, GridPoint, PtGrid};

use crate::database::core::{DatabaseConn, SchemaManager, SchemaStatus};
use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Read access shared by the relational and hierarchical forms
///
/// Unknown molecules or conditions yield empty results, never errors.
pub trait OpacitySource {
    /// Header metadata, `None` if it was never written
    fn header(&self) -> Result<Option<OpacityHeader>>;

    fn continuum_molecules(&self) -> Result<Vec<String>>;

    /// Temperatures tabulated for a continuum molecule, ascending
    fn continuum_temperatures(&self, molecule: &str) -> Result<Vec<f64>>;

    fn continuum_curve(&self, molecule: &str, temperature: f64) -> Result<Option<Vec<f64>>>;

    fn molecular_molecules(&self) -> Result<Vec<String>>;

    /// A molecule's grid points in ptid order
    fn molecular_grid(&self, molecule: &str) -> Result<Vec<GridPoint>>;

    fn molecular_curve(&self, molecule: &str, ptid: u32) -> Result<Option<Vec<f64>>>;

    /// Resolve a requested (pressure, temperature) to the nearest tabulated point
    fn nearest_grid_point(
        &self,
        molecule: &str,
        pressure: f64,
        temperature: f64,
        metric: DistanceMetric,
    ) -> Result<Option<GridPoint>> {
        let grid = PtGrid::new(self.molecular_grid(molecule)?);
        Ok(grid.nearest(pressure, temperature, metric).copied())
    }

    /// Resolve the nearest grid point and fetch its curve
    fn fetch_nearest(
        &self,
        molecule: &str,
        pressure: f64,
        temperature: f64,
        metric: DistanceMetric,
    ) -> Result<Option<MolecularRecord>> {
        let point = match self.nearest_grid_point(molecule, pressure, temperature, metric)? {
            Some(point) => point,
            None => return Ok(None),
        };
        Ok(self
            .molecular_curve(molecule, point.ptid)?
            .map(|opacity| MolecularRecord {
                ptid: point.ptid,
                molecule: molecule.to_string(),
                pressure: point.pressure,
                temperature: point.temperature,
                opacity,
            }))
    }
}

/// A stored curve whose length disagrees with the header grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridMismatch {
    pub table: &'static str,
    pub molecule: String,
    /// Temperature for continuum rows, ptid for molecular rows
    pub key: String,
    pub len: usize,
}

/// Result of comparing every stored curve against the header grid length
#[derive(Debug, Clone, Serialize)]
pub struct GridConsistencyReport {
    pub grid_len: usize,
    pub checked: usize,
    pub mismatches: Vec<GridMismatch>,
}

impl GridConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Record counts and metadata of an opacity database
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSummary {
    pub schema_status: String,
    pub grid_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<OpacityUnits>,
    pub continuum_count: u64,
    pub continuum_molecules: Vec<String>,
    pub molecular_count: u64,
    pub molecular_molecules: Vec<String>,
}

/// Relational opacity database (SQLite backend)
///
/// `OpacityDatabase` owns the connection and hands out repositories for the
/// three relations. The connection is closed when the value is dropped.
pub struct OpacityDatabase {
    db: DatabaseConn,
}

impl OpacityDatabase {
    /// Open an opacity database at the specified path
    ///
    /// A missing or empty file is initialized with an empty schema. A file
    /// with an unusable schema is reported as an error instead of being
    /// reset, since it is a reference artifact; recreate it with
    /// [`OpacityDatabase::create`].
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        Self::check_schema(db, true)
    }

    /// Open an existing opacity database without write access
    pub fn open_read_only(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_read_only(path)?;
        Self::check_schema(db, false)
    }

    /// Create an in-memory opacity database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        SchemaManager::new(&db.conn).initialize()?;
        Ok(Self { db })
    }

    /// Create a fresh database at `path` holding only `header`
    ///
    /// Existing relations are dropped and recreated; there is no upsert.
    pub fn create(path: &str, header: &OpacityHeader) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        let schema = SchemaManager::new(&db.conn);
        if schema.check_status()? != SchemaStatus::NotInitialized {
            info!("Dropping existing opacity tables in {}", path);
        }
        schema.reset()?;
        schema.initialize()?;

        let database = Self { db };
        database.headers().write(header)?;
        info!(
            "Created opacity database at {} ({} wavenumber points)",
            path,
            header.grid_len()
        );
        Ok(database)
    }

    /// Create an in-memory database holding only `header`
    pub fn create_in_memory(header: &OpacityHeader) -> Result<Self> {
        let database = Self::open_in_memory()?;
        database.headers().write(header)?;
        Ok(database)
    }

    fn check_schema(db: DatabaseConn, writable: bool) -> Result<Self> {
        let schema = SchemaManager::new(&db.conn);

        match schema.check_status()? {
            SchemaStatus::Current => {
                info!("Opacity database schema is current");
            }
            SchemaStatus::NotInitialized if writable => {
                info!("Initializing opacity database schema");
                schema.initialize()?;
            }
            SchemaStatus::NotInitialized => {
                return Err(anyhow!("Database holds no opacity tables"));
            }
            SchemaStatus::NeedsMigration { from, to } => {
                return Err(anyhow!(
                    "Opacity database schema v{} is older than v{}, recreate it",
                    from,
                    to
                ));
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => {
                return Err(anyhow!(
                    "Opacity database schema incompatible (db: v{}, required: v{})",
                    database_version,
                    required_version
                ));
            }
            SchemaStatus::Corrupted => {
                return Err(anyhow!(
                    "Opacity database is missing one of the header, continuum or molecular tables"
                ));
            }
        }

        Ok(Self { db })
    }

    /// Get a reference to the header repository
    pub fn headers(&self) -> HeaderRepository<'_> {
        HeaderRepository::new(&self.db.conn)
    }

    /// Get a reference to the continuum repository
    pub fn continuum(&self) -> ContinuumRepository<'_> {
        ContinuumRepository::new(&self.db.conn)
    }

    /// Get a reference to the molecular repository
    pub fn molecular(&self) -> MolecularRepository<'_> {
        MolecularRepository::new(&self.db.conn)
    }

    /// Get the underlying database connection (for advanced queries)
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }

    pub fn schema_status(&self) -> Result<SchemaStatus> {
        SchemaManager::new(&self.db.conn).check_status()
    }

    /// Compare every stored curve's length against the header grid
    ///
    /// Nothing is checked at write time; this is the read-side detector.
    pub fn check_grid_consistency(&self) -> Result<GridConsistencyReport> {
        let grid_len = self
            .headers()
            .wavenumber_grid()?
            .map(|g| g.len())
            .ok_or_else(|| anyhow!("Opacity database has no header"))?;

        let mut checked = 0;
        let mut mismatches = Vec::new();

        for (molecule, temperature, len) in self.continuum().curve_lengths()? {
            checked += 1;
            if len != grid_len {
                mismatches.push(GridMismatch {
                    table: "continuum",
                    molecule,
                    key: temperature.to_string(),
                    len,
                });
            }
        }

        for (molecule, ptid, len) in self.molecular().curve_lengths()? {
            checked += 1;
            if len != grid_len {
                mismatches.push(GridMismatch {
                    table: "molecular",
                    molecule,
                    key: ptid.to_string(),
                    len,
                });
            }
        }

        if !mismatches.is_empty() {
            warn!(
                "{} of {} curves do not match the {}-point wavenumber grid",
                mismatches.len(),
                checked,
                grid_len
            );
        }

        Ok(GridConsistencyReport {
            grid_len,
            checked,
            mismatches,
        })
    }

    /// Summarize counts, molecules and header metadata
    pub fn summary(&self) -> Result<DatabaseSummary> {
        let header = self.headers().get()?;
        Ok(DatabaseSummary {
            schema_status: self.schema_status()?.to_string(),
            grid_len: header.as_ref().map(|h| h.grid_len()),
            units: header.map(|h| h.units),
            continuum_count: self.continuum().count()?,
            continuum_molecules: self.continuum().molecules()?,
            molecular_count: self.molecular().count()?,
            molecular_molecules: self.molecular().molecules()?,
        })
    }
}

impl OpacitySource for OpacityDatabase {
    fn header(&self) -> Result<Option<OpacityHeader>> {
        self.headers().get()
    }

    fn continuum_molecules(&self) -> Result<Vec<String>> {
        self.continuum().molecules()
    }

    fn continuum_temperatures(&self, molecule: &str) -> Result<Vec<f64>> {
        self.continuum().temperatures(Some(molecule))
    }

    fn continuum_curve(&self, molecule: &str, temperature: f64) -> Result<Option<Vec<f64>>> {
        self.continuum().get(molecule, temperature)
    }

    fn molecular_molecules(&self) -> Result<Vec<String>> {
        self.molecular().molecules()
    }

    fn molecular_grid(&self, molecule: &str) -> Result<Vec<GridPoint>> {
        self.molecular().grid(molecule)
    }

    fn molecular_curve(&self, molecule: &str, ptid: u32) -> Result<Option<Vec<f64>>> {
        self.molecular().get(molecule, ptid)
    }
}
