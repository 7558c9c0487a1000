//! Database schema management
//!
//! This module provides the schema definitions for the relational opacity
//! store. The file holds exactly three relations: `header`, `continuum` and
//! `molecular`. The schema version lives in `PRAGMA user_version` rather than
//! a meta table so that no extra relation is introduced.

use anyhow::{anyhow, Result};
use rusqlite::Connection;

/// Current schema version
/// Increment this when making breaking schema changes
pub const SCHEMA_VERSION: u32 = 1;

/// Names of the relations every opacity database must contain
pub const REQUIRED_TABLES: [&str; 3] = ["header", "continuum", "molecular"];

/// Schema definitions for all tables in the opacity database
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Global metadata: shared wavenumber grid and unit strings (single row)
    pub const HEADER_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS header (
            id INTEGER PRIMARY KEY,
            pressure_unit TEXT,
            temperature_unit TEXT,
            wavenumber_grid BLOB,
            continuum_unit TEXT,
            molecular_unit TEXT
        );
    "#;

    /// Continuum opacity curves, one per (molecule, temperature)
    pub const CONTINUUM_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS continuum (
            id INTEGER PRIMARY KEY,
            molecule TEXT,
            temperature REAL,
            opacity BLOB
        );
    "#;

    /// Molecular opacity curves, one per (molecule, pressure, temperature)
    pub const MOLECULAR_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS molecular (
            id INTEGER PRIMARY KEY,
            ptid INTEGER,
            molecule TEXT,
            pressure REAL,
            temperature REAL,
            opacity BLOB
        );
    "#;

    pub const INDEXES: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_continuum_molecule_temperature ON continuum(molecule, temperature)",
        "CREATE INDEX IF NOT EXISTS idx_molecular_molecule_ptid ON molecular(molecule, ptid)",
    ];
}

/// Schema manager for the opacity database
///
/// Handles schema initialization, version checking, and resets.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Initialize the database schema
    ///
    /// Creates all tables and indexes if they don't exist and stamps the
    /// schema version.
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::HEADER_TABLE, [])
            .map_err(|e| anyhow!("Failed to create header table: {}", e))?;

        self.conn
            .execute(SchemaDefinitions::CONTINUUM_TABLE, [])
            .map_err(|e| anyhow!("Failed to create continuum table: {}", e))?;

        self.conn
            .execute(SchemaDefinitions::MOLECULAR_TABLE, [])
            .map_err(|e| anyhow!("Failed to create molecular table: {}", e))?;

        for index_sql in SchemaDefinitions::INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("Failed to create index: {}", e))?;
        }

        self.set_schema_version(SCHEMA_VERSION)?;

        Ok(())
    }

    /// Check the current schema status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        let mut present = 0;
        for table in REQUIRED_TABLES {
            if self.table_exists(table)? {
                present += 1;
            }
        }

        if present == 0 {
            return Ok(SchemaStatus::NotInitialized);
        }
        if present < REQUIRED_TABLES.len() {
            return Ok(SchemaStatus::Corrupted);
        }

        // Files written by other tools carry no version stamp; accept them as-is
        let current_version = self.get_schema_version()?;
        if current_version == 0 || current_version == SCHEMA_VERSION {
            Ok(SchemaStatus::Current)
        } else if current_version < SCHEMA_VERSION {
            Ok(SchemaStatus::NeedsMigration {
                from: current_version,
                to: SCHEMA_VERSION,
            })
        } else {
            Ok(SchemaStatus::Incompatible {
                database_version: current_version,
                required_version: SCHEMA_VERSION,
            })
        }
    }

    /// Get the schema version stamped in the database (0 if never stamped)
    pub fn get_schema_version(&self) -> Result<u32> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to read schema version: {}", e))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        // PRAGMA does not accept bound parameters
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {}", version))
            .map_err(|e| anyhow!("Failed to set schema version: {}", e))
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let exists: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table '{}': {}", table, e))?;
        Ok(exists > 0)
    }

    /// Reset the database by dropping all relations
    ///
    /// Indexes are dropped together with their tables.
    pub fn reset(&self) -> Result<()> {
        self.conn.execute("DROP TABLE IF EXISTS molecular", [])?;
        self.conn.execute("DROP TABLE IF EXISTS continuum", [])?;
        self.conn.execute("DROP TABLE IF EXISTS header", [])?;
        self.set_schema_version(0)?;

        Ok(())
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// Database is not initialized (fresh database)
    NotInitialized,

    /// Schema is current and valid
    Current,

    /// Schema needs migration from an older version
    NeedsMigration { from: u32, to: u32 },

    /// Database is from a newer version (incompatible)
    Incompatible {
        database_version: u32,
        required_version: u32,
    },

    /// Schema is corrupted (some relations missing)
    Corrupted,
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::NotInitialized => write!(f, "not initialized"),
            SchemaStatus::Current => write!(f, "current"),
            SchemaStatus::NeedsMigration { from, to } => {
                write!(f, "needs migration (v{} -> v{})", from, to)
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => write!(
                f,
                "incompatible (database v{}, required v{})",
                database_version, required_version
            ),
            SchemaStatus::Corrupted => write!(f, "corrupted"),
        }
    }
}
