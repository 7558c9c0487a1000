//! Database module
//!
//! This module provides the opacity storage layer, organized into:
//!
//! - **core**: Core database infrastructure (SQLite connections, schema management, blob codec)
//! - **opacity**: The opacity store in its relational and hierarchical forms
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper
//! │   ├── schema      # header/continuum/molecular definitions and status
//! │   └── blob        # little-endian f64 array encoding
//! │
//! └── opacity/        # Opacity storage
//!     ├── header      # wavenumber grid and units (single row)
//!     ├── continuum   # curves keyed by (molecule, temperature)
//!     ├── molecular   # curves keyed by (molecule, ptid)
//!     ├── pt_grid     # nearest (pressure, temperature) resolution
//!     └── document    # hierarchical JSON form
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use opacidb::database::{OpacityDatabase, OpacityHeader, OpacityUnits};
//!
//! let header = OpacityHeader::linear(200.0, 30000.0, 1000, OpacityUnits::default())?;
//! let db = OpacityDatabase::create("opacities.db", &header)?;
//! db.continuum().insert_grid(&["H2H2", "H2He"], &[300.0, 600.0], |_, _| Ok(vec![1e-30; 1000]))?;
//!
//! let curve = db.continuum().get("H2H2", 300.0)?;
//! ```

pub mod core;
pub mod opacity;

// SQLite connection and schema management
pub use core::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};

// Opacity store
pub use opacity::{
    condition_key, ContinuumRecord, ContinuumRepository, DatabaseSummary, DistanceMetric,
    DocumentAttrs, GridConsistencyReport, GridMismatch, GridPoint, HeaderRepository,
    MolecularEntry, MolecularRecord, MolecularRepository, OpacityDatabase, OpacityDocument,
    OpacityHeader, OpacitySource, OpacityUnits, PtGrid,
};

/// Ensure the data directory exists
pub fn ensure_data_dir(data_dir: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
