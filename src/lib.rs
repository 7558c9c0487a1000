#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! opacidb - Opacity lookup databases for radiative transfer
//!
//! opacidb stores absorption coefficients ("opacity curves") for a
//! radiative-transfer code. Continuum curves are keyed by molecule and
//! temperature, molecular curves by molecule and a (pressure, temperature)
//! grid point id (`ptid`). All curves share one wavenumber grid kept in the
//! header.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Storage, query and species resolution | `rusqlite`, `serde_json` |
//! | `display` | Lenses with table formatting | `tabled` |
//! | `cli` | The `opacidb` binary | All above + `clap`, `indicatif` |
//!
//! # Architecture
//!
//! - **[`database`]**: Opacity storage (always available)
//!   - `core`: SQLite connection management, schema definitions, blob codec
//!   - `opacity`: relational database, hierarchical document, nearest grid point
//!
//! - **[`species`]**: Splitting atmospheric species into continuum sources and
//!   molecular absorbers
//!
//! - **`lens`**: Query and output formatting layer (requires `display`)
//!
//! - **[`config`]**: Configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use opacidb::database::{DistanceMetric, OpacityDatabase, OpacityHeader, OpacityUnits};
//!
//! let header = OpacityHeader::linear(200.0, 30000.0, 1000, OpacityUnits::default())?;
//! let db = OpacityDatabase::create("opacities.db", &header)?;
//!
//! db.molecular().insert_grid(&["H2O"], &[(1e-3, 300.0), (1.0, 300.0)], |_, _, _| {
//!     Ok(vec![1e-30; 1000])
//! })?;
//!
//! let record = db.molecular().fetch_nearest("H2O", 0.8, 320.0, DistanceMetric::Raw)?;
//! ```

pub mod config;
pub mod database;
pub mod species;

// Lens module - feature gated
#[cfg(feature = "display")]
pub mod lens;

// =============================================================================
// Configuration (always available)
// =============================================================================

pub use config::OpacidbConfig;

// Shared file info types (used by the config and info commands)
pub use config::{
    format_size, get_document_info, get_sqlite_info, DocumentInfo, SqliteDatabaseInfo,
};

// =============================================================================
// Database Module - Re-export commonly used types (always available)
// =============================================================================

// Core database types
pub use database::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};

// Opacity store
pub use database::{
    DistanceMetric, GridPoint, OpacityDatabase, OpacityDocument, OpacityHeader, OpacitySource,
    OpacityUnits,
};

// Species resolution
pub use species::{needed_continuum, resolve_species, strip_continuum_species, SpeciesSplit};

// =============================================================================
// Lens Module - Feature-gated exports
// =============================================================================

#[cfg(feature = "display")]
pub use lens::utils::OutputFormat;
