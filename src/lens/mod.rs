//! Lens module
//!
//! This module provides high-level "lens" abstractions that combine business logic
//! with output formatting. Lenses are designed to be reusable across different
//! interfaces; the `opacidb` binary is the main consumer.
//!
//! # Architecture
//!
//! Each lens module exports:
//! - A **Lens struct** (e.g., `OpacityLens`) - the main entry point for all operations
//! - **Args structs** - input arguments for lens methods
//! - **Output types** - row types that render as tables, PSV or JSON
//!
//! # Usage
//!
//! ```rust,ignore
//! use opacidb::database::OpacityDatabase;
//! use opacidb::lens::opacity::{MolecularNearestArgs, OpacityLens};
//! use opacidb::lens::utils::{format_rows, OutputFormat};
//!
//! let db = OpacityDatabase::open_read_only("opacities.db")?;
//! let lens = OpacityLens::new(&db);
//! let grid = lens.molecular_grid("H2O")?;
//! println!("{}", format_rows(&grid, OutputFormat::Markdown)?);
//! ```

pub mod opacity;
pub mod utils;
