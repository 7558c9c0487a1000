//! Header repository
//!
//! The header is a single row carrying the wavenumber grid shared by every
//! stored opacity curve, plus the unit strings for each axis. It is written
//! once when the database is created and only read afterwards.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::database::core::blob::{decode_f64s, encode_f64s};

/// Row id used for the single header record
const HEADER_ROW_ID: i64 = 1;

/// Unit strings recorded in the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpacityUnits {
    pub pressure: String,
    pub temperature: String,
    pub continuum: String,
    pub molecular: String,
}

impl Default for OpacityUnits {
    fn default() -> Self {
        Self {
            pressure: "bar".to_string(),
            temperature: "K".to_string(),
            continuum: "cm-1 amagat-2".to_string(),
            molecular: "cm2/molecule".to_string(),
        }
    }
}

/// Global metadata for an opacity database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpacityHeader {
    /// Spectral sample points shared by all opacity curves
    pub wavenumber_grid: Vec<f64>,
    pub units: OpacityUnits,
}

impl OpacityHeader {
    pub fn new(wavenumber_grid: Vec<f64>, units: OpacityUnits) -> Self {
        Self {
            wavenumber_grid,
            units,
        }
    }

    /// Build a header with a linearly spaced grid of `points` samples over `[min, max]`
    pub fn linear(min: f64, max: f64, points: usize, units: OpacityUnits) -> Result<Self> {
        if points == 0 {
            return Err(anyhow!("Wavenumber grid needs at least one point"));
        }
        if !(min.is_finite() && max.is_finite()) || max < min {
            return Err(anyhow!(
                "Invalid wavenumber range: min={} max={}",
                min,
                max
            ));
        }

        let grid = if points == 1 {
            vec![min]
        } else {
            let step = (max - min) / (points - 1) as f64;
            (0..points).map(|i| min + step * i as f64).collect()
        };

        Ok(Self::new(grid, units))
    }

    /// Number of samples every opacity curve is expected to have
    pub fn grid_len(&self) -> usize {
        self.wavenumber_grid.len()
    }
}

/// Repository for the header relation
pub struct HeaderRepository<'a> {
    conn: &'a Connection,
}

impl<'a> HeaderRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Write the header row, replacing any previous one
    pub fn write(&self, header: &OpacityHeader) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO header
                 (id, pressure_unit, temperature_unit, wavenumber_grid, continuum_unit, molecular_unit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    HEADER_ROW_ID,
                    header.units.pressure,
                    header.units.temperature,
                    encode_f64s(&header.wavenumber_grid),
                    header.units.continuum,
                    header.units.molecular,
                ],
            )
            .map_err(|e| anyhow!("Failed to write header: {}", e))?;
        Ok(())
    }

    /// Read the header, or `None` if it has not been written
    ///
    /// Files produced elsewhere may use a different id for their only header
    /// row, so the lowest id is taken rather than a fixed one.
    pub fn get(&self) -> Result<Option<OpacityHeader>> {
        let result = self.conn.query_row(
            "SELECT pressure_unit, temperature_unit, wavenumber_grid, continuum_unit, molecular_unit
             FROM header ORDER BY id LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<Vec<u8>>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        );

        let (pressure, temperature, grid, continuum, molecular) = match result {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(anyhow!("Failed to read header: {}", e)),
        };

        let wavenumber_grid = match grid {
            Some(bytes) => decode_f64s(&bytes)?,
            None => Vec::new(),
        };

        Ok(Some(OpacityHeader {
            wavenumber_grid,
            units: OpacityUnits {
                pressure: pressure.unwrap_or_default(),
                temperature: temperature.unwrap_or_default(),
                continuum: continuum.unwrap_or_default(),
                molecular: molecular.unwrap_or_default(),
            },
        }))
    }

    /// Shortcut for the wavenumber grid alone
    pub fn wavenumber_grid(&self) -> Result<Option<Vec<f64>>> {
        Ok(self.get()?.map(|h| h.wavenumber_grid))
    }
}
