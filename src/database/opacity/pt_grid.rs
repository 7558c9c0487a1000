//! Pressure-temperature grid and nearest grid point resolution
//!
//! Molecular opacities are tabulated on a per-molecule list of
//! (pressure, temperature) points, each labelled with a `ptid`. Resolving an
//! arbitrary (pressure, temperature) request means scanning those points for
//! the one closest in Euclidean distance. Grids hold tens to hundreds of
//! points, so a linear scan is used.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tabulated (pressure, temperature) point of one molecule's grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub ptid: u32,
    pub pressure: f64,
    pub temperature: f64,
}

/// How distances between (pressure, temperature) pairs are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Plain Euclidean distance on the raw values
    ///
    /// Pressure and temperature are compared in their stored units, so the
    /// axis with the larger numeric spread dominates.
    #[default]
    Raw,
    /// Euclidean distance after scaling each axis by the grid's range
    Normalized,
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::Raw => write!(f, "raw"),
            DistanceMetric::Normalized => write!(f, "normalized"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" | "euclidean" => Ok(DistanceMetric::Raw),
            "normalized" | "normalised" | "scaled" => Ok(DistanceMetric::Normalized),
            _ => Err(format!(
                "Unknown distance metric '{}'. Valid metrics: raw, normalized",
                s
            )),
        }
    }
}

/// One molecule's tabulated grid, ordered by ptid
#[derive(Debug, Clone, Default)]
pub struct PtGrid {
    points: Vec<GridPoint>,
}

impl PtGrid {
    pub fn new(mut points: Vec<GridPoint>) -> Self {
        points.sort_by_key(|p| p.ptid);
        Self { points }
    }

    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Look up a point by its ptid
    pub fn get(&self, ptid: u32) -> Option<&GridPoint> {
        self.points.iter().find(|p| p.ptid == ptid)
    }

    /// Find the grid point closest to `(pressure, temperature)`
    ///
    /// Returns `None` for an empty grid or a NaN request. On equal distance
    /// the lower ptid wins.
    pub fn nearest(
        &self,
        pressure: f64,
        temperature: f64,
        metric: DistanceMetric,
    ) -> Option<&GridPoint> {
        let (p_scale, t_scale) = match metric {
            DistanceMetric::Raw => (1.0, 1.0),
            DistanceMetric::Normalized => self.axis_ranges(),
        };

        let mut best: Option<(&GridPoint, f64)> = None;
        for point in &self.points {
            let dp = (point.pressure - pressure) / p_scale;
            let dt = (point.temperature - temperature) / t_scale;
            let dist = (dp * dp + dt * dt).sqrt();
            if dist.is_nan() {
                continue;
            }
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((point, dist)),
            }
        }

        best.map(|(point, _)| point)
    }

    /// Range of each axis over the grid
    fn axis_ranges(&self) -> (f64, f64) {
        (
            axis_span(self.points.iter().map(|p| p.pressure)),
            axis_span(self.points.iter().map(|p| p.temperature)),
        )
    }
}

/// Spread of the values; a degenerate axis scales by 1
fn axis_span(values: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let span = max - min;
    if span.is_finite() && span > 0.0 {
        span
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> PtGrid {
        PtGrid::new(vec![
            GridPoint {
                ptid: 1,
                pressure: 0.001,
                temperature: 300.0,
            },
            GridPoint {
                ptid: 2,
                pressure: 100.0,
                temperature: 300.0,
            },
            GridPoint {
                ptid: 3,
                pressure: 0.001,
                temperature: 1000.0,
            },
            GridPoint {
                ptid: 4,
                pressure: 100.0,
                temperature: 1000.0,
            },
        ])
    }

    #[test]
    fn test_exact_point_returns_own_ptid() {
        let grid = grid();
        for point in grid.points() {
            let found = grid
                .nearest(point.pressure, point.temperature, DistanceMetric::Raw)
                .unwrap();
            assert_eq!(found.ptid, point.ptid);

            let found = grid
                .nearest(point.pressure, point.temperature, DistanceMetric::Normalized)
                .unwrap();
            assert_eq!(found.ptid, point.ptid);
        }
    }

    #[test]
    fn test_empty_grid() {
        let grid = PtGrid::default();
        assert!(grid.is_empty());
        assert!(grid.nearest(1.0, 300.0, DistanceMetric::Raw).is_none());
    }

    #[test]
    fn test_raw_metric_nearest() {
        let grid = grid();
        let raw = grid.nearest(90.0, 640.0, DistanceMetric::Raw).unwrap();
        assert_eq!(raw.ptid, 2);

        let raw = grid.nearest(1.0, 700.0, DistanceMetric::Raw).unwrap();
        assert_eq!(raw.ptid, 3);
    }

    #[test]
    fn test_normalized_metric_differs_from_raw() {
        let grid = PtGrid::new(vec![
            GridPoint {
                ptid: 1,
                pressure: 1.0,
                temperature: 500.0,
            },
            GridPoint {
                ptid: 2,
                pressure: 10.0,
                temperature: 400.0,
            },
        ]);

        // Raw: ~40.8 to #1 against ~60.0 to #2.
        let raw = grid.nearest(9.0, 460.0, DistanceMetric::Raw).unwrap();
        assert_eq!(raw.ptid, 1);

        // Normalized: ~0.98 to #1 against ~0.61 to #2.
        let normalized = grid.nearest(9.0, 460.0, DistanceMetric::Normalized).unwrap();
        assert_eq!(normalized.ptid, 2);
    }

    #[test]
    fn test_nan_request_is_empty() {
        let grid = grid();
        assert!(grid.nearest(f64::NAN, 300.0, DistanceMetric::Raw).is_none());
    }

    #[test]
    fn test_tie_prefers_lower_ptid() {
        let grid = PtGrid::new(vec![
            GridPoint {
                ptid: 2,
                pressure: 2.0,
                temperature: 0.0,
            },
            GridPoint {
                ptid: 1,
                pressure: 0.0,
                temperature: 0.0,
            },
        ]);
        let found = grid.nearest(1.0, 0.0, DistanceMetric::Raw).unwrap();
        assert_eq!(found.ptid, 1);
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("raw".parse::<DistanceMetric>().unwrap(), DistanceMetric::Raw);
        assert_eq!(
            "Normalized".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Normalized
        );
        assert!("manhattan".parse::<DistanceMetric>().is_err());
        assert_eq!(DistanceMetric::Normalized.to_string(), "normalized");
    }

    #[test]
    fn test_get_by_ptid() {
        let grid = grid();
        assert_eq!(grid.get(3).unwrap().temperature, 1000.0);
        assert!(grid.get(42).is_none());
    }
}
