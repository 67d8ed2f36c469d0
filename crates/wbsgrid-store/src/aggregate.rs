//! Weighted progress aggregation.
//!
//! Raw cell values are per-period percentages of one leaf row. To plot the
//! project S-curve each leaf is weighted by its share of the project total:
//!
//! ```text
//! contribution(period) = Σ leaf (cell% / 100) × weight(leaf)
//! cumulative(period)   = Σ contribution(≤ period) / Σ weight × 100
//! ```
//!
//! Weights are cost shares when any leaf has a budgeted cost, volume shares
//! when any leaf has a volume, and an even `1/N` split otherwise.

use serde::{Deserialize, Serialize};

use wbsgrid_core::{leaf_rows, Bar, CellKey, CurvePoint, EntityId, Period, Row};

use crate::CellMap;

/// Default number of weekly periods per monthly bucket
pub const DEFAULT_BUCKET_SIZE: usize = 4;

/// Denominator used to weight leaf rows
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightBasis {
    Cost,
    Volume,
    Even,
}

/// Per-leaf weights, normalized so they sum to 1
#[derive(Clone, Debug, PartialEq)]
pub struct RowWeights {
    basis: WeightBasis,
    weights: Vec<(EntityId, f64)>,
}

impl RowWeights {
    pub fn from_rows(rows: &[Row]) -> Self {
        let leaves = leaf_rows(rows);
        let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0).unwrap_or(0.0);

        let total_cost: f64 = leaves.iter().map(|r| positive(r.cost)).sum();
        let total_volume: f64 = leaves.iter().map(|r| positive(r.volume)).sum();

        let (basis, weights) = if total_cost > 0.0 {
            (
                WeightBasis::Cost,
                leaves
                    .iter()
                    .map(|r| (r.id.clone(), positive(r.cost) / total_cost))
                    .collect(),
            )
        } else if total_volume > 0.0 {
            (
                WeightBasis::Volume,
                leaves
                    .iter()
                    .map(|r| (r.id.clone(), positive(r.volume) / total_volume))
                    .collect(),
            )
        } else {
            let even = if leaves.is_empty() {
                0.0
            } else {
                1.0 / leaves.len() as f64
            };
            (
                WeightBasis::Even,
                leaves.iter().map(|r| (r.id.clone(), even)).collect(),
            )
        };

        Self { basis, weights }
    }

    pub fn basis(&self) -> WeightBasis {
        self.basis
    }

    pub fn weight(&self, entity: &str) -> f64 {
        self.weights
            .iter()
            .find(|(id, _)| id == entity)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().map(|(_, w)| w).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(id, w)| (id.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Aggregation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AggregationConfig {
    /// Weekly periods per monthly bucket
    pub bucket_size: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

fn tracked_periods(periods: &[Period]) -> impl Iterator<Item = &Period> {
    periods.iter().filter(|p| !p.aggregated)
}

/// Weighted contribution of each non-aggregated period, in percent of the
/// total project weight.
pub fn period_contributions(weights: &RowWeights, periods: &[Period], cells: &CellMap) -> Vec<f64> {
    let total = weights.total();
    tracked_periods(periods)
        .map(|period| {
            if total <= 0.0 {
                return 0.0;
            }
            let sum: f64 = weights
                .iter()
                .map(|(entity, weight)| {
                    let key = CellKey::new(entity, period.id.as_str());
                    let pct = cells.get(&key).copied().unwrap_or(0.0).clamp(0.0, 100.0);
                    pct / 100.0 * weight
                })
                .sum();
            sum / total * 100.0
        })
        .collect()
}

/// Running total of [`period_contributions`], one point per period
pub fn cumulative_series(weights: &RowWeights, periods: &[Period], cells: &CellMap) -> Vec<CurvePoint> {
    let contributions = period_contributions(weights, periods, cells);
    let mut running = 0.0;
    tracked_periods(periods)
        .zip(contributions)
        .enumerate()
        .map(|(i, (period, week))| {
            running += week;
            CurvePoint {
                period_id: period.id.clone(),
                period_index: i + 1,
                week_progress: week,
                cumulative_progress: running,
            }
        })
        .collect()
}

/// Group consecutive points into buckets of `bucket_size`.
///
/// A bucket takes the id and cumulative value of its last period and the sum
/// of its weekly contributions. A trailing partial bucket is kept.
pub fn monthly_buckets(points: &[CurvePoint], bucket_size: usize) -> Vec<CurvePoint> {
    points
        .chunks(bucket_size.max(1))
        .enumerate()
        .filter_map(|(i, chunk)| {
            let last = chunk.last()?;
            Some(CurvePoint {
                period_id: last.period_id.clone(),
                period_index: i + 1,
                week_progress: chunk.iter().map(|p| p.week_progress).sum(),
                cumulative_progress: last.cumulative_progress,
            })
        })
        .collect()
}

/// Planned and actual cumulative series of one project
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SCurve {
    pub basis: WeightBasis,
    pub planned: Vec<CurvePoint>,
    pub actual: Vec<CurvePoint>,
}

/// Headline numbers of an S-curve
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveSummary {
    pub planned_final: f64,
    pub actual_final: f64,
    /// Last period with actual progress
    pub last_actual_period: Option<String>,
    /// Actual minus planned cumulative at `last_actual_period`
    pub deviation: Option<f64>,
}

impl SCurve {
    pub fn compute(rows: &[Row], periods: &[Period], planned: &CellMap, actual: &CellMap) -> Self {
        let weights = RowWeights::from_rows(rows);
        Self {
            basis: weights.basis(),
            planned: cumulative_series(&weights, periods, planned),
            actual: cumulative_series(&weights, periods, actual),
        }
    }

    /// Re-bucket both series (see [`monthly_buckets`])
    pub fn monthly(&self, bucket_size: usize) -> Self {
        Self {
            basis: self.basis,
            planned: monthly_buckets(&self.planned, bucket_size),
            actual: monthly_buckets(&self.actual, bucket_size),
        }
    }

    pub fn summary(&self) -> CurveSummary {
        let last = |series: &[CurvePoint]| series.last().map(|p| p.cumulative_progress).unwrap_or(0.0);
        let last_actual = self.actual.iter().rposition(|p| p.week_progress > 0.0);
        CurveSummary {
            planned_final: last(&self.planned),
            actual_final: last(&self.actual),
            last_actual_period: last_actual.map(|i| self.actual[i].period_id.clone()),
            deviation: last_actual.and_then(|i| {
                let planned = self.planned.get(i)?;
                Some(self.actual[i].cumulative_progress - planned.cumulative_progress)
            }),
        }
    }
}

/// One [`Bar`] per leaf row × period where either series has a value
pub fn derive_bars(rows: &[Row], periods: &[Period], planned: &CellMap, actual: &CellMap) -> Vec<Bar> {
    let mut bars = Vec::new();
    for row in leaf_rows(rows) {
        for period in tracked_periods(periods) {
            let key = CellKey::new(row.id.as_str(), period.id.as_str());
            let p = planned.get(&key).copied();
            let a = actual.get(&key).copied();
            if p.is_none() && a.is_none() {
                continue;
            }
            bars.push(Bar::new(&key, p.unwrap_or(0.0), a.unwrap_or(0.0)));
        }
    }
    bars
}
