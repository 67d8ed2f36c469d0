//! # wbsgrid-store
//!
//! Progress data for the wbsgrid views.
//!
//! This crate provides:
//! - `ProgressStore`: planned/actual cell values with pending-vs-committed
//!   separation and memoized merged views
//! - Aggregation: weighted per-period contributions, cumulative S-curve
//!   series, monthly bucketing
//! - Bar derivation for the timeline overlay
//!
//! ## Example
//!
//! ```rust
//! use wbsgrid_core::{Period, ProgressMode, Row};
//! use wbsgrid_store::{ProgressStore, SCurve};
//!
//! let rows = vec![Row::leaf("a"), Row::leaf("b")];
//! let periods = vec![Period::new("w1"), Period::new("w2")];
//!
//! let mut store = ProgressStore::new();
//! store.set_cell_value("a", "w1", "50").unwrap();
//! store.set_cell_value("b", "w2", "100").unwrap();
//! store.commit_changes();
//!
//! let planned = store.get_all_cells_for_mode(ProgressMode::Planned);
//! let actual = store.get_all_cells_for_mode(ProgressMode::Actual);
//! let curve = SCurve::compute(&rows, &periods, &planned, &actual);
//! assert_eq!(curve.planned[1].cumulative_progress, 75.0);
//! ```

pub mod aggregate;
pub mod store;

pub use aggregate::{
    cumulative_series, derive_bars, monthly_buckets, period_contributions, AggregationConfig,
    CurveSummary, RowWeights, SCurve, WeightBasis, DEFAULT_BUCKET_SIZE,
};
pub use store::{parse_cell_input, CellMap, ModeState, PendingChange, ProgressStore, StoreError};
