//! wbsgrid-grid: Virtualized grid engine
//!
//! Flattens the WBS tree into a virtualized row list, lays out pinned and
//! period columns, runs the inline cell editor, and serves the cell
//! geometry the overlays paint against.
//!
//! # Example
//!
//! ```rust
//! use wbsgrid_core::{Geometry, Period, Row};
//! use wbsgrid_grid::{GridConfig, GridEngine};
//! use wbsgrid_store::ProgressStore;
//!
//! let mut grid = GridEngine::new(GridConfig::default());
//! grid.set_data(
//!     vec![Row::group("A").child(Row::leaf("A.1")).child(Row::leaf("A.2"))],
//!     vec![Period::new("w1"), Period::new("w2"), Period::new("w3")],
//! );
//! grid.set_viewport(1200.0, 600.0);
//!
//! let store = ProgressStore::new();
//! grid.measure(&store);
//! assert_eq!(grid.cell_bounding_rects().len(), 2 * 3);
//! ```

pub mod columns;
pub mod debounce;
pub mod editor;
pub mod engine;
pub mod format;
pub mod rows;
pub mod virtualizer;

pub use columns::{ColumnDef, ColumnKind, ColumnModel, InfoField};
pub use debounce::{Debouncer, DEFAULT_RESIZE_DEBOUNCE_MS};
pub use editor::{
    validate_input, CellChange, CellEditor, Direction, EditError, EditEvent, EditOutcome,
    EditState, EditTarget, KeyInput, ValueType,
};
pub use engine::{
    header_transform, is_cell_editable, GridEngine, GridView, RenderStats, RenderedCell,
    RenderedRow, ScrollUpdate,
};
pub use format::CellFormatter;
pub use rows::{FlatRow, RowModel};
pub use virtualizer::{VirtualItem, Virtualizer};

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Smallest row height the grid lays out
pub const MIN_ROW_HEIGHT: f64 = 1.0;

/// Grid layout configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GridConfig {
    /// Fixed height of every row
    pub row_height: f64,
    /// Rows materialized beyond each viewport edge
    pub overscan: usize,
    pub header_height: f64,
    pub label_width: f64,
    /// Pinned info columns after the label column
    pub info_columns: Vec<InfoField>,
    pub info_width: f64,
    pub period_width: f64,
    /// Prefix for cost amounts
    pub currency: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_height: 32.0,
            overscan: 6,
            header_height: 40.0,
            label_width: 280.0,
            info_columns: vec![InfoField::Volume, InfoField::Unit],
            info_width: 80.0,
            period_width: 72.0,
            currency: "$".into(),
        }
    }
}

impl GridConfig {
    pub fn row_height(mut self, height: f64) -> Self {
        self.row_height = height;
        self
    }

    pub fn overscan(mut self, rows: usize) -> Self {
        self.overscan = rows;
        self
    }

    pub fn header_height(mut self, height: f64) -> Self {
        self.header_height = height;
        self
    }

    pub fn label_width(mut self, width: f64) -> Self {
        self.label_width = width;
        self
    }

    pub fn info_columns(mut self, fields: Vec<InfoField>) -> Self {
        self.info_columns = fields;
        self
    }

    pub fn info_width(mut self, width: f64) -> Self {
        self.info_width = width;
        self
    }

    pub fn period_width(mut self, width: f64) -> Self {
        self.period_width = width;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Clamp values the layout cannot work with
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.row_height = self.row_height.max(MIN_ROW_HEIGHT);
        self
    }
}
