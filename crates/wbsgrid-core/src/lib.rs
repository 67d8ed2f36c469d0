//! # wbsgrid-core
//!
//! Core domain model and traits for the wbsgrid progress grid.
//!
//! This crate provides:
//! - Domain types: `Row`, `Period`, `Dependency`, `CellKey`, `DataPayload`
//! - Derived types: `Bar`, `CurvePoint`
//! - Core traits: `Geometry` (cell rectangles) and `Paintable` (drawing surface)
//! - The typed event channel used by the progress store
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use wbsgrid_core::{leaf_rows, Period, Row};
//!
//! let rows = vec![Row::group("civil")
//!     .label("Civil Works")
//!     .child(Row::leaf("excavation").volume(1200.0, "m3"))
//!     .child(Row::leaf("backfill").volume(800.0, "m3"))];
//! let periods: Vec<Period> = (1..=8).map(|w| Period::new(format!("w{w}"))).collect();
//!
//! assert_eq!(leaf_rows(&rows).len(), 2);
//! assert_eq!(rows[0].children[0].level, 1);
//! assert_eq!(periods.len(), 8);
//! ```

pub mod events;
pub mod paint;

pub use events::{EventBus, StoreEvent, SubscriptionId};
pub use paint::{DisplayList, PaintOp, Paintable, StrokeStyle};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier for a row (WBS entity)
pub type EntityId = String;

/// Unique identifier for a period column
pub type PeriodId = String;

// ============================================================================
// Cell Keys
// ============================================================================

/// Address of a single progress cell: one leaf row in one period.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellKey {
    pub entity_id: EntityId,
    pub period_id: PeriodId,
}

impl CellKey {
    /// Separator used by the text form `"{entity}::{period}"`
    pub const SEPARATOR: &'static str = "::";

    pub fn new(entity_id: impl Into<String>, period_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            period_id: period_id.into(),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.entity_id, Self::SEPARATOR, self.period_id)
    }
}

impl FromStr for CellKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(Self::SEPARATOR) {
            Some((entity, period))
                if !entity.trim().is_empty()
                    && !period.trim().is_empty()
                    && !period.contains(Self::SEPARATOR) =>
            {
                Ok(Self::new(entity.trim(), period.trim()))
            }
            _ => Err(ParseError::InvalidCellKey(s.to_string())),
        }
    }
}

// ============================================================================
// Modes
// ============================================================================

/// Which progress series a store operation targets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    #[default]
    Planned,
    Actual,
}

impl ProgressMode {
    pub const ALL: [ProgressMode; 2] = [ProgressMode::Planned, ProgressMode::Actual];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressMode::Planned => "planned",
            ProgressMode::Actual => "actual",
        }
    }
}

impl fmt::Display for ProgressMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" | "plan" => Ok(ProgressMode::Planned),
            "actual" => Ok(ProgressMode::Actual),
            _ => Err(ParseError::InvalidProgressMode(s.to_string())),
        }
    }
}

/// Which visualization the coordinator shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Plain editable table
    #[default]
    Grid,
    /// Planned/actual bar overlay
    Gantt,
    /// Cumulative progress curve overlay
    Kurva,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Grid => "grid",
            ViewMode::Gantt => "gantt",
            ViewMode::Kurva => "kurva",
        }
    }

    /// Whether this mode paints a canvas overlay above the grid body
    pub fn has_overlay(&self) -> bool {
        !matches!(self, ViewMode::Grid)
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(ViewMode::Grid),
            "gantt" => Ok(ViewMode::Gantt),
            "kurva" => Ok(ViewMode::Kurva),
            _ => Err(ParseError::InvalidViewMode(s.to_string())),
        }
    }
}

/// How cell values are entered and displayed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// 0-100 percent of the row's scope
    #[default]
    Percentage,
    /// Quantity in the row's unit, stored as a percentage of `Row::volume`
    Volume,
    /// Monetary amount (actual mode only)
    Cost,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Percentage => "percentage",
            InputMode::Volume => "volume",
            InputMode::Cost => "cost",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" | "%" => Ok(InputMode::Percentage),
            "volume" => Ok(InputMode::Volume),
            "cost" => Ok(InputMode::Cost),
            _ => Err(ParseError::InvalidInputMode(s.to_string())),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// Position of a row in the WBS hierarchy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Group,
    Subgroup,
    Leaf,
}

/// A node in the work-breakdown structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Unique identifier
    pub id: EntityId,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Depth in the hierarchy (0 = top level)
    #[serde(default)]
    pub level: u32,
    /// Group, subgroup or leaf
    #[serde(rename = "type")]
    pub kind: RowKind,
    /// Planned quantity for volume input and volume weighting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Unit of `volume` (m3, kg, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Budgeted cost for cost weighting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Child rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Row>,
}

impl Row {
    fn with_kind(id: impl Into<String>, kind: RowKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            level: 0,
            kind,
            volume: None,
            unit: None,
            cost: None,
            children: Vec::new(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self::with_kind(id, RowKind::Group)
    }

    pub fn subgroup(id: impl Into<String>) -> Self {
        Self::with_kind(id, RowKind::Subgroup)
    }

    pub fn leaf(id: impl Into<String>) -> Self {
        Self::with_kind(id, RowKind::Leaf)
    }

    /// Set the display label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set planned volume and its unit
    pub fn volume(mut self, volume: f64, unit: impl Into<String>) -> Self {
        self.volume = Some(volume);
        self.unit = Some(unit.into());
        self
    }

    /// Set budgeted cost
    pub fn cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Add a child row one level below this one
    pub fn child(mut self, mut child: Row) -> Self {
        child.set_level(self.level + 1);
        self.children.push(child);
        self
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
        for child in &mut self.children {
            child.set_level(level + 1);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == RowKind::Leaf
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Collect all leaf rows in depth-first order
pub fn leaf_rows(rows: &[Row]) -> Vec<&Row> {
    fn collect<'a>(rows: &'a [Row], out: &mut Vec<&'a Row>) {
        for row in rows {
            if row.is_leaf() {
                out.push(row);
            }
            collect(&row.children, out);
        }
    }
    let mut leaves = Vec::new();
    collect(rows, &mut leaves);
    leaves
}

/// Find a row by ID (searches recursively)
pub fn find_row<'a>(rows: &'a [Row], id: &str) -> Option<&'a Row> {
    for row in rows {
        if row.id == id {
            return Some(row);
        }
        if let Some(found) = find_row(&row.children, id) {
            return Some(found);
        }
    }
    None
}

// ============================================================================
// Periods and Dependencies
// ============================================================================

/// A time column (usually one week)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub id: PeriodId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    /// Summary column (e.g. a month total); never editable
    #[serde(default)]
    pub aggregated: bool,
}

impl Period {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            start: None,
            end: None,
            aggregated: false,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn aggregated(mut self) -> Self {
        self.aggregated = true;
        self
    }
}

/// Visual link between two cells
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub from_entity: EntityId,
    pub from_period: PeriodId,
    pub to_entity: EntityId,
    pub to_period: PeriodId,
}

impl Dependency {
    pub fn new(from: CellKey, to: CellKey) -> Self {
        Self {
            from_entity: from.entity_id,
            from_period: from.period_id,
            to_entity: to.entity_id,
            to_period: to.period_id,
        }
    }

    pub fn from_key(&self) -> CellKey {
        CellKey::new(self.from_entity.clone(), self.from_period.clone())
    }

    pub fn to_key(&self) -> CellKey {
        CellKey::new(self.to_entity.clone(), self.to_period.clone())
    }
}

/// Wholesale replacement of rows, columns and dependencies
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPayload {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub columns: Vec<Period>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

// ============================================================================
// Derived Types
// ============================================================================

/// Planned vs. actual value of one cell, recomputed on every render
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    pub entity_id: EntityId,
    pub period_id: PeriodId,
    pub planned: f64,
    pub actual: f64,
    /// `actual - planned`
    pub variance: f64,
}

impl Bar {
    pub fn new(key: &CellKey, planned: f64, actual: f64) -> Self {
        Self {
            entity_id: key.entity_id.clone(),
            period_id: key.period_id.clone(),
            planned,
            actual,
            variance: actual - planned,
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.entity_id.clone(), self.period_id.clone())
    }
}

/// One point of a cumulative progress series
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePoint {
    pub period_id: PeriodId,
    /// 1-based; index 0 is reserved for the synthetic origin
    pub period_index: usize,
    /// Weighted contribution of this period, in percent of the project
    pub week_progress: f64,
    /// Running total, in percent of the project
    pub cumulative_progress: f64,
}

// ============================================================================
// Geometry
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in content pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// Shift by `(dx, dy)`
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Bounding rectangle of one cell
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRect {
    pub key: CellKey,
    pub rect: Rect,
}

/// Horizontal extent of one period column
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnExtent {
    pub period_id: PeriodId,
    pub index: usize,
    pub x: f64,
    pub width: f64,
}

impl ColumnExtent {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Counters for primitives an overlay painted or had to skip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetrics {
    pub painted: usize,
    pub skipped_missing_rect: usize,
    pub skipped_pinned: usize,
    /// Past the edge of a size-clamped canvas
    pub skipped_clipped: usize,
    pub skipped_dependencies: usize,
    pub unmatched_periods: usize,
}

impl RenderMetrics {
    pub fn skipped(&self) -> usize {
        self.skipped_missing_rect
            + self.skipped_pinned
            + self.skipped_clipped
            + self.skipped_dependencies
            + self.unmatched_periods
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Read-only view of grid layout that overlays paint against.
///
/// All coordinates are content coordinates of the scrollable body, with the
/// pinned columns included at the left.
pub trait Geometry {
    /// Rectangle of every leaf row × period cell, whether or not the row is
    /// currently materialized.
    fn cell_bounding_rects(&self) -> Vec<CellRect>;

    /// Total width of the pinned column band
    fn pinned_columns_width(&self) -> f64;

    /// Uniform row height
    fn row_height(&self) -> f64;

    /// Horizontal extent of every period column in order
    fn period_extents(&self) -> Vec<ColumnExtent>;

    /// Full unclipped `(width, height)` of the grid content
    fn content_size(&self) -> (f64, f64);

    /// Whether layout measurement has completed since the last data change
    fn is_measured(&self) -> bool {
        true
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure to interpret host-supplied text
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid cell key: {0:?} (expected \"entity::period\")")]
    InvalidCellKey(String),

    #[error("Invalid progress mode: {0:?}")]
    InvalidProgressMode(String),

    #[error("Invalid view mode: {0:?}")]
    InvalidViewMode(String),

    #[error("Invalid input mode: {0:?}")]
    InvalidInputMode(String),

    #[error("Invalid curve granularity: {0:?}")]
    InvalidGranularity(String),
}

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
