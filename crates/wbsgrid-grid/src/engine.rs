//! Virtualized grid engine.
//!
//! Owns the row, column and virtualizer models plus the cell editor, and
//! produces a [`GridView`] of the materialized rows for the host to paint.
//! It is also the [`Geometry`] provider the overlays draw against, so the
//! rectangles handed to the bar overlay are computed by the same code that
//! places the table cells.
//!
//! Re-render triggers:
//! - scroll: transform only ([`GridEngine::on_scroll`])
//! - data or column change: full rebuild ([`GridEngine::render`])
//! - input mode toggle: formatter pass over the current view

use serde::Serialize;
use std::ops::Range;
use tracing::{debug, warn};

use wbsgrid_core::{
    CellKey, CellRect, ColumnExtent, Geometry, InputMode, Period, ProgressMode, Rect, Row, RowKind,
};
use wbsgrid_store::ProgressStore;

use crate::columns::{ColumnDef, ColumnKind, ColumnModel, InfoField};
use crate::editor::{
    validate_input, CellEditor, Direction, EditError, EditEvent, EditOutcome, EditTarget,
    ValueType,
};
use crate::format::{money, plain_number, CellFormatter};
use crate::rows::{FlatRow, RowModel};
use crate::virtualizer::Virtualizer;
use crate::GridConfig;

/// A cell accepts input iff its row is a leaf, its column is a
/// non-aggregated period, and cost input only happens in actual mode.
pub fn is_cell_editable(
    row: &FlatRow,
    column: &ColumnDef,
    input_mode: InputMode,
    progress_mode: ProgressMode,
) -> bool {
    row.is_leaf()
        && column.is_editable_period()
        && (input_mode != InputMode::Cost || progress_mode == ProgressMode::Actual)
}

/// `translateX(-Npx)` for the sticky header
pub fn header_transform(scroll_left: f64) -> String {
    format!("translateX(-{}px)", scroll_left.max(0.0))
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCell {
    pub column_id: String,
    /// Set for period columns only
    pub key: Option<CellKey>,
    pub rect: Rect,
    /// Sticky `left` for pinned columns
    pub sticky_left: Option<f64>,
    pub text: String,
    pub editable: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedRow {
    pub index: usize,
    pub id: String,
    pub label: String,
    pub level: u32,
    pub kind: RowKind,
    pub y: f64,
    pub has_children: bool,
    pub expanded: bool,
    pub cells: Vec<RenderedCell>,
}

/// Materialized slice of the grid
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridView {
    pub rows: Vec<RenderedRow>,
    pub total_height: f64,
    pub total_width: f64,
    pub pinned_width: f64,
    pub range: Range<usize>,
}

/// Result of a scroll event
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollUpdate {
    pub scroll_top: f64,
    pub scroll_left: f64,
    pub header_transform: String,
    pub range: Range<usize>,
    /// The materialized range moved; the host should call `render`
    pub range_changed: bool,
}

/// How often each re-render path ran
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub full_rebuilds: usize,
    pub transform_updates: usize,
    pub format_passes: usize,
}

pub struct GridEngine {
    config: GridConfig,
    rows: RowModel,
    periods: Vec<Period>,
    columns: ColumnModel,
    virtualizer: Virtualizer,
    editor: CellEditor,
    formatter: CellFormatter,
    viewport_width: f64,
    scroll_left: f64,
    stats: RenderStats,
    view: GridView,
}

impl GridEngine {
    pub fn new(config: GridConfig) -> Self {
        let config = config.normalized();
        let virtualizer = Virtualizer::new(config.row_height, config.overscan);
        let formatter = CellFormatter::new(InputMode::Percentage, config.currency.clone());
        let columns = ColumnModel::standard(
            &[],
            config.label_width,
            &config.info_columns,
            config.info_width,
            config.period_width,
        );
        Self {
            config,
            rows: RowModel::default(),
            periods: Vec::new(),
            columns,
            virtualizer,
            editor: CellEditor::new(),
            formatter,
            viewport_width: 0.0,
            scroll_left: 0.0,
            stats: RenderStats::default(),
            view: GridView::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn rows(&self) -> &RowModel {
        &self.rows
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn editor(&self) -> &CellEditor {
        &self.editor
    }

    pub fn input_mode(&self) -> InputMode {
        self.formatter.input_mode
    }

    pub fn view(&self) -> &GridView {
        &self.view
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn viewport_width(&self) -> f64 {
        self.viewport_width
    }

    pub fn scroll_left(&self) -> f64 {
        self.scroll_left
    }

    pub fn scroll_top(&self) -> f64 {
        self.virtualizer.scroll_top()
    }

    // ------------------------------------------------------------------------
    // Model changes
    // ------------------------------------------------------------------------

    /// Replace rows and periods. Layout becomes unmeasured until the next
    /// [`measure`](Self::measure).
    pub fn set_data(&mut self, rows: Vec<Row>, periods: Vec<Period>) {
        self.rows.set_rows(rows);
        self.columns = ColumnModel::standard(
            &periods,
            self.config.label_width,
            &self.config.info_columns,
            self.config.info_width,
            self.config.period_width,
        );
        self.periods = periods;
        self.virtualizer.set_row_count(self.rows.len());
        self.editor.reset();
        self.view = GridView::default();
        debug!(
            rows = self.rows.len(),
            periods = self.periods.len(),
            "grid data replaced"
        );
    }

    /// Body viewport size; the header height is taken off the height
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width.max(0.0);
        self.virtualizer
            .set_viewport_height(height - self.config.header_height);
        self.scroll_left = self.clamp_scroll_left(self.scroll_left);
    }

    /// Flip a parent row. Returns false if nothing changed.
    pub fn toggle_row(&mut self, id: &str) -> bool {
        let changed = self.rows.toggle(id);
        if changed {
            self.virtualizer.set_row_count(self.rows.len());
        }
        changed
    }

    pub fn expand_all(&mut self) {
        self.rows.expand_all();
        self.virtualizer.set_row_count(self.rows.len());
    }

    pub fn collapse_all(&mut self) {
        self.rows.collapse_all();
        self.virtualizer.set_row_count(self.rows.len());
    }

    pub fn expand_to_level(&mut self, level: u32) {
        self.rows.expand_to_level(level);
        self.virtualizer.set_row_count(self.rows.len());
    }

    /// Switch the formatter and re-run it over the materialized cells only
    pub fn set_input_mode(&mut self, mode: InputMode, store: &ProgressStore) {
        if self.formatter.input_mode == mode {
            return;
        }
        self.formatter.input_mode = mode;
        if self.editor.is_editing() {
            self.editor.reset();
        }
        self.reformat(store);
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    fn clamp_scroll_left(&self, left: f64) -> f64 {
        let max = (self.columns.total_width() - self.viewport_width).max(0.0);
        if left.is_finite() {
            left.clamp(0.0, max)
        } else {
            0.0
        }
    }

    /// Apply a scroll position. No rows are rebuilt here.
    pub fn on_scroll(&mut self, top: f64, left: f64) -> ScrollUpdate {
        let scroll_top = self.virtualizer.set_scroll_top(top);
        self.scroll_left = self.clamp_scroll_left(left);
        self.stats.transform_updates += 1;
        let range = self.virtualizer.visible_range();
        ScrollUpdate {
            scroll_top,
            scroll_left: self.scroll_left,
            header_transform: header_transform(self.scroll_left),
            range_changed: range != self.view.range,
            range,
        }
    }

    pub fn header_transform(&self) -> String {
        header_transform(self.scroll_left)
    }

    /// Rebuild the materialized rows for the current scroll position
    pub fn render(&mut self, store: &ProgressStore) -> &GridView {
        let items = self.virtualizer.virtual_items();
        let mut rows = Vec::with_capacity(items.len());
        for item in &items {
            let Some(row) = self.rows.get(item.index) else {
                continue;
            };
            let cells = (0..self.columns.len())
                .filter_map(|index| self.render_cell(row, index, item.start, store))
                .collect();
            rows.push(RenderedRow {
                index: item.index,
                id: row.id.clone(),
                label: row.label.clone(),
                level: row.level,
                kind: row.kind,
                y: item.start,
                has_children: row.has_children,
                expanded: row.expanded,
                cells,
            });
        }

        self.view = GridView {
            rows,
            total_height: self.virtualizer.total_height(),
            total_width: self.columns.total_width(),
            pinned_width: self.columns.pinned_width(),
            range: self.virtualizer.visible_range(),
        };
        self.stats.full_rebuilds += 1;
        debug!(
            materialized = self.view.rows.len(),
            range = ?self.view.range,
            "grid rows rebuilt"
        );
        &self.view
    }

    /// Forced render pass that completes virtualizer measurement
    pub fn measure(&mut self, store: &ProgressStore) {
        self.render(store);
        self.virtualizer.measure();
    }

    fn render_cell(
        &self,
        row: &FlatRow,
        index: usize,
        y: f64,
        store: &ProgressStore,
    ) -> Option<RenderedCell> {
        let column = self.columns.get(index)?;
        let x = self.columns.x(index)?;
        let key = column
            .is_period()
            .then(|| CellKey::new(row.id.clone(), column.id.clone()));
        Some(RenderedCell {
            column_id: column.id.clone(),
            rect: Rect::new(x, y, column.width, self.config.row_height),
            sticky_left: self.columns.sticky_offset(index),
            text: self.cell_text(row, column, store),
            editable: is_cell_editable(row, column, self.input_mode(), store.current_mode()),
            key,
        })
    }

    fn cell_text(&self, row: &FlatRow, column: &ColumnDef, store: &ProgressStore) -> String {
        match &column.kind {
            ColumnKind::Label => row.label.clone(),
            ColumnKind::Info { field } => match field {
                InfoField::Volume => row.volume.map(|v| plain_number(v, 2)).unwrap_or_default(),
                InfoField::Unit => row.unit.clone().unwrap_or_default(),
                InfoField::Cost => row
                    .cost
                    .map(|c| money(c, &self.formatter.currency))
                    .unwrap_or_default(),
            },
            ColumnKind::Period { .. } => {
                if !row.is_leaf() {
                    return String::new();
                }
                let key = CellKey::new(row.id.clone(), column.id.clone());
                self.formatter
                    .display(stored_value(store, self.input_mode(), &key), row)
            }
        }
    }

    /// Formatter pass over the current view; rows are not rebuilt
    fn reformat(&mut self, store: &ProgressStore) {
        let mut view = std::mem::take(&mut self.view);
        for rendered in &mut view.rows {
            let Some(row) = self.rows.get(rendered.index) else {
                continue;
            };
            for cell in &mut rendered.cells {
                let Some(index) = self.columns.index_of(&cell.column_id) else {
                    continue;
                };
                if let Some(column) = self.columns.get(index) {
                    cell.text = self.cell_text(row, column, store);
                    cell.editable =
                        is_cell_editable(row, column, self.input_mode(), store.current_mode());
                }
            }
        }
        self.view = view;
        self.stats.format_passes += 1;
    }

    /// Re-run the formatter on every materialized cell, for example after a
    /// progress mode switch.
    pub fn refresh_text(&mut self, store: &ProgressStore) {
        self.reformat(store);
    }

    fn refresh_cell(&mut self, key: &CellKey, store: &ProgressStore) {
        let Some(row_index) = self.rows.index_of(&key.entity_id) else {
            return;
        };
        let Some(col_index) = self.columns.index_of(&key.period_id) else {
            return;
        };
        let (Some(row), Some(column)) = (self.rows.get(row_index), self.columns.get(col_index))
        else {
            return;
        };
        let text = self.cell_text(row, column, store);
        let target = self
            .view
            .rows
            .iter_mut()
            .filter(|r| r.index == row_index)
            .flat_map(|r| r.cells.iter_mut())
            .find(|c| c.key.as_ref() == Some(key));
        if let Some(cell) = target {
            cell.text = text;
        }
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Feed an input event to the cell editor. A commit is written to the
    /// store's pending map of the current mode.
    pub fn handle_edit(&mut self, event: EditEvent, store: &mut ProgressStore) -> EditOutcome {
        let outcome = {
            let target = EngineTarget {
                rows: &self.rows,
                columns: &self.columns,
                formatter: &self.formatter,
                store: &*store,
            };
            self.editor.handle(event, &target)
        };

        match outcome {
            EditOutcome::Committed { change, next_focus } => {
                let key = change.cell_key.clone();
                let written = match change.value_type {
                    ValueType::Cost => store.set_cost_number(key.clone(), change.value),
                    ValueType::Percentage => store.set_cell_number(key.clone(), change.value),
                };
                match written {
                    Ok(()) => {
                        self.refresh_cell(&key, store);
                        EditOutcome::Committed { change, next_focus }
                    }
                    Err(e) => {
                        warn!(key = %key, error = %e, "store refused edit");
                        EditOutcome::Rejected {
                            key,
                            error: EditError::Store(e.to_string()),
                        }
                    }
                }
            }
            EditOutcome::Rejected { key, error } => {
                warn!(key = %key, error = %error, "edit rejected, keeping previous value");
                EditOutcome::Rejected { key, error }
            }
            other => other,
        }
    }
}

/// Stored number shown in a period cell for the active input mode
fn stored_value(store: &ProgressStore, input_mode: InputMode, key: &CellKey) -> f64 {
    match input_mode {
        InputMode::Cost => store.cost_in(store.current_mode(), key),
        InputMode::Percentage | InputMode::Volume => store.value_in(store.current_mode(), key),
    }
}

/// Editor view of the engine for one event
struct EngineTarget<'a> {
    rows: &'a RowModel,
    columns: &'a ColumnModel,
    formatter: &'a CellFormatter,
    store: &'a ProgressStore,
}

impl EngineTarget<'_> {
    fn locate(&self, key: &CellKey) -> Option<(usize, usize)> {
        Some((
            self.rows.index_of(&key.entity_id)?,
            self.columns.index_of(&key.period_id)?,
        ))
    }

    fn editable_at(&self, row: usize, column: usize) -> bool {
        match (self.rows.get(row), self.columns.get(column)) {
            (Some(r), Some(c)) => is_cell_editable(
                r,
                c,
                self.formatter.input_mode,
                self.store.current_mode(),
            ),
            _ => false,
        }
    }

    fn key_at(&self, row: usize, column: usize) -> Option<CellKey> {
        Some(CellKey::new(
            self.rows.get(row)?.id.clone(),
            self.columns.get(column)?.id.clone(),
        ))
    }
}

impl EditTarget for EngineTarget<'_> {
    fn is_editable(&self, key: &CellKey) -> bool {
        self.locate(key)
            .is_some_and(|(row, column)| self.editable_at(row, column))
    }

    fn edit_text(&self, key: &CellKey) -> String {
        let Some(row) = self
            .rows
            .index_of(&key.entity_id)
            .and_then(|i| self.rows.get(i))
        else {
            return String::new();
        };
        self.formatter.edit_text(
            stored_value(self.store, self.formatter.input_mode, key),
            row,
        )
    }

    fn neighbor(&self, key: &CellKey, direction: Direction) -> Option<CellKey> {
        let (row, column) = self.locate(key)?;
        let (mut r, mut c) = (row, column);
        loop {
            match direction {
                Direction::Up => r = r.checked_sub(1)?,
                Direction::Down => r += 1,
                Direction::Left => c = c.checked_sub(1)?,
                Direction::Right => c += 1,
            }
            if r >= self.rows.len() || c >= self.columns.len() {
                return None;
            }
            if self.editable_at(r, c) {
                return self.key_at(r, c);
            }
        }
    }

    fn validate(&self, key: &CellKey, raw: &str) -> Result<f64, EditError> {
        let row = self
            .rows
            .index_of(&key.entity_id)
            .and_then(|i| self.rows.get(i))
            .filter(|_| self.is_editable(key))
            .ok_or_else(|| EditError::NotEditable(key.clone()))?;
        validate_input(raw, self.formatter.input_mode, row.volume)
    }

    fn value_type(&self) -> ValueType {
        ValueType::for_input_mode(self.formatter.input_mode)
    }
}

impl Geometry for GridEngine {
    fn cell_bounding_rects(&self) -> Vec<CellRect> {
        let height = self.config.row_height;
        let periods: Vec<(f64, &ColumnDef)> = self
            .columns
            .period_columns()
            .filter_map(|(index, column)| Some((self.columns.x(index)?, column)))
            .collect();

        let mut rects = Vec::with_capacity(self.rows.leaf_count() * periods.len());
        for (row_index, row) in self.rows.flat().iter().enumerate() {
            if !row.is_leaf() {
                continue;
            }
            let y = row_index as f64 * height;
            for (x, column) in &periods {
                rects.push(CellRect {
                    key: CellKey::new(row.id.clone(), column.id.clone()),
                    rect: Rect::new(*x, y, column.width, height),
                });
            }
        }
        rects
    }

    fn pinned_columns_width(&self) -> f64 {
        self.columns.pinned_width()
    }

    fn row_height(&self) -> f64 {
        self.config.row_height
    }

    fn period_extents(&self) -> Vec<ColumnExtent> {
        self.columns
            .period_columns()
            .enumerate()
            .filter_map(|(index, (column_index, column))| {
                Some(ColumnExtent {
                    period_id: column.id.clone(),
                    index,
                    x: self.columns.x(column_index)?,
                    width: column.width,
                })
            })
            .collect()
    }

    fn content_size(&self) -> (f64, f64) {
        (self.columns.total_width(), self.virtualizer.total_height())
    }

    fn is_measured(&self) -> bool {
        self.virtualizer.is_measured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::KeyInput;
    use crate::MIN_ROW_HEIGHT;
    use pretty_assertions::assert_eq;

    fn engine() -> GridEngine {
        let config = GridConfig::default()
            .row_height(30.0)
            .overscan(1)
            .header_height(0.0)
            .label_width(200.0)
            .info_columns(vec![InfoField::Volume])
            .info_width(80.0)
            .period_width(50.0);
        let mut engine = GridEngine::new(config);
        engine.set_data(
            vec![Row::group("G")
                .child(Row::leaf("r1").volume(1200.0, "m3"))
                .child(Row::leaf("r2"))],
            vec![
                Period::new("p1"),
                Period::new("p2"),
                Period::new("m1").aggregated(),
            ],
        );
        engine.set_viewport(400.0, 300.0);
        engine
    }

    fn key(e: &str, p: &str) -> CellKey {
        CellKey::new(e, p)
    }

    #[test]
    fn geometry_counts_leaf_rows_times_periods() {
        let engine = engine();
        let rects = engine.cell_bounding_rects();
        assert_eq!(rects.len(), 2 * 3);
        assert!(rects.iter().all(|c| c.rect.height == 30.0));
        assert_eq!(rects[0].key, key("r1", "p1"));
        assert_eq!(rects[0].rect, Rect::new(280.0, 30.0, 50.0, 30.0));
        assert_eq!(engine.pinned_columns_width(), 280.0);
    }

    #[test]
    fn tiny_row_height_is_clamped_everywhere() {
        let mut engine = GridEngine::new(
            GridConfig::default()
                .row_height(0.1)
                .header_height(0.0)
                .info_columns(Vec::new()),
        );
        engine.set_data(
            vec![Row::leaf("r1"), Row::leaf("r2"), Row::leaf("r3")],
            vec![Period::new("p1")],
        );
        engine.set_viewport(800.0, 600.0);

        assert_eq!(engine.config().row_height, MIN_ROW_HEIGHT);
        assert_eq!(engine.row_height(), engine.virtualizer().row_height());
        let rects = engine.cell_bounding_rects();
        assert!(rects.iter().all(|c| c.rect.height == MIN_ROW_HEIGHT));
        let bottom = rects.iter().map(|c| c.rect.bottom()).fold(0.0, f64::max);
        assert_eq!(bottom, engine.content_size().1);
    }

    #[test]
    fn period_extents_in_column_order() {
        let engine = engine();
        let extents = engine.period_extents();
        let xs: Vec<f64> = extents.iter().map(|e| e.x).collect();
        assert_eq!(xs, vec![280.0, 330.0, 380.0]);
        assert_eq!(extents[1].right(), 380.0);
    }

    #[test]
    fn measurement_resets_on_data_change() {
        let mut engine = engine();
        let store = ProgressStore::new();
        assert!(!engine.is_measured());
        engine.measure(&store);
        assert!(engine.is_measured());
        engine.toggle_row("G");
        assert!(!engine.is_measured());
    }

    #[test]
    fn scroll_is_transform_only() {
        let mut engine = engine();
        let store = ProgressStore::new();
        engine.render(&store);
        let update = engine.on_scroll(0.0, 20.0);
        assert_eq!(update.header_transform, "translateX(-20px)");
        assert!(!update.range_changed);
        assert_eq!(engine.stats().full_rebuilds, 1);
        assert_eq!(engine.stats().transform_updates, 1);

        // content is 430 wide in a 400 viewport
        assert_eq!(engine.on_scroll(0.0, 500.0).scroll_left, 30.0);
        assert_eq!(header_transform(0.0), "translateX(-0px)");
    }

    #[test]
    fn rendered_cells_carry_text_and_editability() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        store.set_cell_value("r1", "p1", "25").unwrap();
        let view = engine.render(&store);

        let r1 = view.rows.iter().find(|r| r.id == "r1").unwrap();
        let p1 = r1.cells.iter().find(|c| c.column_id == "p1").unwrap();
        assert_eq!(p1.text, "25%");
        assert!(p1.editable);
        let m1 = r1.cells.iter().find(|c| c.column_id == "m1").unwrap();
        assert!(!m1.editable);
        let label = &r1.cells[0];
        assert_eq!(label.sticky_left, Some(0.0));
        assert_eq!(label.text, "r1");

        let group = view.rows.iter().find(|r| r.id == "G").unwrap();
        assert!(group.cells.iter().all(|c| !c.editable));
    }

    #[test]
    fn input_mode_toggle_only_reformats() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        store.set_cell_value("r1", "p1", "25").unwrap();
        engine.render(&store);
        engine.set_input_mode(InputMode::Volume, &store);

        let stats = engine.stats();
        assert_eq!(stats.full_rebuilds, 1);
        assert_eq!(stats.format_passes, 1);
        let cell = engine.view().rows[1]
            .cells
            .iter()
            .find(|c| c.column_id == "p1")
            .unwrap();
        assert_eq!(cell.text, "300 m3");
    }

    #[test]
    fn cost_cells_need_actual_mode() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        engine.set_input_mode(InputMode::Cost, &store);
        engine.render(&store);
        assert!(engine.view().rows[1].cells.iter().all(|c| !c.editable));

        store.switch_mode(ProgressMode::Actual);
        engine.render(&store);
        let editable = engine.view().rows[1].cells.iter().filter(|c| c.editable).count();
        assert_eq!(editable, 2);
    }

    #[test]
    fn volume_edit_commits_percentage_to_store() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        engine.set_input_mode(InputMode::Volume, &store);
        engine.render(&store);

        engine.handle_edit(EditEvent::Click(key("r1", "p2")), &mut store);
        for c in "600".chars() {
            engine.handle_edit(EditEvent::Key(KeyInput::Char(c)), &mut store);
        }
        let outcome = engine.handle_edit(EditEvent::Key(KeyInput::Enter { shift: false }), &mut store);

        match outcome {
            EditOutcome::Committed { change, next_focus } => {
                assert_eq!(change.value, 50.0);
                assert_eq!(change.value_type, ValueType::Percentage);
                assert_eq!(next_focus, Some(key("r2", "p2")));
            }
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(store.get_cell_value("r1", "p2"), 50.0);
        assert!(store.has_pending_changes(ProgressMode::Planned));
    }

    #[test]
    fn volume_edit_without_row_volume_uses_percentage() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        store.set_cell_value("r2", "p1", "25").unwrap();
        engine.set_input_mode(InputMode::Volume, &store);
        engine.render(&store);

        let cell = engine.view().rows[2]
            .cells
            .iter()
            .find(|c| c.column_id == "p1")
            .unwrap();
        assert_eq!(cell.text, "25%");

        // prefilled "25" commits unchanged
        engine.handle_edit(EditEvent::DoubleClick(key("r2", "p1")), &mut store);
        let outcome = engine.handle_edit(EditEvent::Key(KeyInput::Enter { shift: false }), &mut store);
        match outcome {
            EditOutcome::Committed { change, .. } => assert_eq!(change.value, 25.0),
            other => panic!("expected commit, got {other:?}"),
        }

        engine.handle_edit(EditEvent::Click(key("r2", "p2")), &mut store);
        for c in "40".chars() {
            engine.handle_edit(EditEvent::Key(KeyInput::Char(c)), &mut store);
        }
        engine.handle_edit(EditEvent::Blur, &mut store);
        assert_eq!(store.get_cell_value("r2", "p2"), 40.0);

        engine.handle_edit(EditEvent::Click(key("r2", "p2")), &mut store);
        for c in "140".chars() {
            engine.handle_edit(EditEvent::Key(KeyInput::Char(c)), &mut store);
        }
        let outcome = engine.handle_edit(EditEvent::Blur, &mut store);
        assert!(matches!(outcome, EditOutcome::Rejected { .. }));
        assert_eq!(store.get_cell_value("r2", "p2"), 40.0);
    }

    #[test]
    fn rejected_edit_keeps_prior_value() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        store.set_cell_value("r2", "p1", "10").unwrap();
        engine.render(&store);

        engine.handle_edit(EditEvent::DoubleClick(key("r2", "p1")), &mut store);
        engine.handle_edit(EditEvent::Key(KeyInput::Char('9')), &mut store);
        engine.handle_edit(EditEvent::Key(KeyInput::Char('9')), &mut store);
        let outcome = engine.handle_edit(EditEvent::Blur, &mut store);

        assert!(matches!(outcome, EditOutcome::Rejected { .. }));
        assert_eq!(store.get_cell_value("r2", "p1"), 10.0);
    }

    #[test]
    fn tab_skips_aggregated_columns() {
        let mut engine = engine();
        let mut store = ProgressStore::new();
        engine.handle_edit(EditEvent::Click(key("r1", "p2")), &mut store);
        let outcome = engine.handle_edit(EditEvent::Key(KeyInput::Tab { shift: false }), &mut store);
        assert_eq!(outcome, EditOutcome::Ignored);

        let outcome = engine.handle_edit(EditEvent::Key(KeyInput::Arrow(Direction::Up)), &mut store);
        assert_eq!(outcome, EditOutcome::Ignored);
    }
}
