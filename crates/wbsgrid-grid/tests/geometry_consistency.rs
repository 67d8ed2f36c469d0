//! Integration tests: rendered cells and geometry rects agree

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use wbsgrid_core::{CellKey, Geometry, Period, Rect, Row, RowKind};
use wbsgrid_grid::{GridConfig, GridEngine, InfoField};
use wbsgrid_store::ProgressStore;

/// `groups` × `leaves` schedule over `weeks` weekly periods
fn schedule(groups: usize, leaves: usize, weeks: usize) -> (Vec<Row>, Vec<Period>) {
    let rows = (1..=groups)
        .map(|g| {
            (1..=leaves).fold(
                Row::group(format!("G{g}")).label(format!("Group {g}")),
                |group, l| group.child(Row::leaf(format!("G{g}.{l}")).volume(100.0, "m2")),
            )
        })
        .collect();
    let periods = (1..=weeks)
        .map(|w| Period::new(format!("w{w}")).label(format!("W{w}")))
        .collect();
    (rows, periods)
}

fn engine(rows: Vec<Row>, periods: Vec<Period>) -> GridEngine {
    let config = GridConfig::default()
        .row_height(28.0)
        .overscan(3)
        .header_height(36.0)
        .label_width(240.0)
        .info_columns(vec![InfoField::Volume, InfoField::Unit])
        .info_width(70.0)
        .period_width(64.0);
    let mut grid = GridEngine::new(config);
    grid.set_data(rows, periods);
    grid.set_viewport(1000.0, 636.0);
    grid
}

// =============================================================================
// Geometry provider
// =============================================================================

#[test]
fn rect_count_is_leaf_rows_times_periods() {
    let (rows, periods) = schedule(50, 40, 52);
    let grid = engine(rows, periods);

    let rects = grid.cell_bounding_rects();
    assert_eq!(rects.len(), 50 * 40 * 52);
    assert!(rects.iter().all(|c| c.rect.height == 28.0));
}

#[test]
fn x_strictly_increases_along_each_row() {
    let (rows, periods) = schedule(2, 3, 10);
    let grid = engine(rows, periods);

    let mut by_row: HashMap<String, Vec<f64>> = HashMap::new();
    for cell in grid.cell_bounding_rects() {
        by_row
            .entry(cell.key.entity_id.clone())
            .or_default()
            .push(cell.rect.x);
    }
    for xs in by_row.values() {
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(xs[0], grid.pinned_columns_width());
    }
}

#[test]
fn y_is_flat_index_times_row_height() {
    let (rows, periods) = schedule(3, 2, 1);
    let grid = engine(rows, periods);

    let ys: Vec<(String, f64)> = grid
        .cell_bounding_rects()
        .into_iter()
        .map(|c| (c.key.entity_id, c.rect.y))
        .collect();
    // G1, G1.1, G1.2, G2, ...
    assert_eq!(ys[0], ("G1.1".to_string(), 28.0));
    assert_eq!(ys[1], ("G1.2".to_string(), 56.0));
    assert_eq!(ys[2], ("G2.1".to_string(), 112.0));
}

#[test]
fn collapsed_rows_have_no_rects() {
    let (rows, periods) = schedule(2, 2, 4);
    let mut grid = engine(rows, periods);
    grid.toggle_row("G1");

    let rects = grid.cell_bounding_rects();
    assert_eq!(rects.len(), 2 * 4);
    assert!(rects.iter().all(|c| c.key.entity_id.starts_with("G2")));
    // G1, G2, G2.1
    assert_eq!(rects[0].rect.y, 2.0 * 28.0);
}

// =============================================================================
// Rendered cells vs geometry
// =============================================================================

#[test]
fn rendered_period_cells_match_geometry_exactly() {
    let (rows, periods) = schedule(20, 10, 26);
    let mut grid = engine(rows, periods);
    let store = ProgressStore::new();

    grid.on_scroll(28.0 * 100.0, 0.0);
    grid.measure(&store);

    let geometry: HashMap<CellKey, Rect> = grid
        .cell_bounding_rects()
        .into_iter()
        .map(|c| (c.key, c.rect))
        .collect();

    let mut compared = 0;
    for row in &grid.view().rows {
        for cell in &row.cells {
            if let Some(key) = &cell.key {
                if row.kind == RowKind::Leaf {
                    assert_eq!(geometry.get(key), Some(&cell.rect), "cell {key}");
                    compared += 1;
                }
            }
        }
    }
    assert!(compared > 0);
}

#[test]
fn only_visible_window_is_materialized() {
    let (rows, periods) = schedule(100, 49, 12);
    let mut grid = engine(rows, periods);
    let store = ProgressStore::new();

    let view = grid.render(&store);
    // 600px body / 28px rows = 22 rows visible, plus 3 overscan below
    assert_eq!(view.range, 0..25);
    assert_eq!(view.total_height, 5000.0 * 28.0);

    let update = grid.on_scroll(28.0 * 2500.0, 0.0);
    assert!(update.range_changed);
    assert_eq!(update.range, 2497..2525);
    assert_eq!(grid.stats().full_rebuilds, 1);

    let view = grid.render(&store);
    assert_eq!(view.rows.first().map(|r| r.index), Some(2497));
    assert_eq!(view.rows.len(), 28);
}

#[test]
fn pinned_cells_stick_at_cumulative_offsets() {
    let (rows, periods) = schedule(1, 1, 2);
    let mut grid = engine(rows, periods);
    let store = ProgressStore::new();
    let view = grid.render(&store);

    let sticky: Vec<Option<f64>> = view.rows[0].cells.iter().map(|c| c.sticky_left).collect();
    assert_eq!(sticky, vec![Some(0.0), Some(240.0), Some(310.0), None, None]);
    assert_eq!(view.pinned_width, 380.0);
}
