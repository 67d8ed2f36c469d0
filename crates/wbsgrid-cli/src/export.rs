//! Static renderings of a schedule
//!
//! Everything here drives the same engine a browser host would: the grid
//! engine for the text table, and a mounted [`Coordinator`] stepped through
//! its animation frames for the overlay SVGs.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use wbsgrid_core::{InputMode, ProgressMode, RenderMetrics, ViewMode};
use wbsgrid_grid::{ColumnKind, GridEngine};
use wbsgrid_render::{Coordinator, CurveGranularity, FrameOutcome, SvgSurface};
use wbsgrid_store::{CurveSummary, ProgressStore, SCurve};

use crate::config::ViewConfig;
use crate::schedule::Schedule;

/// Frames allowed for the measure → sync pipeline to settle
const MAX_FRAMES: usize = 8;
const FRAME_MS: f64 = 16.0;

/// Options of the text table
#[derive(Clone, Copy, Debug, Default)]
pub struct TableOptions {
    pub mode: ProgressMode,
    pub input: InputMode,
    /// Expand parents down to this level; everything when `None`
    pub level: Option<u32>,
}

fn load_store(schedule: &Schedule, current: ProgressMode) -> Result<ProgressStore> {
    let mut store = ProgressStore::new();
    store.load_data(ProgressMode::Planned, schedule.cells(ProgressMode::Planned)?);
    store.load_data(ProgressMode::Actual, schedule.cells(ProgressMode::Actual)?);
    if let Some(costs) = schedule.costs()? {
        store.load_costs(ProgressMode::Actual, costs);
    }
    store.switch_mode(current);
    Ok(store)
}

/// Render the grid as an aligned plain-text table
pub fn render_table(schedule: &Schedule, config: &ViewConfig, options: TableOptions) -> Result<String> {
    let store = load_store(schedule, options.mode)?;
    let mut engine = GridEngine::new(config.view.grid.clone());
    engine.set_data(schedule.payload.rows.clone(), schedule.payload.columns.clone());
    match options.level {
        Some(level) => engine.expand_to_level(level),
        None => engine.expand_all(),
    }
    engine.set_input_mode(options.input, &store);

    let grid = engine.config().clone();
    let height = grid.header_height + engine.rows().len() as f64 * grid.row_height;
    let width = engine.columns().total_width();
    engine.set_viewport(width, height);
    let view = engine.render(&store).clone();

    let columns = engine.columns().columns();
    let mut lines: Vec<Vec<String>> = Vec::with_capacity(view.rows.len() + 1);
    lines.push(columns.iter().map(|c| c.title.clone()).collect());
    for row in &view.rows {
        let marker = match (row.has_children, row.expanded) {
            (false, _) => "  ",
            (true, true) => "- ",
            (true, false) => "+ ",
        };
        let mut line: Vec<String> = row.cells.iter().map(|c| c.text.clone()).collect();
        if let Some(label) = line.first_mut() {
            *label = format!("{}{marker}{label}", "  ".repeat(row.level as usize));
        }
        lines.push(line);
    }

    let mut widths = vec![0usize; columns.len()];
    for line in &lines {
        for (width, text) in widths.iter_mut().zip(line) {
            *width = (*width).max(text.chars().count());
        }
    }

    let mut out = String::new();
    for (n, line) in lines.iter().enumerate() {
        let cells: Vec<String> = line
            .iter()
            .zip(columns)
            .zip(&widths)
            .map(|((text, column), width)| match column.kind {
                ColumnKind::Label => format!("{text:<width$}"),
                _ => format!("{text:>width$}"),
            })
            .collect();
        out.push_str(cells.join(" | ").trim_end());
        out.push('\n');
        if n == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            out.push_str(&rule.join("-+-"));
            out.push('\n');
        }
    }
    Ok(out)
}

/// Mount a coordinator in `mode` and run frames until the overlay paints
pub fn render_overlay(
    schedule: &Schedule,
    config: &ViewConfig,
    mode: ViewMode,
) -> Result<(SvgSurface, RenderMetrics)> {
    if mode == ViewMode::Grid {
        bail!("grid mode has no overlay to export");
    }

    let mut view = Coordinator::new(config.view.clone());
    view.mount(config.output.width, config.output.height);
    view.update_data(schedule.payload.clone());
    view.load_cells(ProgressMode::Planned, schedule.cells(ProgressMode::Planned)?, None);
    view.load_cells(ProgressMode::Actual, schedule.cells(ProgressMode::Actual)?, schedule.costs()?);
    view.set_view_mode(mode);

    let mut surface = SvgSurface::new();
    if let Some(color) = &config.output.background {
        surface = surface.background(color.as_str());
    }
    if let Some(family) = &config.output.font_family {
        surface = surface.font_family(family.as_str());
    }

    for frame in 0..MAX_FRAMES {
        let outcome = view.on_animation_frame(frame as f64 * FRAME_MS, &mut surface);
        debug!(frame, ?outcome, "export frame");
        if let FrameOutcome::Painted { metrics } = outcome {
            if metrics.skipped() > 0 || metrics.unmatched_periods > 0 {
                info!(
                    skipped = metrics.skipped(),
                    unmatched = metrics.unmatched_periods,
                    "some overlay primitives were not drawn"
                );
            }
            return Ok((surface, metrics));
        }
    }
    bail!("overlay did not paint within {MAX_FRAMES} frames")
}

/// Serialize a rendered overlay
pub fn overlay_svg(schedule: &Schedule, config: &ViewConfig, mode: ViewMode) -> Result<String> {
    let (surface, _) = render_overlay(schedule, config, mode)?;
    surface.to_svg_string().context("Failed to serialize SVG")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveReport {
    pub granularity: CurveGranularity,
    pub curve: SCurve,
    pub summary: CurveSummary,
}

/// Cumulative planned/actual series, re-bucketed for monthly granularity
pub fn curve_report(
    schedule: &Schedule,
    config: &ViewConfig,
    granularity: CurveGranularity,
) -> Result<CurveReport> {
    let planned = schedule.cells(ProgressMode::Planned)?;
    let actual = schedule.cells(ProgressMode::Actual)?;
    let weekly = SCurve::compute(
        &schedule.payload.rows,
        &schedule.payload.columns,
        &planned,
        &actual,
    );
    let curve = match granularity {
        CurveGranularity::Weekly => weekly,
        CurveGranularity::Monthly => weekly.monthly(config.view.aggregation.bucket_size),
    };
    Ok(CurveReport {
        granularity,
        summary: curve.summary(),
        curve,
    })
}

impl CurveReport {
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{:<12} {:>10} {:>10}\n",
            "Period", "Planned %", "Actual %"
        );
        for (planned, actual) in self.curve.planned.iter().zip(&self.curve.actual) {
            out.push_str(&format!(
                "{:<12} {:>10.2} {:>10.2}\n",
                planned.period_id, planned.cumulative_progress, actual.cumulative_progress
            ));
        }
        out.push('\n');
        let basis = format!("{:?}", self.curve.basis).to_lowercase();
        out.push_str(&format!("Weighting:   {basis}\n"));
        out.push_str(&format!("Planned:     {:.2}%\n", self.summary.planned_final));
        out.push_str(&format!("Actual:      {:.2}%\n", self.summary.actual_final));
        match (&self.summary.last_actual_period, self.summary.deviation) {
            (Some(period), Some(deviation)) => {
                out.push_str(&format!("Deviation:   {deviation:+.2}% at {period}\n"))
            }
            _ => out.push_str("Deviation:   n/a (no actual progress)\n"),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schedule() -> Schedule {
        Schedule::parse(
            r#"{
            "rows": [
                { "id": "G", "type": "group", "label": "Earthworks", "children": [
                    { "id": "r1", "type": "leaf", "level": 1, "label": "Excavation", "volume": 1000, "unit": "m3" },
                    { "id": "r2", "type": "leaf", "level": 1, "label": "Backfill", "volume": 1000, "unit": "m3" }
                ]}
            ],
            "columns": [{ "id": "w1", "label": "W1" }, { "id": "w2", "label": "W2" }],
            "planned": { "r1::w1": 50, "r1::w2": 50, "r2::w2": 100 },
            "actual": { "r1::w1": 40 }
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn table_lists_rows_with_formatted_cells() {
        let text = render_table(&schedule(), &ViewConfig::default(), TableOptions::default()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("W1") && lines[0].contains("W2"));
        assert!(lines[2].starts_with("- Earthworks"));
        assert!(lines[3].starts_with("    Excavation"));
        assert!(lines[3].contains("50%"));
        assert!(lines[4].contains("100%"));
    }

    #[test]
    fn table_respects_level_and_mode() {
        let options = TableOptions {
            mode: ProgressMode::Actual,
            input: InputMode::Volume,
            level: Some(0),
        };
        let text = render_table(&schedule(), &ViewConfig::default(), options).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("+ Earthworks"));

        let options = TableOptions { level: None, ..options };
        let text = render_table(&schedule(), &ViewConfig::default(), options).unwrap();
        assert!(text.contains("400 m3"));
    }

    #[test]
    fn gantt_overlay_paints_every_bar() {
        let (surface, metrics) =
            render_overlay(&schedule(), &ViewConfig::default(), ViewMode::Gantt).unwrap();
        // r1w1 planned+actual, r1w2 planned, r2w2 planned
        assert_eq!(metrics.painted, 4);
        assert_eq!(metrics.skipped(), 0);
        assert!(surface.to_svg_string().unwrap().contains("#16a34a"));
    }

    #[test]
    fn grid_mode_cannot_be_exported() {
        assert!(render_overlay(&schedule(), &ViewConfig::default(), ViewMode::Grid).is_err());
    }

    #[test]
    fn curve_report_summarizes_progress() {
        let report =
            curve_report(&schedule(), &ViewConfig::default(), CurveGranularity::Weekly).unwrap();
        assert_eq!(report.curve.planned.len(), 2);
        assert_eq!(report.summary.planned_final, 100.0);
        assert_eq!(report.summary.actual_final, 20.0);
        assert_eq!(report.summary.last_actual_period.as_deref(), Some("w1"));
        assert_eq!(report.summary.deviation, Some(-5.0));
        assert!(report.to_text().contains("Deviation:   -5.00% at w1"));
    }
}
