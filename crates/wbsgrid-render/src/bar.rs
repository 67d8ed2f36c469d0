//! Timeline bar overlay (gantt mode).
//!
//! Each cell with a planned or actual value gets two tracks: actual on top,
//! planned below. Dependencies are drawn as arrows from the right edge of the
//! source cell to the left edge of the target cell.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use wbsgrid_core::{
    Bar, CellKey, Dependency, EntityId, Geometry, Paintable, Period, PeriodId, Point, Rect,
    RenderMetrics, Row, StrokeStyle,
};
use wbsgrid_grid::format::plain_number;

use crate::overlay::{CanvasOverlay, OverlayConfig};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BarTheme {
    pub actual_color: String,
    pub planned_color: String,
    /// Vertical inset of the two tracks inside the cell
    pub padding: f64,
    /// Space between actual and planned tracks
    pub track_gap: f64,
    pub dependency_color: String,
    pub dependency_width: f64,
    pub arrow_size: f64,
    pub show_dependencies: bool,
}

impl Default for BarTheme {
    fn default() -> Self {
        Self {
            actual_color: "#16a34a".into(),
            planned_color: "#3b82f6".into(),
            padding: 4.0,
            track_gap: 2.0,
            dependency_color: "#64748b".into(),
            dependency_width: 1.5,
            arrow_size: 6.0,
            show_dependencies: true,
        }
    }
}

impl BarTheme {
    pub fn colors(mut self, actual: impl Into<String>, planned: impl Into<String>) -> Self {
        self.actual_color = actual.into();
        self.planned_color = planned.into();
        self
    }

    pub fn show_dependencies(mut self, show: bool) -> Self {
        self.show_dependencies = show;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    Actual,
    Planned,
}

/// Painted bar rectangle kept for hover lookup (content coordinates)
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarHit {
    pub key: CellKey,
    pub track: Track,
    pub rect: Rect,
    pub bar: Bar,
}

/// Human labels for tooltip text
#[derive(Clone, Debug, Default)]
pub struct LabelIndex {
    rows: HashMap<EntityId, String>,
    periods: HashMap<PeriodId, String>,
}

impl LabelIndex {
    pub fn new(rows: &[Row], periods: &[Period]) -> Self {
        fn walk(rows: &[Row], out: &mut HashMap<EntityId, String>) {
            for row in rows {
                out.insert(row.id.clone(), row.label.clone());
                walk(&row.children, out);
            }
        }
        let mut row_labels = HashMap::new();
        walk(rows, &mut row_labels);
        Self {
            rows: row_labels,
            periods: periods
                .iter()
                .map(|p| (p.id.clone(), p.label.clone()))
                .collect(),
        }
    }

    pub fn row<'a>(&'a self, id: &'a str) -> &'a str {
        self.rows.get(id).map_or(id, String::as_str)
    }

    pub fn period<'a>(&'a self, id: &'a str) -> &'a str {
        self.periods.get(id).map_or(id, String::as_str)
    }
}

#[derive(Clone, Debug, Default)]
pub struct BarOverlay {
    canvas: CanvasOverlay,
    theme: BarTheme,
    bars: Vec<Bar>,
    dependencies: Vec<Dependency>,
    labels: LabelIndex,
    hits: Vec<BarHit>,
    metrics: RenderMetrics,
}

impl BarOverlay {
    pub fn new(config: OverlayConfig, theme: BarTheme) -> Self {
        Self {
            canvas: CanvasOverlay::new(config),
            theme,
            ..Self::default()
        }
    }

    pub fn canvas(&self) -> &CanvasOverlay {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasOverlay {
        &mut self.canvas
    }

    pub fn theme(&self) -> &BarTheme {
        &self.theme
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn hits(&self) -> &[BarHit] {
        &self.hits
    }

    pub fn metrics(&self) -> RenderMetrics {
        self.metrics
    }

    pub fn set_data(&mut self, bars: Vec<Bar>, dependencies: Vec<Dependency>, labels: LabelIndex) {
        self.bars = bars;
        self.dependencies = dependencies;
        self.labels = labels;
    }

    /// Full redraw against `geometry`. Returns what was painted and skipped.
    pub fn repaint(&mut self, geometry: &dyn Geometry, surface: &mut dyn Paintable) -> RenderMetrics {
        self.hits.clear();
        self.metrics = RenderMetrics::default();
        let Some(size) = self.canvas.begin_repaint(surface, geometry.content_size()) else {
            return self.metrics;
        };

        let rects: HashMap<CellKey, Rect> = geometry
            .cell_bounding_rects()
            .into_iter()
            .map(|c| (c.key, c.rect))
            .collect();
        let pinned = geometry.pinned_columns_width();

        for bar in &self.bars {
            let key = bar.key();
            let Some(rect) = rects.get(&key).copied() else {
                self.metrics.skipped_missing_rect += 1;
                continue;
            };
            if rect.right() <= pinned {
                self.metrics.skipped_pinned += 1;
                continue;
            }

            let track_height = ((rect.height - 2.0 * self.theme.padding - self.theme.track_gap) / 2.0).max(1.0);
            let actual_y = rect.y + self.theme.padding;
            let planned_y = actual_y + track_height + self.theme.track_gap;

            for (track, value, y, color) in [
                (Track::Actual, bar.actual, actual_y, &self.theme.actual_color),
                (Track::Planned, bar.planned, planned_y, &self.theme.planned_color),
            ] {
                if value == 0.0 {
                    continue;
                }
                let track_rect = Rect::new(rect.x, y, rect.width, track_height);
                let on_canvas = self.canvas.to_canvas(track_rect);
                if on_canvas.x >= size.width || on_canvas.y >= size.height {
                    self.metrics.skipped_clipped += 1;
                    continue;
                }
                surface.fill_rect(on_canvas, color);
                self.hits.push(BarHit {
                    key: key.clone(),
                    track,
                    rect: track_rect,
                    bar: bar.clone(),
                });
                self.metrics.painted += 1;
            }
        }

        if self.theme.show_dependencies {
            self.paint_dependencies(&rects, surface);
        }

        debug!(
            painted = self.metrics.painted,
            skipped = self.metrics.skipped(),
            "bar overlay painted"
        );
        self.metrics
    }

    fn paint_dependencies(&mut self, rects: &HashMap<CellKey, Rect>, surface: &mut dyn Paintable) {
        let style = StrokeStyle::solid(self.theme.dependency_color.clone(), self.theme.dependency_width);
        for dependency in &self.dependencies {
            let (Some(from), Some(to)) = (
                rects.get(&dependency.from_key()),
                rects.get(&dependency.to_key()),
            ) else {
                self.metrics.skipped_dependencies += 1;
                continue;
            };
            let start = self
                .canvas
                .point_to_canvas(Point::new(from.right(), from.y + from.height / 2.0));
            let end = self
                .canvas
                .point_to_canvas(Point::new(to.x, to.y + to.height / 2.0));
            surface.stroke_line(start, end, &style);
            surface.fill_polygon(&arrow_head(start, end, self.theme.arrow_size), &style.color);
        }
    }

    /// Topmost painted bar under a content-space point
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&BarHit> {
        self.hits.iter().rev().find(|hit| hit.rect.contains(x, y))
    }

    /// `"<row> · <period>: plan 30% / actual 45% (+15)"`
    pub fn tooltip(&self, hit: &BarHit) -> String {
        format_tooltip(
            self.labels.row(&hit.bar.entity_id),
            self.labels.period(&hit.bar.period_id),
            &hit.bar,
        )
    }
}

pub fn format_tooltip(row: &str, period: &str, bar: &Bar) -> String {
    let sign = if bar.variance >= 0.0 { "+" } else { "-" };
    format!(
        "{row} · {period}: plan {}% / actual {}% ({sign}{})",
        plain_number(bar.planned, 2),
        plain_number(bar.actual, 2),
        plain_number(bar.variance.abs(), 2),
    )
}

/// Triangle with its tip at `to`, pointing along `from → to`
pub fn arrow_head(from: Point, to: Point, size: f64) -> [Point; 3] {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let length = dx.hypot(dy);
    let (ux, uy) = if length > f64::EPSILON {
        (dx / length, dy / length)
    } else {
        (1.0, 0.0)
    };
    let base = Point::new(to.x - ux * size, to.y - uy * size);
    let half = size / 2.0;
    [
        to,
        Point::new(base.x - uy * half, base.y + ux * half),
        Point::new(base.x + uy * half, base.y - ux * half),
    ]
}
