//! Cumulative progress curve overlay (kurva mode).
//!
//! The y axis runs from 0% at the bottom margin to 100% at the top margin
//! with dashed guides every 10%. Each series point sits at the right edge of
//! its period column, matched by period id; points whose id has no column
//! are dropped and counted in [`RenderMetrics::unmatched_periods`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use wbsgrid_core::{CurvePoint, Geometry, Paintable, ParseError, Point, RenderMetrics, StrokeStyle};
use wbsgrid_store::{SCurve, DEFAULT_BUCKET_SIZE};

use crate::overlay::{CanvasOverlay, OverlayConfig};

/// Finest spacing between horizontal guides, in percent
pub const MIN_GUIDE_STEP: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveGranularity {
    #[default]
    Weekly,
    Monthly,
}

impl fmt::Display for CurveGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CurveGranularity::Weekly => "weekly",
            CurveGranularity::Monthly => "monthly",
        })
    }
}

impl FromStr for CurveGranularity {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weekly" | "week" => Ok(CurveGranularity::Weekly),
            "monthly" | "month" => Ok(CurveGranularity::Monthly),
            _ => Err(ParseError::InvalidGranularity(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CurveTheme {
    pub planned_color: String,
    pub actual_color: String,
    pub line_width: f64,
    pub marker_radius: f64,
    /// Pointer distance that still counts as a marker hit
    pub hit_radius: f64,
    pub guide_color: String,
    /// Percent between guide lines
    pub guide_step: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub label_size: f64,
}

impl Default for CurveTheme {
    fn default() -> Self {
        Self {
            planned_color: "#3b82f6".into(),
            actual_color: "#ef4444".into(),
            line_width: 2.0,
            marker_radius: 3.5,
            hit_radius: 6.0,
            guide_color: "#cbd5e1".into(),
            guide_step: 10.0,
            margin_top: 16.0,
            margin_bottom: 16.0,
            label_size: 10.0,
        }
    }
}

impl CurveTheme {
    pub fn colors(mut self, planned: impl Into<String>, actual: impl Into<String>) -> Self {
        self.planned_color = planned.into();
        self.actual_color = actual.into();
        self
    }

    pub fn margins(mut self, top: f64, bottom: f64) -> Self {
        self.margin_top = top;
        self.margin_bottom = bottom;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Planned,
    Actual,
}

/// Marker position kept for hit testing (content coordinates)
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveMarker {
    pub series: Series,
    pub period_id: String,
    pub point: Point,
    pub cumulative_progress: f64,
}

/// Maps percent to canvas y
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YScale {
    top: f64,
    bottom: f64,
}

impl YScale {
    pub fn new(height: f64, margin_top: f64, margin_bottom: f64) -> Self {
        let bottom = (height - margin_bottom).max(margin_top);
        Self {
            top: margin_top,
            bottom,
        }
    }

    /// 0% → bottom margin, 100% → top margin
    pub fn y(&self, percent: f64) -> f64 {
        self.bottom - percent.clamp(0.0, 100.0) / 100.0 * (self.bottom - self.top)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CurveOverlay {
    canvas: CanvasOverlay,
    theme: CurveTheme,
    granularity: CurveGranularity,
    bucket_size: usize,
    curve: Option<SCurve>,
    markers: Vec<CurveMarker>,
    metrics: RenderMetrics,
}

impl CurveOverlay {
    pub fn new(config: OverlayConfig, theme: CurveTheme) -> Self {
        Self {
            canvas: CanvasOverlay::new(config),
            theme,
            bucket_size: DEFAULT_BUCKET_SIZE,
            ..Self::default()
        }
    }

    pub fn canvas(&self) -> &CanvasOverlay {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasOverlay {
        &mut self.canvas
    }

    pub fn granularity(&self) -> CurveGranularity {
        self.granularity
    }

    pub fn set_granularity(&mut self, granularity: CurveGranularity) {
        self.granularity = granularity;
    }

    pub fn set_bucket_size(&mut self, size: usize) {
        self.bucket_size = size;
    }

    pub fn set_curve(&mut self, curve: SCurve) {
        self.curve = Some(curve);
    }

    pub fn curve(&self) -> Option<&SCurve> {
        self.curve.as_ref()
    }

    pub fn markers(&self) -> &[CurveMarker] {
        &self.markers
    }

    pub fn metrics(&self) -> RenderMetrics {
        self.metrics
    }

    /// Series at the current granularity
    pub fn displayed(&self) -> Option<SCurve> {
        let curve = self.curve.as_ref()?;
        Some(match self.granularity {
            CurveGranularity::Weekly => curve.clone(),
            CurveGranularity::Monthly => curve.monthly(self.bucket_size),
        })
    }

    pub fn repaint(&mut self, geometry: &dyn Geometry, surface: &mut dyn Paintable) -> RenderMetrics {
        self.markers.clear();
        self.metrics = RenderMetrics::default();
        let Some(size) = self.canvas.begin_repaint(surface, geometry.content_size()) else {
            return self.metrics;
        };
        let scale = YScale::new(size.height, self.theme.margin_top, self.theme.margin_bottom);

        self.paint_guides(surface, size.width, scale);

        let Some(curve) = self.displayed() else {
            return self.metrics;
        };
        let right_edges: HashMap<String, f64> = geometry
            .period_extents()
            .into_iter()
            .map(|e| (e.period_id.clone(), e.right()))
            .collect();

        for (series, points, color) in [
            (Series::Planned, &curve.planned, self.theme.planned_color.clone()),
            (Series::Actual, &curve.actual, self.theme.actual_color.clone()),
        ] {
            self.paint_series(series, points, &color, &right_edges, scale, surface);
        }

        debug!(
            markers = self.markers.len(),
            unmatched = self.metrics.unmatched_periods,
            granularity = %self.granularity,
            "curve overlay painted"
        );
        self.metrics
    }

    fn paint_guides(&self, surface: &mut dyn Paintable, width: f64, scale: YScale) {
        let style = StrokeStyle::dashed(self.theme.guide_color.clone(), 1.0, 4.0, 4.0);
        let step = if self.theme.guide_step > 0.0 {
            self.theme.guide_step.max(MIN_GUIDE_STEP)
        } else {
            10.0
        };
        let count = (100.0 / step + f64::EPSILON).floor() as usize;
        for i in 0..=count {
            let percent = i as f64 * step;
            let y = scale.y(percent);
            surface.stroke_line(Point::new(0.0, y), Point::new(width, y), &style);
            surface.text(
                Point::new(4.0, y - 2.0),
                &format!("{percent}%"),
                &self.theme.guide_color,
                self.theme.label_size,
            );
        }
    }

    fn paint_series(
        &mut self,
        series: Series,
        points: &[CurvePoint],
        color: &str,
        right_edges: &HashMap<String, f64>,
        scale: YScale,
        surface: &mut dyn Paintable,
    ) {
        // synthetic period 0 at the left edge of the period area
        let origin = Point::new(self.canvas.origin_x(), scale.y(0.0));
        let mut line = vec![self.canvas.point_to_canvas(origin)];
        let mut markers = Vec::with_capacity(points.len());

        for point in points {
            let Some(x) = right_edges.get(&point.period_id) else {
                self.metrics.unmatched_periods += 1;
                continue;
            };
            let content = Point::new(*x, scale.y(point.cumulative_progress));
            line.push(self.canvas.point_to_canvas(content));
            markers.push(CurveMarker {
                series,
                period_id: point.period_id.clone(),
                point: content,
                cumulative_progress: point.cumulative_progress,
            });
        }

        let style = StrokeStyle::solid(color, self.theme.line_width);
        surface.polyline(&line, &style);
        for marker in &markers {
            surface.fill_circle(
                self.canvas.point_to_canvas(marker.point),
                self.theme.marker_radius,
                color,
            );
        }
        self.metrics.painted += markers.len();
        self.markers.extend(markers);
    }

    /// Nearest marker within the hit radius of a content-space point
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&CurveMarker> {
        self.markers
            .iter()
            .map(|m| ((m.point.x - x).hypot(m.point.y - y), m))
            .filter(|(distance, _)| *distance <= self.theme.hit_radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, m)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wbsgrid_core::{CellRect, ColumnExtent, DisplayList, PaintOp};
    use wbsgrid_store::WeightBasis;

    struct Columns {
        ids: Vec<&'static str>,
    }

    impl Geometry for Columns {
        fn cell_bounding_rects(&self) -> Vec<CellRect> {
            Vec::new()
        }

        fn pinned_columns_width(&self) -> f64 {
            100.0
        }

        fn row_height(&self) -> f64 {
            20.0
        }

        fn period_extents(&self) -> Vec<ColumnExtent> {
            self.ids
                .iter()
                .enumerate()
                .map(|(i, id)| ColumnExtent {
                    period_id: (*id).to_string(),
                    index: i,
                    x: 100.0 + i as f64 * 50.0,
                    width: 50.0,
                })
                .collect()
        }

        fn content_size(&self) -> (f64, f64) {
            (100.0 + self.ids.len() as f64 * 50.0, 232.0)
        }
    }

    fn point(id: &str, index: usize, week: f64, cumulative: f64) -> CurvePoint {
        CurvePoint {
            period_id: id.into(),
            period_index: index,
            week_progress: week,
            cumulative_progress: cumulative,
        }
    }

    fn curve() -> SCurve {
        SCurve {
            basis: WeightBasis::Even,
            planned: vec![
                point("w1", 1, 25.0, 25.0),
                point("w2", 2, 25.0, 50.0),
                point("w3", 3, 50.0, 100.0),
            ],
            actual: vec![point("w1", 1, 50.0, 50.0), point("w2", 2, 0.0, 50.0)],
        }
    }

    fn overlay() -> CurveOverlay {
        let mut overlay = CurveOverlay::new(OverlayConfig::default(), CurveTheme::default());
        overlay.canvas_mut().show(600.0, 100.0, 232.0);
        overlay.set_curve(curve());
        overlay
    }

    #[test]
    fn y_scale_maps_margins() {
        let scale = YScale::new(232.0, 16.0, 16.0);
        assert_eq!(scale.y(0.0), 216.0);
        assert_eq!(scale.y(100.0), 16.0);
        assert_eq!(scale.y(50.0), 116.0);
        assert_eq!(scale.y(150.0), 16.0);
    }

    #[test]
    fn points_sit_on_right_column_edges() {
        let mut overlay = overlay();
        let geometry = Columns {
            ids: vec!["w1", "w2", "w3"],
        };
        let metrics = overlay.repaint(&geometry, &mut DisplayList::new());

        assert_eq!(metrics.painted, 5);
        assert_eq!(metrics.unmatched_periods, 0);
        let planned: Vec<Point> = overlay
            .markers()
            .iter()
            .filter(|m| m.series == Series::Planned)
            .map(|m| m.point)
            .collect();
        assert_eq!(
            planned,
            vec![
                Point::new(150.0, 166.0),
                Point::new(200.0, 116.0),
                Point::new(250.0, 16.0)
            ]
        );
    }

    #[test]
    fn polyline_starts_at_synthetic_origin() {
        let mut overlay = overlay();
        let geometry = Columns {
            ids: vec!["w1", "w2", "w3"],
        };
        let mut surface = DisplayList::new();
        overlay.repaint(&geometry, &mut surface);

        let first = surface.ops.iter().find_map(|op| match op {
            PaintOp::Polyline { points, .. } => Some(points.clone()),
            _ => None,
        });
        let first = first.unwrap();
        assert_eq!(first[0], Point::new(0.0, 216.0));
        assert_eq!(first[1], Point::new(50.0, 166.0));
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn guides_every_ten_percent() {
        let mut overlay = overlay();
        let mut surface = DisplayList::new();
        overlay.repaint(&Columns { ids: vec!["w1"] }, &mut surface);
        let dashed = surface.count(|op| matches!(op, PaintOp::Line { style, .. } if style.is_dashed()));
        assert_eq!(dashed, 11);
    }

    #[test]
    fn guide_step_is_clamped() {
        let theme = CurveTheme {
            guide_step: 1e-9,
            ..CurveTheme::default()
        };
        let mut overlay = CurveOverlay::new(OverlayConfig::default(), theme);
        overlay.canvas_mut().show(600.0, 100.0, 232.0);
        overlay.set_curve(curve());
        let mut surface = DisplayList::new();
        overlay.repaint(&Columns { ids: vec!["w1"] }, &mut surface);
        let dashed = surface.count(|op| matches!(op, PaintOp::Line { style, .. } if style.is_dashed()));
        assert_eq!(dashed, 101);
    }

    #[test]
    fn unmatched_periods_are_counted() {
        let mut overlay = overlay();
        let metrics = overlay.repaint(&Columns { ids: vec!["w1"] }, &mut DisplayList::new());
        // planned w2, w3 and actual w2 have no column
        assert_eq!(metrics.unmatched_periods, 3);
        assert_eq!(metrics.painted, 2);
    }

    #[test]
    fn monthly_points_use_last_period_of_bucket() {
        let mut overlay = overlay();
        overlay.set_bucket_size(2);
        overlay.set_granularity(CurveGranularity::Monthly);
        let geometry = Columns {
            ids: vec!["w1", "w2", "w3"],
        };
        overlay.repaint(&geometry, &mut DisplayList::new());

        let planned: Vec<(&str, f64)> = overlay
            .markers()
            .iter()
            .filter(|m| m.series == Series::Planned)
            .map(|m| (m.period_id.as_str(), m.point.x))
            .collect();
        assert_eq!(planned, vec![("w2", 200.0), ("w3", 250.0)]);
    }

    #[test]
    fn hit_test_uses_radius() {
        let mut overlay = overlay();
        overlay.repaint(
            &Columns {
                ids: vec!["w1", "w2", "w3"],
            },
            &mut DisplayList::new(),
        );
        let hit = overlay.hit_test(203.0, 118.0).unwrap();
        assert_eq!(hit.period_id, "w2");
        assert!(overlay.hit_test(175.0, 60.0).is_none());
    }

    #[test]
    fn granularity_names() {
        assert_eq!("Monthly".parse::<CurveGranularity>(), Ok(CurveGranularity::Monthly));
        assert!("daily".parse::<CurveGranularity>().is_err());
    }
}
