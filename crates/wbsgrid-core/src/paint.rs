//! Drawing surface abstraction.
//!
//! Overlays never talk to a concrete canvas. They paint through
//! [`Paintable`], which is implemented by the SVG backend, by the browser
//! host, and by [`DisplayList`] (a recorded list of operations that the host
//! can replay, and that tests inspect).

use serde::Serialize;

use crate::{Point, Rect};

/// Line styling for strokes and polylines
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    /// On/off dash lengths; empty for a solid line
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dash: Vec<f64>,
}

impl StrokeStyle {
    pub fn solid(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            dash: Vec::new(),
        }
    }

    pub fn dashed(color: impl Into<String>, width: f64, on: f64, off: f64) -> Self {
        Self {
            color: color.into(),
            width,
            dash: vec![on, off],
        }
    }

    pub fn is_dashed(&self) -> bool {
        !self.dash.is_empty()
    }
}

/// Minimal 2D drawing surface
pub trait Paintable {
    /// Set the pixel size of the surface; implies a clear
    fn resize(&mut self, width: f64, height: f64);

    /// Erase everything
    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: &str);

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle);

    fn polyline(&mut self, points: &[Point], style: &StrokeStyle);

    fn fill_polygon(&mut self, points: &[Point], color: &str);

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str);

    fn text(&mut self, at: Point, text: &str, color: &str, size: f64);
}

/// One recorded drawing operation
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PaintOp {
    Clear,
    FillRect {
        rect: Rect,
        color: String,
    },
    Line {
        from: Point,
        to: Point,
        style: StrokeStyle,
    },
    Polyline {
        points: Vec<Point>,
        style: StrokeStyle,
    },
    Polygon {
        points: Vec<Point>,
        color: String,
    },
    Circle {
        center: Point,
        radius: f64,
        color: String,
    },
    Text {
        at: Point,
        text: String,
        color: String,
        size: f64,
    },
}

/// A `Paintable` that records operations instead of rasterizing them
#[derive(Clone, Debug, Default, Serialize)]
pub struct DisplayList {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<PaintOp>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filled rectangles of the given color, in paint order
    pub fn filled_rects<'a>(&'a self, color: &'a str) -> impl Iterator<Item = &'a Rect> + 'a {
        self.ops.iter().filter_map(move |op| match op {
            PaintOp::FillRect { rect, color: c } if c == color => Some(rect),
            _ => None,
        })
    }

    pub fn count(&self, predicate: impl Fn(&PaintOp) -> bool) -> usize {
        self.ops.iter().filter(|op| predicate(op)).count()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Paintable for DisplayList {
    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.clear();
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(PaintOp::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.ops.push(PaintOp::FillRect {
            rect,
            color: color.to_string(),
        });
    }

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle) {
        self.ops.push(PaintOp::Line {
            from,
            to,
            style: style.clone(),
        });
    }

    fn polyline(&mut self, points: &[Point], style: &StrokeStyle) {
        if points.len() < 2 {
            return;
        }
        self.ops.push(PaintOp::Polyline {
            points: points.to_vec(),
            style: style.clone(),
        });
    }

    fn fill_polygon(&mut self, points: &[Point], color: &str) {
        self.ops.push(PaintOp::Polygon {
            points: points.to_vec(),
            color: color.to_string(),
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        self.ops.push(PaintOp::Circle {
            center,
            radius,
            color: color.to_string(),
        });
    }

    fn text(&mut self, at: Point, text: &str, color: &str, size: f64) {
        self.ops.push(PaintOp::Text {
            at,
            text: text.to_string(),
            color: color.to_string(),
            size,
        });
    }
}
