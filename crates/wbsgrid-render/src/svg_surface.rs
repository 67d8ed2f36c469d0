//! SVG drawing surface for static exports.

use std::path::Path;

use svg::node::element::{Circle, Group, Line, Polygon, Polyline, Rectangle, Text};
use svg::node::Node;
use svg::Document;

use wbsgrid_core::{Paintable, Point, Rect, RenderError, StrokeStyle};

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn dash_attr(style: &StrokeStyle) -> String {
    style
        .dash
        .iter()
        .map(f64::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`Paintable`] that accumulates SVG elements
#[derive(Clone, Debug)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    background: Option<String>,
    font_family: String,
    content: Group,
    elements: usize,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            background: None,
            font_family: "system-ui, -apple-system, sans-serif".into(),
            content: Group::new(),
            elements: 0,
        }
    }
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill color painted under everything
    pub fn background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = family.into();
        self
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Number of drawn elements since the last clear
    pub fn element_count(&self) -> usize {
        self.elements
    }

    fn push<T: Into<Box<dyn Node>>>(&mut self, node: T) {
        self.content.append(node);
        self.elements += 1;
    }

    fn stroke<T: Node>(mut node: T, style: &StrokeStyle) -> T {
        node.assign("fill", "none");
        node.assign("stroke", style.color.as_str());
        node.assign("stroke-width", style.width);
        if style.is_dashed() {
            node.assign("stroke-dasharray", dash_attr(style));
        }
        node
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new()
            .set("width", self.width)
            .set("height", self.height)
            .set("viewBox", (0.0, 0.0, self.width, self.height));
        if let Some(color) = &self.background {
            document = document.add(
                Rectangle::new()
                    .set("width", "100%")
                    .set("height", "100%")
                    .set("fill", color.as_str()),
            );
        }
        document.add(self.content.clone())
    }

    pub fn to_svg_string(&self) -> Result<String, RenderError> {
        let mut output = Vec::new();
        svg::write(&mut output, &self.to_document())
            .map_err(|e| RenderError::Format(format!("Failed to write SVG: {e}")))?;
        String::from_utf8(output).map_err(|e| RenderError::Format(format!("Invalid UTF-8: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        svg::save(path, &self.to_document())?;
        Ok(())
    }
}

impl Paintable for SvgSurface {
    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.clear();
    }

    fn clear(&mut self) {
        self.content = Group::new();
        self.elements = 0;
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.push(
            Rectangle::new()
                .set("x", rect.x)
                .set("y", rect.y)
                .set("width", rect.width)
                .set("height", rect.height)
                .set("fill", color),
        );
    }

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle) {
        let line = Line::new()
            .set("x1", from.x)
            .set("y1", from.y)
            .set("x2", to.x)
            .set("y2", to.y);
        self.push(Self::stroke(line, style));
    }

    fn polyline(&mut self, points: &[Point], style: &StrokeStyle) {
        if points.len() < 2 {
            return;
        }
        let polyline = Polyline::new().set("points", points_attr(points));
        self.push(Self::stroke(polyline, style));
    }

    fn fill_polygon(&mut self, points: &[Point], color: &str) {
        self.push(
            Polygon::new()
                .set("points", points_attr(points))
                .set("fill", color),
        );
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: &str) {
        self.push(
            Circle::new()
                .set("cx", center.x)
                .set("cy", center.y)
                .set("r", radius)
                .set("fill", color),
        );
    }

    fn text(&mut self, at: Point, text: &str, color: &str, size: f64) {
        let family = self.font_family.clone();
        self.push(
            Text::new(text)
                .set("x", at.x)
                .set("y", at.y)
                .set("font-family", family)
                .set("font-size", size)
                .set("fill", color),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_primitives() {
        let mut surface = SvgSurface::new().background("#ffffff");
        surface.resize(200.0, 100.0);
        surface.fill_rect(Rect::new(10.0, 20.0, 30.0, 5.0), "#16a34a");
        surface.polyline(
            &[Point::new(0.0, 90.0), Point::new(50.0, 40.0)],
            &StrokeStyle::solid("#3b82f6", 2.0),
        );
        surface.stroke_line(
            Point::new(0.0, 10.0),
            Point::new(200.0, 10.0),
            &StrokeStyle::dashed("#cbd5e1", 1.0, 4.0, 4.0),
        );
        surface.text(Point::new(4.0, 8.0), "100%", "#cbd5e1", 10.0);

        let svg = surface.to_svg_string().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("viewBox=\"0 0 200 100\""));
        assert!(svg.contains("fill=\"#16a34a\""));
        assert!(svg.contains("points=\"0,90 50,40\""));
        assert!(svg.contains("stroke-dasharray=\"4 4\""));
        assert!(svg.contains("100%"));
        assert_eq!(surface.element_count(), 4);
    }

    #[test]
    fn resize_clears() {
        let mut surface = SvgSurface::new();
        surface.fill_circle(Point::new(1.0, 1.0), 2.0, "red");
        surface.resize(10.0, 10.0);
        assert_eq!(surface.element_count(), 0);
        assert!(!surface.to_svg_string().unwrap().contains("<circle"));
    }

    #[test]
    fn short_polyline_is_dropped() {
        let mut surface = SvgSurface::new();
        surface.polyline(&[Point::new(1.0, 1.0)], &StrokeStyle::solid("red", 1.0));
        assert_eq!(surface.element_count(), 0);
    }
}
