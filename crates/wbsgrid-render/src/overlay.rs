//! Canvas overlay base: a transparent surface above the grid body.
//!
//! The overlay is clipped to a viewport that starts at the right edge of the
//! pinned columns. Scrolling only moves the canvas with a CSS transform;
//! pixels are redrawn on data, resize or mode changes.
//!
//! The canvas origin sits at content x = pinned width, so a geometry rect is
//! painted at `x - pinned_width`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wbsgrid_core::{Paintable, Point, Rect};

/// Largest canvas the host platforms reliably allocate
pub const MAX_CANVAS_WIDTH: f64 = 32_000.0;
pub const MAX_CANVAS_HEIGHT: f64 = 16_000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OverlayConfig {
    /// Space kept free left of the clipping viewport
    pub margin_left: f64,
    /// Space kept free right of the clipping viewport (vertical scrollbar)
    pub margin_right: f64,
    pub max_width: f64,
    pub max_height: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            margin_left: 0.0,
            margin_right: 0.0,
            max_width: MAX_CANVAS_WIDTH,
            max_height: MAX_CANVAS_HEIGHT,
        }
    }
}

impl OverlayConfig {
    pub fn margins(mut self, left: f64, right: f64) -> Self {
        self.margin_left = left;
        self.margin_right = right;
        self
    }

    pub fn max_size(mut self, width: f64, height: f64) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayState {
    #[default]
    Hidden,
    Visible,
}

/// Fixed-position clipping box, in container pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Viewport {
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Pixel size of the backing canvas after clamping
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
    pub clamped: bool,
}

#[derive(Clone, Debug, Default)]
pub struct CanvasOverlay {
    config: OverlayConfig,
    state: OverlayState,
    viewport: Option<Viewport>,
    origin_x: f64,
    scroll_left: f64,
    scroll_top: f64,
    size: CanvasSize,
    repaints: usize,
}

impl CanvasOverlay {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state == OverlayState::Visible
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Full repaints since creation
    pub fn repaints(&self) -> usize {
        self.repaints
    }

    /// Attach the clipping viewport:
    /// `(container_width − pinned_width − margins) × scroll_height`
    pub fn show(&mut self, container_width: f64, pinned_width: f64, scroll_height: f64) -> Viewport {
        let width = (container_width - pinned_width - self.config.margin_left - self.config.margin_right)
            .max(0.0);
        let viewport = Viewport {
            left: pinned_width + self.config.margin_left,
            width,
            height: scroll_height.max(0.0),
        };
        self.viewport = Some(viewport);
        self.origin_x = pinned_width;
        self.state = OverlayState::Visible;
        viewport
    }

    /// Detach the viewport; nothing is painted while hidden
    pub fn hide(&mut self) {
        self.viewport = None;
        self.state = OverlayState::Hidden;
    }

    /// Record the scroll position and return the new transform. No repaint.
    pub fn on_scroll(&mut self, scroll_left: f64, scroll_top: f64) -> String {
        self.scroll_left = scroll_left;
        self.scroll_top = scroll_top;
        self.transform()
    }

    /// CSS transform keeping the canvas aligned with the scrolled body
    pub fn transform(&self) -> String {
        format!("translate(-{}px, -{}px)", self.scroll_left, self.scroll_top)
    }

    /// Start a full repaint: size the surface from the content extent
    /// (clamped) and clear it. Returns `None` while hidden.
    pub fn begin_repaint(
        &mut self,
        surface: &mut dyn Paintable,
        content_size: (f64, f64),
    ) -> Option<CanvasSize> {
        if !self.is_visible() {
            return None;
        }
        let wanted_width = (content_size.0 - self.origin_x).max(0.0);
        let wanted_height = content_size.1.max(0.0);
        let width = wanted_width.min(self.config.max_width);
        let height = wanted_height.min(self.config.max_height);
        let clamped = width < wanted_width || height < wanted_height;
        if clamped {
            warn!(
                wanted_width,
                wanted_height, width, height, "overlay canvas clamped to platform limit"
            );
        }

        self.size = CanvasSize {
            width,
            height,
            clamped,
        };
        surface.resize(width, height);
        self.repaints += 1;
        debug!(width, height, repaint = self.repaints, "overlay repaint");
        Some(self.size)
    }

    /// Content x where canvas x = 0
    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    pub fn to_canvas(&self, rect: Rect) -> Rect {
        rect.offset(-self.origin_x, 0.0)
    }

    pub fn point_to_canvas(&self, point: Point) -> Point {
        Point::new(point.x - self.origin_x, point.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbsgrid_core::DisplayList;

    #[test]
    fn show_sizes_viewport_right_of_pinned_band() {
        let mut overlay = CanvasOverlay::new(OverlayConfig::default().margins(0.0, 16.0));
        let viewport = overlay.show(1200.0, 360.0, 500.0);
        assert_eq!(
            viewport,
            Viewport {
                left: 360.0,
                width: 824.0,
                height: 500.0
            }
        );
        assert!(overlay.is_visible());

        overlay.hide();
        assert_eq!(overlay.viewport(), None);
        assert_eq!(overlay.state(), OverlayState::Hidden);
    }

    #[test]
    fn scroll_changes_transform_only() {
        let mut overlay = CanvasOverlay::default();
        overlay.show(800.0, 200.0, 400.0);
        assert_eq!(overlay.on_scroll(120.0, 64.0), "translate(-120px, -64px)");
        assert_eq!(overlay.repaints(), 0);
    }

    #[test]
    fn hidden_overlay_does_not_repaint() {
        let mut overlay = CanvasOverlay::default();
        let mut surface = DisplayList::new();
        assert_eq!(overlay.begin_repaint(&mut surface, (1000.0, 1000.0)), None);
        assert!(surface.is_empty());
    }

    #[test]
    fn canvas_size_is_clamped() {
        let mut overlay = CanvasOverlay::default();
        overlay.show(1000.0, 300.0, 600.0);
        let mut surface = DisplayList::new();
        let size = overlay
            .begin_repaint(&mut surface, (300.0 + 50_000.0, 200_000.0))
            .unwrap();
        assert_eq!(
            size,
            CanvasSize {
                width: MAX_CANVAS_WIDTH,
                height: MAX_CANVAS_HEIGHT,
                clamped: true
            }
        );
        assert_eq!((surface.width, surface.height), (32_000.0, 16_000.0));
    }

    #[test]
    fn canvas_coordinates_start_at_pinned_edge() {
        let mut overlay = CanvasOverlay::default();
        overlay.show(1000.0, 300.0, 600.0);
        let rect = overlay.to_canvas(Rect::new(364.0, 32.0, 64.0, 32.0));
        assert_eq!(rect, Rect::new(64.0, 32.0, 64.0, 32.0));
    }
}
