//! # wbsgrid-render
//!
//! Overlays painted above the virtualized grid, and the coordinator that
//! keeps them in step with it.
//!
//! This crate provides:
//! - [`CanvasOverlay`]: clipping viewport, scroll transform, clamped repaint
//! - [`BarOverlay`]: planned/actual bars and dependency arrows (gantt mode)
//! - [`CurveOverlay`]: cumulative progress S-curve (kurva mode)
//! - [`SvgSurface`]: a [`Paintable`](wbsgrid_core::Paintable) for static export
//! - [`Coordinator`]: store, grid and overlays behind the host API
//!
//! ## Example
//!
//! ```rust
//! use wbsgrid_core::{DataPayload, DisplayList, Period, Row};
//! use wbsgrid_render::{Coordinator, CoordinatorConfig, FrameOutcome};
//!
//! let mut view = Coordinator::new(CoordinatorConfig::default());
//! view.mount(1280.0, 720.0);
//! view.update_data(DataPayload {
//!     rows: vec![Row::group("A").child(Row::leaf("A.1"))],
//!     columns: vec![Period::new("w1"), Period::new("w2")],
//!     dependencies: Vec::new(),
//! });
//! view.switch_mode("gantt");
//! view.set_cell_value("A.1::w1", "40");
//!
//! let mut surface = DisplayList::new();
//! assert_eq!(view.on_animation_frame(0.0, &mut surface), FrameOutcome::Measured);
//! assert!(matches!(
//!     view.on_animation_frame(16.0, &mut surface),
//!     FrameOutcome::Painted { .. }
//! ));
//! ```

pub mod bar;
pub mod coordinator;
pub mod curve;
pub mod overlay;
pub mod svg_surface;

pub use bar::{arrow_head, format_tooltip, BarHit, BarOverlay, BarTheme, LabelIndex, Track};
pub use coordinator::{Coordinator, CoordinatorConfig, FrameOutcome};
pub use curve::{CurveGranularity, CurveMarker, CurveOverlay, CurveTheme, Series, YScale};
pub use overlay::{
    CanvasOverlay, CanvasSize, OverlayConfig, OverlayState, Viewport, MAX_CANVAS_HEIGHT,
    MAX_CANVAS_WIDTH,
};
pub use svg_surface::SvgSurface;
