//! View coordinator: store + grid + overlays behind one host-facing API.
//!
//! Overlay geometry is only read after the grid has been measured. After any
//! data, mode or resize change the coordinator runs a two-frame pipeline
//! driven by the host's animation frames:
//!
//! ```text
//!   change ─▶ frame 1: forced grid render (measure) ─▶ frame 2: overlay sync
//! ```
//!
//! Nothing here returns errors to the host. Invalid names and keys are
//! logged and ignored.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, error, warn};

use wbsgrid_core::{
    DataPayload, Geometry, InputMode, Paintable, ProgressMode, RenderMetrics, StoreEvent,
    SubscriptionId, ViewMode,
};
use wbsgrid_grid::{
    CellChange, Debouncer, EditEvent, EditOutcome, GridConfig, GridEngine, ScrollUpdate,
    DEFAULT_RESIZE_DEBOUNCE_MS,
};
use wbsgrid_store::{derive_bars, AggregationConfig, CellMap, ProgressStore, SCurve};

use crate::bar::{BarOverlay, BarTheme, LabelIndex};
use crate::curve::{CurveGranularity, CurveOverlay, CurveTheme};
use crate::overlay::OverlayConfig;

/// Everything configurable about a mounted view
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CoordinatorConfig {
    pub grid: GridConfig,
    pub overlay: OverlayConfig,
    pub bar: BarTheme,
    pub curve: CurveTheme,
    pub aggregation: AggregationConfig,
    pub granularity: CurveGranularity,
    pub resize_debounce_ms: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            overlay: OverlayConfig::default(),
            bar: BarTheme::default(),
            curve: CurveTheme::default(),
            aggregation: AggregationConfig::default(),
            granularity: CurveGranularity::Weekly,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
        }
    }
}

impl CoordinatorConfig {
    pub fn grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    pub fn overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn granularity(mut self, granularity: CurveGranularity) -> Self {
        self.granularity = granularity;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum FramePhase {
    #[default]
    Idle,
    /// Next frame runs the forced grid render
    Measure,
    /// Next frame syncs overlays against measured geometry
    Sync,
}

/// What one animation frame did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FrameOutcome {
    Idle,
    Measured,
    Painted { metrics: RenderMetrics },
}

pub struct Coordinator {
    config: CoordinatorConfig,
    store: ProgressStore,
    grid: GridEngine,
    bar: BarOverlay,
    curve: CurveOverlay,
    view_mode: ViewMode,
    payload: DataPayload,
    container: Option<(f64, f64)>,
    phase: FramePhase,
    store_changed: Rc<Cell<bool>>,
    subscription: SubscriptionId,
    resize: Debouncer,
    on_cell_change: Option<Box<dyn FnMut(&CellChange)>>,
    metrics: RenderMetrics,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let mut store = ProgressStore::new();
        let store_changed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&store_changed);
        let subscription = store.subscribe(move |event: &StoreEvent| {
            debug!(event = event.name(), "store event");
            flag.set(true);
        });

        let mut curve = CurveOverlay::new(config.overlay.clone(), config.curve.clone());
        curve.set_granularity(config.granularity);
        curve.set_bucket_size(config.aggregation.bucket_size);

        Self {
            grid: GridEngine::new(config.grid.clone()),
            bar: BarOverlay::new(config.overlay.clone(), config.bar.clone()),
            curve,
            resize: Debouncer::new(config.resize_debounce_ms),
            config,
            store,
            view_mode: ViewMode::Grid,
            payload: DataPayload::default(),
            container: None,
            phase: FramePhase::Idle,
            store_changed,
            subscription,
            on_cell_change: None,
            metrics: RenderMetrics::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Direct store access; overlays repaint on the next idle frame
    pub fn store_mut(&mut self) -> &mut ProgressStore {
        self.store_changed.set(true);
        &mut self.store
    }

    pub fn grid(&self) -> &GridEngine {
        &self.grid
    }

    pub fn bar_overlay(&self) -> &BarOverlay {
        &self.bar
    }

    pub fn curve_overlay(&self) -> &CurveOverlay {
        &self.curve
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn payload(&self) -> &DataPayload {
        &self.payload
    }

    pub fn is_mounted(&self) -> bool {
        self.container.is_some()
    }

    /// Metrics of the last overlay repaint
    pub fn metrics(&self) -> RenderMetrics {
        self.metrics
    }

    /// Subscription the coordinator holds on its own store
    pub fn store_subscription(&self) -> SubscriptionId {
        self.subscription
    }

    // ------------------------------------------------------------------------
    // Host API
    // ------------------------------------------------------------------------

    /// Attach to a container of the given size and schedule the first
    /// measure → sync cycle.
    pub fn mount(&mut self, width: f64, height: f64) {
        self.container = Some((width, height));
        self.grid.set_viewport(width, height);
        self.apply_overlay_visibility();
        self.phase = FramePhase::Measure;
        debug!(width, height, "mounted");
    }

    pub fn unmount(&mut self) {
        self.container = None;
        self.bar.canvas_mut().hide();
        self.curve.canvas_mut().hide();
        self.resize.cancel();
        self.phase = FramePhase::Idle;
    }

    /// Replace rows, columns and dependencies
    pub fn update_data(&mut self, payload: DataPayload) {
        self.grid
            .set_data(payload.rows.clone(), payload.columns.clone());
        debug!(
            rows = payload.rows.len(),
            columns = payload.columns.len(),
            dependencies = payload.dependencies.len(),
            "payload replaced"
        );
        self.payload = payload;
        self.apply_overlay_visibility();
        self.schedule_measure();
    }

    /// Expand or collapse a parent row
    pub fn toggle_row(&mut self, id: &str) -> bool {
        let changed = self.grid.toggle_row(id);
        if changed {
            self.schedule_measure();
        }
        changed
    }

    /// Load committed values (and optionally costs) for one progress mode
    pub fn load_cells(&mut self, mode: ProgressMode, values: CellMap, costs: Option<CellMap>) {
        self.store.load_data(mode, values);
        if let Some(costs) = costs {
            self.store.load_costs(mode, costs);
        }
        self.grid.refresh_text(&self.store);
    }

    /// `"grid"`, `"gantt"` or `"kurva"`; other names are logged and ignored
    pub fn switch_mode(&mut self, name: &str) {
        match name.parse::<ViewMode>() {
            Ok(mode) => self.set_view_mode(mode),
            Err(e) => error!(mode = name, error = %e, "ignoring unknown view mode"),
        }
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if mode == self.view_mode {
            return;
        }
        debug!(old = %self.view_mode, new = %mode, "view mode switch");
        self.view_mode = mode;
        self.apply_overlay_visibility();
        self.schedule_measure();
    }

    /// Planned/actual switch by name; unknown names are logged and ignored
    pub fn switch_progress_mode(&mut self, name: &str) {
        if self.store.switch_mode_named(name).is_ok() {
            self.grid.refresh_text(&self.store);
        }
    }

    /// `"percentage"`, `"volume"` or `"cost"`. Only the formatter re-runs.
    pub fn set_input_mode(&mut self, name: &str) {
        match name.parse::<InputMode>() {
            Ok(mode) => self.grid.set_input_mode(mode, &self.store),
            Err(e) => error!(mode = name, error = %e, "ignoring unknown input mode"),
        }
    }

    pub fn set_granularity(&mut self, granularity: CurveGranularity) {
        self.curve.set_granularity(granularity);
        self.store_changed.set(true);
    }

    /// Register the host callback fired for every committed cell edit
    pub fn on_cell_change(&mut self, callback: impl FnMut(&CellChange) + 'static) {
        self.on_cell_change = Some(Box::new(callback));
    }

    /// Listen to store notifications (`mode-switch`, `commit`, `reset`)
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    /// Removing the coordinator's own subscription is refused
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        if id == self.subscription {
            warn!("refusing to drop the coordinator's store subscription");
            return false;
        }
        self.store.unsubscribe(id)
    }

    /// Forward an input event to the grid editor
    pub fn handle_edit(&mut self, event: EditEvent) -> EditOutcome {
        let outcome = self.grid.handle_edit(event, &mut self.store);
        if let EditOutcome::Committed { change, .. } = &outcome {
            self.store_changed.set(true);
            if let Some(callback) = self.on_cell_change.as_mut() {
                callback(change);
            }
        }
        outcome
    }

    /// Write a raw value addressed by `"entity::period"`. Invalid keys or
    /// values are logged by the store and leave it untouched.
    pub fn set_cell_value(&mut self, key: &str, raw: &str) -> bool {
        match self.store.set_cell_by_key(key, raw) {
            Ok(_) => {
                self.store_changed.set(true);
                self.grid.refresh_text(&self.store);
                true
            }
            Err(_) => false,
        }
    }

    pub fn commit_changes(&mut self) -> usize {
        self.store.commit_changes()
    }

    pub fn discard_changes(&mut self) -> usize {
        let dropped = self.store.discard_changes();
        self.grid.refresh_text(&self.store);
        dropped
    }

    /// Scroll the body. Overlays only get a new transform.
    pub fn on_scroll(&mut self, top: f64, left: f64) -> ScrollUpdate {
        let update = self.grid.on_scroll(top, left);
        self.bar
            .canvas_mut()
            .on_scroll(update.scroll_left, update.scroll_top);
        self.curve
            .canvas_mut()
            .on_scroll(update.scroll_left, update.scroll_top);
        if update.range_changed {
            self.grid.render(&self.store);
        }
        update
    }

    /// Container resized; the repaint waits for the debounce window
    pub fn on_resize(&mut self, width: f64, height: f64, now_ms: f64) {
        if self.container.is_none() {
            warn!("resize before mount ignored");
            return;
        }
        self.container = Some((width, height));
        self.grid.set_viewport(width, height);
        self.resize.trigger(now_ms);
    }

    /// Current CSS transform of the active overlay canvas
    pub fn overlay_transform(&self) -> Option<String> {
        match self.view_mode {
            ViewMode::Grid => None,
            ViewMode::Gantt => Some(self.bar.canvas().transform()),
            ViewMode::Kurva => Some(self.curve.canvas().transform()),
        }
    }

    // ------------------------------------------------------------------------
    // Frame pipeline
    // ------------------------------------------------------------------------

    fn schedule_measure(&mut self) {
        if self.is_mounted() {
            self.phase = FramePhase::Measure;
        }
    }

    fn apply_overlay_visibility(&mut self) {
        let Some((width, height)) = self.container else {
            return;
        };
        let pinned = self.grid.pinned_columns_width();
        let scroll_height = (height - self.config.grid.header_height).max(0.0);
        match self.view_mode {
            ViewMode::Grid => {
                self.bar.canvas_mut().hide();
                self.curve.canvas_mut().hide();
            }
            ViewMode::Gantt => {
                self.curve.canvas_mut().hide();
                self.bar.canvas_mut().show(width, pinned, scroll_height);
            }
            ViewMode::Kurva => {
                self.bar.canvas_mut().hide();
                self.curve.canvas_mut().show(width, pinned, scroll_height);
            }
        }
    }

    /// Advance the pipeline by one host animation frame
    pub fn on_animation_frame(&mut self, now_ms: f64, surface: &mut dyn Paintable) -> FrameOutcome {
        if !self.is_mounted() {
            return FrameOutcome::Idle;
        }
        if self.resize.poll(now_ms) {
            debug!("debounced resize repaint");
            self.apply_overlay_visibility();
            self.phase = FramePhase::Measure;
        }

        match self.phase {
            FramePhase::Measure => {
                self.grid.measure(&self.store);
                self.phase = FramePhase::Sync;
                FrameOutcome::Measured
            }
            FramePhase::Sync => {
                if !self.grid.is_measured() {
                    self.phase = FramePhase::Measure;
                    return FrameOutcome::Idle;
                }
                self.phase = FramePhase::Idle;
                self.store_changed.set(false);
                FrameOutcome::Painted {
                    metrics: self.repaint_overlays(surface),
                }
            }
            FramePhase::Idle if self.store_changed.replace(false) => {
                if !self.grid.is_measured() {
                    self.phase = FramePhase::Measure;
                    return FrameOutcome::Idle;
                }
                FrameOutcome::Painted {
                    metrics: self.repaint_overlays(surface),
                }
            }
            FramePhase::Idle => FrameOutcome::Idle,
        }
    }

    /// Planned and actual S-curve from the merged store views
    pub fn s_curve(&mut self) -> SCurve {
        let planned = self.store.get_all_cells_for_mode(ProgressMode::Planned);
        let actual = self.store.get_all_cells_for_mode(ProgressMode::Actual);
        SCurve::compute(&self.payload.rows, &self.payload.columns, &planned, &actual)
    }

    fn repaint_overlays(&mut self, surface: &mut dyn Paintable) -> RenderMetrics {
        self.metrics = match self.view_mode {
            ViewMode::Grid => {
                surface.clear();
                RenderMetrics::default()
            }
            ViewMode::Gantt => {
                let planned = self.store.get_all_cells_for_mode(ProgressMode::Planned);
                let actual = self.store.get_all_cells_for_mode(ProgressMode::Actual);
                let bars = derive_bars(&self.payload.rows, &self.payload.columns, &planned, &actual);
                self.bar.set_data(
                    bars,
                    self.payload.dependencies.clone(),
                    LabelIndex::new(&self.payload.rows, &self.payload.columns),
                );
                self.bar.repaint(&self.grid, surface)
            }
            ViewMode::Kurva => {
                let curve = self.s_curve();
                self.curve.set_curve(curve);
                self.curve.repaint(&self.grid, surface)
            }
        };
        self.metrics
    }
}
