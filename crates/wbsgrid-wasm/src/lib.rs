//! WebAssembly bindings for the wbsgrid progress grid
//!
//! [`WbsGrid`] wraps a [`Coordinator`] for a browser host. The host owns the
//! DOM: it forwards scroll, resize, pointer and keyboard events, calls
//! [`WbsGrid::animation_frame`] from `requestAnimationFrame`, and replays the
//! returned display list onto its overlay canvas.
//!
//! Rendered output crosses the boundary as JSON strings; payloads coming in
//! accept either plain JS objects or JSON text.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use wbsgrid_core::{CellKey, DisplayList, ProgressMode, StoreEvent, SubscriptionId, ViewMode};
use wbsgrid_grid::{CellChange, Direction, EditEvent, EditOutcome, KeyInput};
use wbsgrid_render::{Coordinator, CoordinatorConfig, CurveGranularity, FrameOutcome, Series};
use wbsgrid_store::CellMap;

/// Initialize panic hook for better error messages in console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":{:?}}}", e.to_string()))
}

/// Call a host function with `value` converted to a JS object
fn call_js<T: Serialize + ?Sized>(function: &js_sys::Function, value: &T) {
    match serde_wasm_bindgen::to_value(value) {
        Ok(value) => {
            if let Err(e) = function.call1(&JsValue::NULL, &value) {
                web_sys::console::error_1(&e);
            }
        }
        Err(e) => web_sys::console::error_1(&e.into()),
    }
}

/// Map a DOM `KeyboardEvent.key` to editor input
pub fn key_input(key: &str, shift: bool) -> Option<KeyInput> {
    let input = match key {
        "Enter" => KeyInput::Enter { shift },
        "Tab" => KeyInput::Tab { shift },
        "Escape" | "Esc" => KeyInput::Escape,
        "Backspace" => KeyInput::Backspace,
        "ArrowUp" => KeyInput::Arrow(Direction::Up),
        "ArrowDown" => KeyInput::Arrow(Direction::Down),
        "ArrowLeft" => KeyInput::Arrow(Direction::Left),
        "ArrowRight" => KeyInput::Arrow(Direction::Right),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyInput::Char(c),
                _ => return None,
            }
        }
    };
    Some(input)
}

/// Convert `{"entity::period": value}` into a cell map; bad keys are skipped
fn cell_map(entries: HashMap<String, f64>) -> CellMap {
    entries
        .into_iter()
        .filter_map(|(raw, value)| match raw.parse::<CellKey>() {
            Ok(key) => Some((key, value)),
            Err(e) => {
                web_sys::console::warn_1(&js_error(e));
                None
            }
        })
        .collect()
}

/// JSON form of an [`EditOutcome`]
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum EditReport {
    Ignored,
    #[serde(rename_all = "camelCase")]
    FocusMoved { key: String },
    #[serde(rename_all = "camelCase")]
    Started { key: String },
    Updated,
    #[serde(rename_all = "camelCase")]
    Committed {
        change: CellChange,
        next_focus: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Rejected { key: String, error: String },
    #[serde(rename_all = "camelCase")]
    Cancelled { key: String },
}

impl From<EditOutcome> for EditReport {
    fn from(outcome: EditOutcome) -> Self {
        match outcome {
            EditOutcome::Ignored => Self::Ignored,
            EditOutcome::FocusMoved(key) => Self::FocusMoved {
                key: key.to_string(),
            },
            EditOutcome::Started(key) => Self::Started {
                key: key.to_string(),
            },
            EditOutcome::Updated => Self::Updated,
            EditOutcome::Committed { change, next_focus } => Self::Committed {
                change,
                next_focus: next_focus.map(|k| k.to_string()),
            },
            EditOutcome::Rejected { key, error } => Self::Rejected {
                key: key.to_string(),
                error: error.to_string(),
            },
            EditOutcome::Cancelled(key) => Self::Cancelled {
                key: key.to_string(),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameReport<'a> {
    outcome: FrameOutcome,
    /// CSS transform of the active overlay canvas
    transform: Option<String>,
    /// Present only when the frame repainted
    display_list: Option<&'a DisplayList>,
}

type ChangeListener = Box<dyn FnMut(&CellChange)>;

/// Where committed cell changes go: the host listener once one is
/// registered, otherwise a log emptied by `drainChanges`.
#[derive(Default)]
struct ChangeRoute {
    listener: Option<ChangeListener>,
    log: Vec<CellChange>,
}

impl ChangeRoute {
    fn deliver(&mut self, change: &CellChange) {
        match self.listener.as_mut() {
            Some(listener) => listener(change),
            None => self.log.push(change.clone()),
        }
    }

    fn listen(&mut self, listener: ChangeListener) {
        self.log.clear();
        self.listener = Some(listener);
    }
}

/// Progress grid bound to one host container
#[wasm_bindgen]
pub struct WbsGrid {
    view: Coordinator,
    surface: DisplayList,
    changes: Rc<RefCell<ChangeRoute>>,
    store_listener: Option<SubscriptionId>,
}

impl WbsGrid {
    fn with_config(config: CoordinatorConfig) -> Self {
        let mut view = Coordinator::new(config);
        let changes: Rc<RefCell<ChangeRoute>> = Rc::default();

        let route = Rc::clone(&changes);
        view.on_cell_change(move |change| route.borrow_mut().deliver(change));

        Self {
            view,
            surface: DisplayList::new(),
            changes,
            store_listener: None,
        }
    }

    /// Send committed changes to `listener` instead of the drain log
    fn listen_changes(&mut self, listener: impl FnMut(&CellChange) + 'static) {
        self.changes.borrow_mut().listen(Box::new(listener));
    }

    /// Replace the store event listener
    fn listen_store_events(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        if let Some(previous) = self.store_listener.take() {
            self.view.unsubscribe(previous);
        }
        self.store_listener = Some(self.view.subscribe(listener));
    }

    fn edit(&mut self, event: EditEvent) -> String {
        to_json(&EditReport::from(self.view.handle_edit(event)))
    }
}

impl Default for WbsGrid {
    fn default() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }
}

#[wasm_bindgen]
impl WbsGrid {
    /// Create a grid with default configuration
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a grid from a configuration object (kebab-case keys, all optional)
    #[wasm_bindgen(js_name = withConfig)]
    pub fn from_config(config: JsValue) -> Result<WbsGrid, JsValue> {
        let config: CoordinatorConfig = serde_wasm_bindgen::from_value(config)?;
        Ok(Self::with_config(config))
    }

    /// Create a grid from JSON configuration text
    #[wasm_bindgen(js_name = withConfigJson)]
    pub fn from_config_json(json: &str) -> Result<WbsGrid, JsValue> {
        let config: CoordinatorConfig = serde_json::from_str(json).map_err(js_error)?;
        Ok(Self::with_config(config))
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Attach to a container element, sized from its client box
    pub fn mount(&mut self, container: &web_sys::Element) {
        self.mount_size(
            f64::from(container.client_width()),
            f64::from(container.client_height()),
        );
    }

    #[wasm_bindgen(js_name = mountSize)]
    pub fn mount_size(&mut self, width: f64, height: f64) {
        self.view.mount(width, height);
    }

    pub fn unmount(&mut self) {
        self.view.unmount();
        self.surface = DisplayList::new();
    }

    #[wasm_bindgen(js_name = isMounted)]
    pub fn is_mounted(&self) -> bool {
        self.view.is_mounted()
    }

    // ------------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------------

    /// Replace rows, columns and dependencies
    #[wasm_bindgen(js_name = updateData)]
    pub fn update_data(&mut self, payload: JsValue) -> Result<(), JsValue> {
        self.view.update_data(serde_wasm_bindgen::from_value(payload)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = updateDataJson)]
    pub fn update_data_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.view
            .update_data(serde_json::from_str(json).map_err(js_error)?);
        Ok(())
    }

    /// Load committed `{"entity::period": value}` maps for one progress mode
    #[wasm_bindgen(js_name = loadCells)]
    pub fn load_cells(&mut self, mode: &str, values: JsValue, costs: JsValue) -> Result<(), JsValue> {
        let mode: ProgressMode = mode.parse().map_err(js_error)?;
        let values: HashMap<String, f64> = serde_wasm_bindgen::from_value(values)?;
        let costs: Option<HashMap<String, f64>> = serde_wasm_bindgen::from_value(costs)?;
        self.view
            .load_cells(mode, cell_map(values), costs.map(cell_map));
        Ok(())
    }

    #[wasm_bindgen(js_name = loadCellsJson)]
    pub fn load_cells_json(&mut self, mode: &str, values: &str) -> Result<(), JsValue> {
        let mode: ProgressMode = mode.parse().map_err(js_error)?;
        let values: HashMap<String, f64> = serde_json::from_str(values).map_err(js_error)?;
        self.view.load_cells(mode, cell_map(values), None);
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleRow)]
    pub fn toggle_row(&mut self, id: &str) -> bool {
        self.view.toggle_row(id)
    }

    // ------------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------------

    /// `"grid"`, `"gantt"` or `"kurva"`
    #[wasm_bindgen(js_name = switchMode)]
    pub fn switch_mode(&mut self, mode: &str) {
        self.view.switch_mode(mode);
    }

    #[wasm_bindgen(js_name = viewMode)]
    pub fn view_mode(&self) -> String {
        self.view.view_mode().to_string()
    }

    /// `"planned"` or `"actual"`
    #[wasm_bindgen(js_name = switchProgressMode)]
    pub fn switch_progress_mode(&mut self, mode: &str) {
        self.view.switch_progress_mode(mode);
    }

    /// `"percentage"`, `"volume"` or `"cost"`
    #[wasm_bindgen(js_name = setInputMode)]
    pub fn set_input_mode(&mut self, mode: &str) {
        self.view.set_input_mode(mode);
    }

    /// `"weekly"` or `"monthly"`
    #[wasm_bindgen(js_name = setGranularity)]
    pub fn set_granularity(&mut self, granularity: &str) -> Result<(), JsValue> {
        let granularity: CurveGranularity = granularity.parse().map_err(js_error)?;
        self.view.set_granularity(granularity);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------------

    /// Register the callback fired with every committed cell change.
    /// Changes are no longer queued for `drainChanges` afterwards.
    #[wasm_bindgen(js_name = onCellChange)]
    pub fn on_cell_change(&mut self, callback: js_sys::Function) {
        self.listen_changes(move |change| call_js(&callback, change));
    }

    /// Register the callback fired with `mode-switch`, `commit` and `reset`
    /// store events; replaces any earlier one
    #[wasm_bindgen(js_name = onStoreEvent)]
    pub fn on_store_event(&mut self, callback: js_sys::Function) {
        self.listen_store_events(move |event| call_js(&callback, event));
    }

    /// Committed changes since the last call, as a JSON array. Empty once
    /// an `onCellChange` callback is registered.
    #[wasm_bindgen(js_name = drainChanges)]
    pub fn drain_changes(&mut self) -> String {
        let changes = std::mem::take(&mut self.changes.borrow_mut().log);
        to_json(&changes)
    }

    /// Single click on a cell addressed as `"entity::period"`
    pub fn click(&mut self, key: &str) -> String {
        match key.parse::<CellKey>() {
            Ok(key) => self.edit(EditEvent::Click(key)),
            Err(_) => to_json(&EditReport::Ignored),
        }
    }

    #[wasm_bindgen(js_name = doubleClick)]
    pub fn double_click(&mut self, key: &str) -> String {
        match key.parse::<CellKey>() {
            Ok(key) => self.edit(EditEvent::DoubleClick(key)),
            Err(_) => to_json(&EditReport::Ignored),
        }
    }

    /// Forward a `KeyboardEvent.key`; unknown keys are ignored
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str, shift: bool) -> String {
        match key_input(key, shift) {
            Some(input) => self.edit(EditEvent::Key(input)),
            None => to_json(&EditReport::Ignored),
        }
    }

    pub fn blur(&mut self) -> String {
        self.edit(EditEvent::Blur)
    }

    /// Write a raw value to `"entity::period"` in the current progress mode
    #[wasm_bindgen(js_name = setCellValue)]
    pub fn set_cell_value(&mut self, key: &str, raw: &str) -> bool {
        self.view.set_cell_value(key, raw)
    }

    #[wasm_bindgen(js_name = getCellValue)]
    pub fn get_cell_value(&self, entity: &str, period: &str) -> f64 {
        self.view.store().get_cell_value(entity, period)
    }

    #[wasm_bindgen(js_name = commitChanges)]
    pub fn commit_changes(&mut self) -> usize {
        self.view.commit_changes()
    }

    #[wasm_bindgen(js_name = discardChanges)]
    pub fn discard_changes(&mut self) -> usize {
        self.view.discard_changes()
    }

    /// Pending edits of the current progress mode, as a JSON array
    #[wasm_bindgen(js_name = pendingChanges)]
    pub fn pending_changes(&self) -> String {
        let store = self.view.store();
        to_json(&store.pending_changes(store.current_mode()))
    }

    // ------------------------------------------------------------------------
    // Host events and rendering
    // ------------------------------------------------------------------------

    /// Apply a scroll position; returns the header transform and row range
    pub fn scroll(&mut self, top: f64, left: f64) -> String {
        to_json(&self.view.on_scroll(top, left))
    }

    pub fn resize(&mut self, width: f64, height: f64, now_ms: f64) {
        self.view.on_resize(width, height, now_ms);
    }

    #[wasm_bindgen(js_name = overlayTransform)]
    pub fn overlay_transform(&self) -> Option<String> {
        self.view.overlay_transform()
    }

    /// Advance one animation frame. The display list is included only when
    /// the overlay canvas was repainted.
    #[wasm_bindgen(js_name = animationFrame)]
    pub fn animation_frame(&mut self, now_ms: f64) -> String {
        let outcome = self.view.on_animation_frame(now_ms, &mut self.surface);
        let painted = matches!(outcome, FrameOutcome::Painted { .. });
        to_json(&FrameReport {
            outcome,
            transform: self.view.overlay_transform(),
            display_list: painted.then_some(&self.surface),
        })
    }

    /// Materialized rows of the virtual window
    #[wasm_bindgen(js_name = gridView)]
    pub fn grid_view(&self) -> String {
        to_json(self.view.grid().view())
    }

    /// Cumulative planned/actual series with its summary
    #[wasm_bindgen(js_name = sCurve)]
    pub fn s_curve(&mut self) -> String {
        let curve = self.view.s_curve();
        to_json(&serde_json::json!({
            "curve": curve,
            "summary": curve.summary(),
        }))
    }

    /// Tooltip for the overlay element under a content-space point
    #[wasm_bindgen(js_name = tooltipAt)]
    pub fn tooltip_at(&self, x: f64, y: f64) -> Option<String> {
        match self.view.view_mode() {
            ViewMode::Grid => None,
            ViewMode::Gantt => {
                let bars = self.view.bar_overlay();
                bars.hit_test(x, y).map(|hit| bars.tooltip(hit))
            }
            ViewMode::Kurva => self.view.curve_overlay().hit_test(x, y).map(|marker| {
                let series = match marker.series {
                    Series::Planned => "plan",
                    Series::Actual => "actual",
                };
                format!(
                    "{}: {series} {:.2}%",
                    marker.period_id, marker.cumulative_progress
                )
            }),
        }
    }
}
