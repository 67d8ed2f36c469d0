//! Dual-mode progress store.
//!
//! Each [`ProgressMode`] owns a [`ModeState`]: a committed map loaded from the
//! backend, a pending map of unsaved edits, and a parallel pair of maps for
//! monetary cost values. Reads resolve `pending ?? committed ?? 0`.
//!
//! The merged view returned by [`ProgressStore::get_all_cells_for_mode`] is
//! memoized per mode and shared as an `Rc`, so callers can cheaply detect
//! changes with `Rc::ptr_eq`. Every mutation marks the mode dirty and drops
//! the cached view.

use serde::Serialize;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, warn};

use wbsgrid_core::{CellKey, EventBus, ParseError, ProgressMode, StoreEvent, SubscriptionId};

/// Cell values keyed by (entity, period)
pub type CellMap = HashMap<CellKey, f64>;

/// Store mutation error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Not a number: {0:?}")]
    NotANumber(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Cost values can only be edited in actual mode (current mode: {0})")]
    CostRequiresActual(ProgressMode),
}

/// Parse host input the way the grid accepts it: surrounding whitespace and a
/// trailing `%` are ignored; non-finite numbers are rejected.
pub fn parse_cell_input(raw: &str) -> Result<f64, StoreError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(StoreError::NotANumber(raw.to_string())),
    }
}

/// Committed + pending values of one mode
#[derive(Debug, Default)]
pub struct ModeState {
    assignment_map: CellMap,
    modified_cells: CellMap,
    cost_assignment_map: CellMap,
    cost_modified_cells: CellMap,
    dirty: bool,
    cost_dirty: bool,
    merged: Option<Rc<CellMap>>,
    merged_costs: Option<Rc<CellMap>>,
}

impl ModeState {
    /// Effective value: pending, then committed, then 0
    pub fn value(&self, key: &CellKey) -> f64 {
        self.modified_cells
            .get(key)
            .or_else(|| self.assignment_map.get(key))
            .copied()
            .unwrap_or(0.0)
    }

    /// Effective cost: pending, then committed, then 0
    pub fn cost(&self, key: &CellKey) -> f64 {
        self.cost_modified_cells
            .get(key)
            .or_else(|| self.cost_assignment_map.get(key))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn committed(&self) -> &CellMap {
        &self.assignment_map
    }

    pub fn pending(&self) -> &CellMap {
        &self.modified_cells
    }

    pub fn pending_costs(&self) -> &CellMap {
        &self.cost_modified_cells
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.cost_dirty
    }

    fn pending_len(&self) -> usize {
        self.modified_cells.len() + self.cost_modified_cells.len()
    }

    fn invalidate(&mut self) {
        self.dirty = true;
        self.merged = None;
    }

    fn invalidate_costs(&mut self) {
        self.cost_dirty = true;
        self.merged_costs = None;
    }

    fn set_pending(&mut self, key: CellKey, value: f64) {
        self.modified_cells.insert(key, value);
        self.invalidate();
    }

    fn set_pending_cost(&mut self, key: CellKey, value: f64) {
        self.cost_modified_cells.insert(key, value);
        self.invalidate_costs();
    }

    /// Move pending into committed; returns the number of entries moved
    fn commit(&mut self) -> usize {
        let moved = self.pending_len();
        if !self.modified_cells.is_empty() {
            self.assignment_map.extend(self.modified_cells.drain());
            self.invalidate();
        }
        if !self.cost_modified_cells.is_empty() {
            self.cost_assignment_map
                .extend(self.cost_modified_cells.drain());
            self.invalidate_costs();
        }
        moved
    }

    fn discard(&mut self) -> usize {
        let dropped = self.pending_len();
        self.modified_cells.clear();
        self.cost_modified_cells.clear();
        self.invalidate();
        self.invalidate_costs();
        dropped
    }

    fn load(&mut self, committed: CellMap) {
        self.assignment_map = committed;
        self.modified_cells.clear();
        self.invalidate();
    }

    fn load_costs(&mut self, committed: CellMap) {
        self.cost_assignment_map = committed;
        self.cost_modified_cells.clear();
        self.invalidate_costs();
    }

    fn merged_view(&mut self) -> Rc<CellMap> {
        if !self.dirty {
            if let Some(view) = &self.merged {
                return Rc::clone(view);
            }
        }
        let view = Rc::new(merge(&self.assignment_map, &self.modified_cells));
        self.merged = Some(Rc::clone(&view));
        self.dirty = false;
        view
    }

    fn merged_cost_view(&mut self) -> Rc<CellMap> {
        if !self.cost_dirty {
            if let Some(view) = &self.merged_costs {
                return Rc::clone(view);
            }
        }
        let view = Rc::new(merge(
            &self.cost_assignment_map,
            &self.cost_modified_cells,
        ));
        self.merged_costs = Some(Rc::clone(&view));
        self.cost_dirty = false;
        view
    }
}

fn merge(committed: &CellMap, pending: &CellMap) -> CellMap {
    let mut merged = committed.clone();
    merged.extend(pending.iter().map(|(k, v)| (k.clone(), *v)));
    merged
}

/// An unsaved edit, for the host to persist upstream
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub key: CellKey,
    pub value: f64,
    pub mode: ProgressMode,
}

/// Planned/actual progress values with pending-vs-committed separation
#[derive(Debug, Default)]
pub struct ProgressStore {
    planned: ModeState,
    actual: ModeState,
    current: ProgressMode,
    events: EventBus<StoreEvent>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode that `get_cell_value` / `set_cell_value` target
    pub fn current_mode(&self) -> ProgressMode {
        self.current
    }

    pub fn state(&self, mode: ProgressMode) -> &ModeState {
        match mode {
            ProgressMode::Planned => &self.planned,
            ProgressMode::Actual => &self.actual,
        }
    }

    fn state_mut(&mut self, mode: ProgressMode) -> &mut ModeState {
        match mode {
            ProgressMode::Planned => &mut self.planned,
            ProgressMode::Actual => &mut self.actual,
        }
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Effective value in the current mode; 0 if absent
    pub fn get_cell_value(&self, entity: &str, period: &str) -> f64 {
        self.value_in(self.current, &CellKey::new(entity, period))
    }

    /// Effective value in a specific mode; 0 if absent
    pub fn value_in(&self, mode: ProgressMode, key: &CellKey) -> f64 {
        self.state(mode).value(key)
    }

    /// Effective cost in a specific mode; 0 if absent
    pub fn cost_in(&self, mode: ProgressMode, key: &CellKey) -> f64 {
        self.state(mode).cost(key)
    }

    /// Effective cost in the current mode; 0 if absent
    pub fn get_cost_value(&self, entity: &str, period: &str) -> f64 {
        self.cost_in(self.current, &CellKey::new(entity, period))
    }

    /// Merged committed ⊕ pending view of `mode` (pending wins).
    ///
    /// The same `Rc` is returned until the mode is mutated again.
    pub fn get_all_cells_for_mode(&mut self, mode: ProgressMode) -> Rc<CellMap> {
        let state = self.state_mut(mode);
        if state.dirty || state.merged.is_none() {
            debug!(mode = %mode, "rebuilding merged cell view");
        }
        state.merged_view()
    }

    /// Merged committed ⊕ pending cost view of `mode`
    pub fn get_all_costs_for_mode(&mut self, mode: ProgressMode) -> Rc<CellMap> {
        self.state_mut(mode).merged_cost_view()
    }

    pub fn is_dirty(&self, mode: ProgressMode) -> bool {
        self.state(mode).is_dirty()
    }

    pub fn has_pending_changes(&self, mode: ProgressMode) -> bool {
        self.state(mode).pending_len() > 0
    }

    /// Pending value edits of `mode`, sorted by key
    pub fn pending_changes(&self, mode: ProgressMode) -> Vec<PendingChange> {
        let mut changes: Vec<PendingChange> = self
            .state(mode)
            .pending()
            .iter()
            .map(|(key, value)| PendingChange {
                key: key.clone(),
                value: *value,
                mode,
            })
            .collect();
        changes.sort_by(|a, b| a.key.cmp(&b.key));
        changes
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Parse `raw` and write it to the pending map of the current mode.
    ///
    /// Non-numeric input is logged and leaves the store untouched.
    pub fn set_cell_value(
        &mut self,
        entity: &str,
        period: &str,
        raw: &str,
    ) -> Result<f64, StoreError> {
        let value = parse_cell_input(raw).map_err(|e| {
            warn!(entity, period, input = raw, "ignoring non-numeric cell value");
            e
        })?;
        self.set_cell_number(CellKey::new(entity, period), value)?;
        Ok(value)
    }

    /// Like [`set_cell_value`](Self::set_cell_value), addressed by the
    /// `"entity::period"` text form of a key.
    pub fn set_cell_by_key(&mut self, key: &str, raw: &str) -> Result<f64, StoreError> {
        let key: CellKey = key.parse().map_err(|e: ParseError| {
            error!(key, "invalid cell key");
            StoreError::from(e)
        })?;
        self.set_cell_value(&key.entity_id, &key.period_id, raw)
    }

    /// Write an already-validated number to the pending map of the current mode
    pub fn set_cell_number(&mut self, key: CellKey, value: f64) -> Result<(), StoreError> {
        if !value.is_finite() {
            warn!(key = %key, value, "ignoring non-finite cell value");
            return Err(StoreError::NotANumber(value.to_string()));
        }
        let mode = self.current;
        self.state_mut(mode).set_pending(key, value);
        Ok(())
    }

    /// Write a monetary amount to the pending cost map. Only the actual mode
    /// carries costs.
    pub fn set_cost_value(
        &mut self,
        entity: &str,
        period: &str,
        raw: &str,
    ) -> Result<f64, StoreError> {
        if self.current != ProgressMode::Actual {
            warn!(entity, period, mode = %self.current, "cost edit outside actual mode");
            return Err(StoreError::CostRequiresActual(self.current));
        }
        let value = parse_cell_input(raw).map_err(|e| {
            warn!(entity, period, input = raw, "ignoring non-numeric cost value");
            e
        })?;
        self.set_cost_number(CellKey::new(entity, period), value)?;
        Ok(value)
    }

    /// Write an already-validated amount to the pending cost map
    pub fn set_cost_number(&mut self, key: CellKey, value: f64) -> Result<(), StoreError> {
        if self.current != ProgressMode::Actual {
            warn!(key = %key, mode = %self.current, "cost edit outside actual mode");
            return Err(StoreError::CostRequiresActual(self.current));
        }
        if !value.is_finite() {
            return Err(StoreError::NotANumber(value.to_string()));
        }
        self.state_mut(ProgressMode::Actual).set_pending_cost(key, value);
        Ok(())
    }

    /// Move pending edits of the current mode into its committed map.
    ///
    /// Emits `Commit { mode, count }` and returns `count`.
    pub fn commit_changes(&mut self) -> usize {
        let mode = self.current;
        let count = self.state_mut(mode).commit();
        debug!(mode = %mode, count, "committed pending changes");
        self.events.publish(&StoreEvent::Commit { mode, count });
        count
    }

    /// Drop pending edits of the current mode. Emits `Reset`.
    pub fn discard_changes(&mut self) -> usize {
        let mode = self.current;
        let dropped = self.state_mut(mode).discard();
        self.events.publish(&StoreEvent::Reset { mode });
        dropped
    }

    /// Retarget future reads and writes. Data is not touched.
    pub fn switch_mode(&mut self, mode: ProgressMode) {
        if mode == self.current {
            return;
        }
        let old_mode = std::mem::replace(&mut self.current, mode);
        self.events.publish(&StoreEvent::ModeSwitch {
            old_mode,
            new_mode: mode,
        });
    }

    /// [`switch_mode`](Self::switch_mode) by name; unknown names are logged
    /// and ignored.
    pub fn switch_mode_named(&mut self, name: &str) -> Result<(), StoreError> {
        match name.parse::<ProgressMode>() {
            Ok(mode) => {
                self.switch_mode(mode);
                Ok(())
            }
            Err(e) => {
                error!(mode = name, "unknown progress mode");
                Err(e.into())
            }
        }
    }

    /// Replace the committed map of `mode` and drop its pending edits
    pub fn load_data(&mut self, mode: ProgressMode, committed: CellMap) {
        debug!(mode = %mode, cells = committed.len(), "loading committed cells");
        self.state_mut(mode).load(committed);
        self.events.publish(&StoreEvent::Reset { mode });
    }

    /// Replace the committed cost map of `mode` and drop its pending costs
    pub fn load_costs(&mut self, mode: ProgressMode, committed: CellMap) {
        self.state_mut(mode).load_costs(committed);
        self.events.publish(&StoreEvent::Reset { mode });
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    fn recorder(store: &mut ProgressStore) -> Rc<RefCell<Vec<StoreEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn absent_cell_reads_zero() {
        let store = ProgressStore::new();
        assert_eq!(store.get_cell_value("r1", "p1"), 0.0);
    }

    #[test]
    fn set_then_get_until_commit() {
        let mut store = ProgressStore::new();
        store.set_cell_value("r1", "p1", "42.5").unwrap();
        assert_eq!(store.get_cell_value("r1", "p1"), 42.5);
        assert!(store.has_pending_changes(ProgressMode::Planned));

        store.commit_changes();
        assert_eq!(store.get_cell_value("r1", "p1"), 42.5);
        let view = store.get_all_cells_for_mode(ProgressMode::Planned);
        assert_eq!(view.get(&CellKey::new("r1", "p1")), Some(&42.5));
    }

    #[test]
    fn non_numeric_input_is_a_no_op() {
        let mut store = ProgressStore::new();
        store.set_cell_value("r1", "p1", "10").unwrap();
        let before = store.get_all_cells_for_mode(ProgressMode::Planned);

        let err = store.set_cell_value("r1", "p1", "abc").unwrap_err();
        assert_eq!(err, StoreError::NotANumber("abc".into()));
        assert_eq!(store.get_cell_value("r1", "p1"), 10.0);
        assert!(Rc::ptr_eq(
            &before,
            &store.get_all_cells_for_mode(ProgressMode::Planned)
        ));
    }

    #[test]
    fn parse_accepts_percent_suffix() {
        assert_eq!(parse_cell_input(" 45% "), Ok(45.0));
        assert_eq!(parse_cell_input("0.5"), Ok(0.5));
        assert!(parse_cell_input("").is_err());
        assert!(parse_cell_input("NaN").is_err());
        assert!(parse_cell_input("inf").is_err());
    }

    #[test]
    fn merged_view_is_memoized_between_mutations() {
        let mut store = ProgressStore::new();
        store.set_cell_value("r1", "p1", "5").unwrap();

        let a = store.get_all_cells_for_mode(ProgressMode::Planned);
        let b = store.get_all_cells_for_mode(ProgressMode::Planned);
        assert!(Rc::ptr_eq(&a, &b));

        store.set_cell_value("r1", "p2", "6").unwrap();
        let c = store.get_all_cells_for_mode(ProgressMode::Planned);
        assert!(!Rc::ptr_eq(&b, &c));

        store.commit_changes();
        let d = store.get_all_cells_for_mode(ProgressMode::Planned);
        assert!(!Rc::ptr_eq(&c, &d));

        store.load_data(ProgressMode::Planned, CellMap::new());
        let e = store.get_all_cells_for_mode(ProgressMode::Planned);
        assert!(!Rc::ptr_eq(&d, &e));
        assert!(e.is_empty());
    }

    #[test]
    fn mutation_of_other_mode_keeps_view() {
        let mut store = ProgressStore::new();
        let planned = store.get_all_cells_for_mode(ProgressMode::Planned);

        store.switch_mode(ProgressMode::Actual);
        store.set_cell_value("r1", "p1", "5").unwrap();

        assert!(Rc::ptr_eq(
            &planned,
            &store.get_all_cells_for_mode(ProgressMode::Planned)
        ));
    }

    #[test]
    fn pending_wins_over_committed() {
        let mut store = ProgressStore::new();
        let mut committed = CellMap::new();
        committed.insert(CellKey::new("r1", "p1"), 20.0);
        store.load_data(ProgressMode::Planned, committed);

        store.set_cell_value("r1", "p1", "35").unwrap();
        let view = store.get_all_cells_for_mode(ProgressMode::Planned);
        assert_eq!(view[&CellKey::new("r1", "p1")], 35.0);
        assert_eq!(
            store.state(ProgressMode::Planned).committed()[&CellKey::new("r1", "p1")],
            20.0
        );
    }

    #[test]
    fn commit_moves_pending_and_emits() {
        let mut store = ProgressStore::new();
        let events = recorder(&mut store);

        store.set_cell_value("r1", "p1", "10").unwrap();
        store.set_cell_value("r2", "p1", "20").unwrap();
        let count = store.commit_changes();

        assert_eq!(count, 2);
        let state = store.state(ProgressMode::Planned);
        assert_eq!(state.committed().len(), 2);
        assert_eq!(state.pending().len(), 0);
        assert_eq!(
            *events.borrow(),
            vec![StoreEvent::Commit {
                mode: ProgressMode::Planned,
                count: 2
            }]
        );
    }

    #[test]
    fn modes_are_isolated() {
        let mut store = ProgressStore::new();
        let events = recorder(&mut store);

        store.set_cell_value("r1", "p1", "50").unwrap();
        store.switch_mode(ProgressMode::Actual);
        store.set_cell_value("r1", "p1", "75").unwrap();
        store.switch_mode(ProgressMode::Planned);

        assert_eq!(store.get_cell_value("r1", "p1"), 50.0);
        assert_eq!(
            store.value_in(ProgressMode::Actual, &CellKey::new("r1", "p1")),
            75.0
        );
        assert_eq!(events.borrow().len(), 2);
        assert_eq!(events.borrow()[0].name(), "mode-switch");
    }

    #[test]
    fn invalid_mode_name_is_ignored() {
        let mut store = ProgressStore::new();
        let events = recorder(&mut store);

        assert!(store.switch_mode_named("forecast").is_err());
        assert_eq!(store.current_mode(), ProgressMode::Planned);
        assert!(events.borrow().is_empty());

        store.switch_mode_named("actual").unwrap();
        assert_eq!(store.current_mode(), ProgressMode::Actual);
    }

    #[test]
    fn switching_to_current_mode_is_silent() {
        let mut store = ProgressStore::new();
        let events = recorder(&mut store);
        store.switch_mode(ProgressMode::Planned);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn invalid_key_text_is_rejected() {
        let mut store = ProgressStore::new();
        assert!(matches!(
            store.set_cell_by_key("no-separator", "10"),
            Err(StoreError::Parse(_))
        ));
        store.set_cell_by_key("r1::p1", "10").unwrap();
        assert_eq!(store.get_cell_value("r1", "p1"), 10.0);
    }

    #[test]
    fn load_data_clears_pending() {
        let mut store = ProgressStore::new();
        store.set_cell_value("r1", "p1", "10").unwrap();

        let mut fresh = CellMap::new();
        fresh.insert(CellKey::new("r9", "p9"), 1.0);
        store.load_data(ProgressMode::Planned, fresh);

        assert!(!store.has_pending_changes(ProgressMode::Planned));
        assert_eq!(store.get_cell_value("r1", "p1"), 0.0);
        assert_eq!(store.get_cell_value("r9", "p9"), 1.0);
    }

    #[test]
    fn discard_restores_committed() {
        let mut store = ProgressStore::new();
        let mut committed = CellMap::new();
        committed.insert(CellKey::new("r1", "p1"), 20.0);
        store.load_data(ProgressMode::Planned, committed);
        store.set_cell_value("r1", "p1", "90").unwrap();

        assert_eq!(store.discard_changes(), 1);
        assert_eq!(store.get_cell_value("r1", "p1"), 20.0);
    }

    #[test]
    fn costs_only_in_actual_mode() {
        let mut store = ProgressStore::new();
        assert_eq!(
            store.set_cost_value("r1", "p1", "1500"),
            Err(StoreError::CostRequiresActual(ProgressMode::Planned))
        );

        store.switch_mode(ProgressMode::Actual);
        store.set_cost_value("r1", "p1", "1500").unwrap();
        assert_eq!(store.get_cost_value("r1", "p1"), 1500.0);
        let costs = store.get_all_costs_for_mode(ProgressMode::Actual);
        assert_eq!(costs.len(), 1);

        assert_eq!(store.commit_changes(), 1);
        assert_eq!(store.state(ProgressMode::Actual).pending_costs().len(), 0);
        assert_eq!(store.get_cost_value("r1", "p1"), 1500.0);
    }

    #[test]
    fn pending_changes_sorted() {
        let mut store = ProgressStore::new();
        store.set_cell_value("r2", "p1", "1").unwrap();
        store.set_cell_value("r1", "p2", "2").unwrap();
        store.set_cell_value("r1", "p1", "3").unwrap();

        let keys: Vec<String> = store
            .pending_changes(ProgressMode::Planned)
            .iter()
            .map(|c| c.key.to_string())
            .collect();
        assert_eq!(keys, vec!["r1::p1", "r1::p2", "r2::p1"]);
    }
}
