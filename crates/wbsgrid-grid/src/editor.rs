//! Inline cell editing state machine.
//!
//! ```text
//!            dblclick / Enter / digit (editable cell)
//!   Idle ─────────────────────────────────────────────▶ Editing
//!    ▲                                                    │
//!    └──── Enter (commit + move) / Blur (commit) / Esc ───┘
//! ```
//!
//! The editor only tracks focus and the edit buffer. Whether a cell is
//! editable, its current text, its neighbours and how input is validated are
//! supplied by an [`EditTarget`].

use serde::Serialize;
use thiserror::Error;

use wbsgrid_core::{CellKey, InputMode};
use wbsgrid_store::parse_cell_input;

/// Focus movement after a commit or from arrow keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Keyboard input relevant to the grid
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Enter { shift: bool },
    Tab { shift: bool },
    Escape,
    Backspace,
    Arrow(Direction),
    Char(char),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditEvent {
    /// Single click: focus only
    Click(CellKey),
    DoubleClick(CellKey),
    Key(KeyInput),
    Blur,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditState {
    #[default]
    Idle,
    Editing { key: CellKey, buffer: String },
}

/// What kind of number a committed value is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Percentage,
    Cost,
}

impl ValueType {
    pub fn for_input_mode(mode: InputMode) -> Self {
        match mode {
            InputMode::Cost => ValueType::Cost,
            InputMode::Percentage | InputMode::Volume => ValueType::Percentage,
        }
    }
}

/// Payload of the host's cell-change callback
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellChange {
    pub cell_key: CellKey,
    pub value: f64,
    pub value_type: ValueType,
}

/// Rejected edit
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EditError {
    #[error("Cell {0} is not editable")]
    NotEditable(CellKey),

    #[error("Not a number: {0:?}")]
    NotANumber(String),

    #[error("Value {value} is outside {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("Store rejected value: {0}")]
    Store(String),
}

/// Check raw input for one cell and convert it to the stored value.
///
/// Percentage mode accepts `0..=100`; volume mode accepts `0..=row_volume`
/// and returns the equivalent percentage; cost mode accepts any
/// non-negative amount. A row without a usable volume is edited as a
/// percentage, matching how [`CellFormatter`](crate::CellFormatter) shows it.
pub fn validate_input(raw: &str, mode: InputMode, row_volume: Option<f64>) -> Result<f64, EditError> {
    let value = parse_cell_input(raw).map_err(|_| EditError::NotANumber(raw.to_string()))?;
    match mode {
        InputMode::Percentage => {
            if (0.0..=100.0).contains(&value) {
                Ok(value)
            } else {
                Err(EditError::OutOfRange {
                    value,
                    min: 0.0,
                    max: 100.0,
                })
            }
        }
        InputMode::Volume => {
            let Some(volume) = row_volume.filter(|v| v.is_finite() && *v > 0.0) else {
                return validate_input(raw, InputMode::Percentage, None);
            };
            if (0.0..=volume).contains(&value) {
                Ok(value / volume * 100.0)
            } else {
                Err(EditError::OutOfRange {
                    value,
                    min: 0.0,
                    max: volume,
                })
            }
        }
        InputMode::Cost => {
            if value >= 0.0 {
                Ok(value)
            } else {
                Err(EditError::OutOfRange {
                    value,
                    min: 0.0,
                    max: f64::INFINITY,
                })
            }
        }
    }
}

/// Grid-side knowledge the editor needs
pub trait EditTarget {
    fn is_editable(&self, key: &CellKey) -> bool;

    /// Text shown in the editor when editing an existing value
    fn edit_text(&self, key: &CellKey) -> String;

    /// Nearest editable cell in `direction`
    fn neighbor(&self, key: &CellKey, direction: Direction) -> Option<CellKey>;

    fn validate(&self, key: &CellKey, raw: &str) -> Result<f64, EditError>;

    fn value_type(&self) -> ValueType;
}

/// Result of feeding one event to the editor
#[derive(Clone, Debug, PartialEq)]
pub enum EditOutcome {
    /// Event had no effect
    Ignored,
    FocusMoved(CellKey),
    Started(CellKey),
    /// Buffer changed while editing
    Updated,
    Committed {
        change: CellChange,
        next_focus: Option<CellKey>,
    },
    /// Input refused; the previous value stays
    Rejected { key: CellKey, error: EditError },
    Cancelled(CellKey),
}

#[derive(Clone, Debug, Default)]
pub struct CellEditor {
    state: EditState,
    focus: Option<CellKey>,
}

impl CellEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn focus(&self) -> Option<&CellKey> {
        self.focus.as_ref()
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    /// Drop focus and any edit in progress without committing
    pub fn reset(&mut self) {
        self.state = EditState::Idle;
        self.focus = None;
    }

    pub fn handle(&mut self, event: EditEvent, target: &dyn EditTarget) -> EditOutcome {
        match std::mem::take(&mut self.state) {
            EditState::Idle => self.handle_idle(event, target),
            EditState::Editing { key, buffer } => self.handle_editing(key, buffer, event, target),
        }
    }

    fn start(&mut self, key: CellKey, buffer: String) -> EditOutcome {
        self.focus = Some(key.clone());
        self.state = EditState::Editing {
            key: key.clone(),
            buffer,
        };
        EditOutcome::Started(key)
    }

    fn handle_idle(&mut self, event: EditEvent, target: &dyn EditTarget) -> EditOutcome {
        match event {
            EditEvent::Click(key) => {
                self.focus = Some(key.clone());
                EditOutcome::FocusMoved(key)
            }
            EditEvent::DoubleClick(key) => {
                if target.is_editable(&key) {
                    let text = target.edit_text(&key);
                    self.start(key, text)
                } else {
                    self.focus = Some(key);
                    EditOutcome::Ignored
                }
            }
            EditEvent::Key(input) => {
                let Some(key) = self.focus.clone() else {
                    return EditOutcome::Ignored;
                };
                match input {
                    KeyInput::Enter { .. } if target.is_editable(&key) => {
                        let text = target.edit_text(&key);
                        self.start(key, text)
                    }
                    KeyInput::Char(c) if c.is_ascii_digit() && target.is_editable(&key) => {
                        self.start(key, c.to_string())
                    }
                    KeyInput::Arrow(direction) => self.move_focus(&key, direction, target),
                    KeyInput::Tab { shift } => {
                        let direction = if shift {
                            Direction::Left
                        } else {
                            Direction::Right
                        };
                        self.move_focus(&key, direction, target)
                    }
                    _ => EditOutcome::Ignored,
                }
            }
            EditEvent::Blur => {
                self.focus = None;
                EditOutcome::Ignored
            }
        }
    }

    fn move_focus(
        &mut self,
        key: &CellKey,
        direction: Direction,
        target: &dyn EditTarget,
    ) -> EditOutcome {
        match target.neighbor(key, direction) {
            Some(next) => {
                self.focus = Some(next.clone());
                EditOutcome::FocusMoved(next)
            }
            None => EditOutcome::Ignored,
        }
    }

    fn handle_editing(
        &mut self,
        key: CellKey,
        mut buffer: String,
        event: EditEvent,
        target: &dyn EditTarget,
    ) -> EditOutcome {
        match event {
            EditEvent::Key(KeyInput::Char(c)) => {
                buffer.push(c);
                self.state = EditState::Editing { key, buffer };
                EditOutcome::Updated
            }
            EditEvent::Key(KeyInput::Backspace) => {
                buffer.pop();
                self.state = EditState::Editing { key, buffer };
                EditOutcome::Updated
            }
            EditEvent::Key(KeyInput::Escape) => EditOutcome::Cancelled(key),
            EditEvent::Key(KeyInput::Enter { shift }) => {
                let direction = if shift { Direction::Up } else { Direction::Down };
                self.commit(key, &buffer, Some(direction), target)
            }
            EditEvent::Key(KeyInput::Tab { shift }) => {
                let direction = if shift {
                    Direction::Left
                } else {
                    Direction::Right
                };
                self.commit(key, &buffer, Some(direction), target)
            }
            EditEvent::Blur => self.commit(key, &buffer, None, target),
            EditEvent::Click(other) | EditEvent::DoubleClick(other) if other != key => {
                let outcome = self.commit(key, &buffer, None, target);
                self.focus = Some(other);
                outcome
            }
            // caret movement inside the input, or a click on the cell itself
            EditEvent::Key(KeyInput::Arrow(_)) | EditEvent::Click(_) | EditEvent::DoubleClick(_) => {
                self.state = EditState::Editing { key, buffer };
                EditOutcome::Ignored
            }
        }
    }

    fn commit(
        &mut self,
        key: CellKey,
        buffer: &str,
        direction: Option<Direction>,
        target: &dyn EditTarget,
    ) -> EditOutcome {
        match target.validate(&key, buffer) {
            Ok(value) => {
                let next_focus = direction.and_then(|d| target.neighbor(&key, d));
                self.focus = Some(next_focus.clone().unwrap_or_else(|| key.clone()));
                EditOutcome::Committed {
                    change: CellChange {
                        cell_key: key,
                        value,
                        value_type: target.value_type(),
                    },
                    next_focus,
                }
            }
            Err(error) => EditOutcome::Rejected { key, error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// 2×2 grid of editable cells r{1,2} × p{1,2}; "g" rows are not editable
    struct Fixture;

    impl EditTarget for Fixture {
        fn is_editable(&self, key: &CellKey) -> bool {
            key.entity_id.starts_with('r')
        }

        fn edit_text(&self, _key: &CellKey) -> String {
            "40".into()
        }

        fn neighbor(&self, key: &CellKey, direction: Direction) -> Option<CellKey> {
            let row: u32 = key.entity_id[1..].parse().ok()?;
            let col: u32 = key.period_id[1..].parse().ok()?;
            let (row, col) = match direction {
                Direction::Up => (row.checked_sub(1)?, col),
                Direction::Down => (row + 1, col),
                Direction::Left => (row, col.checked_sub(1)?),
                Direction::Right => (row, col + 1),
            };
            ((1..=2).contains(&row) && (1..=2).contains(&col))
                .then(|| CellKey::new(format!("r{row}"), format!("p{col}")))
        }

        fn validate(&self, key: &CellKey, raw: &str) -> Result<f64, EditError> {
            validate_input(raw, InputMode::Percentage, None)
        }

        fn value_type(&self) -> ValueType {
            ValueType::Percentage
        }
    }

    fn key(e: &str, p: &str) -> CellKey {
        CellKey::new(e, p)
    }

    #[test]
    fn double_click_starts_with_current_text() {
        let mut editor = CellEditor::new();
        let out = editor.handle(EditEvent::DoubleClick(key("r1", "p1")), &Fixture);
        assert_eq!(out, EditOutcome::Started(key("r1", "p1")));
        assert_eq!(
            editor.state(),
            &EditState::Editing {
                key: key("r1", "p1"),
                buffer: "40".into()
            }
        );
    }

    #[test]
    fn non_editable_cell_stays_idle() {
        let mut editor = CellEditor::new();
        let out = editor.handle(EditEvent::DoubleClick(key("g1", "p1")), &Fixture);
        assert_eq!(out, EditOutcome::Ignored);
        assert!(!editor.is_editing());

        let out = editor.handle(EditEvent::Key(KeyInput::Char('5')), &Fixture);
        assert_eq!(out, EditOutcome::Ignored);
    }

    #[test]
    fn typing_digit_replaces_content() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::Click(key("r1", "p1")), &Fixture);
        editor.handle(EditEvent::Key(KeyInput::Char('7')), &Fixture);
        editor.handle(EditEvent::Key(KeyInput::Char('5')), &Fixture);

        let out = editor.handle(EditEvent::Key(KeyInput::Enter { shift: false }), &Fixture);
        assert_eq!(
            out,
            EditOutcome::Committed {
                change: CellChange {
                    cell_key: key("r1", "p1"),
                    value: 75.0,
                    value_type: ValueType::Percentage,
                },
                next_focus: Some(key("r2", "p1")),
            }
        );
        assert_eq!(editor.focus(), Some(&key("r2", "p1")));
        assert!(!editor.is_editing());
    }

    #[test]
    fn letters_do_not_start_editing() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::Click(key("r1", "p1")), &Fixture);
        let out = editor.handle(EditEvent::Key(KeyInput::Char('x')), &Fixture);
        assert_eq!(out, EditOutcome::Ignored);
    }

    #[test]
    fn escape_discards() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::DoubleClick(key("r1", "p2")), &Fixture);
        editor.handle(EditEvent::Key(KeyInput::Char('9')), &Fixture);
        let out = editor.handle(EditEvent::Key(KeyInput::Escape), &Fixture);
        assert_eq!(out, EditOutcome::Cancelled(key("r1", "p2")));
        assert!(!editor.is_editing());
    }

    #[test]
    fn blur_commits_without_moving() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::DoubleClick(key("r2", "p2")), &Fixture);
        let out = editor.handle(EditEvent::Blur, &Fixture);
        match out {
            EditOutcome::Committed { change, next_focus } => {
                assert_eq!(change.value, 40.0);
                assert_eq!(next_focus, None);
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::Click(key("r1", "p1")), &Fixture);
        for c in ['1', '5', '0'] {
            editor.handle(EditEvent::Key(KeyInput::Char(c)), &Fixture);
        }
        let out = editor.handle(EditEvent::Key(KeyInput::Enter { shift: false }), &Fixture);
        assert_eq!(
            out,
            EditOutcome::Rejected {
                key: key("r1", "p1"),
                error: EditError::OutOfRange {
                    value: 150.0,
                    min: 0.0,
                    max: 100.0
                },
            }
        );
        assert!(!editor.is_editing());
    }

    #[test]
    fn shift_tab_moves_left_and_stops_at_edge() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::Click(key("r1", "p2")), &Fixture);
        let out = editor.handle(EditEvent::Key(KeyInput::Tab { shift: true }), &Fixture);
        assert_eq!(out, EditOutcome::FocusMoved(key("r1", "p1")));
        let out = editor.handle(EditEvent::Key(KeyInput::Arrow(Direction::Left)), &Fixture);
        assert_eq!(out, EditOutcome::Ignored);
    }

    #[test]
    fn clicking_elsewhere_commits_and_refocuses() {
        let mut editor = CellEditor::new();
        editor.handle(EditEvent::DoubleClick(key("r1", "p1")), &Fixture);
        let out = editor.handle(EditEvent::Click(key("r2", "p2")), &Fixture);
        assert!(matches!(out, EditOutcome::Committed { .. }));
        assert_eq!(editor.focus(), Some(&key("r2", "p2")));
    }

    #[test]
    fn validation_by_mode() {
        assert_eq!(validate_input("50", InputMode::Percentage, None), Ok(50.0));
        assert_eq!(validate_input("300", InputMode::Volume, Some(1200.0)), Ok(25.0));
        assert!(matches!(
            validate_input("1300", InputMode::Volume, Some(1200.0)),
            Err(EditError::OutOfRange { max, .. }) if max == 1200.0
        ));
        assert_eq!(validate_input("10", InputMode::Volume, None), Ok(10.0));
        assert_eq!(validate_input("10", InputMode::Volume, Some(0.0)), Ok(10.0));
        assert!(matches!(
            validate_input("150", InputMode::Volume, None),
            Err(EditError::OutOfRange { max, .. }) if max == 100.0
        ));
        assert_eq!(validate_input("1e6", InputMode::Cost, None), Ok(1_000_000.0));
        assert!(validate_input("-1", InputMode::Cost, None).is_err());
        assert_eq!(
            validate_input("abc", InputMode::Cost, None),
            Err(EditError::NotANumber("abc".into()))
        );
    }
}
