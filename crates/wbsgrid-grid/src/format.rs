//! Cell text formatting for the three input modes.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use wbsgrid_core::InputMode;

use crate::rows::FlatRow;

/// Round to `dp` decimal places using banker-free midpoint-away rounding
pub fn round_amount(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Shortest decimal text with at most `dp` places ("12.5", "40")
pub fn plain_number(value: f64, dp: u32) -> String {
    round_amount(value, dp).normalize().to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `"{currency}1,234.50"`
pub fn money(value: f64, currency: &str) -> String {
    let amount = round_amount(value, 2);
    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    let text = format!("{:.2}", amount.abs());
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}{currency}{}.{frac}", group_thousands(int))
}

/// Converts stored values to display text and back to edit text
#[derive(Clone, Debug)]
pub struct CellFormatter {
    pub input_mode: InputMode,
    pub currency: String,
}

impl CellFormatter {
    pub fn new(input_mode: InputMode, currency: impl Into<String>) -> Self {
        Self {
            input_mode,
            currency: currency.into(),
        }
    }

    /// Display text of a stored value. Zero renders as an empty cell.
    ///
    /// `value` is a percentage in percentage and volume mode and an amount
    /// in cost mode.
    pub fn display(&self, value: f64, row: &FlatRow) -> String {
        if value == 0.0 {
            return String::new();
        }
        match self.input_mode {
            InputMode::Percentage => format!("{}%", plain_number(value, 2)),
            InputMode::Volume => match row.volume {
                Some(volume) if volume > 0.0 => {
                    let quantity = plain_number(value / 100.0 * volume, 2);
                    match row.unit.as_deref() {
                        Some(unit) if !unit.is_empty() => format!("{quantity} {unit}"),
                        _ => quantity,
                    }
                }
                _ => format!("{}%", plain_number(value, 2)),
            },
            InputMode::Cost => money(value, &self.currency),
        }
    }

    /// Text placed in the editor when editing starts
    pub fn edit_text(&self, value: f64, row: &FlatRow) -> String {
        if value == 0.0 {
            return String::new();
        }
        match self.input_mode {
            InputMode::Volume => match row.volume {
                Some(volume) if volume > 0.0 => plain_number(value / 100.0 * volume, 4),
                _ => plain_number(value, 4),
            },
            InputMode::Percentage | InputMode::Cost => plain_number(value, 4),
        }
    }
}

/// Convenience for tests and summaries
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
