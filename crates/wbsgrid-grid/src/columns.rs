//! Column model: pinned descriptive columns followed by period columns.
//!
//! Pinned columns always come first. Each pinned column sticks at an offset
//! equal to the summed width of the pinned columns before it, and the x of
//! the first period column equals [`ColumnModel::pinned_width`].

use serde::{Deserialize, Serialize};

use wbsgrid_core::Period;

/// Row attribute shown in a pinned info column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoField {
    Volume,
    Unit,
    Cost,
}

impl InfoField {
    pub fn title(&self) -> &'static str {
        match self {
            InfoField::Volume => "Volume",
            InfoField::Unit => "Unit",
            InfoField::Cost => "Cost",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnKind {
    /// Hierarchical row label
    Label,
    Info { field: InfoField },
    Period { aggregated: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub id: String,
    pub title: String,
    pub width: f64,
    pub pinned: bool,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub fn label(width: f64) -> Self {
        Self {
            id: "label".into(),
            title: "Work Item".into(),
            width,
            pinned: true,
            kind: ColumnKind::Label,
        }
    }

    pub fn info(field: InfoField, width: f64) -> Self {
        Self {
            id: format!("info:{}", field.title().to_ascii_lowercase()),
            title: field.title().into(),
            width,
            pinned: true,
            kind: ColumnKind::Info { field },
        }
    }

    pub fn period(period: &Period, width: f64) -> Self {
        Self {
            id: period.id.clone(),
            title: period.label.clone(),
            width,
            pinned: false,
            kind: ColumnKind::Period {
                aggregated: period.aggregated,
            },
        }
    }

    pub fn is_period(&self) -> bool {
        matches!(self.kind, ColumnKind::Period { .. })
    }

    /// Period column that accepts input
    pub fn is_editable_period(&self) -> bool {
        matches!(self.kind, ColumnKind::Period { aggregated: false })
    }
}

/// Ordered columns with precomputed x offsets
#[derive(Clone, Debug, Default)]
pub struct ColumnModel {
    columns: Vec<ColumnDef>,
    offsets: Vec<f64>,
    pinned_width: f64,
}

impl ColumnModel {
    /// Build from arbitrary columns; pinned ones are moved to the front,
    /// keeping relative order.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        let (mut ordered, scrolling): (Vec<_>, Vec<_>) =
            columns.into_iter().partition(|c| c.pinned);
        ordered.extend(scrolling);

        let mut offsets = Vec::with_capacity(ordered.len());
        let mut x = 0.0;
        let mut pinned_width = 0.0;
        for column in &ordered {
            offsets.push(x);
            x += column.width;
            if column.pinned {
                pinned_width += column.width;
            }
        }

        Self {
            columns: ordered,
            offsets,
            pinned_width,
        }
    }

    /// Label column, the given info columns, then one column per period
    pub fn standard(
        periods: &[Period],
        label_width: f64,
        info: &[InfoField],
        info_width: f64,
        period_width: f64,
    ) -> Self {
        let mut columns = vec![ColumnDef::label(label_width)];
        columns.extend(info.iter().map(|f| ColumnDef::info(*f, info_width)));
        columns.extend(periods.iter().map(|p| ColumnDef::period(p, period_width)));
        Self::new(columns)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ColumnDef> {
        self.columns.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    /// Content x of a column's left edge
    pub fn x(&self, index: usize) -> Option<f64> {
        self.offsets.get(index).copied()
    }

    /// Sticky `left` offset of a pinned column; `None` for scrolling columns
    pub fn sticky_offset(&self, index: usize) -> Option<f64> {
        let column = self.columns.get(index)?;
        column.pinned.then(|| self.offsets[index])
    }

    pub fn pinned_width(&self) -> f64 {
        self.pinned_width
    }

    pub fn total_width(&self) -> f64 {
        self.columns.iter().map(|c| c.width).sum()
    }

    pub fn pinned_count(&self) -> usize {
        self.columns.iter().take_while(|c| c.pinned).count()
    }

    /// `(index, column)` of every period column in order
    pub fn period_columns(&self) -> impl Iterator<Item = (usize, &ColumnDef)> {
        self.columns.iter().enumerate().filter(|(_, c)| c.is_period())
    }

    pub fn period_count(&self) -> usize {
        self.period_columns().count()
    }
}
