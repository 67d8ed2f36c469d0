//! Schedule input file
//!
//! A schedule is a JSON document holding the data payload (rows, columns,
//! dependencies) plus committed planned and actual cell values keyed by
//! `"entity::period"`:
//!
//! ```json
//! {
//!   "rows": [{ "id": "r1", "type": "leaf", "label": "Excavation" }],
//!   "columns": [{ "id": "w1", "label": "W1" }],
//!   "planned": { "r1::w1": 40 },
//!   "actual": { "r1::w1": 35 },
//!   "actualCosts": { "r1::w1": 1250.5 }
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use wbsgrid_core::{find_row, CellKey, DataPayload, ProgressMode, Row};
use wbsgrid_store::CellMap;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(flatten)]
    pub payload: DataPayload,
    #[serde(default)]
    pub planned: BTreeMap<String, f64>,
    #[serde(default)]
    pub actual: BTreeMap<String, f64>,
    #[serde(default)]
    pub actual_costs: BTreeMap<String, f64>,
}

impl Schedule {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid schedule file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn entries(&self, mode: ProgressMode) -> &BTreeMap<String, f64> {
        match mode {
            ProgressMode::Planned => &self.planned,
            ProgressMode::Actual => &self.actual,
        }
    }

    /// Committed values of one mode
    pub fn cells(&self, mode: ProgressMode) -> Result<CellMap> {
        to_cell_map(self.entries(mode))
    }

    /// Committed actual costs, if the file has any
    pub fn costs(&self) -> Result<Option<CellMap>> {
        if self.actual_costs.is_empty() {
            return Ok(None);
        }
        to_cell_map(&self.actual_costs).map(Some)
    }

    /// Consistency problems that would make cells or arrows silently vanish
    pub fn validate(&self) -> Vec<Issue> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        visit_rows(&self.payload.rows, &mut |row| {
            if !seen.insert(row.id.as_str()) {
                issues.push(Issue::DuplicateRow(row.id.clone()));
            }
        });

        let mut periods = HashSet::new();
        for period in &self.payload.columns {
            if !periods.insert(period.id.as_str()) {
                issues.push(Issue::DuplicatePeriod(period.id.clone()));
            }
        }

        let sources = [
            ("planned", &self.planned),
            ("actual", &self.actual),
            ("actualCosts", &self.actual_costs),
        ];
        for (section, entries) in sources {
            for (raw, value) in entries {
                let key = match raw.parse::<CellKey>() {
                    Ok(key) => key,
                    Err(_) => {
                        issues.push(Issue::MalformedKey {
                            section,
                            key: raw.clone(),
                        });
                        continue;
                    }
                };
                match find_row(&self.payload.rows, &key.entity_id) {
                    None => issues.push(Issue::UnknownRow {
                        section,
                        key: raw.clone(),
                    }),
                    Some(row) if !row.is_leaf() => issues.push(Issue::NotALeaf {
                        section,
                        key: raw.clone(),
                    }),
                    Some(_) => {}
                }
                if !periods.contains(key.period_id.as_str()) {
                    issues.push(Issue::UnknownPeriod {
                        section,
                        key: raw.clone(),
                    });
                }
                if section != "actualCosts" && !(0.0..=100.0).contains(value) {
                    issues.push(Issue::OutOfRange {
                        section,
                        key: raw.clone(),
                        value: *value,
                    });
                }
            }
        }

        for dep in &self.payload.dependencies {
            for key in [dep.from_key(), dep.to_key()] {
                let known = find_row(&self.payload.rows, &key.entity_id).is_some()
                    && periods.contains(key.period_id.as_str());
                if !known {
                    issues.push(Issue::DanglingDependency(key.to_string()));
                }
            }
        }

        issues
    }
}

fn visit_rows<'a>(rows: &'a [Row], f: &mut impl FnMut(&'a Row)) {
    for row in rows {
        f(row);
        visit_rows(&row.children, f);
    }
}

fn to_cell_map(entries: &BTreeMap<String, f64>) -> Result<CellMap> {
    entries
        .iter()
        .map(|(raw, value)| {
            let key = raw
                .parse::<CellKey>()
                .with_context(|| format!("Bad cell key {raw:?}"))?;
            Ok((key, *value))
        })
        .collect()
}

/// One problem found by [`Schedule::validate`]
#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    DuplicateRow(String),
    DuplicatePeriod(String),
    MalformedKey { section: &'static str, key: String },
    UnknownRow { section: &'static str, key: String },
    UnknownPeriod { section: &'static str, key: String },
    NotALeaf { section: &'static str, key: String },
    OutOfRange { section: &'static str, key: String, value: f64 },
    DanglingDependency(String),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::DuplicateRow(id) => write!(f, "duplicate row id {id:?}"),
            Issue::DuplicatePeriod(id) => write!(f, "duplicate period id {id:?}"),
            Issue::MalformedKey { section, key } => {
                write!(f, "{section}: malformed cell key {key:?}")
            }
            Issue::UnknownRow { section, key } => write!(f, "{section}: unknown row in {key:?}"),
            Issue::UnknownPeriod { section, key } => {
                write!(f, "{section}: unknown period in {key:?}")
            }
            Issue::NotALeaf { section, key } => {
                write!(f, "{section}: {key:?} is on a group row")
            }
            Issue::OutOfRange {
                section,
                key,
                value,
            } => write!(f, "{section}: {key:?} = {value} is outside 0-100"),
            Issue::DanglingDependency(key) => {
                write!(f, "dependency endpoint {key:?} does not exist")
            }
        }
    }
}
