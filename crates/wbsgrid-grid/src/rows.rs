//! Row model: the WBS tree flattened for virtualization.

use serde::Serialize;
use std::collections::HashSet;

use wbsgrid_core::{EntityId, Row, RowKind};

/// A row as it appears in the flattened, expand/collapse-aware list
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatRow {
    pub id: EntityId,
    pub label: String,
    pub level: u32,
    pub kind: RowKind,
    pub volume: Option<f64>,
    pub unit: Option<String>,
    pub cost: Option<f64>,
    pub has_children: bool,
    pub expanded: bool,
}

impl FlatRow {
    pub fn is_leaf(&self) -> bool {
        self.kind == RowKind::Leaf
    }
}

/// Hierarchical rows plus collapse state
#[derive(Clone, Debug, Default)]
pub struct RowModel {
    roots: Vec<Row>,
    collapsed: HashSet<EntityId>,
    flat: Vec<FlatRow>,
}

impl RowModel {
    pub fn new(rows: Vec<Row>) -> Self {
        let mut model = Self {
            roots: rows,
            collapsed: HashSet::new(),
            flat: Vec::new(),
        };
        model.reflatten();
        model
    }

    /// Replace the tree. Collapse state of ids that still exist is kept.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.roots = rows;
        let mut alive = HashSet::new();
        collect_ids(&self.roots, &mut alive);
        self.collapsed.retain(|id| alive.contains(id));
        self.reflatten();
    }

    pub fn roots(&self) -> &[Row] {
        &self.roots
    }

    pub fn flat(&self) -> &[FlatRow] {
        &self.flat
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FlatRow> {
        self.flat.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.flat.iter().position(|r| r.id == id)
    }

    /// Number of visible leaf rows
    pub fn leaf_count(&self) -> usize {
        self.flat.iter().filter(|r| r.is_leaf()).count()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        !self.collapsed.contains(id)
    }

    /// Flip expand state of a row with children. Returns false if the row has
    /// no children or does not exist.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.has_children(id) {
            return false;
        }
        if !self.collapsed.remove(id) {
            self.collapsed.insert(id.to_string());
        }
        self.reflatten();
        true
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
        self.reflatten();
    }

    pub fn collapse_all(&mut self) {
        let mut parents = HashSet::new();
        collect_parent_ids(&self.roots, &mut parents);
        self.collapsed = parents;
        self.reflatten();
    }

    /// Show rows down to `level`; deeper parents are collapsed
    pub fn expand_to_level(&mut self, level: u32) {
        fn walk(rows: &[Row], level: u32, out: &mut HashSet<EntityId>) {
            for row in rows {
                if row.has_children() && row.level >= level {
                    out.insert(row.id.clone());
                }
                walk(&row.children, level, out);
            }
        }
        let mut collapsed = HashSet::new();
        walk(&self.roots, level, &mut collapsed);
        self.collapsed = collapsed;
        self.reflatten();
    }

    fn has_children(&self, id: &str) -> bool {
        wbsgrid_core::find_row(&self.roots, id).is_some_and(|r| r.has_children())
    }

    fn reflatten(&mut self) {
        fn walk(rows: &[Row], collapsed: &HashSet<EntityId>, out: &mut Vec<FlatRow>) {
            for row in rows {
                let expanded = !collapsed.contains(&row.id);
                out.push(FlatRow {
                    id: row.id.clone(),
                    label: row.label.clone(),
                    level: row.level,
                    kind: row.kind,
                    volume: row.volume,
                    unit: row.unit.clone(),
                    cost: row.cost,
                    has_children: row.has_children(),
                    expanded,
                });
                if expanded {
                    walk(&row.children, collapsed, out);
                }
            }
        }
        let mut flat = Vec::with_capacity(self.flat.len());
        walk(&self.roots, &self.collapsed, &mut flat);
        self.flat = flat;
    }
}

fn collect_ids(rows: &[Row], out: &mut HashSet<EntityId>) {
    for row in rows {
        out.insert(row.id.clone());
        collect_ids(&row.children, out);
    }
}

fn collect_parent_ids(rows: &[Row], out: &mut HashSet<EntityId>) {
    for row in rows {
        if row.has_children() {
            out.insert(row.id.clone());
        }
        collect_parent_ids(&row.children, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Row> {
        vec![
            Row::group("A")
                .child(
                    Row::subgroup("A.1")
                        .child(Row::leaf("A.1.1"))
                        .child(Row::leaf("A.1.2")),
                )
                .child(Row::leaf("A.2")),
            Row::group("B").child(Row::leaf("B.1")),
        ]
    }

    fn ids(model: &RowModel) -> Vec<&str> {
        model.flat().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn flattens_depth_first() {
        let model = RowModel::new(sample());
        assert_eq!(ids(&model), vec!["A", "A.1", "A.1.1", "A.1.2", "A.2", "B", "B.1"]);
        assert_eq!(model.leaf_count(), 4);
        assert_eq!(model.get(2).map(|r| r.level), Some(2));
    }

    #[test]
    fn toggle_hides_descendants() {
        let mut model = RowModel::new(sample());
        assert!(model.toggle("A.1"));
        assert_eq!(ids(&model), vec!["A", "A.1", "A.2", "B", "B.1"]);
        assert!(!model.is_expanded("A.1"));

        assert!(model.toggle("A.1"));
        assert_eq!(model.len(), 7);
    }

    #[test]
    fn toggle_leaf_is_rejected() {
        let mut model = RowModel::new(sample());
        assert!(!model.toggle("A.2"));
        assert!(!model.toggle("missing"));
        assert_eq!(model.len(), 7);
    }

    #[test]
    fn collapse_and_expand_all() {
        let mut model = RowModel::new(sample());
        model.collapse_all();
        assert_eq!(ids(&model), vec!["A", "B"]);
        model.expand_all();
        assert_eq!(model.len(), 7);
    }

    #[test]
    fn expand_to_level_one() {
        let mut model = RowModel::new(sample());
        model.expand_to_level(1);
        assert_eq!(ids(&model), vec!["A", "A.1", "A.2", "B", "B.1"]);
    }

    #[test]
    fn set_rows_keeps_surviving_collapse_state() {
        let mut model = RowModel::new(sample());
        model.toggle("B");
        model.toggle("A.1");

        model.set_rows(vec![Row::group("B").child(Row::leaf("B.1"))]);
        assert_eq!(ids(&model), vec!["B"]);
        assert!(model.is_expanded("A.1"));
    }
}
