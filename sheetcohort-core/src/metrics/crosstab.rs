//! Two-way tables of summed values with totals

use serde::Serialize;

/// Column of a cross-tab, optionally nested under a group heading
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnKey {
    pub group: Option<String>,
    pub label: String,
}

impl ColumnKey {
    pub fn new(label: &str) -> Self {
        Self {
            group: None,
            label: label.to_string(),
        }
    }

    pub fn grouped(group: &str, label: &str) -> Self {
        Self {
            group: Some(group.to_string()),
            label: label.to_string(),
        }
    }
}

/// Rows × columns of summed values.
///
/// Row and column sets are fixed at construction so that every declared
/// category appears even when all of its cells are zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub title: String,
    pub rows: Vec<String>,
    pub columns: Vec<ColumnKey>,
    cells: Vec<Vec<f64>>,
}

impl CrossTab {
    pub fn new(title: &str, rows: Vec<String>, columns: Vec<ColumnKey>) -> Self {
        let cells = vec![vec![0.0; columns.len()]; rows.len()];
        Self {
            title: title.to_string(),
            rows,
            columns,
            cells,
        }
    }

    /// Add `value` to a cell; returns false when the row or column is not declared
    pub fn add(&mut self, row: &str, column: &ColumnKey, value: f64) -> bool {
        let r = self.rows.iter().position(|label| label == row);
        let c = self.columns.iter().position(|key| key == column);
        match (r, c) {
            (Some(r), Some(c)) => {
                self.cells[r][c] += value;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(column))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row_total(&self, row: usize) -> f64 {
        self.cells.get(row).map(|cells| cells.iter().sum()).unwrap_or(0.0)
    }

    pub fn column_total(&self, column: usize) -> f64 {
        self.cells
            .iter()
            .filter_map(|cells| cells.get(column))
            .sum()
    }

    /// Sum of every cell
    pub fn grand_total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }

    /// Whether any column carries a group heading
    pub fn is_grouped(&self) -> bool {
        self.columns.iter().any(|c| c.group.is_some())
    }

    /// Remove all-zero rows and columns whose labels are not in the
    /// declared sets
    pub fn prune_undeclared(&mut self, declared_rows: &[String], declared_columns: &[String]) {
        let keep_rows: Vec<bool> = (0..self.rows.len())
            .map(|r| {
                declared_rows.contains(&self.rows[r]) || self.cells[r].iter().any(|v| *v != 0.0)
            })
            .collect();
        let keep_columns: Vec<bool> = (0..self.columns.len())
            .map(|c| {
                declared_columns.contains(&self.columns[c].label)
                    || self.cells.iter().any(|cells| cells[c] != 0.0)
            })
            .collect();

        let mut flags = keep_rows.iter();
        self.rows.retain(|_| *flags.next().unwrap_or(&true));
        let mut flags = keep_rows.iter();
        self.cells.retain(|_| *flags.next().unwrap_or(&true));
        let mut flags = keep_columns.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for cells in &mut self.cells {
            let mut flags = keep_columns.iter();
            cells.retain(|_| *flags.next().unwrap_or(&true));
        }
    }
}
