use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

/// Sum-aggregating pivot table with zero fill
///
/// Rows and columns come out in sorted order. Values added under a missing
/// index are dropped.
#[derive(Debug, Clone, Default)]
pub struct Pivot<V> {
    columns: BTreeSet<String>,
    cells: BTreeMap<String, BTreeMap<String, V>>,
}

impl<V: Copy + Default + AddAssign> Pivot<V> {
    pub fn new() -> Self {
        Self {
            columns: BTreeSet::new(),
            cells: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, index: Option<&str>, column: &str, value: V) {
        let Some(index) = index else {
            return;
        };
        self.columns.insert(column.to_string());
        *self
            .cells
            .entry(index.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default() += value;
    }
}

impl<V: Copy + Default> Pivot<V> {

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Each index with one value per column, zero where nothing was added
    pub fn rows(&self) -> impl Iterator<Item = (&str, Vec<V>)> {
        self.cells.iter().map(|(index, row)| {
            let values = self
                .columns
                .iter()
                .map(|col| row.get(col).copied().unwrap_or_default())
                .collect();
            (index.as_str(), values)
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_fill() {
        let mut pivot = Pivot::new();
        pivot.add(Some("First Bank"), "FHA", 2i64);
        pivot.add(Some("First Bank"), "FHA", 3);
        pivot.add(Some("First Bank"), "Conventional", 10);
        pivot.add(Some("Second Bank"), "VA", 1);

        assert_eq!(
            pivot.columns().collect::<Vec<_>>(),
            vec!["Conventional", "FHA", "VA"]
        );
        let rows: Vec<(&str, Vec<i64>)> = pivot.rows().collect();
        assert_eq!(
            rows,
            vec![
                ("First Bank", vec![10, 5, 0]),
                ("Second Bank", vec![0, 0, 1]),
            ]
        );
    }

    #[test]
    fn test_missing_index_dropped() {
        let mut pivot = Pivot::new();
        pivot.add(None, "FHA", 1.5f64);
        assert_eq!(pivot.len(), 0);
        assert_eq!(pivot.columns().count(), 0);
    }
}
