use ndarray::{Array2, Axis};

use crate::{DataErr, Result};

/// An in-memory numeric table with named columns.
///
/// Columns marked as integer-typed are formatted without a fractional part
/// when the table is written out; in memory everything is `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    names: Vec<String>,
    rows: Array2<f32>,
    int_columns: Vec<String>,
}

impl Table {
    /// Creates a table, checking that `names` matches the column count.
    pub fn new(names: Vec<String>, rows: Array2<f32>) -> Result<Self> {
        if names.len() != rows.ncols() {
            return Err(DataErr::MissingColumns {
                got: rows.ncols(),
                expected: names.len(),
            });
        }
        Ok(Self {
            names,
            rows,
            int_columns: Vec::new(),
        })
    }

    /// Marks columns whose values are written as integers.
    pub fn with_int_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.int_columns = names.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn rows(&self) -> &Array2<f32> {
        &self.rows
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.rows.nrows()
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.rows.ncols()
    }

    #[inline]
    pub fn is_int_column(&self, name: &str) -> bool {
        self.int_columns.iter().any(|n| n == name)
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// A new table keeping only the rows at `indices`, in order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            rows: self.rows.select(Axis(0), indices),
            int_columns: self.int_columns.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn new_rejects_name_count_mismatch() {
        let rows = array![[1.0, 2.0]];
        assert!(Table::new(vec!["a".into()], rows).is_err());
    }

    #[test]
    fn select_rows_keeps_order_and_names() {
        let rows = array![[1.0], [2.0], [3.0]];
        let table = Table::new(vec!["x".into()], rows).unwrap();
        let picked = table.select_rows(&[2, 0]);
        assert_eq!(picked.rows(), &array![[3.0], [1.0]]);
        assert_eq!(picked.names(), table.names());
    }

    #[test]
    fn int_columns_are_tracked_by_name() {
        let table = Table::new(vec!["n".into()], array![[1.0]])
            .unwrap()
            .with_int_columns(["n"]);
        assert!(table.is_int_column("n"));
        assert!(!table.is_int_column("m"));
    }
}
