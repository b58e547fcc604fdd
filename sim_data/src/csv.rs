use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::table::Table;
use crate::{DataErr, Result};

/// Reads a comma-separated file into a [`Table`].
///
/// The first line is the header; every other non-empty line must hold one
/// numeric cell per header entry.
pub fn load_csv(path: &Path) -> Result<Table> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = lines.next().ok_or(DataErr::Empty)??;
    let names: Vec<String> = header.split(',').map(|n| n.trim().to_string()).collect();
    let width = names.len();

    let mut values: Vec<f32> = Vec::new();
    let mut num_rows = 0;

    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        // Header is line 1, so data starts at line 2.
        let line_number = idx + 2;
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() != width {
            return Err(DataErr::RowWidth {
                line: line_number,
                got: cells.len(),
                expected: width,
            });
        }

        for (column, cell) in cells.iter().enumerate() {
            let value: f32 = cell.trim().parse().map_err(|_| DataErr::Parse {
                line: line_number,
                column: column + 1,
            })?;
            values.push(value);
        }
        num_rows += 1;
    }

    let rows = Array2::from_shape_vec((num_rows, width), values)
        .expect("row count and width were tracked together");
    Table::new(names, rows)
}

/// Writes a [`Table`] as a comma-separated file, integer-typed columns
/// without a fractional part.
pub fn save_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "{}", table.names().join(","))?;

    let int_mask: Vec<bool> = table
        .names()
        .iter()
        .map(|n| table.is_int_column(n))
        .collect();

    for row in table.rows().rows() {
        let mut first = true;
        for (value, &as_int) in row.iter().zip(&int_mask) {
            if !first {
                write!(writer, ",")?;
            }
            first = false;
            if as_int {
                write!(writer, "{}", value.round() as i64)?;
            } else {
                write!(writer, "{value}")?;
            }
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}
