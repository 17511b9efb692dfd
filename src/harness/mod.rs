//! Drives a design with a table of test vectors and checks its outputs.

mod table;

use std::fmt;

use tracing::{debug, trace};

use crate::{
    circuit_sim::Ticks,
    error::{Error, Result},
    Design,
};

pub use table::{hex, Cell, VectorTable};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// 1-based data row.
    pub row: usize,
    pub column: String,
    pub width: usize,
    pub expected: u64,
    pub actual: u64,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {}: {} expected {} got {}",
            self.row,
            self.column,
            hex(self.expected, self.width),
            hex(self.actual, self.width)
        )
    }
}

#[derive(Clone, Debug)]
pub struct RunReport {
    /// Every pin of every row as sampled after settling.
    pub actual: VectorTable,
    pub widths: Vec<usize>,
    pub mismatches: Vec<Mismatch>,
    pub cycles: usize,
    pub ticks: Ticks,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// One line per mismatching cell.
    pub fn diff(&self) -> String {
        self.mismatches
            .iter()
            .map(Mismatch::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs every row of `table` against `design`.
///
/// Each row drives its input cells (don't-care keeps the previous value),
/// lets the circuit settle, samples every column and compares the output
/// cells. A clocked design then gets one clock pulse before the next row.
pub fn run(design: &mut Design, table: &VectorTable) -> Result<RunReport> {
    let widths = table
        .columns
        .iter()
        .map(|column| design.width_of(column))
        .collect::<Result<Vec<_>>>()?;
    let is_input: Vec<bool> = table.columns.iter().map(|c| design.is_input(c)).collect();

    let mut report = RunReport {
        actual: VectorTable {
            columns: table.columns.clone(),
            rows: Vec::with_capacity(table.rows.len()),
        },
        widths: widths.clone(),
        mismatches: Vec::new(),
        cycles: 0,
        ticks: 0,
    };

    for (index, cells) in table.rows.iter().enumerate() {
        let row = index + 1;
        let mut expected = Vec::with_capacity(cells.len());
        for (column, cell) in cells.iter().enumerate() {
            if *cell == Cell::DontCare {
                expected.push(None);
                continue;
            }
            let value = cell.value_at(widths[column]).ok_or_else(|| Error::BadValue {
                row,
                column: table.columns[column].clone(),
                value: cell.to_string(),
            })?;
            if is_input[column] {
                design.set_input(&table.columns[column], value)?;
                expected.push(None);
            } else {
                expected.push(Some(value));
            }
        }
        report.ticks += design.settle()?;

        let mut actual = Vec::with_capacity(cells.len());
        for (column, expected) in expected.into_iter().enumerate() {
            let name = &table.columns[column];
            let value = design.read_output(name)?;
            actual.push(Cell::Value(value));
            if let Some(expected) = expected {
                if expected != value {
                    trace!(row, column = %name, expected, value, "mismatch");
                    report.mismatches.push(Mismatch {
                        row,
                        column: name.clone(),
                        width: widths[column],
                        expected,
                        actual: value,
                    });
                }
            }
        }
        report.actual.rows.push(actual);

        if design.has_clock() {
            report.ticks += design.pulse_clock()?;
            report.cycles += 1;
        }
    }
    debug!(
        design = design.name(),
        rows = table.rows.len(),
        mismatches = report.mismatches.len(),
        ticks = report.ticks,
        "vector run finished"
    );
    Ok(report)
}
