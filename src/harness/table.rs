use std::{fmt, fs::File, io, path::Path};

use crate::{
    components::wire::mask,
    error::{Error, Result},
    netlist::parse_unsigned,
};

/// One cell of a vector table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    DontCare,
    Value(u64),
    /// Magnitude of a negative decimal, stored in two's complement once the
    /// pin width is known.
    Negative(u64),
}

impl Cell {
    pub fn parse(text: &str) -> Option<Cell> {
        let text = text.trim();
        match text {
            "x" | "X" | "-" => Some(Cell::DontCare),
            _ => match text.strip_prefix('-') {
                Some(magnitude) if magnitude.chars().all(|c| c.is_ascii_digit() || c == '_') => {
                    parse_unsigned(magnitude).map(Cell::Negative)
                }
                Some(_) => None,
                None => parse_unsigned(text).map(Cell::Value),
            },
        }
    }

    /// The value at `width` bits. `None` for don't-care cells and for values
    /// that do not fit.
    pub fn value_at(self, width: usize) -> Option<u64> {
        match self {
            Cell::Value(value) if value & !mask(width) == 0 => Some(value),
            Cell::Negative(magnitude) if magnitude <= 1 << (width.min(64) - 1) => {
                Some(magnitude.wrapping_neg() & mask(width))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::DontCare => write!(f, "x"),
            Cell::Value(value) => write!(f, "{value:#x}"),
            Cell::Negative(magnitude) => write!(f, "-{magnitude}"),
        }
    }
}

/// Fixed-width hex for a `width`-bit value.
pub fn hex(value: u64, width: usize) -> String {
    format!("0x{value:0digits$x}", digits = width.div_ceil(4).max(1))
}

/// Named columns of pin values, one row per step.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VectorTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl VectorTable {
    pub fn from_path(path: &Path) -> Result<VectorTable> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::from_reader(file)
    }

    /// Reads CSV with a header row of pin names. Lines starting with `#` are
    /// comments.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<VectorTable> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let row = index + 1;
            if record.len() != columns.len() {
                return Err(Error::RowLength {
                    row,
                    found: record.len(),
                    expected: columns.len(),
                });
            }
            let cells = record
                .iter()
                .zip(&columns)
                .map(|(text, column)| {
                    Cell::parse(text).ok_or_else(|| Error::BadValue {
                        row,
                        column: column.clone(),
                        value: text.to_string(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(cells);
        }
        Ok(VectorTable { columns, rows })
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Writes the table as CSV with every value in fixed-width hex.
    pub fn write<W: io::Write>(&self, writer: W, widths: &[usize]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().zip(widths).map(|(cell, width)| match cell {
                Cell::Value(value) => hex(*value, *width),
                cell => cell.to_string(),
            }))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn write_to_path(&self, path: &Path, widths: &[usize]) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        self.write(file, widths)
    }
}
