//! Reading tabular input (spreadsheets and csv) into memory.
//!
//! The first row is always the header. Cells keep their raw kind so that the
//! label column may hold text while feature columns are checked for numbers
//! later on.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use csv::{ReaderBuilder, Trim};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
	Number(f64),
	Text(String),
	Empty,
}

impl Cell {
	fn parse(raw: &str) -> Self {
		let raw = raw.trim();

		if raw.is_empty() {
			Cell::Empty
		} else if let Some(x) = raw.parse::<f64>().ok().filter(|x| x.is_finite()) {
			Cell::Number(x)
		} else {
			Cell::Text(raw.to_string())
		}
	}

	fn from_data(data: &Data) -> Self {
		match data {
			Data::Int(x) => Cell::Number(*x as f64),
			Data::Float(x) => Cell::Number(*x),
			Data::Bool(x) => Cell::Number(if *x { 1.0 } else { 0.0 }),
			Data::DateTime(x) => Cell::Number(x.as_f64()),
			Data::String(x) => Cell::parse(x),
			Data::Empty => Cell::Empty,
			other => Cell::Text(other.to_string()),
		}
	}

	pub fn as_text(&self) -> String {
		match self {
			Cell::Number(x) => x.to_string(),
			Cell::Text(x) => x.clone(),
			Cell::Empty => String::new(),
		}
	}
}

#[derive(Clone, Debug)]
pub struct Table {
	pub headers: Vec<String>,
	pub rows: Vec<Vec<Cell>>,
}

impl Table {
	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.headers.iter().position(|h| h == name)
	}

	pub fn rows_len(&self) -> usize {
		self.rows.len()
	}

	/// Picks the column named `preferred`, falling back to the last column.
	pub fn label_column(&self, preferred: &str) -> Result<usize> {
		if self.headers.is_empty() {
			return Err(Error::EmptyDataset("columns"));
		}

		Ok(self.column_index(preferred).unwrap_or(self.headers.len() - 1))
	}

	fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
		// Trailing empties are common in exported spreadsheets.
		if row.iter().all(|c| *c == Cell::Empty) {
			return Ok(());
		}

		if row.len() != self.headers.len() {
			return Err(Error::RaggedRow {
				row: self.rows.len() + 1,
				expected: self.headers.len(),
				found: row.len(),
			});
		}

		self.rows.push(row);
		Ok(())
	}
}

/// Reads a table, choosing the reader from the file extension.
pub fn read(path: &Path) -> Result<Table> {
	let extension = path
		.extension()
		.and_then(|e| e.to_str())
		.map(|e| e.to_ascii_lowercase());

	match extension.as_deref() {
		Some("csv") => read_csv(path),
		Some("xlsx") | Some("xlsm") | Some("xls") | Some("xlsb") | Some("ods") => read_spreadsheet(path),
		_ => Err(Error::UnsupportedFormat(path.to_path_buf())),
	}
}

pub fn read_csv(path: &Path) -> Result<Table> {
	let mut reader = ReaderBuilder::new()
		.has_headers(true)
		.flexible(true)
		.trim(Trim::All)
		.from_path(path)?;

	let headers = reader
		.headers()?
		.iter()
		.map(|x| x.trim_start_matches('\u{feff}').to_string())
		.collect::<Vec<String>>();

	if headers.is_empty() {
		return Err(Error::EmptyDataset("header"));
	}

	let mut table = Table { headers, rows: Vec::new() };

	for record in reader.records() {
		table.push_row(record?.iter().map(Cell::parse).collect())?;
	}

	Ok(table)
}

pub fn read_spreadsheet(path: &Path) -> Result<Table> {
	let mut workbook = open_workbook_auto(path)?;
	let range = workbook
		.worksheet_range_at(0)
		.ok_or(Error::EmptyDataset("worksheet"))??;

	let mut rows = range.rows();
	let headers = match rows.next() {
		Some(header) => header
			.iter()
			.map(|x| Cell::from_data(x).as_text())
			.collect::<Vec<String>>(),
		None => return Err(Error::EmptyDataset("header")),
	};

	let mut table = Table { headers, rows: Vec::new() };

	for row in rows {
		table.push_row(row.iter().map(Cell::from_data).collect())?;
	}

	Ok(table)
}
