use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::table::Cell;

/// A value of the label column, in its original domain.
#[derive(Clone, Debug, PartialEq)]
pub enum Label {
	Number(f64),
	Text(String),
}

// Whole numbers go out as JSON integers, the way they were written in the sheet.
impl Serialize for Label {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		match self {
			Label::Number(x) if x.fract() == 0.0 && x.abs() < i64::MAX as f64 => serializer.serialize_i64(*x as i64),
			Label::Number(x) => serializer.serialize_f64(*x),
			Label::Text(x) => serializer.serialize_str(x),
		}
	}
}

impl Label {
	fn from_cell(cell: &Cell, row: usize) -> Result<Self> {
		match cell {
			Cell::Number(x) => Ok(Label::Number(*x)),
			Cell::Text(x) => Ok(Label::Text(x.clone())),
			Cell::Empty => Err(Error::MissingLabel(row + 1)),
		}
	}

	fn cmp_key(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Label::Number(a), Label::Number(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
			(Label::Number(_), Label::Text(_)) => Ordering::Less,
			(Label::Text(_), Label::Number(_)) => Ordering::Greater,
			(Label::Text(a), Label::Text(b)) => a.cmp(b),
		}
	}
}

impl fmt::Display for Label {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Label::Number(x) => write!(f, "{}", x),
			Label::Text(x) => f.write_str(x),
		}
	}
}

/// The sorted set of distinct labels. A label is encoded as its index.
#[derive(Clone, Debug, PartialEq)]
pub struct Classes {
	labels: Vec<Label>,
}

impl Classes {
	pub fn new(mut labels: Vec<Label>) -> Self {
		labels.sort_by(Label::cmp_key);
		labels.dedup_by(|a, b| a.cmp_key(b) == Ordering::Equal);

		Self { labels }
	}

	/// Collects the classes of one column and encodes every row.
	pub fn encode_column(cells: impl Iterator<Item = Cell>) -> Result<(Self, Vec<f64>)> {
		let raw = cells
			.enumerate()
			.map(|(row, cell)| Label::from_cell(&cell, row))
			.collect::<Result<Vec<Label>>>()?;

		let mut order = (0..raw.len()).collect::<Vec<_>>();
		order.sort_by(|&a, &b| raw[a].cmp_key(&raw[b]));

		// Walk the rows in label order, opening a new class at every change.
		let mut labels: Vec<Label> = Vec::new();
		let mut targets = vec![0.0; raw.len()];
		for row in order {
			let same = labels
				.last()
				.map_or(false, |last| last.cmp_key(&raw[row]) == Ordering::Equal);
			if !same {
				labels.push(raw[row].clone());
			}
			targets[row] = (labels.len() - 1) as f64;
		}

		Ok((Self { labels }, targets))
	}

	pub fn encode(&self, label: &Label) -> Option<usize> {
		self.labels
			.binary_search_by(|x| x.cmp_key(label))
			.ok()
	}

	pub fn decode(&self, class: f64) -> Option<&Label> {
		if class < 0.0 || class.fract() != 0.0 {
			return None;
		}

		self.labels.get(class as usize)
	}

	pub fn labels(&self) -> &[Label] {
		&self.labels
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}
}
