use crate::classifier::Classifier;
use crate::error::{Error, Result};
use crate::label::Classes;
use crate::table::{Cell, Table};
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::ops::Range;
use rand::seq::SliceRandom;
use rand::Rng;
use ordered_float::OrderedFloat;

#[derive(Clone, Debug)]
pub struct Dataset<'a> {
	columns: &'a [Vec<f64>],
	targets: &'a [f64],

	index: Vec<usize>,
	range: Range<usize>,
}

impl<'a, 'b> Dataset<'a> {
	/// Share of rows the classifier gets right, `None` when the view is empty.
	pub fn evaluate<C: Classifier + Sync>(&self, classifier: &C) -> Option<f64> {
		if self.rows_len() == 0 {
			return None;
		}

		let correct = self.rows()
			.zip(self.targets())
			.collect::<Vec<_>>()
			.into_par_iter()
			.filter(|(x, y)| classifier.predict(x) == *y)
			.count();

		Some(correct as f64 / self.rows_len() as f64)
	}

	pub fn sort(&mut self, column: usize) {
		let values = &self.columns[column];

		self.index[self.range.start..self.range.end]
			.sort_by_key(|&x| OrderedFloat(values[x]));
	}

	/// Candidate thresholds of a sorted column: the midpoint between each pair
	/// of adjacent distinct values, with the rows that fall to the left.
	/// Rows at or below the threshold go left.
	pub fn get_splits(&'b self, column: usize) -> impl 'b + Iterator<Item = (Range<usize>, f64)> {
		let column = &self.columns[column];

		self.indices()
			.map(move |x| column[x])
			.enumerate()
			.scan(None, |prev: &mut Option<f64>, (i, x)| {
				match *prev {
					None => {
						*prev = Some(x);
						Some(None)
					}
					Some(y) if y != x => {
						*prev = Some(x);
						// Neighbouring floats can round the midpoint up onto `x`.
						let mid = (x + y) / 2.0;
						Some(Some((0..i, if mid < x { mid } else { y })))
					}
					Some(_) => Some(None),
				}
			})
			.flatten()
	}

	/// Rows of the parent view this view covers, as absolute positions.
	pub fn range(&self) -> Range<usize> {
		self.range.clone()
	}

	/// Narrows the view to an absolute range returned by `range` or `split_at`.
	pub fn focus(&mut self, range: Range<usize>) {
		self.range = range;
	}

	/// Absolute ranges of the first `row` rows and the rest.
	pub fn split_at(&self, row: usize) -> (Range<usize>, Range<usize>) {
		let row = row + self.range.start;

		(self.range.start..row, row..self.range.end)
	}

	/// Shuffles the rows and cuts off `ceil(rows * test_rate)` of them as the
	/// test view. Returns `(train, test)`.
	pub fn train_test_split<R: Rng + ?Sized>(mut self, rng: &mut R, test_rate: f64) -> (Self, Self) {
		self.index[self.range.start..self.range.end].shuffle(rng);
		let test_num = std::cmp::min(
			(self.rows_len() as f64 * test_rate).ceil() as usize,
			self.rows_len(),
		);

		let mut train = self.clone();
		let mut test = self;
		test.range.end = test.range.start + test_num;
		train.range.start = test.range.end;

		(train, test)
	}

	fn indices(&'b self) -> impl 'b + Iterator<Item = usize> + Clone {
		self.index[self.range.start..self.range.end]
			.iter()
			.copied()
	}

	/// Original row numbers of this view, in view order.
	pub fn row_ids(&self) -> &[usize] {
		&self.index[self.range.start..self.range.end]
	}

	pub fn targets(&'b self) -> impl 'b + Iterator<Item = f64> {
		self.indices()
			.map(move |i| self.targets[i])
	}

	pub fn column(&'b self, column: usize) -> impl 'b + Iterator<Item = f64> {
		let column = &self.columns[column];

		self.indices()
			.map(move |i| column[i])
	}

	pub fn features_len(&self) -> usize {
		self.columns.len()
	}

	pub fn rows_len(&self) -> usize {
		self.range.end - self.range.start
	}

	pub fn rows(&'b self) -> impl 'b + Iterator<Item = Vec<f64>> {
		self.indices().map(move |i| {
			(0..self.columns.len())
				.map(|j| self.columns[j][i])
				.collect()
		})
	}

	pub fn classify<C: Classifier>(&self, classifier: &C) -> Vec<f64> {
		self.rows()
			.map(|x| classifier.predict(&x))
			.collect()
	}
}

#[derive(Debug, Default)]
pub struct Builder {
	columns: Vec<Vec<f64>>,
	targets: Vec<f64>,
}

impl Builder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Splits a table into numeric features and encoded targets.
	/// Returns the builder, the feature column names and the label classes.
	pub fn from_table(table: &Table, label: usize) -> Result<(Self, Vec<String>, Classes)> {
		if table.rows.is_empty() {
			return Err(Error::EmptyDataset("rows"));
		}

		let rows = feature_rows(table, Some(label))?;
		let (classes, targets) = Classes::encode_column(table.rows.iter().map(|row| row[label].clone()))?;

		let mut builder = Self::new();
		for (x, y) in rows.iter().zip(targets) {
			builder.add(x, y);
		}

		Ok((builder, feature_names(table, Some(label)), classes))
	}

	pub fn build(&self) -> Dataset {
		let range = 0..self.targets.len();

		Dataset {
			columns: &self.columns,
			targets: &self.targets,

			range: range.clone(),
			index: range.collect(),
		}
	}

	pub fn add(&mut self, x: &[f64], y: f64) {
		if self.columns.is_empty() {
			self.columns = vec![Vec::new(); x.len()];
		}

		for (column, value) in self.columns.iter_mut().zip(x) {
			column.push(*value);
		}

		self.targets.push(y);
	}
}

pub fn feature_names(table: &Table, skip: Option<usize>) -> Vec<String> {
	table.headers
		.iter()
		.enumerate()
		.filter(|&(i, _)| Some(i) != skip)
		.map(|(_, name)| name.clone())
		.collect()
}

/// Every row of the table as a feature vector, leaving out column `skip`.
pub fn feature_rows(table: &Table, skip: Option<usize>) -> Result<Vec<Vec<f64>>> {
	table.rows
		.iter()
		.enumerate()
		.map(|(row, cells)| {
			cells
				.iter()
				.enumerate()
				.filter(|&(i, _)| Some(i) != skip)
				.map(|(i, cell)| match cell {
					Cell::Number(x) => Ok(*x),
					other => Err(Error::NonNumericFeature {
						column: table.headers[i].clone(),
						row: row + 1,
						value: other.as_text(),
					}),
				})
				.collect()
		})
		.collect()
}
