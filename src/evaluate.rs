use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::dataset;
use crate::error::Result;
use crate::model::Model;
use crate::table;

/// Classifies every row of `input` and writes one label per line to `output`.
/// A column named like the model's label column is ignored.
/// Returns the number of rows written.
pub fn run(model: &Model, input: &Path, output: &Path) -> Result<usize> {
	tracing::info!(path = %input.display(), "reading evaluation dataset");
	let table = table::read(input)?;

	let label = table.column_index(model.label_column());
	let rows = dataset::feature_rows(&table, label)?;

	tracing::info!(rows = rows.len(), "classifying evaluation data");
	let predicted = rows
		.iter()
		.map(|row| model.predict_label(row))
		.collect::<Result<Vec<_>>>()?;

	tracing::info!(path = %output.display(), "writing classified data");
	let mut writer = BufWriter::new(File::create(output)?);
	for label in &predicted {
		writeln!(writer, "{}", label)?;
	}
	writer.flush()?;

	Ok(predicted.len())
}
