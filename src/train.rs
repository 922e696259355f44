//! The training entry point: spreadsheet in, model artifact out.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::dataset::Builder;
use crate::decision_tree::DecisionTreeBuilder;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::table;

/// What a training run produced, for logging and tests.
#[derive(Debug, Clone)]
pub struct Report {
	pub label_column: String,
	pub train_rows: usize,
	pub test_rows: usize,
	pub test_accuracy: Option<f64>,
	pub train_accuracy: Option<f64>,
	pub depth: usize,
	pub leaves: usize,
}

/// Reads the configured dataset, fits a tree and writes the artifact.
pub fn run(config: &Config) -> Result<(Model, Report)> {
	if !config.data_path.is_file() {
		tracing::error!(path = %config.data_path.display(), "dataset not found, check MEDBOT_DATA_PATH");
		return Err(Error::DatasetNotFound(config.data_path.clone()));
	}

	tracing::info!(path = %config.data_path.display(), "loading dataset");
	let table = table::read(&config.data_path)?;

	let (model, report) = fit(&table, config)?;

	tracing::info!(path = %config.model_path.display(), "saving model");
	model.save(&config.model_path)?;

	Ok((model, report))
}

/// Fits a model on an in-memory table without touching the filesystem.
pub fn fit(table: &table::Table, config: &Config) -> Result<(Model, Report)> {
	let label = table.label_column(&config.label_column)?;
	let label_column = table.headers[label].clone();
	tracing::info!(column = %label_column, rows = table.rows_len(), "using target column");

	let (builder, feature_names, classes) = Builder::from_table(table, label)?;
	let dataset = builder.build();

	let mut split_rng = StdRng::seed_from_u64(config.seed);
	let (train, test) = dataset.train_test_split(&mut split_rng, config.test_rate);
	if train.rows_len() == 0 {
		return Err(Error::EmptyDataset("training rows"));
	}
	tracing::info!(train = train.rows_len(), test = test.rows_len(), "split dataset");

	tracing::info!(max_depth = ?config.max_depth, features = feature_names.len(), classes = classes.len(), "fitting decision tree");
	let mut tree_rng = StdRng::seed_from_u64(config.seed);
	let tree = (DecisionTreeBuilder {
		max_features: None,
		max_depth: config.max_depth,
	}).fit(&mut tree_rng, train.clone());

	let model = Model::new(label_column.clone(), feature_names, classes, tree);

	let report = Report {
		label_column,
		train_rows: train.rows_len(),
		test_rows: test.rows_len(),
		test_accuracy: test.evaluate(&model),
		train_accuracy: train.evaluate(&model),
		depth: model.tree().depth(),
		leaves: model.tree().leaves(),
	};

	match report.test_accuracy {
		Some(accuracy) => tracing::info!("model trained, test accuracy: {:.2}%", accuracy * 100.0),
		None => tracing::warn!("model trained, no test rows to measure accuracy"),
	}
	if let Some(accuracy) = report.train_accuracy {
		tracing::debug!(depth = report.depth, leaves = report.leaves, "train accuracy: {:.2}%", accuracy * 100.0);
	}

	Ok((model, report))
}
