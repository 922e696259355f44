use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("dataset not found at {0}")]
	DatasetNotFound(PathBuf),

	#[error("model artifact not found at {0}")]
	ModelNotFound(PathBuf),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("csv error: {0}")]
	Csv(#[from] csv::Error),

	#[error("spreadsheet error: {0}")]
	Spreadsheet(#[from] calamine::Error),

	#[error("unsupported dataset format {0:?}, expected csv, xlsx, xlsm, xls or ods")]
	UnsupportedFormat(PathBuf),

	#[error("dataset has no {0}")]
	EmptyDataset(&'static str),

	#[error("row {row} has {found} cells, header has {expected}")]
	RaggedRow { row: usize, expected: usize, found: usize },

	#[error("row {0} has no label")]
	MissingLabel(usize),

	#[error("feature column {column:?} row {row} is not numeric: {value:?}")]
	NonNumericFeature { column: String, row: usize, value: String },

	#[error("expected {expected} features, got {found}")]
	FeatureCountMismatch { expected: usize, found: usize },

	#[error("invalid model artifact: {0}")]
	InvalidArtifact(String),
}
