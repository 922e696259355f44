//! The persisted model artifact.
//!
//! Layout, all integers big endian:
//!
//! ```text
//! "MDBT" | version u16 | label column | feature count u16 | feature names...
//!        | class count u32 | classes... | node count u32 | nodes...
//! ```
//!
//! Strings are a u16 byte length followed by utf-8. A class is a u8 kind
//! (0 number, 1 text) followed by an f64 or a string. A node is a u16 tag,
//! then either the leaf class (f64) or the split (f64 threshold, u16 column)
//! and the u32 indices of both children.

use std::io::{self, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::classifier::Classifier;
use crate::decision_tree::DecisionTree;
use crate::error::{Error, Result};
use crate::label::{Classes, Label};

const MAGIC: &[u8; 4] = b"MDBT";
const VERSION: u16 = 1;

const NUMBER: u8 = 0;
const TEXT: u8 = 1;

fn invalid(message: impl Into<String>) -> io::Error {
	io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn write_str<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
	let len = u16::try_from(value.len())
		.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("string too long: {} bytes", value.len())))?;

	writer.write_u16::<BigEndian>(len)?;
	writer.write_all(value.as_bytes())
}

fn read_str<R: Read>(reader: &mut R) -> io::Result<String> {
	let len = reader.read_u16::<BigEndian>()? as usize;
	let mut buf = vec![0u8; len];
	reader.read_exact(&mut buf)?;

	String::from_utf8(buf).map_err(|e| invalid(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
	label_column: String,
	feature_names: Vec<String>,
	classes: Classes,
	tree: DecisionTree,
}

impl Model {
	pub fn new(label_column: String, feature_names: Vec<String>, classes: Classes, tree: DecisionTree) -> Self {
		Self { label_column, feature_names, classes, tree }
	}

	/// Loads an artifact, telling a missing file apart from a broken one.
	pub fn open(path: &Path) -> Result<Self> {
		if !path.is_file() {
			return Err(Error::ModelNotFound(path.to_path_buf()));
		}

		Self::load(path).map_err(|e| match e.kind() {
			io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => Error::InvalidArtifact(e.to_string()),
			_ => Error::Io(e),
		})
	}

	pub fn label_column(&self) -> &str {
		&self.label_column
	}

	pub fn feature_names(&self) -> &[String] {
		&self.feature_names
	}

	pub fn features_len(&self) -> usize {
		self.feature_names.len()
	}

	pub fn classes(&self) -> &Classes {
		&self.classes
	}

	pub fn tree(&self) -> &DecisionTree {
		&self.tree
	}

	/// Predicts the label of one feature vector. Only the length is checked;
	/// the column order has to match the training data.
	pub fn predict_label(&self, x: &[f64]) -> Result<&Label> {
		if x.len() != self.features_len() {
			return Err(Error::FeatureCountMismatch {
				expected: self.features_len(),
				found: x.len(),
			});
		}

		let class = self.predict(x);
		self.classes
			.decode(class)
			.ok_or_else(|| Error::InvalidArtifact(format!("tree predicted unknown class {}", class)))
	}
}

impl Classifier for Model {
	fn predict(&self, x: &[f64]) -> f64 {
		self.tree.predict(x)
	}

	fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		writer.write_all(MAGIC)?;
		writer.write_u16::<BigEndian>(VERSION)?;
		write_str(writer, &self.label_column)?;

		let features = u16::try_from(self.feature_names.len())
			.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many feature columns"))?;
		writer.write_u16::<BigEndian>(features)?;
		for name in &self.feature_names {
			write_str(writer, name)?;
		}

		writer.write_u32::<BigEndian>(self.classes.len() as u32)?;
		for label in self.classes.labels() {
			match label {
				Label::Number(x) => {
					writer.write_u8(NUMBER)?;
					writer.write_f64::<BigEndian>(*x)?;
				},
				Label::Text(x) => {
					writer.write_u8(TEXT)?;
					write_str(writer, x)?;
				},
			}
		}

		self.tree.serialize(writer)
	}

	fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self> {
		let mut magic = [0u8; 4];
		reader.read_exact(&mut magic)?;
		if &magic != MAGIC {
			return Err(invalid("not a model artifact"));
		}

		let version = reader.read_u16::<BigEndian>()?;
		if version != VERSION {
			return Err(invalid(format!("unsupported artifact version {}", version)));
		}

		let label_column = read_str(reader)?;

		let features = reader.read_u16::<BigEndian>()?;
		let feature_names = (0..features)
			.map(|_| read_str(reader))
			.collect::<io::Result<Vec<String>>>()?;

		let classes = reader.read_u32::<BigEndian>()?;
		let labels = (0..classes)
			.map(|_| match reader.read_u8()? {
				NUMBER => Ok(Label::Number(reader.read_f64::<BigEndian>()?)),
				TEXT => Ok(Label::Text(read_str(reader)?)),
				kind => Err(invalid(format!("unknown class kind {}", kind))),
			})
			.collect::<io::Result<Vec<Label>>>()?;

		let tree = DecisionTree::deserialize(reader)?;

		if let Some(column) = tree.max_column() {
			if column >= feature_names.len() {
				return Err(invalid(format!("tree splits on column {} of {}", column, feature_names.len())));
			}
		}

		Ok(Self {
			label_column,
			feature_names,
			classes: Classes::new(labels),
			tree,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dataset::Builder;
	use crate::decision_tree::DecisionTreeBuilder;
	use crate::table::{Cell, Table};
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	fn trained() -> (Model, Vec<Vec<f64>>) {
		let rows = (0..30)
			.map(|i| {
				let temp = 36.0 + (i % 6) as f64;
				let cough = (i % 2) as f64;
				let disease = if temp >= 39.0 { "flu" } else if cough == 1.0 { "cold" } else { "healthy" };
				vec![Cell::Number(temp), Cell::Text(disease.into()), Cell::Number(cough)]
			})
			.collect::<Vec<_>>();
		let table = Table {
			headers: vec!["temp".into(), "disease".into(), "cough".into()],
			rows,
		};

		let (builder, names, classes) = Builder::from_table(&table, 1).unwrap();
		let mut rng = StdRng::seed_from_u64(42);
		let tree = DecisionTreeBuilder::default().fit(&mut rng, builder.build());
		let rows = builder.build().rows().collect();

		(Model::new("disease".into(), names, classes, tree), rows)
	}

	#[test]
	fn predicts_original_labels() {
		let (model, _) = trained();

		assert_eq!(model.predict_label(&[40.0, 0.0]).unwrap(), &Label::Text("flu".into()));
		assert_eq!(model.predict_label(&[37.0, 1.0]).unwrap(), &Label::Text("cold".into()));
		assert_eq!(model.predict_label(&[36.0, 0.0]).unwrap(), &Label::Text("healthy".into()));
	}

	#[test]
	fn wrong_feature_count_is_an_error() {
		let (model, _) = trained();

		assert!(matches!(
			model.predict_label(&[40.0]),
			Err(Error::FeatureCountMismatch { expected: 2, found: 1 })
		));
	}

	#[test]
	fn saved_model_predicts_identically() {
		let (model, rows) = trained();
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("nested").join("model.bin");

		model.save(&path).unwrap();
		let restored = Model::open(&path).unwrap();

		assert_eq!(restored, model);
		assert_eq!(restored.feature_names(), &["temp".to_string(), "cough".to_string()]);
		for row in rows {
			assert_eq!(restored.predict_label(&row).unwrap(), model.predict_label(&row).unwrap());
		}
	}

	#[test]
	fn missing_and_corrupt_artifacts() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("model.bin");
		assert!(matches!(Model::open(&path), Err(Error::ModelNotFound(_))));

		std::fs::write(&path, b"NOPE").unwrap();
		assert!(matches!(Model::open(&path), Err(Error::InvalidArtifact(_))));

		let (model, _) = trained();
		let mut bytes = Vec::new();
		model.serialize(&mut bytes).unwrap();
		bytes.truncate(bytes.len() - 3);
		std::fs::write(&path, &bytes).unwrap();
		assert!(matches!(Model::open(&path), Err(Error::InvalidArtifact(_))));
	}
}
