use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

pub trait Classifier: Sized {
	/// Predicted class index for one feature vector.
	fn predict(&self, x: &[f64]) -> f64;

	fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()>;
	fn deserialize<R: Read>(reader: &mut R) -> io::Result<Self>;

	/// Writes the classifier to `path`, creating missing parent directories.
	fn save(&self, path: &Path) -> io::Result<()> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}

		let mut writer = BufWriter::new(File::create(path)?);
		self.serialize(&mut writer)?;
		writer.flush()
	}

	fn load(path: &Path) -> io::Result<Self> {
		let mut reader = BufReader::new(File::open(path)?);
		Self::deserialize(&mut reader)
	}
}
