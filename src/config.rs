//! Configuration module

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

/// Reads and parses `key`. A value that is set but unusable is logged and
/// treated as unset.
fn parsed<T, F>(lookup: &F, key: &str, valid: impl Fn(&T) -> bool) -> Option<T>
where
	T: FromStr,
	F: Fn(&str) -> Option<String>,
{
	let raw = lookup(key)?;

	match raw.trim().parse::<T>() {
		Ok(value) if valid(&value) => Some(value),
		_ => {
			tracing::warn!(key, value = %raw, "ignoring invalid setting, using the default");
			None
		}
	}
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
	/// Spreadsheet the trainer reads
	pub data_path: PathBuf,

	/// Where the trainer writes the model and the server reads it
	pub model_path: PathBuf,

	/// Preferred label column, the last column is used when absent
	pub label_column: String,

	/// Share of rows held out for the accuracy check
	pub test_rate: f64,

	/// Seed for both the split and the tree
	pub seed: u64,

	/// Deepest level a tree may grow to, unlimited when `None`
	pub max_depth: Option<usize>,

	/// Server bind address
	pub host: IpAddr,

	/// Server port
	pub port: u16,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			data_path: PathBuf::from("data/data.xlsx"),
			model_path: PathBuf::from("model/model.bin"),
			label_column: "disease".to_string(),
			test_rate: 0.2,
			seed: 42,
			max_depth: None,
			host: IpAddr::V4(Ipv4Addr::LOCALHOST),
			port: 5000,
		}
	}
}

impl Config {
	/// Load configuration from `MEDBOT_*` environment variables
	pub fn from_env() -> Self {
		Self::from_lookup(|key| env::var(key).ok())
	}

	pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
		let defaults = Self::default();

		Self {
			data_path: lookup("MEDBOT_DATA_PATH")
				.map(PathBuf::from)
				.unwrap_or(defaults.data_path),

			model_path: lookup("MEDBOT_MODEL_PATH")
				.map(PathBuf::from)
				.unwrap_or(defaults.model_path),

			label_column: lookup("MEDBOT_LABEL_COLUMN")
				.unwrap_or(defaults.label_column),

			test_rate: parsed(&lookup, "MEDBOT_TEST_RATE", |r: &f64| (0.0..1.0).contains(r))
				.unwrap_or(defaults.test_rate),

			seed: parsed(&lookup, "MEDBOT_SEED", |_| true).unwrap_or(defaults.seed),

			max_depth: parsed(&lookup, "MEDBOT_MAX_DEPTH", |&d: &usize| d > 0)
				.or(defaults.max_depth),

			host: parsed(&lookup, "MEDBOT_HOST", |_| true).unwrap_or(defaults.host),

			port: parsed(&lookup, "MEDBOT_PORT", |_| true).unwrap_or(defaults.port),
		}
	}

	pub fn addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}
}
