use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medbot::{evaluate, server, train, Config, Model};

/// Train a decision tree on a spreadsheet and serve its predictions
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "medbot")]
#[command(version)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
	/// Fit a model on the dataset and write the artifact
	Fit {
		/// Dataset to read, overrides MEDBOT_DATA_PATH
		#[arg(long)]
		data: Option<PathBuf>,

		/// Artifact to write, overrides MEDBOT_MODEL_PATH
		#[arg(long)]
		model: Option<PathBuf>,
	},

	/// Serve POST /predict from a saved artifact
	Serve {
		/// Artifact to load, overrides MEDBOT_MODEL_PATH
		#[arg(long)]
		model: Option<PathBuf>,

		/// Port to listen on, overrides MEDBOT_PORT
		#[arg(long)]
		port: Option<u16>,
	},

	/// Classify every row of a table and write one label per line
	Evaluate {
		input: PathBuf,
		output: PathBuf,

		/// Artifact to load, overrides MEDBOT_MODEL_PATH
		#[arg(long)]
		model: Option<PathBuf>,
	},
}

fn apply_overrides(config: &mut Config, command: &Command) {
	match command {
		Command::Fit { data, model } => {
			if let Some(data) = data {
				config.data_path = data.clone();
			}
			if let Some(model) = model {
				config.model_path = model.clone();
			}
		},
		Command::Serve { model, port } => {
			if let Some(model) = model {
				config.model_path = model.clone();
			}
			if let Some(port) = port {
				config.port = *port;
			}
		},
		Command::Evaluate { model, .. } => {
			if let Some(model) = model {
				config.model_path = model.clone();
			}
		},
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	dotenvy::dotenv().ok();

	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| "medbot=info,tower_http=info".into()))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let cli = Cli::parse();
	let mut config = Config::from_env();
	apply_overrides(&mut config, &cli.command);

	match cli.command {
		Command::Fit { .. } => {
			// Training is CPU bound and short lived.
			tokio::task::spawn_blocking(move || train::run(&config))
				.await
				.context("training task panicked")?
				.context("training failed")?;
		},
		Command::Serve { .. } => {
			server::run(&config).await.context("server failed")?;
		},
		Command::Evaluate { input, output, .. } => {
			let model = Model::open(&config.model_path)
				.with_context(|| format!("loading {}", config.model_path.display()))?;
			let written = evaluate::run(&model, &input, &output)
				.context("evaluation failed")?;
			tracing::info!(rows = written, "done");
		},
	}

	Ok(())
}
