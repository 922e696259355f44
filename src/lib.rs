//! Decision-tree disease classifier: a training command that turns a
//! spreadsheet into a model artifact, and a server that answers
//! `POST /predict` from that artifact.
//!
//! ```text
//!  data.xlsx ──► train::run ──► model.bin ──► server::run ──► POST /predict
//! ```

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod decision_tree;
pub mod error;
pub mod evaluate;
pub mod functions;
pub mod label;
pub mod model;
pub mod node;
pub mod server;
pub mod table;
pub mod train;

pub use config::Config;
pub use error::{Error, Result};
pub use label::Label;
pub use model::Model;
