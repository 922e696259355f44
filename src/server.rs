//! HTTP prediction server.
//!
//! One route, `POST /predict`, answered from a model loaded once at startup
//! and shared read-only between requests.

use std::sync::Arc;

use axum::{
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::post,
	Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::label::Label;
use crate::model::Model;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
	pub features: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
	pub prediction: Label,
}

/// Request failures, rendered as `{"error": ..., "status": ...}`.
#[derive(Debug)]
pub struct AppError(Error);

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = match &self.0 {
			Error::FeatureCountMismatch { .. } => StatusCode::BAD_REQUEST,
			other => {
				tracing::error!("prediction failed: {}", other);
				StatusCode::INTERNAL_SERVER_ERROR
			}
		};

		let body = Json(json!({
			"error": self.0.to_string(),
			"status": status.as_u16()
		}));

		(status, body).into_response()
	}
}

impl From<Error> for AppError {
	fn from(err: Error) -> Self {
		AppError(err)
	}
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
	pub model: Arc<Model>,
}

async fn predict(
	State(state): State<AppState>,
	Json(request): Json<PredictRequest>,
) -> std::result::Result<Json<PredictResponse>, AppError> {
	let prediction = state.model.predict_label(&request.features)?.clone();
	tracing::debug!(%prediction, "predicted");

	Ok(Json(PredictResponse { prediction }))
}

pub fn router(model: Arc<Model>) -> Router {
	Router::new()
		.route("/predict", post(predict))
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any)
		)
		.with_state(AppState { model })
}

/// Loads the configured model and serves until the process is stopped.
pub async fn run(config: &Config) -> Result<()> {
	tracing::info!(path = %config.model_path.display(), "loading model");
	let model = Model::open(&config.model_path)?;
	tracing::info!(
		features = model.features_len(),
		classes = model.classes().len(),
		label = model.label_column(),
		"model loaded"
	);

	let app = router(Arc::new(model));

	let addr = config.addr();
	let listener = tokio::net::TcpListener::bind(addr).await?;
	tracing::info!("listening on http://{}", addr);

	axum::serve(listener, app).await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dataset::Builder;
	use crate::decision_tree::DecisionTreeBuilder;
	use crate::table::{Cell, Table};
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Method, Request};
	use rand::rngs::StdRng;
	use rand::SeedableRng;
	use serde_json::Value;
	use tower::ServiceExt;

	fn model() -> Arc<Model> {
		let table = Table {
			headers: vec!["fever".into(), "cough".into(), "disease".into()],
			rows: (0..16)
				.map(|i| {
					let fever = (i % 2) as f64;
					let cough = ((i / 2) % 2) as f64;
					let disease = if fever == 1.0 { "flu" } else if cough == 1.0 { "cold" } else { "healthy" };
					vec![Cell::Number(fever), Cell::Number(cough), Cell::Text(disease.into())]
				})
				.collect(),
		};

		let (builder, names, classes) = Builder::from_table(&table, 2).unwrap();
		let mut rng = StdRng::seed_from_u64(42);
		let tree = DecisionTreeBuilder::default().fit(&mut rng, builder.build());

		Arc::new(Model::new("disease".into(), names, classes, tree))
	}

	async fn post(body: &str) -> (StatusCode, Option<Value>) {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/predict")
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body.to_string()))
			.unwrap();

		let response = router(model()).oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

		(status, serde_json::from_slice(&bytes).ok())
	}

	#[tokio::test]
	async fn predicts_well_formed_request() {
		let (status, body) = post(r#"{"features": [1, 0]}"#).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body.unwrap(), json!({ "prediction": "flu" }));

		let (_, body) = post(r#"{"features": [0.0, 1.0]}"#).await;
		assert_eq!(body.unwrap()["prediction"], "cold");
	}

	#[tokio::test]
	async fn wrong_length_is_bad_request() {
		let (status, body) = post(r#"{"features": [1, 0, 1]}"#).await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body.unwrap()["status"], 400);
	}

	#[tokio::test]
	async fn malformed_payloads_are_rejected_not_fatal() {
		for body in [r#"{}"#, r#"{"features": "high"}"#, r#"{"features": [1, null]}"#, "not json"] {
			let (status, _) = post(body).await;
			assert!(status.is_client_error(), "{} gave {}", body, status);
		}

		let (status, _) = post(r#"{"features": [1, 1]}"#).await;
		assert_eq!(status, StatusCode::OK);
	}

	#[tokio::test]
	async fn allows_any_origin() {
		let request = Request::builder()
			.method(Method::OPTIONS)
			.uri("/predict")
			.header(header::ORIGIN, "http://example.com")
			.header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
			.body(Body::empty())
			.unwrap();

		let response = router(model()).oneshot(request).await.unwrap();

		assert_eq!(
			response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
			"*"
		);
	}

	#[tokio::test]
	async fn other_routes_are_not_served() {
		let request = Request::builder()
			.method(Method::GET)
			.uri("/health")
			.body(Body::empty())
			.unwrap();

		let response = router(model()).oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_FOUND);
	}
}
