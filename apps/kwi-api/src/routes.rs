use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use kwi_service::{
	AnalyticsRequest, AnalyticsResponse, CollectRequest, CollectResponse, Error, ErrorKind,
	TrendRequest, TrendResponse,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/keywords/collect", post(collect))
		.route("/v1/keywords/trends", post(trends))
		.route("/v1/keywords/analytics", post(analytics))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

/// Failed collections keep the collect response body; only the status reflects the error kind.
async fn collect(
	State(state): State<AppState>,
	Json(payload): Json<CollectRequest>,
) -> (StatusCode, Json<CollectResponse>) {
	let response = state.service.collect(payload).await;
	let status = response.error_kind.map(status_for).unwrap_or(StatusCode::OK);

	(status, Json(response))
}

async fn trends(
	State(state): State<AppState>,
	Json(payload): Json<TrendRequest>,
) -> Result<Json<TrendResponse>, ApiError> {
	let response = state.service.trends(payload).await?;

	Ok(Json(response))
}

async fn analytics(
	State(state): State<AppState>,
	Json(payload): Json<AnalyticsRequest>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
	let response = state.service.analytics(payload).await?;

	Ok(Json(response))
}

fn status_for(kind: ErrorKind) -> StatusCode {
	match kind {
		ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
		ErrorKind::NotFound => StatusCode::NOT_FOUND,
		ErrorKind::AllSourcesFailed => StatusCode::BAD_GATEWAY,
		ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
		ErrorKind::PersistenceError => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let kind = err.kind();

		if kind == ErrorKind::PersistenceError {
			tracing::error!(error = %err, "Request failed on storage.");
		}

		Self::new(status_for(kind), kind.as_str(), err.to_string())
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
