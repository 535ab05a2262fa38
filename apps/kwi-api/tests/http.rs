use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use kwi_api::{routes, state::AppState};
use kwi_config::{Analytics, Collection, Config, Service, Sources, Storage, Trend};
use kwi_domain::{DefaultIntentClassifier, RawEntry, SourceType};
use kwi_providers::{BoxFuture, FetchOptions, SourceAdapter};
use kwi_service::KwiService;
use kwi_storage::MemorySnapshotStore;

struct StaticSource(Vec<&'static str>);
impl SourceAdapter for StaticSource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		_source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		let entries = self.0.iter().map(|text| RawEntry::new(*text)).collect();

		Box::pin(async move { Ok(entries) })
	}
}

struct DownSource;
impl SourceAdapter for DownSource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		Box::pin(async move {
			Err(kwi_providers::Error::SourceMalformed {
				source_type,
				message: "unexpected body".to_string(),
			})
		})
	}
}

fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage::default(),
		sources: Sources::default(),
		collection: Collection {
			sleep_min_ms: 0,
			sleep_max_ms: 0,
			max_attempts: 1,
			..Collection::default()
		},
		trend: Trend::default(),
		analytics: Analytics::default(),
		worker: None,
	}
}

fn shared(adapter: impl SourceAdapter + 'static) -> Arc<dyn SourceAdapter> {
	Arc::new(adapter)
}

fn app(sources: Vec<(SourceType, Arc<dyn SourceAdapter>)>) -> Router {
	let service = KwiService::with_sources(
		test_config(),
		Arc::new(MemorySnapshotStore::new()),
		sources,
		Arc::new(DefaultIntentClassifier),
	);

	routes::router(AppState::from_service(service))
}

fn healthy_app() -> Router {
	app(vec![
		(SourceType::Autosuggest, shared(StaticSource(vec!["맛집 추천", "맛집 지도"]))),
		(SourceType::RelatedSearch, shared(StaticSource(vec!["카페"]))),
	])
}

async fn post_json(app: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
	let request = Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.");
	let response = app.clone().oneshot(request).await.expect("Request failed.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let body = serde_json::from_slice(&bytes).expect("Body is not JSON.");

	(status, body)
}

#[tokio::test]
async fn health_ok() {
	let request =
		Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request.");
	let response = healthy_app().oneshot(request).await.expect("Request failed.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn collect_then_trends_and_analytics() {
	let app = healthy_app();
	let (status, body) = post_json(&app, "/v1/keywords/collect", json!({ "query": "맛집" })).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["success"], json!(true));
	assert_eq!(body["stats"]["total"], json!(3));
	assert_eq!(body["stats"]["perSourceCounts"]["autosuggest"], json!(2));
	assert_eq!(body["data"].as_array().map(Vec::len), Some(3));
	assert!(body["runId"].is_string());

	let (status, body) = post_json(&app, "/v1/keywords/trends", json!({ "query": "맛집" })).await;

	assert_eq!(status, StatusCode::OK);

	let entries = body["entries"].as_array().expect("entries must be an array");

	assert_eq!(entries.len(), 3);
	assert!(entries.iter().all(|entry| entry["state"] == json!("new")));

	let (status, body) =
		post_json(&app, "/v1/keywords/analytics", json!({ "query": "맛집" })).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["analytics"]["runCount"], json!(1));
	assert_eq!(body["analytics"]["keywordTotal"], json!(3));
	assert_eq!(body["chartData"]["issueAnalysis"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn blank_query_is_a_bad_request() {
	let (status, body) =
		post_json(&healthy_app(), "/v1/keywords/collect", json!({ "query": "   " })).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["success"], json!(false));
	assert_eq!(body["errorKind"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn all_sources_down_is_a_bad_gateway() {
	let app = app(vec![
		(SourceType::Autosuggest, shared(DownSource)),
		(SourceType::HotTopics, shared(DownSource)),
	]);
	let (status, body) = post_json(&app, "/v1/keywords/collect", json!({ "query": "맛집" })).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(body["errorKind"], json!("ALL_SOURCES_FAILED"));
	assert_eq!(body["warnings"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn trends_without_history_are_not_found() {
	let (status, body) =
		post_json(&healthy_app(), "/v1/keywords/trends", json!({ "query": "없는 검색어" })).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error_code"], json!("NOT_FOUND"));
	assert!(body["message"].is_string());
}

#[tokio::test]
async fn analytics_without_history_is_empty() {
	let (status, body) =
		post_json(&healthy_app(), "/v1/keywords/analytics", json!({ "query": "빵집" })).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["analytics"]["runCount"], json!(0));
	assert_eq!(body["relatedKeywords"], json!([]));
}
