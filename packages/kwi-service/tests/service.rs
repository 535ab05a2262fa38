use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU32, AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};

use time::{Duration, OffsetDateTime};

use kwi_config::{Analytics, Collection, Config, Service, Sources, Storage, Trend};
use kwi_domain::{DefaultIntentClassifier, RawEntry, SearchVolume, SourceType, WarningKind};
use kwi_providers::{BoxFuture, FetchOptions, SourceAdapter};
use kwi_service::{
	AnalyticsRequest, CollectOptions, CollectRequest, ErrorKind, KwiService, TrendRequest,
	TrendState,
};
use kwi_storage::{MemorySnapshotStore, SnapshotStore};

struct StaticSource {
	entries: Vec<RawEntry>,
	calls: AtomicU32,
}
impl StaticSource {
	fn new(texts: &[&str]) -> Self {
		Self { entries: entries(texts), calls: AtomicU32::new(0) }
	}
}
impl SourceAdapter for StaticSource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		_source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move { Ok(self.entries.clone()) })
	}
}

/// Fails every call, transiently or permanently.
struct FailingSource {
	retryable: bool,
	calls: AtomicU32,
}
impl FailingSource {
	fn new(retryable: bool) -> Self {
		Self { retryable, calls: AtomicU32::new(0) }
	}
}
impl SourceAdapter for FailingSource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let message = "fake failure".to_string();
		let err = if self.retryable {
			kwi_providers::Error::SourceUnavailable { source_type, message }
		} else {
			kwi_providers::Error::SourceMalformed { source_type, message }
		};

		Box::pin(async move { Err(err) })
	}
}

/// Fails transiently a fixed number of times, then succeeds.
struct FlakySource {
	failures_left: AtomicU32,
	calls: AtomicU32,
	entries: Vec<RawEntry>,
}
impl SourceAdapter for FlakySource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let failing = self
			.failures_left
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
			.is_ok();

		Box::pin(async move {
			if failing {
				return Err(kwi_providers::Error::SourceUnavailable {
					source_type,
					message: "flaky".to_string(),
				});
			}

			Ok(self.entries.clone())
		})
	}
}

struct SlowSource {
	delay: StdDuration,
	entries: Vec<RawEntry>,
	in_flight: Arc<AtomicUsize>,
	max_in_flight: Arc<AtomicUsize>,
}
impl SlowSource {
	fn new(delay_ms: u64, texts: &[&str]) -> Self {
		Self {
			delay: StdDuration::from_millis(delay_ms),
			entries: entries(texts),
			in_flight: Arc::new(AtomicUsize::new(0)),
			max_in_flight: Arc::new(AtomicUsize::new(0)),
		}
	}
}
impl SourceAdapter for SlowSource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		_source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		Box::pin(async move {
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.max_in_flight.fetch_max(now, Ordering::SeqCst);
			tokio::time::sleep(self.delay).await;
			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			Ok(self.entries.clone())
		})
	}
}

/// Plays back one scripted response per call. `None` is a malformed response; an exhausted script
/// returns nothing.
struct ScriptedSource {
	script: Mutex<VecDeque<Option<Vec<RawEntry>>>>,
}
impl ScriptedSource {
	fn new(script: Vec<Option<Vec<RawEntry>>>) -> Self {
		Self { script: Mutex::new(script.into()) }
	}
}
impl SourceAdapter for ScriptedSource {
	fn fetch<'a>(
		&'a self,
		_query: &'a str,
		source_type: SourceType,
		_options: &'a FetchOptions,
	) -> BoxFuture<'a, kwi_providers::Result<Vec<RawEntry>>> {
		let next = self.script.lock().expect("script lock poisoned").pop_front();

		Box::pin(async move {
			match next {
				Some(Some(entries)) => Ok(entries),
				Some(None) => Err(kwi_providers::Error::SourceMalformed {
					source_type,
					message: "scripted failure".to_string(),
				}),
				None => Ok(Vec::new()),
			}
		})
	}
}

fn shared<S: SourceAdapter + 'static>(source: Arc<S>) -> Arc<dyn SourceAdapter> {
	source
}

fn entries(texts: &[&str]) -> Vec<RawEntry> {
	texts.iter().map(|text| RawEntry::new(*text)).collect()
}

fn config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage::default(),
		sources: Sources::default(),
		collection: Collection {
			sleep_min_ms: 0,
			sleep_max_ms: 0,
			wait_timeout_ms: 5_000,
			..Collection::default()
		},
		trend: Trend::default(),
		analytics: Analytics::default(),
		worker: None,
	}
}

fn service(
	cfg: Config,
	store: &MemorySnapshotStore,
	sources: Vec<(SourceType, Arc<dyn SourceAdapter>)>,
) -> KwiService {
	KwiService::with_sources(
		cfg,
		Arc::new(store.clone()),
		sources,
		Arc::new(DefaultIntentClassifier),
	)
}

fn t0() -> OffsetDateTime {
	OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)
}

#[tokio::test]
async fn one_failing_source_degrades_to_a_warning() {
	let store = MemorySnapshotStore::new();
	let failing = Arc::new(FailingSource::new(true));
	let svc = service(
		config(),
		&store,
		vec![
			(
				SourceType::Autosuggest,
				shared(Arc::new(StaticSource::new(&["맛집 추천", "맛집 지도"]))),
			),
			(SourceType::RelatedSearch, shared(Arc::new(StaticSource::new(&["카페"])))),
			(SourceType::HotTopics, shared(failing.clone())),
		],
	);
	let response = svc.collect(CollectRequest::new("맛집")).await;

	assert!(response.success, "{:?}", response.error);
	assert_eq!(response.stats.per_source_counts.get(&SourceType::HotTopics), Some(&0));
	assert_eq!(response.stats.per_source_counts.get(&SourceType::Autosuggest), Some(&2));
	assert_eq!(response.stats.total, 3);
	assert_eq!(response.warnings.len(), 1);
	assert_eq!(response.warnings[0].source_type, SourceType::HotTopics);
	assert_eq!(response.warnings[0].kind, WarningKind::SourceUnavailable);
	assert_eq!(response.warnings[0].attempts, 3);
	assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
	assert!(response.data.iter().any(|record| record.source_type == SourceType::Autosuggest));
	assert!(response.data.iter().any(|record| record.source_type == SourceType::RelatedSearch));
	assert!(response.run_id.is_some());

	let stored = store
		.load_latest("맛집", None, None)
		.await
		.expect("load failed")
		.expect("run must be committed");

	assert_eq!(stored.records.len(), 3);
	assert_eq!(stored.warnings, response.warnings);
	assert_eq!(
		stored.sources,
		vec![SourceType::Autosuggest, SourceType::RelatedSearch, SourceType::HotTopics]
	);
}

#[tokio::test]
async fn malformed_response_is_not_retried() {
	let store = MemorySnapshotStore::new();
	let malformed = Arc::new(FailingSource::new(false));
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(Arc::new(StaticSource::new(&["a"])))),
			(SourceType::RelatedSearch, shared(malformed.clone())),
		],
	);
	let response = svc.collect(CollectRequest::new("q")).await;

	assert!(response.success);
	assert_eq!(malformed.calls.load(Ordering::SeqCst), 1);
	assert_eq!(response.warnings[0].kind, WarningKind::SourceMalformed);
	assert_eq!(response.warnings[0].attempts, 1);
}

#[tokio::test]
async fn flaky_source_recovers_within_its_attempts() {
	let store = MemorySnapshotStore::new();
	let flaky = Arc::new(FlakySource {
		failures_left: AtomicU32::new(2),
		calls: AtomicU32::new(0),
		entries: entries(&["빵집"]),
	});
	let svc = service(config(), &store, vec![(SourceType::Autosuggest, shared(flaky.clone()))]);
	let response = svc.collect(CollectRequest::new("q")).await;

	assert!(response.success);
	assert!(response.warnings.is_empty());
	assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
	assert_eq!(response.data[0].text, "빵집");
}

#[tokio::test]
async fn all_sources_failing_records_a_failed_attempt() {
	let store = MemorySnapshotStore::new();
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(Arc::new(FailingSource::new(true)))),
			(SourceType::RelatedSearch, shared(Arc::new(FailingSource::new(false)))),
		],
	);
	let response = svc.collect(CollectRequest::new("q")).await;

	assert!(!response.success);
	assert_eq!(response.error_kind, Some(ErrorKind::AllSourcesFailed));
	assert!(response.data.is_empty());
	assert_eq!(response.warnings.len(), 2);
	assert_eq!(store.failure_count("q"), 1);
	assert!(store.load_latest("q", None, None).await.expect("load failed").is_none());
}

#[tokio::test]
async fn timeout_keeps_partial_results() {
	let store = MemorySnapshotStore::new();
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(Arc::new(StaticSource::new(&["a", "b"])))),
			(SourceType::HotTopics, shared(Arc::new(SlowSource::new(10_000, &["late"])))),
		],
	);
	let options = CollectOptions { wait_timeout_ms: Some(200), ..CollectOptions::default() };
	let response = svc.collect(CollectRequest::new("q").with_options(options)).await;

	assert!(response.success);
	assert_eq!(response.stats.total, 2);
	assert_eq!(response.stats.per_source_counts.get(&SourceType::HotTopics), Some(&0));
	assert_eq!(response.warnings.len(), 1);
	assert_eq!(response.warnings[0].kind, WarningKind::Timeout);
	assert!(response.stats.duration_ms < 5_000);
}

#[tokio::test]
async fn timeout_before_any_source_finishes_fails_the_run() {
	let store = MemorySnapshotStore::new();
	let svc = service(
		config(),
		&store,
		vec![(SourceType::Autosuggest, shared(Arc::new(SlowSource::new(10_000, &["late"]))))],
	);
	let options = CollectOptions { wait_timeout_ms: Some(100), ..CollectOptions::default() };
	let response = svc.collect(CollectRequest::new("q").with_options(options)).await;

	assert!(!response.success);
	assert_eq!(response.error_kind, Some(ErrorKind::Timeout));
	assert_eq!(store.failure_count("q"), 1);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_fetching() {
	let store = MemorySnapshotStore::new();
	let source = Arc::new(StaticSource::new(&["a"]));
	let svc = service(config(), &store, vec![(SourceType::Autosuggest, shared(source.clone()))]);
	let blank = svc.collect(CollectRequest::new("   ")).await;
	let unknown = svc
		.collect(CollectRequest::new("q").with_options(CollectOptions {
			source_types: Some(vec!["shopping".to_string()]),
			..CollectOptions::default()
		}))
		.await;
	let disabled = svc
		.collect(CollectRequest::new("q").with_options(CollectOptions {
			source_types: Some(vec!["hotTopics".to_string()]),
			..CollectOptions::default()
		}))
		.await;
	let inverted_sleep = svc
		.collect(CollectRequest::new("q").with_options(CollectOptions {
			sleep_min_ms: Some(500),
			sleep_max_ms: Some(100),
			..CollectOptions::default()
		}))
		.await;

	for response in [blank, unknown, disabled, inverted_sleep] {
		assert!(!response.success);
		assert_eq!(response.error_kind, Some(ErrorKind::ValidationError));
	}

	assert_eq!(source.calls.load(Ordering::SeqCst), 0);
	assert_eq!(store.failure_count("q"), 0);
}

#[tokio::test]
async fn requested_source_types_limit_the_fan_out() {
	let store = MemorySnapshotStore::new();
	let autosuggest = Arc::new(StaticSource::new(&["a"]));
	let related = Arc::new(StaticSource::new(&["b"]));
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(autosuggest.clone())),
			(SourceType::RelatedSearch, shared(related.clone())),
		],
	);
	let response = svc
		.collect(CollectRequest::new("q").with_options(CollectOptions {
			source_types: Some(vec!["related_search".to_string()]),
			..CollectOptions::default()
		}))
		.await;

	assert!(response.success);
	assert_eq!(autosuggest.calls.load(Ordering::SeqCst), 0);
	assert_eq!(related.calls.load(Ordering::SeqCst), 1);
	assert_eq!(response.stats.per_source_counts.len(), 1);
}

#[tokio::test]
async fn concurrency_is_bounded() {
	let store = MemorySnapshotStore::new();
	let in_flight = Arc::new(AtomicUsize::new(0));
	let max_in_flight = Arc::new(AtomicUsize::new(0));
	let source = |text: &str| -> Arc<dyn SourceAdapter> {
		let mut slow = SlowSource::new(50, &[text]);

		slow.in_flight = in_flight.clone();
		slow.max_in_flight = max_in_flight.clone();

		Arc::new(slow)
	};
	let mut cfg = config();

	cfg.collection.concurrency = 2;

	let svc = service(
		cfg,
		&store,
		vec![
			(SourceType::Autosuggest, source("a")),
			(SourceType::RelatedSearch, source("b")),
			(SourceType::TogetherSearched, source("c")),
			(SourceType::HotTopics, source("d")),
		],
	);
	let response = svc.collect(CollectRequest::new("q")).await;

	assert!(response.success);
	assert_eq!(response.stats.total, 4);
	assert!(max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn completion_order_does_not_change_records() {
	let at = t0();
	let run = |autosuggest_delay: u64, related_delay: u64| async move {
		let store = MemorySnapshotStore::new();
		let svc = service(
			config(),
			&store,
			vec![
				(
					SourceType::Autosuggest,
					shared(Arc::new(SlowSource::new(autosuggest_delay, &["맛집", "빵집", "맛집"]))),
				),
				(
					SourceType::RelatedSearch,
					shared(Arc::new(SlowSource::new(related_delay, &["맛집", "카페"]))),
				),
			],
		);

		svc.collect_at(CollectRequest::new("q"), at).await.data
	};
	let fast_first = run(0, 80).await;
	let slow_first = run(80, 0).await;

	assert_eq!(fast_first, slow_first);
	assert_eq!(fast_first.len(), 4);
}

#[tokio::test]
async fn trends_follow_consecutive_runs() {
	let store = MemorySnapshotStore::new();
	let script = ScriptedSource::new(vec![
		Some(entries(&["카페", "맛집"])),
		Some(entries(&["맛집", "빵집", "카페"])),
	]);
	let svc = service(config(), &store, vec![(SourceType::Autosuggest, shared(Arc::new(script)))]);
	let t1 = t0() + Duration::hours(1);

	assert!(svc.collect_at(CollectRequest::new("q"), t0()).await.success);
	assert!(svc.collect_at(CollectRequest::new("q"), t1).await.success);

	let first = svc
		.trends(TrendRequest { query: "q".to_string(), at: Some(t0()) })
		.await
		.expect("trends failed");

	assert!(first.entries.iter().all(|entry| entry.state == TrendState::New));
	assert!(first.priors.is_empty());

	let latest =
		svc.trends(TrendRequest { query: "q".to_string(), at: None }).await.expect("trends failed");
	let states: Vec<_> =
		latest.entries.iter().map(|entry| (entry.text.as_str(), entry.state)).collect();

	assert_eq!(latest.collected_at, t1);
	assert_eq!(
		states,
		vec![("맛집", TrendState::Rising), ("빵집", TrendState::New), ("카페", TrendState::Falling)]
	);
}

#[tokio::test]
async fn failed_source_is_compared_with_its_last_good_run() {
	let store = MemorySnapshotStore::new();
	let autosuggest = ScriptedSource::new(vec![
		Some(entries(&["a"])),
		Some(entries(&["a"])),
		Some(entries(&["a"])),
	]);
	let hot_topics =
		ScriptedSource::new(vec![Some(entries(&["이슈"])), None, Some(entries(&["이슈"]))]);
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(Arc::new(autosuggest))),
			(SourceType::HotTopics, shared(Arc::new(hot_topics))),
		],
	);
	let t1 = t0() + Duration::hours(1);
	let t2 = t0() + Duration::hours(2);

	assert!(svc.collect_at(CollectRequest::new("q"), t0()).await.success);
	assert!(svc.collect_at(CollectRequest::new("q"), t1).await.success);

	let degraded = svc
		.trends(TrendRequest { query: "q".to_string(), at: Some(t1) })
		.await
		.expect("trends failed");

	assert!(degraded.entries.iter().all(|entry| entry.source_type == SourceType::Autosuggest));
	assert!(degraded.entries.iter().all(|entry| entry.state != TrendState::Disappeared));

	assert!(svc.collect_at(CollectRequest::new("q"), t2).await.success);

	let recovered =
		svc.trends(TrendRequest { query: "q".to_string(), at: None }).await.expect("trends failed");
	let hot_prior = recovered
		.priors
		.iter()
		.find(|prior| prior.source_type == SourceType::HotTopics)
		.expect("hot topics must have a prior run");

	assert_eq!(hot_prior.collected_at, t0());
	assert!(recovered.entries.iter().all(|entry| entry.state == TrendState::Stable));
}

#[tokio::test]
async fn skipped_source_is_neither_disappeared_nor_new() {
	let store = MemorySnapshotStore::new();
	let related = Arc::new(StaticSource::new(&["r1", "r2"]));
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(Arc::new(StaticSource::new(&["a"])))),
			(SourceType::RelatedSearch, shared(related.clone())),
		],
	);
	let t1 = t0() + Duration::hours(1);
	let t2 = t0() + Duration::hours(2);
	let autosuggest_only = CollectOptions {
		source_types: Some(vec!["autosuggest".to_string()]),
		..CollectOptions::default()
	};

	assert!(svc.collect_at(CollectRequest::new("q"), t0()).await.success);
	assert!(
		svc.collect_at(CollectRequest::new("q").with_options(autosuggest_only), t1)
			.await
			.success
	);
	assert_eq!(related.calls.load(Ordering::SeqCst), 1);

	let subset = svc
		.trends(TrendRequest { query: "q".to_string(), at: Some(t1) })
		.await
		.expect("trends failed");
	let states: Vec<_> = subset
		.entries
		.iter()
		.map(|entry| (entry.source_type, entry.text.as_str(), entry.state))
		.collect();

	assert_eq!(states, vec![(SourceType::Autosuggest, "a", TrendState::Stable)]);

	assert!(svc.collect_at(CollectRequest::new("q"), t2).await.success);

	let full =
		svc.trends(TrendRequest { query: "q".to_string(), at: None }).await.expect("trends failed");
	let related_prior = full
		.priors
		.iter()
		.find(|prior| prior.source_type == SourceType::RelatedSearch)
		.expect("related searches must have a prior run");

	assert_eq!(related_prior.collected_at, t0());
	assert_eq!(full.entries.len(), 3);
	assert!(full.entries.iter().all(|entry| entry.state == TrendState::Stable));
}

#[tokio::test]
async fn emptied_source_reports_disappeared() {
	let store = MemorySnapshotStore::new();
	let hot_topics = ScriptedSource::new(vec![Some(entries(&["이슈"])), Some(Vec::new())]);
	let svc = service(
		config(),
		&store,
		vec![
			(SourceType::Autosuggest, shared(Arc::new(StaticSource::new(&["a"])))),
			(SourceType::HotTopics, shared(Arc::new(hot_topics))),
		],
	);
	let t1 = t0() + Duration::hours(1);

	assert!(svc.collect_at(CollectRequest::new("q"), t0()).await.success);
	assert!(svc.collect_at(CollectRequest::new("q"), t1).await.success);

	let latest =
		svc.trends(TrendRequest { query: "q".to_string(), at: None }).await.expect("trends failed");
	let gone: Vec<_> = latest
		.entries
		.iter()
		.filter(|entry| entry.state == TrendState::Disappeared)
		.map(|entry| (entry.source_type, entry.text.as_str()))
		.collect();

	assert_eq!(gone, vec![(SourceType::HotTopics, "이슈")]);
}

#[tokio::test]
async fn trends_without_history_is_not_found() {
	let store = MemorySnapshotStore::new();
	let svc = service(config(), &store, Vec::new());
	let err = svc
		.trends(TrendRequest { query: "nothing".to_string(), at: None })
		.await
		.expect_err("no run exists");

	assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn analytics_roll_up_runs_in_the_window() {
	let store = MemorySnapshotStore::new();
	let script = ScriptedSource::new(vec![
		Some(vec![
			RawEntry::new("맛집").with_volume(SearchVolume::new(100, 300)),
			RawEntry::new("카페").with_volume(SearchVolume::new(50, 50)),
		]),
		Some(vec![
			RawEntry::new("카페").with_volume(SearchVolume::new(100, 100)),
			RawEntry::new("맛집").with_volume(SearchVolume::new(100, 300)),
			RawEntry::new("빵집"),
		]),
	]);
	let svc = service(config(), &store, vec![(SourceType::Autosuggest, shared(Arc::new(script)))]);
	let t1 = t0() + Duration::days(1);

	assert!(svc.collect_at(CollectRequest::new("q"), t0()).await.success);
	assert!(svc.collect_at(CollectRequest::new("q"), t1).await.success);

	let response = svc
		.analytics(AnalyticsRequest {
			query: "q".to_string(),
			from: Some(t0() - Duration::days(1)),
			to: Some(t1 + Duration::days(1)),
		})
		.await
		.expect("analytics failed");
	let summary = &response.analytics;

	assert_eq!(summary.run_count, 2);
	assert_eq!(summary.keyword_total, 3);
	assert_eq!(summary.unique_keywords, 3);
	assert_eq!(summary.volume.as_ref().map(|volume| volume.total), Some(600));
	assert_eq!(summary.per_state_counts.get(&TrendState::New), Some(&1));
	assert_eq!(summary.per_state_counts.get(&TrendState::Rising), Some(&1));
	assert_eq!(summary.per_state_counts.get(&TrendState::Falling), Some(&1));
	assert_eq!(response.chart_data.search_trends.len(), 2);
	assert_eq!(response.chart_data.search_trends[0].value, 500.0);
	assert_eq!(response.related_keywords[0].text, "카페");
	assert!(response.related_keywords.iter().all(|keyword| keyword.intent == "unknown"));

	let json = serde_json::to_value(&response).expect("serialize failed");

	for series in
		["searchTrends", "monthlyRatios", "weekdayRatios", "issueAnalysis", "intentAnalysis"]
	{
		assert!(json["chartData"][series].is_array(), "missing {series}");
	}
	assert!(json["relatedKeywords"].is_array());
}

#[tokio::test]
async fn analytics_without_runs_is_empty() {
	let store = MemorySnapshotStore::new();
	let svc = service(config(), &store, Vec::new());
	let response = svc
		.analytics(AnalyticsRequest { query: "q".to_string(), from: None, to: None })
		.await
		.expect("analytics failed");

	assert_eq!(response.analytics.run_count, 0);
	assert!(response.related_keywords.is_empty());
}
