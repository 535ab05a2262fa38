pub mod autosuggest;
pub mod listing;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use rand::Rng;
use reqwest::{
	Client, Response, StatusCode,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

use kwi_config::SourceConfig;
use kwi_domain::{RawEntry, SourceType};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone, Debug)]
pub struct FetchOptions {
	pub max_pages: u32,
	/// Jitter bounds between page requests, in milliseconds.
	pub sleep_min_ms: u64,
	pub sleep_max_ms: u64,
	/// PC share assumed when a source reports only a total volume.
	pub default_pc_ratio: f64,
}
impl Default for FetchOptions {
	fn default() -> Self {
		Self {
			max_pages: 1,
			sleep_min_ms: 0,
			sleep_max_ms: 0,
			default_pc_ratio: kwi_domain::DEFAULT_PC_RATIO,
		}
	}
}

/// Fetches raw keyword candidates for one query from one external source.
pub trait SourceAdapter
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		query: &'a str,
		source_type: SourceType,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<Vec<RawEntry>>>;
}

/// HTTP adapter for one configured source section.
#[derive(Clone, Debug)]
pub struct HttpSource {
	cfg: SourceConfig,
}
impl HttpSource {
	pub fn new(cfg: SourceConfig) -> Self {
		Self { cfg }
	}
}
impl SourceAdapter for HttpSource {
	fn fetch<'a>(
		&'a self,
		query: &'a str,
		source_type: SourceType,
		options: &'a FetchOptions,
	) -> BoxFuture<'a, Result<Vec<RawEntry>>> {
		match source_type {
			SourceType::Autosuggest => Box::pin(autosuggest::fetch(&self.cfg, query)),
			_ => Box::pin(listing::fetch(&self.cfg, source_type, query, options)),
		}
	}
}

/// One HTTP adapter per enabled source section, in collection order.
pub fn http_sources(sources: &kwi_config::Sources) -> Vec<(SourceType, Arc<dyn SourceAdapter>)> {
	sources
		.enabled()
		.map(|(key, cfg)| {
			let adapter: Arc<dyn SourceAdapter> = Arc::new(HttpSource::new(cfg.clone()));

			(SourceType::parse(key), adapter)
		})
		.collect()
}

pub fn auth_headers(
	api_key: Option<&str>,
	default_headers: &Map<String, Value>,
) -> std::result::Result<HeaderMap, String> {
	let mut headers = HeaderMap::new();

	if let Some(api_key) = api_key {
		headers.insert(
			AUTHORIZATION,
			format!("Bearer {api_key}").parse().map_err(|err| format!("{err}"))?,
		);
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err("Default header values must be strings.".to_string());
		};

		headers.insert(
			HeaderName::from_bytes(key.as_bytes()).map_err(|err| format!("{err}"))?,
			raw.parse().map_err(|err| format!("{err}"))?,
		);
	}

	Ok(headers)
}

/// Uniform delay in `[min_ms, max_ms]`.
pub fn jitter(min_ms: u64, max_ms: u64) -> Duration {
	if max_ms <= min_ms {
		return Duration::from_millis(min_ms);
	}

	Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

pub(crate) fn build_client(cfg: &SourceConfig, source_type: SourceType) -> Result<Client> {
	let headers = auth_headers(cfg.api_key.as_deref(), &cfg.default_headers)
		.map_err(|message| Error::InvalidConfig { source_type, message })?;

	Client::builder()
		.timeout(Duration::from_millis(cfg.timeout_ms))
		.default_headers(headers)
		.build()
		.map_err(|err| Error::InvalidConfig { source_type, message: err.to_string() })
}

pub(crate) fn request_error(source_type: SourceType, err: reqwest::Error) -> Error {
	if err.is_decode() {
		return Error::SourceMalformed { source_type, message: err.to_string() };
	}

	Error::SourceUnavailable { source_type, message: err.to_string() }
}

/// Reads a JSON body, classifying HTTP failures as transient or permanent.
pub(crate) async fn read_json(source_type: SourceType, res: Response) -> Result<Value> {
	let status = res.status();

	if !status.is_success() {
		let message = format!("HTTP status {status}.");

		if status.is_server_error()
			|| status == StatusCode::TOO_MANY_REQUESTS
			|| status == StatusCode::REQUEST_TIMEOUT
		{
			return Err(Error::SourceUnavailable { source_type, message });
		}

		return Err(Error::SourceMalformed { source_type, message });
	}

	let body = res.bytes().await.map_err(|err| request_error(source_type, err))?;

	serde_json::from_slice(&body).map_err(|err| Error::SourceMalformed {
		source_type,
		message: format!("Response is not valid JSON: {err}."),
	})
}
