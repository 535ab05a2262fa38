use serde::Deserialize;
use serde_json::{Map, Value};

/// Config keys of the source sections, in collection order.
pub const SOURCE_KEYS: [&str; 4] =
	["autosuggest", "related_search", "together_searched", "hot_topics"];

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub storage: Storage,
	pub sources: Sources,
	#[serde(default)]
	pub collection: Collection,
	#[serde(default)]
	pub trend: Trend,
	#[serde(default)]
	pub analytics: Analytics,
	pub worker: Option<Worker>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Storage {
	/// Optional. Without it runs are kept in process memory only.
	pub postgres: Option<Postgres>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Sources {
	pub autosuggest: Option<SourceConfig>,
	pub related_search: Option<SourceConfig>,
	pub together_searched: Option<SourceConfig>,
	pub hot_topics: Option<SourceConfig>,
}
impl Sources {
	pub fn get(&self, key: &str) -> Option<&SourceConfig> {
		match key {
			"autosuggest" => self.autosuggest.as_ref(),
			"related_search" => self.related_search.as_ref(),
			"together_searched" => self.together_searched.as_ref(),
			"hot_topics" => self.hot_topics.as_ref(),
			_ => None,
		}
	}

	pub fn enabled(&self) -> impl Iterator<Item = (&'static str, &SourceConfig)> {
		SOURCE_KEYS
			.into_iter()
			.filter_map(|key| self.get(key).filter(|source| source.enabled).map(|cfg| (key, cfg)))
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct SourceConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub api_base: String,
	pub path: String,
	pub api_key: Option<String>,
	#[serde(default = "default_source_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Collection {
	pub source_types: Vec<String>,
	pub max_pages_per_module: u32,
	/// Concurrent source fetches per run.
	pub concurrency: u32,
	/// Total attempts per source, first call included.
	pub max_attempts: u32,
	pub sleep_min_ms: u64,
	pub sleep_max_ms: u64,
	pub wait_timeout_ms: u64,
	pub max_keyword_chars: u32,
}
impl Default for Collection {
	fn default() -> Self {
		Self {
			source_types: SOURCE_KEYS.iter().map(|key| key.to_string()).collect(),
			max_pages_per_module: 1,
			concurrency: 3,
			max_attempts: 3,
			sleep_min_ms: 300,
			sleep_max_ms: 1_200,
			wait_timeout_ms: 30_000,
			max_keyword_chars: 80,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Trend {
	pub rank_delta_threshold: u32,
	/// Relative change, e.g. 0.1 means a 10% move in total volume.
	pub volume_change_ratio: f64,
}
impl Default for Trend {
	fn default() -> Self {
		Self { rank_delta_threshold: 1, volume_change_ratio: 0.1 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Analytics {
	pub top_n: u32,
	pub window_days: i64,
	pub rank_weight: f64,
	pub default_pc_ratio: f64,
	pub state_weights: StateWeights,
	pub intent_rules: Vec<IntentRule>,
}
impl Default for Analytics {
	fn default() -> Self {
		Self {
			top_n: 20,
			window_days: 30,
			rank_weight: 1.0,
			default_pc_ratio: 0.5,
			state_weights: StateWeights::default(),
			intent_rules: Vec::new(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StateWeights {
	pub new: f64,
	pub rising: f64,
	pub stable: f64,
	pub falling: f64,
}
impl Default for StateWeights {
	fn default() -> Self {
		Self { new: 0.3, rising: 0.5, stable: 0.0, falling: -0.2 }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct IntentRule {
	pub label: String,
	pub patterns: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Worker {
	pub queries: Vec<String>,
	#[serde(default = "default_interval_seconds")]
	pub interval_seconds: u64,
}

fn default_true() -> bool {
	true
}

fn default_source_timeout_ms() -> u64 {
	5_000
}

fn default_interval_seconds() -> u64 {
	3_600
}
