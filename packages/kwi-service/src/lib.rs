pub mod analytics;
pub mod collect;
pub mod trend;

mod error;

pub use analytics::{
	AnalyticsRequest, AnalyticsResponse, AnalyticsSummary, ChartData, ChartPoint, RelatedKeyword,
	VolumeSummary, summarize,
};
pub use collect::{CollectOptions, CollectRequest, CollectResponse, CollectStats};
pub use error::{Error, ErrorKind, Result};
pub use trend::{TrendEntry, TrendRequest, TrendResponse, TrendState, TrendThresholds, analyze};

use std::sync::Arc;

use kwi_config::Config;
use kwi_domain::{DefaultIntentClassifier, IntentClassifier, RuleIntentClassifier, SourceType};
use kwi_providers::SourceAdapter;
use kwi_storage::SnapshotStore;

/// Adapters in collection order, one per source type.
pub type Sources = Vec<(SourceType, Arc<dyn SourceAdapter>)>;

pub struct KwiService {
	pub cfg: Config,
	pub store: Arc<dyn SnapshotStore>,
	pub sources: Sources,
	pub intent: Arc<dyn IntentClassifier>,
}
impl KwiService {
	/// Wires HTTP adapters for every enabled source section and the configured intent rules.
	pub fn new(cfg: Config, store: Arc<dyn SnapshotStore>) -> Result<Self> {
		let sources = kwi_providers::http_sources(&cfg.sources);
		let intent = intent_classifier(&cfg.analytics)?;

		Ok(Self { cfg, store, sources, intent })
	}

	pub fn with_sources(
		cfg: Config,
		store: Arc<dyn SnapshotStore>,
		sources: Sources,
		intent: Arc<dyn IntentClassifier>,
	) -> Self {
		Self { cfg, store, sources, intent }
	}

	pub(crate) fn adapter(&self, source_type: SourceType) -> Option<Arc<dyn SourceAdapter>> {
		self.sources
			.iter()
			.find(|(candidate, _)| *candidate == source_type)
			.map(|(_, adapter)| adapter.clone())
	}
}

pub fn intent_classifier(cfg: &kwi_config::Analytics) -> Result<Arc<dyn IntentClassifier>> {
	if cfg.intent_rules.is_empty() {
		return Ok(Arc::new(DefaultIntentClassifier));
	}

	let rules = RuleIntentClassifier::from_config(&cfg.intent_rules)
		.map_err(|err| Error::Validation { message: format!("Invalid intent rule: {err}.") })?;

	Ok(Arc::new(rules))
}
