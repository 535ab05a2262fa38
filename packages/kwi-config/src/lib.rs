mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Analytics, Collection, Config, IntentRule, Postgres, SOURCE_KEYS, Service, SourceConfig,
	Sources, StateWeights, Storage, Trend, Worker,
};

use std::{fs, path::Path};

use regex::Regex;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	if let Some(postgres) = cfg.storage.postgres.as_ref() {
		if postgres.dsn.trim().is_empty() {
			return Err(Error::Validation {
				message: "storage.postgres.dsn must be non-empty.".to_string(),
			});
		}
		if postgres.pool_max_conns == 0 {
			return Err(Error::Validation {
				message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
			});
		}
	}

	for (key, source) in cfg.sources.enabled() {
		if source.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("sources.{key}.api_base must be non-empty when enabled."),
			});
		}
		if source.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("sources.{key}.timeout_ms must be greater than zero."),
			});
		}
	}

	validate_collection(&cfg.collection)?;

	if !cfg.trend.volume_change_ratio.is_finite() || cfg.trend.volume_change_ratio < 0.0 {
		return Err(Error::Validation {
			message: "trend.volume_change_ratio must be a finite number, zero or greater."
				.to_string(),
		});
	}

	validate_analytics(&cfg.analytics)?;

	if let Some(worker) = cfg.worker.as_ref() {
		if worker.interval_seconds == 0 {
			return Err(Error::Validation {
				message: "worker.interval_seconds must be greater than zero.".to_string(),
			});
		}
		if worker.queries.iter().any(|query| query.trim().is_empty()) {
			return Err(Error::Validation {
				message: "worker.queries must not contain empty queries.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_collection(collection: &Collection) -> Result<()> {
	if collection.source_types.is_empty() {
		return Err(Error::Validation {
			message: "collection.source_types must be non-empty.".to_string(),
		});
	}

	for source_type in &collection.source_types {
		if !SOURCE_KEYS.contains(&source_type.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"collection.source_types entry {source_type:?} must be one of autosuggest, related_search, together_searched, or hot_topics."
				),
			});
		}
	}

	for (label, value) in [
		("collection.max_pages_per_module", u64::from(collection.max_pages_per_module)),
		("collection.concurrency", u64::from(collection.concurrency)),
		("collection.max_attempts", u64::from(collection.max_attempts)),
		("collection.wait_timeout_ms", collection.wait_timeout_ms),
	] {
		if value == 0 {
			return Err(Error::Validation { message: format!("{label} must be greater than zero.") });
		}
	}

	if collection.sleep_min_ms > collection.sleep_max_ms {
		return Err(Error::Validation {
			message: "collection.sleep_min_ms must be less than or equal to collection.sleep_max_ms."
				.to_string(),
		});
	}
	// Room for at least one character plus the ellipsis marker.
	if collection.max_keyword_chars < 2 {
		return Err(Error::Validation {
			message: "collection.max_keyword_chars must be at least 2.".to_string(),
		});
	}

	Ok(())
}

fn validate_analytics(analytics: &Analytics) -> Result<()> {
	if analytics.top_n == 0 {
		return Err(Error::Validation {
			message: "analytics.top_n must be greater than zero.".to_string(),
		});
	}
	if analytics.window_days <= 0 {
		return Err(Error::Validation {
			message: "analytics.window_days must be greater than zero.".to_string(),
		});
	}
	if !analytics.rank_weight.is_finite() || analytics.rank_weight < 0.0 {
		return Err(Error::Validation {
			message: "analytics.rank_weight must be a finite number, zero or greater.".to_string(),
		});
	}
	if !analytics.default_pc_ratio.is_finite()
		|| !(0.0..=1.0).contains(&analytics.default_pc_ratio)
	{
		return Err(Error::Validation {
			message: "analytics.default_pc_ratio must be in the range 0.0-1.0.".to_string(),
		});
	}

	let weights = &analytics.state_weights;

	for (label, weight) in [
		("new", weights.new),
		("rising", weights.rising),
		("stable", weights.stable),
		("falling", weights.falling),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("analytics.state_weights.{label} must be a finite number."),
			});
		}
	}

	for rule in &analytics.intent_rules {
		if rule.label.trim().is_empty() {
			return Err(Error::Validation {
				message: "analytics.intent_rules.label must be non-empty.".to_string(),
			});
		}
		if rule.patterns.is_empty() {
			return Err(Error::Validation {
				message: format!(
					"analytics.intent_rules entry {:?} must have at least one pattern.",
					rule.label
				),
			});
		}

		for pattern in &rule.patterns {
			Regex::new(pattern).map_err(|err| Error::IntentPattern {
				label: rule.label.clone(),
				pattern: pattern.clone(),
				source: err,
			})?;
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let sources = &mut cfg.sources;

	for source in [
		sources.autosuggest.as_mut(),
		sources.related_search.as_mut(),
		sources.together_searched.as_mut(),
		sources.hot_topics.as_mut(),
	]
	.into_iter()
	.flatten()
	{
		if source.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
			source.api_key = None;
		}
	}

	cfg.collection.source_types =
		cfg.collection.source_types.iter().map(|value| value.trim().to_ascii_lowercase()).collect();

	if let Some(worker) = cfg.worker.as_mut() {
		worker.queries = worker.queries.iter().map(|query| query.trim().to_string()).collect();
	}
}
