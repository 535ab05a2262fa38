use serde_json::Value;

use kwi_config::SourceConfig;
use kwi_domain::{RawEntry, SourceType};

use crate::{Error, Result};

const SOURCE: SourceType = SourceType::Autosuggest;

/// Queries the search engine's suggestion endpoint. Suggestions come back in one response, so
/// paging options do not apply.
pub async fn fetch(cfg: &SourceConfig, query: &str) -> Result<Vec<RawEntry>> {
	let client = crate::build_client(cfg, SOURCE)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.get(url)
		.query(&[
			("q", query),
			("st", "100"),
			("r_format", "json"),
			("q_enc", "UTF-8"),
			("r_enc", "UTF-8"),
		])
		.send()
		.await
		.map_err(|err| crate::request_error(SOURCE, err))?;
	let json = crate::read_json(SOURCE, res).await?;

	parse_autosuggest_response(json)
}

/// Expects `{"items": [[["keyword", ...], ...], ...]}`; the outer index is the suggestion group.
fn parse_autosuggest_response(json: Value) -> Result<Vec<RawEntry>> {
	let groups = json.get("items").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::SourceMalformed {
			source_type: SOURCE,
			message: "Autosuggest response is missing items array.".to_string(),
		}
	})?;
	let mut entries = Vec::new();

	for (group, items) in groups.iter().enumerate() {
		let items = items.as_array().ok_or_else(|| Error::SourceMalformed {
			source_type: SOURCE,
			message: "Autosuggest group must be an array.".to_string(),
		})?;

		for item in items {
			let text = match item {
				Value::Array(fields) => fields.first().and_then(|v| v.as_str()),
				Value::String(text) => Some(text.as_str()),
				_ => None,
			};
			let Some(text) = text else {
				return Err(Error::SourceMalformed {
					source_type: SOURCE,
					message: "Autosuggest item is missing keyword text.".to_string(),
				});
			};

			entries.push(RawEntry::new(text).with_group(group as u32));
		}
	}

	Ok(entries)
}
