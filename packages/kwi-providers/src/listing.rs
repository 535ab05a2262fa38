//! Paged keyword listings: related searches, together-searched clusters, and hot topics.

use std::future::Future;

use serde_json::Value;

use kwi_config::SourceConfig;
use kwi_domain::{RawEntry, SearchVolume, SourceType};

use crate::{Error, FetchOptions, Result};

struct ListingPage {
	entries: Vec<RawEntry>,
	has_more: bool,
}

pub async fn fetch(
	cfg: &SourceConfig,
	source_type: SourceType,
	query: &str,
	options: &FetchOptions,
) -> Result<Vec<RawEntry>> {
	let client = crate::build_client(cfg, source_type)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);

	collect_pages(source_type, options, |page| {
		let request = client
			.get(&url)
			.query(&[("query", query), ("page", page.to_string().as_str())]);

		async move {
			let res = request.send().await.map_err(|err| crate::request_error(source_type, err))?;
			let json = crate::read_json(source_type, res).await?;

			parse_listing_page(source_type, json, options.default_pc_ratio)
		}
	})
	.await
}

/// Walks pages until one reports no more items or `max_pages` is reached. A failure on the first
/// page fails the source; a failure on a later page keeps what the earlier pages returned.
async fn collect_pages<F, Fut>(
	source_type: SourceType,
	options: &FetchOptions,
	mut fetch_page: F,
) -> Result<Vec<RawEntry>>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<ListingPage>>,
{
	let mut entries = Vec::new();

	for page in 1..=options.max_pages.max(1) {
		if page > 1 {
			tokio::time::sleep(crate::jitter(options.sleep_min_ms, options.sleep_max_ms)).await;
		}

		let parsed = match fetch_page(page).await {
			Ok(parsed) => parsed,
			Err(err) if page > 1 => {
				tracing::warn!(
					source_type = %source_type,
					page,
					kept = entries.len(),
					error = %err,
					"Listing page failed. Keeping earlier pages."
				);

				break;
			},
			Err(err) => return Err(err),
		};

		tracing::debug!(
			source_type = %source_type,
			page,
			count = parsed.entries.len(),
			"Fetched listing page."
		);

		entries.extend(parsed.entries);

		if !parsed.has_more {
			break;
		}
	}

	Ok(entries)
}

/// Accepts `{"items": [...], "hasMore": bool}` or a bare array of items.
fn parse_listing_page(
	source_type: SourceType,
	json: Value,
	default_pc_ratio: f64,
) -> Result<ListingPage> {
	let malformed =
		|message: &str| Error::SourceMalformed { source_type, message: message.to_string() };
	let (items, has_more) = match &json {
		Value::Array(items) => (items, false),
		Value::Object(_) => {
			let items = json
				.get("items")
				.and_then(|v| v.as_array())
				.ok_or_else(|| malformed("Listing response is missing items array."))?;
			let has_more = json.get("hasMore").and_then(|v| v.as_bool()).unwrap_or(false);

			(items, has_more)
		},
		_ => return Err(malformed("Listing response must be an object or an array.")),
	};
	let mut entries = Vec::with_capacity(items.len());

	for item in items {
		let text = item
			.get("text")
			.or_else(|| item.get("keyword"))
			.and_then(|v| v.as_str())
			.ok_or_else(|| malformed("Listing item is missing text."))?;
		let group = match item.get("group") {
			None | Some(Value::Null) => None,
			Some(value) => Some(
				value.as_u64().and_then(|group| u32::try_from(group).ok()).ok_or_else(|| {
					malformed("Listing item group must be a small non-negative integer.")
				})?,
			),
		};

		entries.push(RawEntry {
			text: text.to_string(),
			href: optional_string(item, "href"),
			image_alt: optional_string(item, "imageAlt"),
			group,
			volume: parse_volume(item, default_pc_ratio),
		});
	}

	Ok(ListingPage { entries, has_more })
}

fn optional_string(item: &Value, field: &str) -> Option<String> {
	item.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

/// Channel counts win over a bare total; a total alone is split with the default ratio.
fn parse_volume(item: &Value, default_pc_ratio: f64) -> Option<SearchVolume> {
	let pc = item.get("pc").and_then(parse_count);
	let mobile = item.get("mobile").and_then(parse_count);

	if pc.is_some() || mobile.is_some() {
		return Some(SearchVolume::new(pc.unwrap_or(0), mobile.unwrap_or(0)));
	}

	item.get("total")
		.and_then(parse_count)
		.map(|total| SearchVolume::from_total(total, default_pc_ratio))
}

/// Counts arrive as numbers or strings; "< 10" style floors count as zero.
fn parse_count(value: &Value) -> Option<u64> {
	match value {
		Value::Number(number) => number.as_u64(),
		Value::String(raw) => {
			let trimmed = raw.trim();

			if trimmed.starts_with('<') {
				return Some(0);
			}

			trimmed.replace(',', "").parse().ok()
		},
		_ => None,
	}
}
