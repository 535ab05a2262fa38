use regex::Regex;

pub const UNKNOWN_INTENT: &str = "unknown";

/// Maps keyword text to an intent label.
pub trait IntentClassifier
where
	Self: Send + Sync,
{
	fn classify(&self, text: &str) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultIntentClassifier;
impl IntentClassifier for DefaultIntentClassifier {
	fn classify(&self, _text: &str) -> String {
		UNKNOWN_INTENT.to_string()
	}
}

/// First matching rule wins; rules are tried in configuration order.
#[derive(Clone, Debug, Default)]
pub struct RuleIntentClassifier {
	rules: Vec<(String, Vec<Regex>)>,
}
impl RuleIntentClassifier {
	pub fn from_config(rules: &[kwi_config::IntentRule]) -> Result<Self, regex::Error> {
		let mut compiled = Vec::with_capacity(rules.len());

		for rule in rules {
			let patterns: Vec<Regex> =
				rule.patterns.iter().map(|pattern| Regex::new(pattern)).collect::<Result<_, _>>()?;

			compiled.push((rule.label.trim().to_string(), patterns));
		}

		Ok(Self { rules: compiled })
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}
}
impl IntentClassifier for RuleIntentClassifier {
	fn classify(&self, text: &str) -> String {
		self.rules
			.iter()
			.find(|(_, patterns)| patterns.iter().any(|pattern| pattern.is_match(text)))
			.map(|(label, _)| label.clone())
			.unwrap_or_else(|| UNKNOWN_INTENT.to_string())
	}
}
