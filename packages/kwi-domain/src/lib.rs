pub mod batch;
pub mod intent;
pub mod keyword;
pub mod normalize;
pub mod volume;

pub use batch::{CollectionBatch, SourceWarning, WarningKind};
pub use intent::{DefaultIntentClassifier, IntentClassifier, RuleIntentClassifier, UNKNOWN_INTENT};
pub use keyword::{KeywordKey, KeywordRecord, RawEntry, Snapshot, SourceType};
pub use volume::{DEFAULT_PC_RATIO, SearchVolume};
