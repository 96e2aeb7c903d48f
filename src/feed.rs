use serde_json::Value;
use tracing::debug;

/// Title phrase a record must contain (case-insensitively) to be considered.
pub const RELEVANCE_KEYWORD: &str = "jadwal ujian";

/// Timestamp as it appears in the feed, before any parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    Text(String),
    Millis(i64),
}

impl std::fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawTimestamp::Text(s) => f.write_str(s),
            RawTimestamp::Millis(ms) => write!(f, "{}", ms),
        }
    }
}

const TITLE_KEYS: &[&str] = &["title", "judul"];
const MARKUP_KEYS: &[&str] = &["detailMarkup", "detail"];
const CREATED_KEYS: &[&str] = &["created_at", "createdAt"];
const UPDATED_KEYS: &[&str] = &["updated_at", "updatedAt"];

/// One entry of the announcement feed.
#[derive(Debug, Clone, Default)]
pub struct FeedRecord {
    pub title: Option<String>,
    pub detail_markup: Option<String>,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
}

impl FeedRecord {
    /// Build a record from one feed entry; `None` when the entry is not an object.
    ///
    /// Each field may appear under either spelling; the first usable one wins.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let pick_string = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str).map(str::to_string))
        };
        let pick_timestamp =
            |keys: &[&str]| keys.iter().find_map(|k| obj.get(*k).and_then(timestamp));

        Some(FeedRecord {
            title: pick_string(TITLE_KEYS),
            detail_markup: pick_string(MARKUP_KEYS),
            created_at: pick_timestamp(CREATED_KEYS),
            updated_at: pick_timestamp(UPDATED_KEYS),
        })
    }

    pub fn is_relevant(&self) -> bool {
        self.title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(RELEVANCE_KEYWORD))
    }
}

/// Decode a feed body: a JSON array whose non-object entries are skipped.
pub fn parse_feed(body: &str) -> serde_json::Result<Vec<FeedRecord>> {
    let entries: Vec<Value> = serde_json::from_str(body)?;
    let records: Vec<FeedRecord> = entries.iter().filter_map(FeedRecord::from_value).collect();
    if records.len() < entries.len() {
        debug!("Skipped {} non-object feed entries", entries.len() - records.len());
    }
    Ok(records)
}

/// Keep only records whose title mentions the exam schedule, in feed order.
pub fn filter_relevant(records: &[FeedRecord]) -> Vec<&FeedRecord> {
    records.iter().filter(|r| r.is_relevant()).collect()
}

/// Strings and integer millis count; blanks, null and anything else do not.
fn timestamp(value: &Value) -> Option<RawTimestamp> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(RawTimestamp::Text(s.clone())),
        Value::Number(n) => n.as_i64().map(RawTimestamp::Millis),
        _ => None,
    }
}
