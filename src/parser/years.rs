use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::error::{PipelineError, Result};
use crate::feed::{FeedRecord, RawTimestamp};

/// Label that selects every year.
pub const ALL_YEARS: &str = "semua";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Four-digit year label for a record: `created_at` when it parses, else `updated_at`.
pub fn record_year(record: &FeedRecord) -> Result<String> {
    record
        .created_at
        .as_ref()
        .and_then(parse_year)
        .or_else(|| record.updated_at.as_ref().and_then(parse_year))
        .map(|year| year.to_string())
        .ok_or_else(|| PipelineError::InvalidTimestamp {
            created: record.created_at.as_ref().map(|t| t.to_string()),
            updated: record.updated_at.as_ref().map(|t| t.to_string()),
        })
}

/// Years that fit a four-digit label.
const LABEL_YEARS: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Calendar year of a raw timestamp, read in the timestamp's own offset.
/// Years outside `LABEL_YEARS` count as unparseable.
fn parse_year(raw: &RawTimestamp) -> Option<i32> {
    calendar_year(raw).filter(|year| LABEL_YEARS.contains(year))
}

fn calendar_year(raw: &RawTimestamp) -> Option<i32> {
    match raw {
        RawTimestamp::Millis(ms) => DateTime::from_timestamp_millis(*ms).map(|dt| dt.year()),
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.year());
            }
            if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
                return Some(dt.year());
            }
            for fmt in NAIVE_DATETIME_FORMATS {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
                    return Some(dt.year());
                }
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.year())
        }
    }
}

/// Numeric value of a year label, used for ordering.
pub fn year_value(year: &str) -> i64 {
    year.parse().unwrap_or(i64::MIN)
}

/// Distinct years present in an index, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearIndex(Vec<String>);

impl YearIndex {
    pub fn from_years<'a>(years: impl IntoIterator<Item = &'a str>) -> Self {
        let mut distinct: Vec<String> = Vec::new();
        for year in years {
            if !distinct.iter().any(|y| y == year) {
                distinct.push(year.to_string());
            }
        }
        distinct.sort_by_key(|y| std::cmp::Reverse(year_value(y)));
        YearIndex(distinct)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, year: &str) -> bool {
        self.0.iter().any(|y| y == year)
    }
}

/// Year selection applied to an index before display or export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum YearFilter {
    #[default]
    All,
    Year(String),
}

impl YearFilter {
    pub fn matches(&self, year: &str) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => y == year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(ALL_YEARS) || s.eq_ignore_ascii_case("all") {
            return Ok(YearFilter::All);
        }
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(YearFilter::Year(s.to_string()))
        } else {
            Err(PipelineError::Configuration(format!(
                "year filter must be a 4-digit year or '{}', got '{}'",
                ALL_YEARS, s
            )))
        }
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => f.write_str(ALL_YEARS),
            YearFilter::Year(y) => f.write_str(y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(created: Option<RawTimestamp>, updated: Option<RawTimestamp>) -> FeedRecord {
        FeedRecord {
            created_at: created,
            updated_at: updated,
            ..Default::default()
        }
    }

    fn text(s: &str) -> Option<RawTimestamp> {
        Some(RawTimestamp::Text(s.to_string()))
    }

    #[test]
    fn prefers_created_at() {
        let r = record(text("2023-08-01T02:00:00.000000Z"), text("2024-01-01 00:00:00"));
        assert_eq!(record_year(&r).unwrap(), "2023");
    }

    #[test]
    fn falls_back_to_updated_at() {
        let r = record(text("bukan tanggal"), text("2022-02-10"));
        assert_eq!(record_year(&r).unwrap(), "2022");
        let r = record(None, Some(RawTimestamp::Millis(1_700_000_000_000)));
        assert_eq!(record_year(&r).unwrap(), "2023");
    }

    #[test]
    fn unparseable_timestamps_fail() {
        let r = record(text("??"), None);
        assert!(matches!(
            record_year(&r),
            Err(PipelineError::InvalidTimestamp { .. })
        ));
        assert!(record_year(&record(None, None)).is_err());
    }

    #[test]
    fn out_of_range_years_are_rejected() {
        let far_future = Some(RawTimestamp::Millis(300_000_000_000_000));
        assert!(matches!(
            record_year(&record(far_future.clone(), None)),
            Err(PipelineError::InvalidTimestamp { .. })
        ));
        let r = record(far_future, text("2021-07-07"));
        assert_eq!(record_year(&r).unwrap(), "2021");

        let r = record(text("0999-12-31"), text("1999-12-31"));
        assert_eq!(record_year(&r).unwrap(), "1999");
        assert!(record_year(&record(text("0042-01-01"), None)).is_err());
    }

    #[test]
    fn year_index_is_distinct_and_descending() {
        let idx = YearIndex::from_years(["2022", "2024", "2022", "2023"]);
        assert_eq!(idx.as_slice(), &["2024", "2023", "2022"]);
        assert!(idx.contains("2023"));
        assert!(YearIndex::from_years([]).is_empty());
    }

    #[test]
    fn year_filter_parsing() {
        assert_eq!("semua".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!("ALL".parse::<YearFilter>().unwrap(), YearFilter::All);
        assert_eq!(
            "2024".parse::<YearFilter>().unwrap(),
            YearFilter::Year("2024".into())
        );
        assert!("24".parse::<YearFilter>().is_err());
        assert!(YearFilter::All.matches("1999"));
        assert!(!YearFilter::Year("2024".into()).matches("2023"));
    }
}
