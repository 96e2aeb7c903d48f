pub mod references;
pub mod years;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::feed::{filter_relevant, FeedRecord};
use references::{normalize_reference, scan_references};
use years::{record_year, year_value, YearFilter, YearIndex};

/// A raw `src` value paired with the year of the record it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub raw_location: String,
    pub year: String,
}

/// An image reference rewritten into an absolute, fetchable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedReference {
    #[serde(rename = "src")]
    pub location: String,
    pub year: String,
}

impl ImageReference {
    pub fn normalize(self, origin: &str) -> NormalizedReference {
        NormalizedReference {
            location: normalize_reference(&self.raw_location, origin),
            year: self.year,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    pub references: Vec<NormalizedReference>,
    pub years: YearIndex,
}

impl ReferenceIndex {
    /// References for the selected year, keeping index order.
    pub fn filtered(&self, filter: &YearFilter) -> Vec<&NormalizedReference> {
        self.references
            .iter()
            .filter(|r| filter.matches(&r.year))
            .collect()
    }
}

/// Scan one record's markup, tagging every hit with the record's year.
/// A record without a usable timestamp contributes nothing.
pub fn extract_record(record: &FeedRecord) -> Vec<ImageReference> {
    let Some(markup) = record.detail_markup.as_deref() else {
        return Vec::new();
    };
    let year = match record_year(record) {
        Ok(y) => y,
        Err(e) => {
            warn!(
                title = record.title.as_deref().unwrap_or_default(),
                "Dropping record references: {}", e
            );
            return Vec::new();
        }
    };
    scan_references(markup)
        .map(|raw| ImageReference {
            raw_location: raw.to_string(),
            year: year.clone(),
        })
        .collect()
}

/// Filter → scan → bucket → normalize, then sort newest year first.
///
/// Records are processed in parallel; `collect` keeps feed order and the sort
/// is stable, so equal years stay in scan order.
pub fn build_reference_index(records: &[FeedRecord], origin: &str) -> ReferenceIndex {
    let relevant = filter_relevant(records);
    debug!("{} of {} records are relevant", relevant.len(), records.len());

    let per_record: Vec<Vec<NormalizedReference>> = relevant
        .par_iter()
        .map(|record| {
            extract_record(record)
                .into_iter()
                .map(|r| r.normalize(origin))
                .collect()
        })
        .collect();

    let mut references: Vec<NormalizedReference> = per_record.into_iter().flatten().collect();
    references.sort_by_key(|r| std::cmp::Reverse(year_value(&r.year)));

    let years = YearIndex::from_years(references.iter().map(|r| r.year.as_str()));
    info!(
        "Indexed {} images across {} years",
        references.len(),
        years.as_slice().len()
    );

    ReferenceIndex { references, years }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{parse_feed, RawTimestamp};

    const ORIGIN: &str = "https://akademik.example.ac.id";

    fn load_fixture(name: &str) -> Vec<FeedRecord> {
        let json = std::fs::read_to_string(format!("tests/fixtures/{}.json", name)).unwrap();
        parse_feed(&json).unwrap()
    }

    fn rec(title: &str, detail: &str, created: &str) -> FeedRecord {
        FeedRecord {
            title: Some(title.to_string()),
            detail_markup: Some(detail.to_string()),
            created_at: Some(RawTimestamp::Text(created.to_string())),
            updated_at: None,
        }
    }

    #[test]
    fn index_sorted_by_year_and_stable() {
        let records = vec![
            rec("Jadwal Ujian A", r#"<img src="a1.jpg"><img src="a2.jpg">"#, "2022-01-01"),
            rec("Jadwal Ujian B", r#"<img src="b1.jpg">"#, "2024-03-01"),
            rec("Jadwal Ujian C", r#"<img src="c1.jpg">"#, "2022-06-01"),
            rec("Jadwal Ujian D", r#"<img src="d1.jpg">"#, "2024-09-01"),
        ];
        let index = build_reference_index(&records, ORIGIN);
        let locs: Vec<_> = index
            .references
            .iter()
            .map(|r| r.location.trim_start_matches("https://akademik.example.ac.id/"))
            .collect();
        assert_eq!(locs, vec!["b1.jpg", "d1.jpg", "a1.jpg", "a2.jpg", "c1.jpg"]);
        assert_eq!(index.years.as_slice(), &["2024", "2022"]);
    }

    #[test]
    fn irrelevant_records_are_ignored() {
        let records = vec![
            rec("Pengumuman", r#"<img src="x.jpg">"#, "2024-01-01"),
            rec("Jadwal Ujian Semester Genap", r#"<img src="/y.jpg">"#, "2024-01-01"),
        ];
        let index = build_reference_index(&records, ORIGIN);
        assert_eq!(index.references.len(), 1);
        assert_eq!(index.references[0].location, format!("{}/y.jpg", ORIGIN));
    }

    #[test]
    fn bad_timestamp_drops_only_that_record() {
        let mut broken = rec("Jadwal Ujian Rusak", r#"<img src="bad.jpg">"#, "not a date");
        broken.updated_at = Some(RawTimestamp::Text("also not".into()));
        let records = vec![
            broken,
            rec("Jadwal Ujian Baik", r#"<img src="good.jpg">"#, "2023-01-01"),
        ];
        let index = build_reference_index(&records, ORIGIN);
        assert_eq!(index.references.len(), 1);
        assert!(index.references[0].location.ends_with("good.jpg"));
        assert_eq!(index.years.as_slice(), &["2023"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        let records = vec![
            rec("Jadwal Ujian 1", r#"<img src="same.jpg">"#, "2024-01-01"),
            rec("Jadwal Ujian 2", r#"<img src="same.jpg">"#, "2024-02-01"),
        ];
        let index = build_reference_index(&records, ORIGIN);
        assert_eq!(index.references.len(), 2);
        assert_eq!(index.references[0], index.references[1]);
    }

    #[test]
    fn fixture_feed() {
        let records = load_fixture("feed");
        let index = build_reference_index(&records, ORIGIN);
        assert_eq!(index.years.as_slice(), &["2024", "2023"]);
        let locs: Vec<&str> = index.references.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(
            locs,
            vec![
                "https://akademik.example.ac.id/storage/uas-genap-2024.jpg",
                "https://cdn.example.ac.id/uas-genap-2024-b.png",
                "https://akademik.example.ac.id/uploads/uts-2024.jpg",
                "https://files.example.ac.id/uas-ganjil-2023.jpg",
            ]
        );

        let only_2023 = index.filtered(&YearFilter::Year("2023".into()));
        assert_eq!(only_2023.len(), 1);
        assert_eq!(index.filtered(&YearFilter::All).len(), 4);
    }

    #[test]
    fn mixed_spellings_and_stray_entries_still_index() {
        let json = r#"[
            "not a record",
            {"judul": "Jadwal Ujian Ganjil", "detail": "<img src=\"/g.jpg\">", "created_at": "2023-10-01"},
            42,
            {"judul": "Jadwal Ujian Genap", "title": "Jadwal Ujian Genap",
             "createdAt": "2024-04-01", "created_at": "2024-04-01",
             "detailMarkup": "<img src=\"/h.jpg\">"}
        ]"#;
        let records = parse_feed(json).unwrap();
        let index = build_reference_index(&records, ORIGIN);
        let locs: Vec<&str> = index.references.iter().map(|r| r.location.as_str()).collect();
        assert_eq!(
            locs,
            vec![
                "https://akademik.example.ac.id/h.jpg",
                "https://akademik.example.ac.id/g.jpg",
            ]
        );
        assert_eq!(index.years.as_slice(), &["2024", "2023"]);
    }

    #[test]
    fn record_without_markup_contributes_nothing() {
        let mut bare = rec("Jadwal Ujian Tanpa Gambar", "", "2025-01-01");
        bare.detail_markup = None;
        let records = vec![
            bare,
            rec("Jadwal Ujian Lengkap", r#"<img src="ada.jpg">"#, "2024-01-01"),
        ];
        let index = build_reference_index(&records, ORIGIN);
        assert_eq!(index.references.len(), 1);
        assert!(index.references[0].location.ends_with("/ada.jpg"));
        assert_eq!(index.years.as_slice(), &["2024"]);
    }
}
