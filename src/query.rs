use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ForecastDocument;
use crate::error::StormlinkError;

/// One storm as stored in `storm_bundles.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredBundle {
    pub sid: String,
    pub name: String,
    pub corpus_name: Option<String>,
    pub year: i32,
    pub season: f64,
    pub basin: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub matched: bool,
    pub ambiguous: bool,
    pub has_advisory: bool,
    pub has_discussion: bool,
    pub advisories: Vec<ForecastDocument>,
    pub discussions: Vec<ForecastDocument>,
}

#[derive(Debug, Serialize)]
pub struct QueryStats {
    pub total_storms: usize,
    pub matched_storms: usize,
    pub total_advisories: usize,
    pub total_discussions: usize,
    pub by_year: BTreeMap<i32, usize>,
    pub by_basin: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct StormSummary {
    pub key: String,
    pub sid: String,
    pub name: String,
    pub year: i32,
    pub basin: String,
    pub matched: bool,
    pub advisories: usize,
    pub discussions: usize,
}

#[derive(Debug, Serialize)]
pub struct StormDetail {
    #[serde(flatten)]
    pub summary: StormSummary,
    pub season: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub first_advisory: Option<DocumentSummary>,
    pub first_discussion: Option<DocumentSummary>,
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub raw_timestamp: String,
    pub resolved_instant: Option<DateTime<Utc>>,
}

/// Read-only queries over a previously written bundle export.
#[derive(Debug)]
pub struct BundleQuery {
    data: BTreeMap<String, StoredBundle>,
}

impl BundleQuery {
    pub fn load(path: &Path) -> Result<Self, StormlinkError> {
        if !path.exists() {
            return Err(StormlinkError::BundleNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|err| StormlinkError::BundleParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let data = serde_json::from_str(&content).map_err(|err| StormlinkError::BundleParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Ok(Self { data })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    pub fn stats(&self) -> QueryStats {
        let mut stats = QueryStats {
            total_storms: self.data.len(),
            matched_storms: 0,
            total_advisories: 0,
            total_discussions: 0,
            by_year: BTreeMap::new(),
            by_basin: BTreeMap::new(),
        };
        for bundle in self.data.values() {
            if bundle.matched {
                stats.matched_storms += 1;
            }
            stats.total_advisories += bundle.advisories.len();
            stats.total_discussions += bundle.discussions.len();
            *stats.by_year.entry(bundle.year).or_default() += 1;
            *stats.by_basin.entry(bundle.basin.clone()).or_default() += 1;
        }
        stats
    }

    pub fn by_name(&self, name: &str, year: Option<i32>) -> Vec<StormSummary> {
        let wanted = name.trim().to_uppercase();
        self.data
            .iter()
            .filter(|(_, bundle)| {
                let candidate = bundle
                    .corpus_name
                    .as_deref()
                    .unwrap_or(&bundle.name)
                    .to_uppercase();
                candidate == wanted && year.is_none_or(|year| bundle.year == year)
            })
            .map(|(key, bundle)| summarize(key, bundle))
            .collect()
    }

    pub fn info(&self, key: &str) -> Result<StormDetail, StormlinkError> {
        let bundle = self
            .data
            .get(key)
            .ok_or_else(|| StormlinkError::StormNotFound(key.to_string()))?;
        Ok(StormDetail {
            summary: summarize(key, bundle),
            season: bundle.season,
            start_time: bundle.start_time,
            end_time: bundle.end_time,
            first_advisory: bundle.advisories.first().map(summarize_document),
            first_discussion: bundle.discussions.first().map(summarize_document),
        })
    }
}

fn summarize(key: &str, bundle: &StoredBundle) -> StormSummary {
    StormSummary {
        key: key.to_string(),
        sid: bundle.sid.clone(),
        name: bundle.name.clone(),
        year: bundle.year,
        basin: bundle.basin.clone(),
        matched: bundle.matched,
        advisories: bundle.advisories.len(),
        discussions: bundle.discussions.len(),
    }
}

fn summarize_document(document: &ForecastDocument) -> DocumentSummary {
    DocumentSummary {
        filename: document.filename.clone(),
        raw_timestamp: document.raw_timestamp.clone(),
        resolved_instant: document.resolved_instant,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SAMPLE: &str = r#"{
      "2024_Atlantic_BERYL": {
        "sid": "2024181N09320",
        "name": "BERYL",
        "corpus_name": "BERYL",
        "year": 2024,
        "season": 2024.0,
        "basin": "Atlantic",
        "start_time": "2024-06-28T06:00:00Z",
        "end_time": "2024-07-09T12:00:00Z",
        "matched": true,
        "ambiguous": false,
        "has_advisory": true,
        "has_discussion": false,
        "advisories": [
          {
            "filename": "adv.001.txt",
            "raw_timestamp": "1500 UTC MON JUL 1 2024",
            "resolved_instant": "2024-07-01T15:00:00Z",
            "body": "FORECAST BODY"
          }
        ],
        "discussions": []
      },
      "2024_NA_CHRIS": {
        "sid": "2024190N20300",
        "name": "CHRIS",
        "corpus_name": null,
        "year": 2024,
        "season": 2024.0,
        "basin": "NA",
        "start_time": null,
        "end_time": null,
        "matched": false,
        "ambiguous": false,
        "has_advisory": false,
        "has_discussion": false,
        "advisories": [],
        "discussions": []
      }
    }"#;

    fn sample_query() -> BundleQuery {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("storm_bundles.json");
        fs::write(&path, SAMPLE).unwrap();
        BundleQuery::load(&path).unwrap()
    }

    #[test]
    fn stats_counts_storms_and_documents() {
        let stats = sample_query().stats();
        assert_eq!(stats.total_storms, 2);
        assert_eq!(stats.matched_storms, 1);
        assert_eq!(stats.total_advisories, 1);
        assert_eq!(stats.by_year.get(&2024), Some(&2));
        assert_eq!(stats.by_basin.get("Atlantic"), Some(&1));
    }

    #[test]
    fn by_name_filters_by_year() {
        let query = sample_query();
        assert_eq!(query.by_name("beryl", None).len(), 1);
        assert_eq!(query.by_name("beryl", Some(2023)).len(), 0);
        assert_eq!(query.by_name("CHRIS", Some(2024)).len(), 1);
    }

    #[test]
    fn info_returns_document_summaries() {
        let detail = sample_query().info("2024_Atlantic_BERYL").unwrap();
        assert_eq!(detail.summary.sid, "2024181N09320");
        assert_eq!(
            detail.first_advisory.as_ref().map(|d| d.filename.as_str()),
            Some("adv.001.txt")
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        let err = sample_query().info("2024_Atlantic_NOBODY").unwrap_err();
        assert_matches!(err, StormlinkError::StormNotFound(_));
    }

    #[test]
    fn missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = BundleQuery::load(&temp.path().join("absent.json")).unwrap_err();
        assert_matches!(err, StormlinkError::BundleNotFound(_));
    }
}
