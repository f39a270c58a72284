use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StormlinkError;

/// Registry storm identifier, e.g. `2024181N09320`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StormId(String);

impl StormId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StormId {
    type Err = StormlinkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        let is_valid = !normalized.is_empty()
            && normalized.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(StormlinkError::InvalidStormId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One timestamped observation in a storm's timeline. `speed` and `bearing`
/// are filled in by the kinematics pass; both stay `None` for the first fix
/// and for non-positive time deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub instant: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub wind: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_alt: Option<f64>,
    pub pressure_alt: Option<f64>,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
    pub duplicate_instant: bool,
}

impl Fix {
    pub fn new(instant: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            instant,
            latitude,
            longitude,
            wind: None,
            pressure: None,
            wind_alt: None,
            pressure_alt: None,
            speed: None,
            bearing: None,
            duplicate_instant: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StormEvent {
    pub sid: StormId,
    pub name: String,
    pub season: f64,
    pub basin_code: String,
    pub timeline: Vec<Fix>,
}

impl StormEvent {
    pub fn year(&self) -> i32 {
        self.season.floor() as i32
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.timeline.first().map(|fix| fix.instant)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.timeline.last().map(|fix| fix.instant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentClass {
    ForecastAdvisory,
    PublicAdvisory,
    ForecastDiscussion,
    Other(String),
}

impl DocumentClass {
    pub fn from_dir_name(name: &str) -> Self {
        match name {
            "forecast_advisory" => DocumentClass::ForecastAdvisory,
            "public_advisory" => DocumentClass::PublicAdvisory,
            "forecast_discussion" => DocumentClass::ForecastDiscussion,
            other => DocumentClass::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DocumentClass::ForecastAdvisory => "forecast_advisory",
            DocumentClass::PublicAdvisory => "public_advisory",
            DocumentClass::ForecastDiscussion => "forecast_discussion",
            DocumentClass::Other(tag) => tag,
        }
    }
}

/// One storm directory discovered in the corpus tree. Never mutated after
/// discovery.
#[derive(Debug, Clone)]
pub struct CorpusStormDirectory {
    pub year: i32,
    pub basin_dir: String,
    pub name: String,
    pub path: Utf8PathBuf,
    pub files: Vec<(DocumentClass, Utf8PathBuf)>,
}

impl CorpusStormDirectory {
    pub fn files_of(&self, class: &DocumentClass) -> Vec<&Utf8PathBuf> {
        self.files
            .iter()
            .filter(|(file_class, _)| file_class == class)
            .map(|(_, path)| path)
            .collect()
    }

    pub fn has_advisory(&self) -> bool {
        self.files
            .iter()
            .any(|(class, _)| *class == DocumentClass::ForecastAdvisory)
    }

    pub fn has_discussion(&self) -> bool {
        self.files
            .iter()
            .any(|(class, _)| *class == DocumentClass::ForecastDiscussion)
    }
}

/// Outcome of identity matching for one registry event, matched or not.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub sid: StormId,
    pub matched: bool,
    pub ambiguous: bool,
    pub corpus_year: Option<i32>,
    pub corpus_basin: Option<String>,
    pub corpus_name: Option<String>,
    pub corpus_path: Option<Utf8PathBuf>,
    pub has_advisory: bool,
    pub has_discussion: bool,
}

impl MatchRecord {
    pub fn unmatched(sid: StormId) -> Self {
        Self {
            sid,
            matched: false,
            ambiguous: false,
            corpus_year: None,
            corpus_basin: None,
            corpus_name: None,
            corpus_path: None,
            has_advisory: false,
            has_discussion: false,
        }
    }

    pub fn ambiguous(sid: StormId) -> Self {
        Self {
            ambiguous: true,
            ..Self::unmatched(sid)
        }
    }

    pub fn matched(sid: StormId, directory: &CorpusStormDirectory) -> Self {
        Self {
            sid,
            matched: true,
            ambiguous: false,
            corpus_year: Some(directory.year),
            corpus_basin: Some(directory.basin_dir.clone()),
            corpus_name: Some(directory.name.clone()),
            corpus_path: Some(directory.path.clone()),
            has_advisory: directory.has_advisory(),
            has_discussion: directory.has_discussion(),
        }
    }
}

/// One corpus document with its resolved (or unresolvable) header timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDocument {
    pub filename: String,
    pub raw_timestamp: String,
    pub resolved_instant: Option<DateTime<Utc>>,
    pub body: String,
}

/// Final per-storm join of track, match status, and ordered documents.
#[derive(Debug, Clone)]
pub struct StormBundle {
    pub event: StormEvent,
    pub record: MatchRecord,
    pub advisories: Vec<ForecastDocument>,
    pub discussions: Vec<ForecastDocument>,
}

impl StormBundle {
    /// Export key, `<year>_<basin>_<name>`. Matched storms use the corpus
    /// labels; unmatched storms fall back to registry fields.
    pub fn key(&self) -> String {
        let basin = self
            .record
            .corpus_basin
            .as_deref()
            .unwrap_or(&self.event.basin_code);
        let name = self
            .record
            .corpus_name
            .as_deref()
            .unwrap_or(&self.event.name);
        format!("{}_{}_{}", self.event.year(), basin, name.replace(' ', "_"))
    }
}
