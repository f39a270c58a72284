use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport, RunSummary};
use crate::domain::{ForecastDocument, StormBundle};
use crate::error::StormlinkError;
use crate::store::OutputStore;

pub struct OutputWriter;

impl OutputWriter {
    pub fn write_all(store: &OutputStore, report: &RunReport) -> Result<(), StormlinkError> {
        store.ensure_root()?;
        Self::write_match_csv(store, report)?;
        Self::write_tracks_csv(store, report)?;
        Self::write_bundles_json(store, report)?;
        Ok(())
    }

    /// One row per registry event, matched or not.
    pub fn write_match_csv(store: &OutputStore, report: &RunReport) -> Result<(), StormlinkError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "sid",
                "name",
                "year",
                "season",
                "start_time",
                "end_time",
                "corpus_basin",
                "corpus_name",
                "corpus_path",
                "has_advisory",
                "has_discussion",
                "ambiguous",
            ])
            .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;

        for record in &report.records {
            let Some(bundle) = report.bundles.get(&record.sid) else {
                continue;
            };
            let event = &bundle.event;
            let row = [
                record.sid.as_str().to_string(),
                event.name.clone(),
                event.year().to_string(),
                event.season.to_string(),
                optional_instant(event.start()),
                optional_instant(event.end()),
                record.corpus_basin.clone().unwrap_or_default(),
                record.corpus_name.clone().unwrap_or_default(),
                record
                    .corpus_path
                    .as_ref()
                    .map(|path| path.to_string())
                    .unwrap_or_default(),
                record.has_advisory.to_string(),
                record.has_discussion.to_string(),
                record.ambiguous.to_string(),
            ];
            writer
                .write_record(&row)
                .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;
        }

        OutputStore::write_bytes_atomic(&store.matched_csv_path(), &finish(writer)?)
    }

    /// One row per fix, with derived kinematics. First-fix rows carry empty
    /// speed and bearing.
    pub fn write_tracks_csv(store: &OutputStore, report: &RunReport) -> Result<(), StormlinkError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "storm_id",
                "storm_name",
                "season",
                "datetime",
                "year",
                "month",
                "day",
                "hour",
                "latitude",
                "longitude",
                "max_wind_wmo",
                "min_pressure_wmo",
                "max_wind_usa",
                "min_pressure_usa",
                "storm_speed",
                "storm_direction",
                "corpus_name",
                "corpus_basin",
            ])
            .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;

        for bundle in report.bundles.values() {
            let event = &bundle.event;
            for fix in &event.timeline {
                let row = [
                    event.sid.as_str().to_string(),
                    event.name.clone(),
                    event.season.to_string(),
                    fix.instant.to_rfc3339(),
                    fix.instant.year().to_string(),
                    fix.instant.month().to_string(),
                    fix.instant.day().to_string(),
                    fix.instant.hour().to_string(),
                    fix.latitude.to_string(),
                    fix.longitude.to_string(),
                    optional_number(fix.wind),
                    optional_number(fix.pressure),
                    optional_number(fix.wind_alt),
                    optional_number(fix.pressure_alt),
                    optional_number(fix.speed),
                    optional_number(fix.bearing),
                    bundle.record.corpus_name.clone().unwrap_or_default(),
                    bundle.record.corpus_basin.clone().unwrap_or_default(),
                ];
                writer
                    .write_record(&row)
                    .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;
            }
        }

        OutputStore::write_bytes_atomic(&store.tracks_csv_path(), &finish(writer)?)
    }

    /// Hierarchical export keyed by `<year>_<basin>_<name>`.
    pub fn write_bundles_json(
        store: &OutputStore,
        report: &RunReport,
    ) -> Result<(), StormlinkError> {
        let exports: BTreeMap<String, BundleExport<'_>> = report
            .bundles
            .values()
            .map(|bundle| (bundle.key(), BundleExport::from(bundle)))
            .collect();
        let bytes = serde_json::to_vec_pretty(&exports)
            .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;
        OutputStore::write_bytes_atomic(&store.bundles_json_path(), &bytes)
    }
}

#[derive(Debug, Serialize)]
struct BundleExport<'a> {
    sid: &'a str,
    name: &'a str,
    corpus_name: Option<&'a str>,
    year: i32,
    season: f64,
    basin: &'a str,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    matched: bool,
    ambiguous: bool,
    has_advisory: bool,
    has_discussion: bool,
    advisories: &'a [ForecastDocument],
    discussions: &'a [ForecastDocument],
}

impl<'a> From<&'a StormBundle> for BundleExport<'a> {
    fn from(bundle: &'a StormBundle) -> Self {
        Self {
            sid: bundle.event.sid.as_str(),
            name: &bundle.event.name,
            corpus_name: bundle.record.corpus_name.as_deref(),
            year: bundle.event.year(),
            season: bundle.event.season,
            basin: bundle
                .record
                .corpus_basin
                .as_deref()
                .unwrap_or(&bundle.event.basin_code),
            start_time: bundle.event.start(),
            end_time: bundle.event.end(),
            matched: bundle.record.matched,
            ambiguous: bundle.record.ambiguous,
            has_advisory: bundle.record.has_advisory,
            has_discussion: bundle.record.has_discussion,
            advisories: &bundle.advisories,
            discussions: &bundle.discussions,
        }
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, StormlinkError> {
    writer
        .into_inner()
        .map_err(|err| StormlinkError::OutputWrite(err.to_string()))
}

fn optional_instant(instant: Option<DateTime<Utc>>) -> String {
    instant.map(|value| value.to_rfc3339()).unwrap_or_default()
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
