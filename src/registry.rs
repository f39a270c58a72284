use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{Fix, StormEvent, StormId};
use crate::error::StormlinkError;

const MANDATORY_COLUMNS: [&str; 7] = ["sid", "name", "season", "basin", "iso_time", "lat", "lon"];

/// Column positions resolved from the header row by name. The alternate-agency
/// intensity pair is legitimately absent from some registry snapshots.
struct ColumnMap {
    sid: usize,
    name: usize,
    season: usize,
    basin: usize,
    iso_time: usize,
    lat: usize,
    lon: usize,
    wind: Option<usize>,
    pressure: Option<usize>,
    wind_alt: Option<usize>,
    pressure_alt: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, StormlinkError> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(column))
        };
        for column in MANDATORY_COLUMNS {
            if position(column).is_none() {
                return Err(StormlinkError::RegistryMissingColumn(column.to_string()));
            }
        }
        Ok(Self {
            sid: position("sid").unwrap(),
            name: position("name").unwrap(),
            season: position("season").unwrap(),
            basin: position("basin").unwrap(),
            iso_time: position("iso_time").unwrap(),
            lat: position("lat").unwrap(),
            lon: position("lon").unwrap(),
            wind: position("wmo_wind"),
            pressure: position("wmo_pres"),
            wind_alt: position("usa_wind"),
            pressure_alt: position("usa_pres"),
        })
    }
}

#[derive(Debug)]
pub struct RegistryLoadResult {
    pub events: BTreeMap<StormId, StormEvent>,
    pub rejected_records: usize,
    pub duplicate_instants: usize,
}

pub struct RegistryLoader;

impl RegistryLoader {
    pub fn load(path: &Path) -> Result<RegistryLoadResult, StormlinkError> {
        if !path.exists() {
            return Err(StormlinkError::RegistryNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|err| StormlinkError::RegistryRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let result = Self::load_from_reader(file)?;
        info!(
            events = result.events.len(),
            rejected = result.rejected_records,
            "loaded registry from {}",
            path.display()
        );
        Ok(result)
    }

    pub fn load_from_reader<R: io::Read>(reader: R) -> Result<RegistryLoadResult, StormlinkError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader
            .headers()
            .map_err(|err| StormlinkError::RegistryParse(err.to_string()))?
            .clone();
        let columns = ColumnMap::from_headers(&headers)?;

        let mut events: BTreeMap<StormId, StormEvent> = BTreeMap::new();
        let mut rejected_records = 0usize;

        for record in csv_reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(err) => {
                    debug!("rejected unreadable registry row: {err}");
                    rejected_records += 1;
                    continue;
                }
            };
            match parse_row(&record, &columns) {
                Some((sid, name, season, basin, fix)) => {
                    events
                        .entry(sid.clone())
                        .or_insert_with(|| StormEvent {
                            sid,
                            name,
                            season,
                            basin_code: basin,
                            timeline: Vec::new(),
                        })
                        .timeline
                        .push(fix);
                }
                None => {
                    debug!("rejected registry row missing mandatory fields");
                    rejected_records += 1;
                }
            }
        }

        let mut duplicate_instants = 0usize;
        for event in events.values_mut() {
            event.timeline.sort_by_key(|fix| fix.instant);
            for i in 1..event.timeline.len() {
                if event.timeline[i].instant == event.timeline[i - 1].instant {
                    event.timeline[i].duplicate_instant = true;
                    duplicate_instants += 1;
                }
            }
        }

        Ok(RegistryLoadResult {
            events,
            rejected_records,
            duplicate_instants,
        })
    }
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnMap,
) -> Option<(StormId, String, f64, String, Fix)> {
    let field = |index: usize| record.get(index).map(str::trim).filter(|v| !v.is_empty());

    let sid: StormId = field(columns.sid)?.parse().ok()?;
    let name = field(columns.name)?.to_uppercase();
    let instant = parse_instant(field(columns.iso_time)?)?;
    let latitude: f64 = field(columns.lat)?.parse().ok()?;
    let longitude: f64 = field(columns.lon)?.parse().ok()?;

    // Season and basin ride along when present; a missing season falls back to
    // the observation year rather than rejecting the row.
    let season = field(columns.season)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or_else(|| f64::from(instant.year()));
    let basin = field(columns.basin).unwrap_or_default().to_uppercase();

    let mut fix = Fix::new(instant, latitude, longitude);
    fix.wind = optional_number(record, columns.wind);
    fix.pressure = optional_number(record, columns.pressure);
    fix.wind_alt = optional_number(record, columns.wind_alt);
    fix.pressure_alt = optional_number(record, columns.pressure_alt);

    Some((sid, name, season, basin, fix))
}

fn optional_number(record: &StringRecord, index: Option<usize>) -> Option<f64> {
    let value = record.get(index?)?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse().ok()
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
