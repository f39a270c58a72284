use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use regex::{Captures, Regex};

/// How many leading lines of a document are searched for a timestamp. The
/// product headers sit in the first few lines; bodies can be long.
const HEADER_LINES: usize = 30;

/// Result of resolving one document's header timestamp. `raw` is the verbatim
/// matched text (empty when nothing matched at all); `instant` is present only
/// when a pattern parsed completely.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub raw: String,
    pub instant: Option<DateTime<Utc>>,
}

struct Pattern {
    regex: Regex,
    parse: fn(&Captures<'_>) -> Option<DateTime<Utc>>,
}

/// Ordered list of independent timestamp matchers, tried in fixed priority
/// order; the first successful parse wins.
pub struct TimestampResolver {
    patterns: Vec<Pattern>,
}

impl TimestampResolver {
    pub fn new() -> Self {
        let patterns = vec![
            // 12-hour clock: "1100 AM AST MON JUL 1 2024", "11:00 PM EDT Wed Aug 28 2024"
            Pattern {
                regex: Regex::new(
                    r"(?i)\b(\d{1,2}:\d{2}|\d{3,4})\s+(AM|PM)\s+([A-Z]{1,4})\s+[A-Z]{3}\s+([A-Z]{3,9})\s+(\d{1,2})\s+(\d{4})\b",
                )
                .expect("static regex"),
                parse: parse_twelve_hour,
            },
            // 24-hour clock: "1500 UTC MON JUL 1 2024", "2100 GMT THU SEP 12 2019"
            Pattern {
                regex: Regex::new(
                    r"(?i)\b(\d{4})\s+([A-Z]{1,4})\s+[A-Z]{3}\s+([A-Z]{3,9})\s+(\d{1,2})\s+(\d{4})\b",
                )
                .expect("static regex"),
                parse: parse_twenty_four_hour,
            },
            // Compact advisory stamp: "01/1500Z". Day-of-month plus time only;
            // carries no month or year, so it never resolves to an instant.
            Pattern {
                regex: Regex::new(r"\b(\d{2})/(\d{4})Z\b").expect("static regex"),
                parse: |_| None,
            },
        ];
        Self { patterns }
    }

    /// Searches the leading lines of `text` with every pattern in priority
    /// order. The first pattern that parses supplies the instant; the
    /// highest-priority pattern that merely matches supplies the raw text.
    pub fn resolve(&self, text: &str) -> Resolution {
        let head: String = text
            .lines()
            .take(HEADER_LINES)
            .collect::<Vec<_>>()
            .join("\n");

        let mut raw = String::new();
        for pattern in &self.patterns {
            if let Some(captures) = pattern.regex.captures(&head) {
                let matched = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
                if raw.is_empty() {
                    raw = matched.to_string();
                }
                if let Some(instant) = (pattern.parse)(&captures) {
                    return Resolution {
                        raw: matched.to_string(),
                        instant: Some(instant),
                    };
                }
            }
        }
        Resolution { raw, instant: None }
    }
}

fn parse_twelve_hour(captures: &Captures<'_>) -> Option<DateTime<Utc>> {
    let (hour, minute) = split_clock(captures.get(1)?.as_str())?;
    let meridiem = captures.get(2)?.as_str().to_uppercase();
    let hour = match (hour, meridiem.as_str()) {
        (12, "AM") => 0,
        (12, "PM") => 12,
        (h, "PM") => h + 12,
        (h, _) => h,
    };
    let offset = zone_offset_hours(captures.get(3)?.as_str())?;
    let month = month_number(captures.get(4)?.as_str())?;
    let day: u32 = captures.get(5)?.as_str().parse().ok()?;
    let year: i32 = captures.get(6)?.as_str().parse().ok()?;
    to_utc(year, month, day, hour, minute, offset)
}

fn parse_twenty_four_hour(captures: &Captures<'_>) -> Option<DateTime<Utc>> {
    let clock = captures.get(1)?.as_str();
    let hour: u32 = clock[..2].parse().ok()?;
    let minute: u32 = clock[2..].parse().ok()?;
    let offset = zone_offset_hours(captures.get(2)?.as_str())?;
    let month = month_number(captures.get(3)?.as_str())?;
    let day: u32 = captures.get(4)?.as_str().parse().ok()?;
    let year: i32 = captures.get(5)?.as_str().parse().ok()?;
    to_utc(year, month, day, hour, minute, offset)
}

fn split_clock(clock: &str) -> Option<(u32, u32)> {
    if let Some((hour, minute)) = clock.split_once(':') {
        return Some((hour.parse().ok()?, minute.parse().ok()?));
    }
    // "1100" or "700": the last two digits are minutes.
    let split = clock.len().checked_sub(2)?;
    Some((clock[..split].parse().ok()?, clock[split..].parse().ok()?))
}

/// Fixed offsets for the timezone abbreviations used by forecast products.
fn zone_offset_hours(abbrev: &str) -> Option<i32> {
    match abbrev.to_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => Some(0),
        "AST" => Some(-4),
        "ADT" => Some(-3),
        "EST" => Some(-5),
        "EDT" => Some(-4),
        "CST" => Some(-6),
        "CDT" => Some(-5),
        "MST" => Some(-7),
        "MDT" => Some(-6),
        "PST" => Some(-8),
        "PDT" => Some(-7),
        "HST" => Some(-10),
        "CVT" => Some(-1),
        _ => None,
    }
}

fn month_number(token: &str) -> Option<u32> {
    let prefix = token.get(..3)?.to_uppercase();
    match prefix.as_str() {
        "JAN" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "APR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AUG" => Some(8),
        "SEP" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DEC" => Some(12),
        _ => None,
    }
}

fn to_utc(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    offset_hours: i32,
) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(offset_hours * 3600)?;
    let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    Some(
        local
            .and_local_timezone(offset)
            .single()?
            .with_timezone(&Utc),
    )
}
