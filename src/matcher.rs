use std::collections::{BTreeMap, HashSet};
use std::fs;

use tracing::{debug, info};

use crate::domain::{CorpusStormDirectory, DocumentClass, MatchRecord, StormEvent, StormId};
use crate::timestamp::TimestampResolver;

/// Qualifier phrases stripped from either end of a storm name before
/// comparison. One side writes `POTENTIAL TROPICAL CYCLONE ONE`, the other
/// just `ONE`.
const QUALIFIERS: [&str; 11] = [
    "POTENTIAL TROPICAL CYCLONE",
    "POST-TROPICAL CYCLONE",
    "SUBTROPICAL DEPRESSION",
    "SUBTROPICAL STORM",
    "TROPICAL DEPRESSION",
    "TROPICAL CYCLONE",
    "TROPICAL STORM",
    "MAJOR HURRICANE",
    "REMNANTS OF",
    "HURRICANE",
    "TYPHOON",
];

/// Corpus basin directory labels and the registry basin codes they translate
/// to. IBTrACS labels the North Atlantic `NA` while NHC identifiers use `AL`,
/// so both are accepted. Labels absent from this table carry no translation.
const BASIN_TRANSLATION: [(&str, &[&str]); 3] = [
    ("Atlantic", &["AL", "NA"]),
    ("E_Pacific", &["EP"]),
    ("C_Pacific", &["CP"]),
];

pub fn translate_basin(basin_dir: &str) -> Option<&'static [&'static str]> {
    BASIN_TRANSLATION
        .iter()
        .find(|(label, _)| *label == basin_dir)
        .map(|(_, codes)| *codes)
}

/// Canonical form used on both sides of the name join: uppercase, diacritics
/// folded, qualifier phrases stripped from the ends, separators collapsed,
/// trailing sequence numbers dropped.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .to_uppercase()
        .chars()
        .map(fold_diacritic)
        .map(|ch| if ch == '_' || ch == '-' { ' ' } else { ch })
        .collect();
    let mut tokens: Vec<&str> = folded.split_whitespace().collect();

    let mut stripped = true;
    while stripped {
        stripped = false;
        for qualifier in QUALIFIERS {
            let qualifier_tokens: Vec<&str> = qualifier.split_whitespace().collect();
            if tokens.len() > qualifier_tokens.len() {
                if tokens.starts_with(&qualifier_tokens) {
                    tokens.drain(..qualifier_tokens.len());
                    stripped = true;
                } else if tokens.ends_with(&qualifier_tokens) {
                    tokens.truncate(tokens.len() - qualifier_tokens.len());
                    stripped = true;
                }
            }
        }
    }

    if tokens.len() > 1
        && tokens
            .last()
            .is_some_and(|token| token.chars().all(|ch| ch.is_ascii_digit()))
    {
        tokens.pop();
    }

    tokens.join(" ")
}

fn fold_diacritic(ch: char) -> char {
    match ch {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        'Ý' => 'Y',
        other => other,
    }
}

#[derive(Debug)]
pub struct MatchResult {
    pub records: Vec<MatchRecord>,
    pub unresolved_matches: usize,
    pub ambiguous_matches: usize,
}

enum Selection<'c> {
    Matched(usize, &'c CorpusStormDirectory),
    Unmatched,
    Ambiguous,
}

/// Joins registry events to corpus directories. Events are visited in
/// ascending sid order; each directory can be claimed once, and later events
/// are evaluated only against what remains unclaimed.
pub struct IdentityMatcher {
    resolver: TimestampResolver,
}

impl IdentityMatcher {
    pub fn new() -> Self {
        Self {
            resolver: TimestampResolver::new(),
        }
    }

    pub fn match_events(
        &self,
        events: &BTreeMap<StormId, StormEvent>,
        directories: &[CorpusStormDirectory],
    ) -> MatchResult {
        let normalized: Vec<String> = directories
            .iter()
            .map(|dir| normalize_name(&dir.name))
            .collect();
        let mut claimed: HashSet<usize> = HashSet::new();
        let mut records = Vec::with_capacity(events.len());
        let mut unresolved_matches = 0usize;
        let mut ambiguous_matches = 0usize;

        for event in events.values() {
            let wanted = normalize_name(&event.name);
            let candidates: Vec<(usize, &CorpusStormDirectory)> = directories
                .iter()
                .enumerate()
                .filter(|(index, dir)| {
                    !claimed.contains(index)
                        && dir.year == event.year()
                        && !wanted.is_empty()
                        && normalized[*index] == wanted
                })
                .collect();

            match self.select(event, candidates) {
                Selection::Matched(index, directory) => {
                    claimed.insert(index);
                    records.push(MatchRecord::matched(event.sid.clone(), directory));
                }
                Selection::Unmatched => {
                    debug!(sid = %event.sid, name = %event.name, "no corpus candidate");
                    unresolved_matches += 1;
                    records.push(MatchRecord::unmatched(event.sid.clone()));
                }
                Selection::Ambiguous => {
                    debug!(sid = %event.sid, name = %event.name, "ambiguous corpus candidates");
                    ambiguous_matches += 1;
                    records.push(MatchRecord::ambiguous(event.sid.clone()));
                }
            }
        }

        info!(
            matched = records.iter().filter(|r| r.matched).count(),
            unresolved = unresolved_matches,
            ambiguous = ambiguous_matches,
            "identity matching complete"
        );
        MatchResult {
            records,
            unresolved_matches,
            ambiguous_matches,
        }
    }

    /// Prioritized tie-break chain: each rule may narrow the candidate set; a
    /// rule that would eliminate every candidate carries no information and
    /// leaves the set unchanged. More than one survivor after all rules is an
    /// ambiguity, never an arbitrary pick.
    fn select<'c>(
        &self,
        event: &StormEvent,
        mut candidates: Vec<(usize, &'c CorpusStormDirectory)>,
    ) -> Selection<'c> {
        if candidates.is_empty() {
            return Selection::Unmatched;
        }

        let rules: [fn(&Self, &StormEvent, &(usize, &CorpusStormDirectory)) -> bool; 2] =
            [Self::basin_rule, Self::overlap_rule];
        for rule in rules {
            if candidates.len() == 1 {
                break;
            }
            let narrowed: Vec<(usize, &CorpusStormDirectory)> = candidates
                .iter()
                .filter(|candidate| rule(self, event, candidate))
                .copied()
                .collect();
            if !narrowed.is_empty() {
                candidates = narrowed;
            }
        }

        match candidates.as_slice() {
            [(index, directory)] => Selection::Matched(*index, *directory),
            _ => Selection::Ambiguous,
        }
    }

    fn basin_rule(&self, event: &StormEvent, candidate: &(usize, &CorpusStormDirectory)) -> bool {
        translate_basin(&candidate.1.basin_dir)
            .is_some_and(|codes| codes.contains(&event.basin_code.as_str()))
    }

    /// Lazily resolves document timestamps from the candidate directory and
    /// keeps it when any falls inside the registry timeline's interval.
    fn overlap_rule(&self, event: &StormEvent, candidate: &(usize, &CorpusStormDirectory)) -> bool {
        let (Some(start), Some(end)) = (event.start(), event.end()) else {
            return false;
        };
        for (class, path) in &candidate.1.files {
            if !matches!(
                class,
                DocumentClass::ForecastAdvisory | DocumentClass::ForecastDiscussion
            ) {
                continue;
            }
            let Ok(text) = fs::read_to_string(path.as_std_path()) else {
                continue;
            };
            if let Some(instant) = self.resolver.resolve(&text).instant {
                if instant >= start && instant <= end {
                    return true;
                }
            }
        }
        false
    }
}
