use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::bundle::{BundleAssembler, BundleOutcome};
use crate::corpus::CorpusScanner;
use crate::domain::{CorpusStormDirectory, MatchRecord, StormBundle, StormEvent, StormId};
use crate::error::StormlinkError;
use crate::kinematics;
use crate::matcher::IdentityMatcher;
use crate::registry::RegistryLoader;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub registry: Utf8PathBuf,
    pub corpus_root: Utf8PathBuf,
    pub jobs: Option<usize>,
}

/// Per-kind tallies for everything the run skipped or flagged instead of
/// raising. Reported once at the end; no single storm aborts the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub storms_total: usize,
    pub storms_matched: usize,
    pub rejected_records: usize,
    pub duplicate_instants: usize,
    pub unrecognized_paths: usize,
    pub unresolved_matches: usize,
    pub ambiguous_matches: usize,
    pub unparseable_timestamps: usize,
    pub encoding_failures: usize,
    pub documents_bundled: usize,
}

#[derive(Debug)]
pub struct RunReport {
    pub bundles: BTreeMap<StormId, StormBundle>,
    pub records: Vec<MatchRecord>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App;

impl App {
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, StormlinkError> {
        sink.event(ProgressEvent {
            message: "phase=Registry; loading track registry".to_string(),
        });
        let registry = RegistryLoader::load(options.registry.as_std_path())?;

        sink.event(ProgressEvent {
            message: "phase=Corpus; scanning document tree".to_string(),
        });
        let corpus = CorpusScanner::scan(&options.corpus_root)?;

        sink.event(ProgressEvent {
            message: "phase=Match; joining registry to corpus".to_string(),
        });
        let matches = IdentityMatcher::new().match_events(&registry.events, &corpus.directories);

        let directory_by_path: BTreeMap<&Utf8PathBuf, &CorpusStormDirectory> = corpus
            .directories
            .iter()
            .map(|dir| (&dir.path, dir))
            .collect();
        let tasks: Vec<(StormEvent, MatchRecord, Option<&CorpusStormDirectory>)> = registry
            .events
            .values()
            .cloned()
            .zip(matches.records.iter().cloned())
            .map(|(event, record)| {
                let directory = record
                    .corpus_path
                    .as_ref()
                    .and_then(|path| directory_by_path.get(path).copied());
                (event, record, directory)
            })
            .collect();

        sink.event(ProgressEvent {
            message: format!("phase=Bundle; processing {} storms", tasks.len()),
        });
        let bundles = run_pool(&tasks, options.jobs.unwrap_or_else(default_jobs));

        let mut summary = RunSummary {
            storms_total: registry.events.len(),
            storms_matched: matches.records.iter().filter(|r| r.matched).count(),
            rejected_records: registry.rejected_records,
            duplicate_instants: registry.duplicate_instants,
            unrecognized_paths: corpus.unrecognized_paths,
            unresolved_matches: matches.unresolved_matches,
            ambiguous_matches: matches.ambiguous_matches,
            ..RunSummary::default()
        };
        let mut finished = BTreeMap::new();
        for (sid, outcome) in bundles {
            summary.unparseable_timestamps += outcome.unparseable_timestamps;
            summary.encoding_failures += outcome.encoding_failures;
            summary.documents_bundled +=
                outcome.bundle.advisories.len() + outcome.bundle.discussions.len();
            finished.insert(sid, outcome.bundle);
        }

        info!(
            storms = summary.storms_total,
            matched = summary.storms_matched,
            documents = summary.documents_bundled,
            "run complete"
        );
        Ok(RunReport {
            bundles: finished,
            records: matches.records,
            summary,
        })
    }
}

/// Bounded worker pool over the ordered task list. Workers pull the next task
/// through a shared cursor and park each finished bundle into the result map
/// under a lock held only for the insert; ordering is re-derived from the map
/// afterwards, never from completion order.
fn run_pool(
    tasks: &[(StormEvent, MatchRecord, Option<&CorpusStormDirectory>)],
    jobs: usize,
) -> BTreeMap<StormId, BundleOutcome> {
    let jobs = jobs.max(1).min(tasks.len().max(1));
    let cursor = AtomicUsize::new(0);
    let results: Mutex<BTreeMap<StormId, BundleOutcome>> = Mutex::new(BTreeMap::new());

    thread::scope(|scope| {
        for _ in 0..jobs {
            scope.spawn(|| {
                let assembler = BundleAssembler::new();
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some((event, record, directory)) = tasks.get(index) else {
                        break;
                    };
                    let mut event = event.clone();
                    kinematics::enrich_timeline(&mut event.timeline);
                    let sid = event.sid.clone();
                    let outcome = assembler.assemble(event, record.clone(), *directory);
                    results
                        .lock()
                        .expect("bundle result lock poisoned")
                        .insert(sid, outcome);
                }
            });
        }
    });

    results.into_inner().expect("bundle result lock poisoned")
}

fn default_jobs() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::output::JsonOutput;

    fn write(path: &std::path::Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    fn fixture(root: &std::path::Path) -> RunOptions {
        let registry = root.join("registry.csv");
        write(
            &registry,
            "sid,season,basin,name,iso_time,lat,lon,wmo_wind,wmo_pres\n\
             2024181N09320,2024,NA,BERYL,2024-06-28 06:00:00,10.0,-50.0,80,980\n\
             2024181N09320,2024,NA,BERYL,2024-07-04 12:00:00,16.0,-61.0,130,940\n\
             2024190N20300,2024,NA,CHRIS,2024-06-30 00:00:00,20.0,-96.0,35,1005\n",
        );
        let corpus = root.join("corpus");
        write(
            &corpus.join("2024/Atlantic/BERYL/forecast_advisory/adv.001.txt"),
            "1500 UTC MON JUL 1 2024\nFORECAST BODY\n",
        );
        write(
            &corpus.join("2024/Atlantic/BERYL/forecast_discussion/dis.001.txt"),
            "1100 AM AST Mon Jul 1 2024\nDISCUSSION BODY\n",
        );
        RunOptions {
            registry: Utf8PathBuf::from_path_buf(registry).unwrap(),
            corpus_root: Utf8PathBuf::from_path_buf(corpus).unwrap(),
            jobs: Some(2),
        }
    }

    #[test]
    fn run_produces_bundles_for_the_whole_registry() {
        let temp = tempfile::tempdir().unwrap();
        let options = fixture(temp.path());

        let report = App.run(&options, &JsonOutput).unwrap();
        assert_eq!(report.summary.storms_total, 2);
        assert_eq!(report.summary.storms_matched, 1);
        assert_eq!(report.summary.unresolved_matches, 1);
        assert_eq!(report.bundles.len(), 2);

        let beryl = report
            .bundles
            .get(&"2024181N09320".parse().unwrap())
            .unwrap();
        assert!(beryl.record.matched);
        assert_eq!(beryl.advisories.len(), 1);
        assert_eq!(beryl.discussions.len(), 1);
        // Kinematics ran: the second fix has speed and bearing.
        assert!(beryl.event.timeline[1].speed.is_some());
        assert!(beryl.event.timeline[1].bearing.is_some());

        let chris = report
            .bundles
            .get(&"2024190N20300".parse().unwrap())
            .unwrap();
        assert!(!chris.record.matched);
        assert!(chris.advisories.is_empty());
    }

    #[test]
    fn missing_registry_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let mut options = fixture(temp.path());
        options.registry = Utf8PathBuf::from_path_buf(temp.path().join("absent.csv")).unwrap();
        let err = App.run(&options, &JsonOutput).unwrap_err();
        assert!(matches!(err, StormlinkError::RegistryNotFound(_)));
    }
}
