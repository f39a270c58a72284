use std::cmp::Ordering;
use std::fs;

use tracing::warn;

use crate::domain::{
    CorpusStormDirectory, DocumentClass, ForecastDocument, MatchRecord, StormBundle, StormEvent,
};
use crate::timestamp::TimestampResolver;

#[derive(Debug)]
pub struct BundleOutcome {
    pub bundle: StormBundle,
    pub unparseable_timestamps: usize,
    pub encoding_failures: usize,
}

/// Collects a matched directory's documents, resolves their header
/// timestamps, and attaches both class sequences to the storm in
/// chronological order. Unmatched storms get a bundle with empty sequences.
pub struct BundleAssembler {
    resolver: TimestampResolver,
}

impl BundleAssembler {
    pub fn new() -> Self {
        Self {
            resolver: TimestampResolver::new(),
        }
    }

    pub fn assemble(
        &self,
        event: StormEvent,
        record: MatchRecord,
        directory: Option<&CorpusStormDirectory>,
    ) -> BundleOutcome {
        let mut unparseable_timestamps = 0usize;
        let mut encoding_failures = 0usize;
        let mut advisories = Vec::new();
        let mut discussions = Vec::new();

        if let Some(directory) = directory.filter(|_| record.matched) {
            advisories = self.collect_class(
                directory,
                &DocumentClass::ForecastAdvisory,
                &mut unparseable_timestamps,
                &mut encoding_failures,
            );
            discussions = self.collect_class(
                directory,
                &DocumentClass::ForecastDiscussion,
                &mut unparseable_timestamps,
                &mut encoding_failures,
            );
        }

        BundleOutcome {
            bundle: StormBundle {
                event,
                record,
                advisories,
                discussions,
            },
            unparseable_timestamps,
            encoding_failures,
        }
    }

    fn collect_class(
        &self,
        directory: &CorpusStormDirectory,
        class: &DocumentClass,
        unparseable_timestamps: &mut usize,
        encoding_failures: &mut usize,
    ) -> Vec<ForecastDocument> {
        let mut documents = Vec::new();
        for path in directory.files_of(class) {
            let bytes = match fs::read(path.as_std_path()) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!("skipping unreadable document {path}: {err}");
                    *encoding_failures += 1;
                    continue;
                }
            };
            let body = match String::from_utf8(bytes) {
                Ok(body) => body,
                Err(_) => {
                    warn!("skipping non-utf8 document {path}");
                    *encoding_failures += 1;
                    continue;
                }
            };

            let resolution = self.resolver.resolve(&body);
            if resolution.instant.is_none() {
                *unparseable_timestamps += 1;
            }
            documents.push(ForecastDocument {
                filename: path.file_name().unwrap_or_default().to_string(),
                raw_timestamp: resolution.raw,
                resolved_instant: resolution.instant,
                body,
            });
        }
        sort_documents(&mut documents);
        documents
    }
}

/// Resolved documents first in ascending order, unresolved last; filename is
/// the final key either way.
fn sort_documents(documents: &mut [ForecastDocument]) {
    documents.sort_by(|a, b| match (a.resolved_instant, b.resolved_instant) {
        (Some(left), Some(right)) => left
            .cmp(&right)
            .then_with(|| a.filename.cmp(&b.filename)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.filename.cmp(&b.filename),
    });
}
