use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::domain::{CorpusStormDirectory, DocumentClass};
use crate::error::StormlinkError;

#[derive(Debug)]
pub struct CorpusScanResult {
    pub directories: Vec<CorpusStormDirectory>,
    pub unrecognized_paths: usize,
}

/// Walks `<root>/<year>/<basin>/<storm>/<class>/<file>` without parsing any
/// file content. Entries that break the expected shape are counted and
/// skipped, never fatal.
pub struct CorpusScanner;

impl CorpusScanner {
    pub fn scan(root: &Utf8Path) -> Result<CorpusScanResult, StormlinkError> {
        if !root.is_dir() {
            return Err(StormlinkError::CorpusRootNotFound(
                root.as_std_path().to_path_buf(),
            ));
        }

        let mut directories = Vec::new();
        let mut unrecognized_paths = 0usize;

        for year_entry in read_dir_sorted(root)? {
            let year: i32 = match year_entry.file_name().and_then(|n| n.parse().ok()) {
                Some(year) if year_entry.is_dir() => year,
                _ => {
                    warn!("skipping non-year entry {year_entry}");
                    unrecognized_paths += 1;
                    continue;
                }
            };

            for basin_entry in read_dir_sorted(&year_entry)? {
                if !basin_entry.is_dir() {
                    warn!("skipping stray file at basin level: {basin_entry}");
                    unrecognized_paths += 1;
                    continue;
                }
                let basin_dir = basin_entry.file_name().unwrap_or_default().to_string();

                for storm_entry in read_dir_sorted(&basin_entry)? {
                    if !storm_entry.is_dir() {
                        warn!("skipping stray file at storm level: {storm_entry}");
                        unrecognized_paths += 1;
                        continue;
                    }
                    let name = storm_entry
                        .file_name()
                        .unwrap_or_default()
                        .trim()
                        .to_uppercase();

                    let mut files = Vec::new();
                    for class_entry in read_dir_sorted(&storm_entry)? {
                        if !class_entry.is_dir() {
                            warn!("skipping file outside a class directory: {class_entry}");
                            unrecognized_paths += 1;
                            continue;
                        }
                        let class = DocumentClass::from_dir_name(
                            class_entry.file_name().unwrap_or_default(),
                        );
                        for file_entry in read_dir_sorted(&class_entry)? {
                            if file_entry.is_dir() {
                                warn!("skipping nested directory {file_entry}");
                                unrecognized_paths += 1;
                                continue;
                            }
                            files.push((class.clone(), file_entry));
                        }
                    }

                    directories.push(CorpusStormDirectory {
                        year,
                        basin_dir: basin_dir.clone(),
                        name,
                        path: storm_entry,
                        files,
                    });
                }
            }
        }

        info!(
            storms = directories.len(),
            unrecognized = unrecognized_paths,
            "scanned corpus at {root}"
        );
        Ok(CorpusScanResult {
            directories,
            unrecognized_paths,
        })
    }
}

fn read_dir_sorted(path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, StormlinkError> {
    let entries = fs::read_dir(path.as_std_path()).map_err(|err| StormlinkError::CorpusRead {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| StormlinkError::CorpusRead {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;
        match Utf8PathBuf::from_path_buf(entry.path()) {
            Ok(path) => paths.push(path),
            Err(path) => {
                warn!("skipping non-utf8 path {}", path.display());
            }
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn touch(path: &std::path::Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"FORECAST\n").unwrap();
    }

    #[test]
    fn discovers_storm_directories_with_classified_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(&root.join("2024/Atlantic/BERYL/forecast_advisory/adv.001.txt"));
        touch(&root.join("2024/Atlantic/BERYL/forecast_discussion/dis.001.txt"));
        touch(&root.join("2024/E_Pacific/ALETTA/forecast_advisory/adv.001.txt"));

        let root = Utf8Path::from_path(root).unwrap();
        let result = CorpusScanner::scan(root).unwrap();
        assert_eq!(result.directories.len(), 2);
        assert_eq!(result.unrecognized_paths, 0);

        let beryl = result
            .directories
            .iter()
            .find(|dir| dir.name == "BERYL")
            .unwrap();
        assert_eq!(beryl.year, 2024);
        assert_eq!(beryl.basin_dir, "Atlantic");
        assert!(beryl.has_advisory());
        assert!(beryl.has_discussion());
    }

    #[test]
    fn unknown_class_directories_are_retained_as_other() {
        let temp = tempfile::tempdir().unwrap();
        touch(&temp.path().join("2024/Atlantic/BERYL/wind_probabilities/prob.001.txt"));

        let root = Utf8Path::from_path(temp.path()).unwrap();
        let result = CorpusScanner::scan(root).unwrap();
        let beryl = &result.directories[0];
        assert!(!beryl.has_advisory());
        assert_eq!(beryl.files.len(), 1);
        assert_matches!(beryl.files[0].0, DocumentClass::Other(_));
    }

    #[test]
    fn malformed_entries_are_counted_not_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(&root.join("2024/Atlantic/BERYL/forecast_advisory/adv.001.txt"));
        touch(&root.join("notes.txt"));
        fs::create_dir_all(root.join("unsorted")).unwrap();
        touch(&root.join("2024/Atlantic/stray.txt"));
        touch(&root.join("2024/Atlantic/BERYL/stray.txt"));

        let root = Utf8Path::from_path(root).unwrap();
        let result = CorpusScanner::scan(root).unwrap();
        assert_eq!(result.directories.len(), 1);
        assert_eq!(result.unrecognized_paths, 4);
    }

    #[test]
    fn missing_root_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("absent");
        let err = CorpusScanner::scan(Utf8Path::from_path(&missing).unwrap()).unwrap_err();
        assert_matches!(err, StormlinkError::CorpusRootNotFound(_));
    }

    #[test]
    fn file_lists_are_sorted_for_determinism() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(&root.join("2024/Atlantic/BERYL/forecast_advisory/adv.003.txt"));
        touch(&root.join("2024/Atlantic/BERYL/forecast_advisory/adv.001.txt"));
        touch(&root.join("2024/Atlantic/BERYL/forecast_advisory/adv.002.txt"));

        let root = Utf8Path::from_path(root).unwrap();
        let result = CorpusScanner::scan(root).unwrap();
        let names: Vec<_> = result.directories[0]
            .files
            .iter()
            .map(|(_, path)| path.file_name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["adv.001.txt", "adv.002.txt", "adv.003.txt"]);
    }
}
