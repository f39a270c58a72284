use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::StormlinkError;

/// Output root layout. Every artifact is written atomically (temp file plus
/// rename) so a rerun never leaves a half-written file behind.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn matched_csv_path(&self) -> Utf8PathBuf {
        self.root.join("matched_storms.csv")
    }

    pub fn tracks_csv_path(&self) -> Utf8PathBuf {
        self.root.join("storm_tracks.csv")
    }

    pub fn bundles_json_path(&self) -> Utf8PathBuf {
        self.root.join("storm_bundles.json")
    }

    pub fn ensure_root(&self) -> Result<(), StormlinkError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| StormlinkError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), StormlinkError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| StormlinkError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| StormlinkError::OutputWrite(err.to_string()))?;
        Ok(())
    }
}
