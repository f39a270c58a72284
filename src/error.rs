use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum StormlinkError {
    #[error("invalid storm id: {0}")]
    InvalidStormId(String),

    #[error("registry file not found: {0}")]
    RegistryNotFound(PathBuf),

    #[error("failed to read registry file {path}: {message}")]
    RegistryRead { path: PathBuf, message: String },

    #[error("registry header missing mandatory column: {0}")]
    RegistryMissingColumn(String),

    #[error("failed to parse registry: {0}")]
    RegistryParse(String),

    #[error("corpus root not found: {0}")]
    CorpusRootNotFound(PathBuf),

    #[error("failed to read corpus directory {path}: {message}")]
    CorpusRead { path: PathBuf, message: String },

    #[error("bundle file not found: {0}")]
    BundleNotFound(PathBuf),

    #[error("failed to parse bundle file {path}: {message}")]
    BundleParse { path: PathBuf, message: String },

    #[error("storm not found: {0}")]
    StormNotFound(String),

    #[error("failed to write output: {0}")]
    OutputWrite(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
