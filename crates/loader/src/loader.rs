//! Source loaders for histree.
//!
//! Turns a directory of CSV and YAML files into a [`HistoryTree`]. Each file
//! is parsed into [`IngestionRecord`]s which are ingested in file order; the
//! files themselves are visited depth-first, sorted by name within each
//! directory, files before subdirectories.
//!
//! ```rust,no_run
//! use histree::TracingReporter;
//!
//! let tree = histree_loader::build_db("data/", &TracingReporter).unwrap();
//! let history = tree.get_history("so_hk.labs.yale.observatory.therm1.feeds.data.ch1");
//! ```

pub mod csv_source;
pub mod yaml_source;

use histree::{BuildReporter, HistoryTree, HistreeError, IngestionRecord, TreeBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Histree(#[from] HistreeError),
    #[error("missing column \"{0}\"")]
    MissingColumn(String),
    #[error("malformed document: {0}")]
    Shape(String),
    #[error("{}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: Box<LoaderError>,
    },
}

impl LoaderError {
    fn in_file(self, path: &Path) -> Self {
        LoaderError::Source {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoaderError>;

// ---------------------------------------------------------------------------
// Source formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Yaml,
}

impl SourceFormat {
    /// Pick a format from the file extension (`.csv`, `.yaml`, `.yml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "csv" => Some(SourceFormat::Csv),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Yaml => "yaml",
        }
    }

    /// Parse source text into top-level records.
    pub fn parse(self, text: &str) -> Result<Vec<IngestionRecord>> {
        match self {
            SourceFormat::Csv => csv_source::parse_csv(text.as_bytes()),
            SourceFormat::Yaml => Ok(yaml_source::parse_yaml(text)?.into_iter().collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Build a tree from every supported file under `dir`.
pub fn build_db(dir: impl AsRef<Path>, reporter: &dyn BuildReporter) -> Result<HistoryTree> {
    let dir = dir.as_ref();
    reporter.build_started(&dir.display().to_string());
    let mut builder = TreeBuilder::new(reporter);
    for path in source_files(dir)? {
        load_file(&mut builder, &path)?;
    }
    Ok(builder.finish())
}

/// Parse one file and ingest its records. Returns the number of values added.
///
/// Files with an unsupported extension are skipped and add nothing.
pub fn load_file(builder: &mut TreeBuilder<'_>, path: &Path) -> Result<usize> {
    let Some(format) = SourceFormat::from_path(path) else {
        debug!(path = %path.display(), "skipping unsupported file");
        return Ok(0);
    };
    builder
        .reporter()
        .source_started(&path.display().to_string(), format.name());

    let ingest = |builder: &mut TreeBuilder<'_>| -> Result<usize> {
        let text = fs::read_to_string(path)?;
        let mut added = 0;
        for record in format.parse(&text)? {
            added += builder.ingest(&record)?;
        }
        Ok(added)
    };
    ingest(builder).map_err(|e| e.in_file(path))
}

/// Supported source files under `dir`, in visiting order.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(dir, &mut found).map_err(|e| LoaderError::from(e).in_file(dir))?;
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    files.sort();
    dirs.sort();

    found.extend(
        files
            .into_iter()
            .filter(|p| SourceFormat::from_path(p).is_some()),
    );
    for sub in dirs {
        walk(&sub, found)?;
    }
    Ok(())
}
