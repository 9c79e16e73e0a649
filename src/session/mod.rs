//! Sessions: a `.cv2d` config file turned into a ready pipeline, and back.

pub mod config;

pub use config::SessionConfig;

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::{DataError, GridDataset};
use crate::pipeline::registry::ModRegistry;
use crate::pipeline::textual::ParseError;
use crate::pipeline::{Pipeline, PipelineError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid session file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("session file does not name a data file")]
    MissingDataFile,
}

impl From<ParseError> for SessionError {
    fn from(e: ParseError) -> Self {
        SessionError::Pipeline(PipelineError::Parse(e))
    }
}

/// A loaded session: the config it came from, the resolved data file and
/// the pipeline rebuilt over it.
pub struct Session {
    pub config: SessionConfig,
    pub datafile: PathBuf,
    pub pipeline: Pipeline,
}

impl Session {
    /// Store the pipeline's current entries in the config and write it to
    /// `path`. Plot settings loaded with the session are written back as-is.
    pub fn save(&mut self, path: &Path) -> Result<(), SessionError> {
        self.config.pipeline = Some(self.pipeline.dump());
        self.config.save(path)
    }
}

/// Open a `.cv2d` file with the built-in mods.
pub fn open(path: &Path) -> Result<Session, SessionError> {
    open_with_registry(path, ModRegistry::builtin())
}

pub fn open_with_registry(path: &Path, registry: ModRegistry) -> Result<Session, SessionError> {
    let config = SessionConfig::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let datafile = config
        .resolve_datafile(base_dir)
        .ok_or(SessionError::MissingDataFile)?;
    let pipeline = build_pipeline(&config, &datafile, registry)?;
    Ok(Session {
        config,
        datafile,
        pipeline,
    })
}

/// Load `datafile` with the config's columns and replay the config's
/// pipeline over it.
pub fn build_pipeline(
    config: &SessionConfig,
    datafile: &Path,
    registry: ModRegistry,
) -> Result<Pipeline, SessionError> {
    // parse first so a broken pipeline fails before the data is read
    let entries = config.pipeline_entries()?;
    let dataset = GridDataset::load_block_file(datafile, config.datafilecolumns)?;

    let mut pipeline = Pipeline::with_registry(registry);
    pipeline.history_mut().set_source(&datafile.display().to_string());
    pipeline.set_dataset(dataset);
    if !entries.is_empty() {
        pipeline.replace(entries)?;
    }
    Ok(pipeline)
}
