//! The `.cv2d` session document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::SessionError;
use crate::data::BlockColumns;
use crate::pipeline::textual::{self, ParseError};
use crate::pipeline::{Pipeline, PipelineEntry};

/// Everything needed to rebuild a colorplot session: which file, which
/// columns, and which pipeline. Plot settings (colormap, colorbar limits,
/// labels, fonts, geometry) are kept as opaque values and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datafilename: Option<PathBuf>,
    #[serde(default)]
    pub datafilecolumns: BlockColumns,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = std::fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&json)?;
        log::info!("Loaded session config {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved session config {}", path.display());
        Ok(())
    }

    /// Snapshot a pipeline's entries together with the data file it was
    /// loaded from.
    pub fn capture(pipeline: &Pipeline, datafile: Option<&Path>, columns: BlockColumns) -> Self {
        Self {
            datafilename: datafile.map(Path::to_path_buf),
            datafilecolumns: columns,
            pipeline: Some(pipeline.dump()),
            settings: BTreeMap::new(),
        }
    }

    /// The data file path, relative paths taken against `base_dir`.
    pub fn resolve_datafile(&self, base_dir: &Path) -> Option<PathBuf> {
        self.datafilename.as_ref().map(|p| {
            if p.is_relative() {
                base_dir.join(p)
            } else {
                p.clone()
            }
        })
    }

    /// Entries of the stored pipeline. No pipeline key is an empty
    /// pipeline, not an error.
    pub fn pipeline_entries(&self) -> Result<Vec<PipelineEntry>, ParseError> {
        match self.pipeline.as_deref() {
            None => Ok(Vec::new()),
            Some(text) => textual::parse_entries(text),
        }
    }

    /// A preserved UI setting such as `Colormap` or `Cbmin`.
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.settings.get(key)
    }

    pub fn set_setting(&mut self, key: &str, value: serde_json::Value) {
        self.settings.insert(key.to_string(), value);
    }
}
