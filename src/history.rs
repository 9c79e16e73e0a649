//! Processing history
//!
//! Every mutation of a pipeline is recorded with:
//! - Sequential order
//! - Timestamp
//! - Operation name and description
//! - The full pipeline text after the operation
//!
//! The last entry's pipeline text alone is enough to reproduce the result;
//! the earlier entries show how it was reached. The history can be exported
//! as human-readable text or JSON.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// A single recorded operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Sequential operation number (1-based)
    pub sequence: usize,
    pub timestamp: DateTime<Local>,
    /// Short operation name ("Add", "Remove", ...)
    pub operation: String,
    pub description: String,
    /// Textual pipeline form after the operation
    pub pipeline: String,
}

impl HistoryEntry {
    pub fn to_text(&self) -> String {
        format!(
            "[{:03}] {} | {} | {}\n      Pipeline: {}",
            self.sequence,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.operation,
            self.description,
            self.pipeline
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingHistory {
    pub session_id: String,
    pub session_start: DateTime<Local>,
    /// Data file the session was opened from, if any
    pub source_file: String,
    pub software_version: String,
    pub entries: Vec<HistoryEntry>,
}

impl ProcessingHistory {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session_start: Local::now(),
            source_file: String::new(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            entries: Vec::new(),
        }
    }

    pub fn set_source(&mut self, source: &str) {
        self.source_file = source.to_string();
    }

    /// Append an operation.
    pub fn record(&mut self, operation: &str, description: &str, pipeline: &str) {
        let seq = self.entries.len() + 1;
        self.entries.push(HistoryEntry {
            sequence: seq,
            timestamp: Local::now(),
            operation: operation.to_string(),
            description: description.to_string(),
            pipeline: pipeline.to_string(),
        });
        log::info!("[HISTORY {:03}] {}: {}", seq, operation, description);
    }

    /// Pipeline text after the most recent operation.
    pub fn latest_pipeline(&self) -> Option<&str> {
        self.entries.last().map(|e| e.pipeline.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_text(&self) -> String {
        let rule = "=".repeat(64);
        let mut out = String::new();
        out.push_str(&rule);
        out.push_str("\n  Colorplot Processing History\n");
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("  Session ID:  {}\n", self.session_id));
        out.push_str(&format!(
            "  Started:     {}\n",
            self.session_start.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("  Source:      {}\n", self.source_file));
        out.push_str(&format!("  Software:    colorview v{}\n", self.software_version));
        out.push_str(&format!("  Operations:  {}\n", self.entries.len()));
        out.push_str(&"-".repeat(64));
        out.push_str("\n\n");

        for entry in &self.entries {
            out.push_str(&entry.to_text());
            out.push_str("\n\n");
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn save_text(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_text())
    }

    pub fn save_json(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for ProcessingHistory {
    fn default() -> Self {
        Self::new()
    }
}
