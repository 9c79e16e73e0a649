//! The mod pipeline: an ordered list of `(kind, args)` entries replayed
//! against an untouched original dataset.
//!
//! `current` is never edited on its own. Every mutation of the entry list
//! replays all entries from a fresh copy of `original`, so removing an entry
//! removes every trace of it.

pub mod filters;
pub mod mods;
pub mod registry;
pub mod textual;

use thiserror::Error;

use crate::data::GridDataset;
use crate::history::ProcessingHistory;
use mods::{args_literal, ApplyError, ModArg, ModKind};
use registry::ModRegistry;
use textual::ParseError;

/// One pipeline step: the registered mod name and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEntry {
    pub kind: String,
    pub args: Vec<ModArg>,
}

impl PipelineEntry {
    pub fn new(kind: impl Into<String>, args: Vec<ModArg>) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    pub fn builtin(kind: ModKind, args: Vec<ModArg>) -> Self {
        Self::new(kind.name(), args)
    }
}

impl std::fmt::Display for PipelineEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind, args_literal(&self.args))
    }
}

/// A mod that could not be applied during replay.
#[derive(Error, Debug)]
#[error("mod {kind}{} (entry {index}) failed: {source}", args_literal(.args))]
pub struct ModFailure {
    pub kind: String,
    pub args: Vec<ModArg>,
    /// Position of the entry in the pipeline
    pub index: usize,
    #[source]
    pub source: ApplyError,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no dataset loaded")]
    NotReady,
    #[error("unknown mod '{0}'")]
    UnknownMod(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Outcome of the most recent replay.
#[derive(Debug, Default)]
pub struct ReplayReport {
    /// Names of the entries that were applied, in order
    pub applied: Vec<String>,
    /// Entries that failed and were skipped
    pub failed: Vec<ModFailure>,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Pipeline positions of the skipped entries.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.index).collect()
    }
}

/// Called after every completed replay.
pub trait PipelineListener {
    fn pipeline_updated(&mut self, current: &GridDataset, report: &ReplayReport);
}

impl<F> PipelineListener for F
where
    F: FnMut(&GridDataset, &ReplayReport),
{
    fn pipeline_updated(&mut self, current: &GridDataset, report: &ReplayReport) {
        self(current, report)
    }
}

struct Loaded {
    original: GridDataset,
    current: GridDataset,
}

/// Ordered, replayable list of mods over one dataset.
///
/// A pipeline starts out empty (no dataset); every operation except
/// [`Pipeline::set_dataset`] and [`Pipeline::dump`] then fails with
/// [`PipelineError::NotReady`]. Callers sharing a pipeline across threads
/// must serialize access themselves.
pub struct Pipeline {
    registry: ModRegistry,
    loaded: Option<Loaded>,
    entries: Vec<PipelineEntry>,
    report: ReplayReport,
    history: ProcessingHistory,
    listener: Option<Box<dyn PipelineListener>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// A pipeline over the built-in mods.
    pub fn new() -> Self {
        Self::with_registry(ModRegistry::builtin())
    }

    pub fn with_registry(registry: ModRegistry) -> Self {
        Self {
            registry,
            loaded: None,
            entries: Vec::new(),
            report: ReplayReport::default(),
            history: ProcessingHistory::new(),
            listener: None,
        }
    }

    pub fn registry(&self) -> &ModRegistry {
        &self.registry
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn entries(&self) -> &[PipelineEntry] {
        &self.entries
    }

    pub fn original(&self) -> Option<&GridDataset> {
        self.loaded.as_ref().map(|l| &l.original)
    }

    pub fn current(&self) -> Option<&GridDataset> {
        self.loaded.as_ref().map(|l| &l.current)
    }

    pub fn last_report(&self) -> &ReplayReport {
        &self.report
    }

    pub fn history(&self) -> &ProcessingHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ProcessingHistory {
        &mut self.history
    }

    pub fn set_listener(&mut self, listener: Box<dyn PipelineListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Use `dataset` as the new original. Clears all entries.
    pub fn set_dataset(&mut self, dataset: GridDataset) {
        let description = format!(
            "{}x{} grid, x {} .. {}, y {} .. {}",
            dataset.ny(),
            dataset.nx(),
            dataset.xleft(),
            dataset.xright(),
            dataset.ybottom(),
            dataset.ytop()
        );
        let current = dataset.deep_copy();
        self.loaded = Some(Loaded {
            original: dataset,
            current,
        });
        self.entries.clear();
        self.report = ReplayReport::default();
        self.notify();
        let text = self.dump();
        self.history.record("Set Dataset", &description, &text);
    }

    /// Add a mod. An entry of the same kind is replaced in place; otherwise
    /// the entry goes to the end. Empty `args` means the kind's defaults.
    pub fn add(&mut self, kind: &str, args: Vec<ModArg>) -> Result<&GridDataset, PipelineError> {
        self.ensure_ready()?;
        let registered = self
            .registry
            .get(kind)
            .ok_or_else(|| PipelineError::UnknownMod(kind.to_string()))?;
        let args = if args.is_empty() {
            registered.default_args.clone()
        } else {
            args
        };
        let entry = PipelineEntry::new(kind, args);
        let description = entry.to_string();

        match self.entries.iter().position(|e| e.kind == kind) {
            Some(pos) => {
                self.entries[pos] = entry;
                let mut seen = false;
                self.entries.retain(|e| {
                    if e.kind != kind {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                self.commit("Replace", &description)
            }
            None => {
                self.entries.push(entry);
                self.commit("Add", &description)
            }
        }
    }

    /// Add one of the built-in kinds.
    pub fn add_builtin(&mut self, kind: ModKind, args: Vec<ModArg>) -> Result<&GridDataset, PipelineError> {
        self.add(kind.name(), args)
    }

    /// Remove every entry of `kind`. Removing an absent kind is a no-op.
    pub fn remove(&mut self, kind: &str) -> Result<&GridDataset, PipelineError> {
        self.ensure_ready()?;
        let before = self.entries.len();
        self.entries.retain(|e| e.kind != kind);
        let removed = before - self.entries.len();
        self.commit("Remove", &format!("{} ({} entries)", kind, removed))
    }

    /// Drop all entries, leaving `current` equal to `original`.
    pub fn reset(&mut self) -> Result<&GridDataset, PipelineError> {
        self.ensure_ready()?;
        self.entries.clear();
        self.commit("Reset", "cleared all entries")
    }

    /// Replace the whole entry list. Every kind must be registered.
    pub fn replace(&mut self, entries: Vec<PipelineEntry>) -> Result<&GridDataset, PipelineError> {
        self.ensure_ready()?;
        self.check_known(&entries)?;
        self.entries = entries;
        let description = format!("{} entries", self.entries.len());
        self.commit("Replace All", &description)
    }

    /// Replace the entry list with one parsed from its textual form.
    pub fn load(&mut self, text: &str) -> Result<&GridDataset, PipelineError> {
        self.ensure_ready()?;
        let entries = textual::parse_entries(text)?;
        self.check_known(&entries)?;
        self.entries = entries;
        let description = format!("{} entries from text", self.entries.len());
        self.commit("Load", &description)
    }

    /// The entry list in its textual form.
    pub fn dump(&self) -> String {
        textual::format_entries(&self.entries)
    }

    /// Rebuild `current` from `original` by replaying every entry in order.
    /// Failing entries are logged, reported and skipped.
    pub fn apply_all(&mut self) -> Result<&GridDataset, PipelineError> {
        self.refresh()?;
        self.current().ok_or(PipelineError::NotReady)
    }

    fn ensure_ready(&self) -> Result<(), PipelineError> {
        if self.loaded.is_none() {
            return Err(PipelineError::NotReady);
        }
        Ok(())
    }

    fn check_known(&self, entries: &[PipelineEntry]) -> Result<(), PipelineError> {
        match entries.iter().find(|e| !self.registry.contains(&e.kind)) {
            Some(e) => Err(PipelineError::UnknownMod(e.kind.clone())),
            None => Ok(()),
        }
    }

    fn refresh(&mut self) -> Result<(), PipelineError> {
        let loaded = self.loaded.as_mut().ok_or(PipelineError::NotReady)?;
        let (current, report) = replay(&self.registry, &loaded.original, &self.entries);
        loaded.current = current;
        self.report = report;
        self.notify();
        Ok(())
    }

    fn notify(&mut self) {
        if let (Some(listener), Some(loaded)) = (self.listener.as_mut(), self.loaded.as_ref()) {
            listener.pipeline_updated(&loaded.current, &self.report);
        }
    }

    /// Replay, record the step in the history, and hand back `current`.
    fn commit(&mut self, operation: &str, description: &str) -> Result<&GridDataset, PipelineError> {
        self.refresh()?;
        let mut description = description.to_string();
        if !self.report.is_clean() {
            description.push_str(&format!(
                " [{} entr{} skipped]",
                self.report.failed.len(),
                if self.report.failed.len() == 1 { "y" } else { "ies" }
            ));
        }
        let text = self.dump();
        self.history.record(operation, &description, &text);
        self.current().ok_or(PipelineError::NotReady)
    }
}

fn replay(
    registry: &ModRegistry,
    original: &GridDataset,
    entries: &[PipelineEntry],
) -> (GridDataset, ReplayReport) {
    let mut current = original.deep_copy();
    let mut report = ReplayReport::default();

    for (index, entry) in entries.iter().enumerate() {
        let result = registry
            .apply(&entry.kind, &current, &entry.args)
            .unwrap_or_else(|| {
                Err(ApplyError::Invalid(format!(
                    "mod '{}' is not registered",
                    entry.kind
                )))
            });
        match result {
            Ok(next) => {
                log::debug!(
                    "Applied {} -> {}x{} grid",
                    entry,
                    next.ny(),
                    next.nx()
                );
                current = next;
                report.applied.push(entry.kind.clone());
            }
            Err(source) => {
                let failure = ModFailure {
                    kind: entry.kind.clone(),
                    args: entry.args.clone(),
                    index,
                    source,
                };
                log::warn!("Skipping {}", failure);
                report.failed.push(failure);
            }
        }
    }

    (current, report)
}
