//! Colorplot data model and replayable mod pipeline.
//!
//! A [`GridDataset`] holds a 2D grid of z values with the x and y axis
//! coordinates of its columns and rows. A [`Pipeline`] owns an untouched
//! original dataset and an ordered list of mods; the current dataset is
//! always the result of replaying every mod over a fresh copy of the
//! original.

pub mod data;
pub mod history;
pub mod pipeline;
pub mod session;

pub use data::{BlockColumns, DataError, GridDataset};
pub use history::ProcessingHistory;
pub use pipeline::mods::{ModArg, ModKind};
pub use pipeline::registry::ModRegistry;
pub use pipeline::{Pipeline, PipelineEntry, PipelineError, PipelineListener, ReplayReport};
pub use session::{Session, SessionConfig, SessionError};
