//! Stage reporting for pipeline runs.

use std::cell::RefCell;
use std::fmt;

use tracing::{info, warn};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    ValidateAlignment,
    CleanOverflow,
    IndexTime,
    Calibrate,
    Rename,
    Normalize,
    Average,
    Export,
    Plot,
    Publish,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::ValidateAlignment => "validate-alignment",
            Stage::CleanOverflow => "clean-overflow",
            Stage::IndexTime => "index-time",
            Stage::Calibrate => "calibrate",
            Stage::Rename => "rename",
            Stage::Normalize => "normalize",
            Stage::Average => "average",
            Stage::Export => "export",
            Stage::Plot => "plot",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives progress messages from the orchestrator.
pub trait ProgressSink {
    /// A stage finished; `message` says what it produced.
    fn stage(&self, stage: Stage, message: &str);

    /// Something looks off but the run continues.
    fn warn(&self, message: &str);
}

/// Forwards progress to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn stage(&self, stage: Stage, message: &str) {
        info!(stage = stage.name(), "{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }
}

/// Keeps every message in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    stages: RefCell<Vec<(Stage, String)>>,
    warnings: RefCell<Vec<String>>,
}

impl RecordingProgress {
    pub fn stages(&self) -> Vec<Stage> {
        self.stages.borrow().iter().map(|(s, _)| *s).collect()
    }

    pub fn messages(&self) -> Vec<(Stage, String)> {
        self.stages.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn stage(&self, stage: Stage, message: &str) {
        self.stages.borrow_mut().push((stage, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }
}
