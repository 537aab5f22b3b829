use std::path::PathBuf;

use crate::pipeline::{Step, StepRecord};
use crate::runtime::{Error, Result};

/// What earlier steps produced, handed explicitly to later ones
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// Trimmed read pair; set by trimming, cleared by cleanup
    pub trimmed: Option<(PathBuf, PathBuf)>,
    /// Assembly; set by assembly
    pub contigs: Option<PathBuf>,
    /// One record per attempted step, in execution order
    pub records: Vec<StepRecord>,
}

impl PipelineContext {
    pub fn trimmed_reads(&self) -> Result<(PathBuf, PathBuf)> {
        self.trimmed.clone().ok_or_else(|| {
            Error::config("Trimmed reads requested before trimming ran or after cleanup")
        })
    }

    pub fn contigs(&self) -> Result<PathBuf> {
        self.contigs
            .clone()
            .ok_or_else(|| Error::config("Contigs requested before assembly ran"))
    }

    /// Steps that were attempted, in order
    pub fn steps_run(&self) -> Vec<Step> {
        self.records.iter().map(|r| r.step).collect()
    }
}
