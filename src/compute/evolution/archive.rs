//! Run log persistence.
//!
//! The log is rewritten in full after every status change, through a
//! temporary file and a rename, so a reader never sees a torn file and a
//! crash loses at most the evaluation in flight.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::schema::{
    Candidate, GenerationRecord, IndividualRecord, IndividualStatus, RunLog, WeightedObjective,
};

use super::evaluator::Evaluation;

/// Failure to persist or load a run log.
#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("No generation open for record")]
    NoOpenGeneration,
    #[error("Record index {0} out of range")]
    UnknownRecord(usize),
}

impl RunLogError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Incrementally written run log.
#[derive(Debug)]
pub struct RunLogWriter {
    path: PathBuf,
    log: RunLog,
    wire_catalog: Vec<f64>,
    objectives: Vec<WeightedObjective>,
}

impl RunLogWriter {
    /// Start an empty log at `path`, creating parent directories.
    pub fn create<P: AsRef<Path>>(
        path: P,
        wire_catalog: Vec<f64>,
        objectives: Vec<WeightedObjective>,
    ) -> Result<Self, RunLogError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| RunLogError::io(parent, e))?;
        }
        let writer = Self {
            path,
            log: RunLog::default(),
            wire_catalog,
            objectives,
        };
        writer.flush()?;
        Ok(writer)
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Open a new generation. Nothing is written until its first record.
    pub fn begin_generation(&mut self, generation: usize) {
        self.log.generations.push(GenerationRecord {
            generation,
            individuals: Vec::new(),
        });
    }

    /// Append a `started` record and write the log. Returns its index.
    pub fn record_started(&mut self, candidate: &Candidate) -> Result<usize, RunLogError> {
        let record = IndividualRecord::started(candidate.clone(), &self.wire_catalog);
        let generation = self
            .log
            .generations
            .last_mut()
            .ok_or(RunLogError::NoOpenGeneration)?;
        generation.individuals.push(record);
        let index = generation.individuals.len() - 1;
        self.flush()?;
        Ok(index)
    }

    /// Fill in the outcome of record `index` and write the log.
    pub fn record_outcome(
        &mut self,
        index: usize,
        evaluation: &Evaluation,
    ) -> Result<(), RunLogError> {
        let generation = self
            .log
            .generations
            .last_mut()
            .ok_or(RunLogError::NoOpenGeneration)?;
        let record = generation
            .individuals
            .get_mut(index)
            .ok_or(RunLogError::UnknownRecord(index))?;

        record.status = evaluation.status;
        record.fitness = Some(evaluation.fitness.to_named_map(&self.objectives));
        record.error = evaluation.error.clone();
        record.violation = evaluation.violation.clone();
        debug_assert_ne!(record.status, IndividualStatus::Started);

        self.flush()
    }

    /// Rewrite the whole log atomically.
    pub fn flush(&self) -> Result<(), RunLogError> {
        write_json(&self.path, &self.log)
    }
}

/// Serialize `value` to `path` through a sibling temporary file.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), RunLogError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| RunLogError::json(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| RunLogError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| RunLogError::io(path, e))
}

/// Load a run log. A trailing generation of `started` records is accepted.
pub fn load_run_log<P: AsRef<Path>>(path: P) -> Result<RunLog, RunLogError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| RunLogError::io(path, e))?;
    serde_json::from_str(&json).map_err(|e| RunLogError::json(path, e))
}
