use std::fs;
use std::path::Path;

use derive_getters::Getters;
use derive_more::Display;
use eyre::{Result, WrapErr};

use alignfarm_core_rs::{Mode, Parallelism};
use alignfarm_io_rs::fasta::Record;
use alignfarm_io_rs::source;

use crate::artifacts::Artifacts;
use crate::cleanup;

/// Lifecycle of a job. Sequential jobs skip the partitioning and joining stages.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Stage {
    #[display("received")]
    Received,
    #[display("partitioned")]
    Partitioned,
    #[display("executing")]
    Executing,
    #[display("joined")]
    Joined,
    #[display("cleaned")]
    Cleaned,
    #[display("responded")]
    Responded,
    #[display("aborted")]
    Aborted,
}

/// A single alignment request together with the transient files it owns.
#[derive(Debug, Getters)]
pub struct Job {
    id: u64,
    mode: Mode,
    parallelism: Parallelism,
    payload: Vec<u8>,
    artifacts: Artifacts,
    #[getter(skip)]
    history: Vec<Stage>,
}

impl Job {
    /// Accepts a job and creates its private artifacts directory inside `workdir`.
    pub fn new(
        id: u64,
        mode: Mode,
        parallelism: Parallelism,
        payload: Vec<u8>,
        workdir: impl AsRef<Path>,
    ) -> Result<Self> {
        let artifacts = Artifacts::for_job(workdir, id);
        fs::create_dir_all(artifacts.root()).wrap_err_with(|| {
            format!(
                "Failed to create the job directory {}",
                artifacts.root().display()
            )
        })?;

        log::debug!(
            "Job {id}: {} bytes in {mode} mode, parallelism {parallelism}",
            payload.len()
        );
        Ok(Self {
            id,
            mode,
            parallelism,
            payload,
            artifacts,
            history: vec![Stage::Received],
        })
    }

    /// Decodes the payload into records.
    pub fn records(&self) -> Result<Vec<Record>> {
        source::records(&self.payload)
    }

    pub fn stage(&self) -> Stage {
        // History is never empty: a job starts as received
        self.history.last().copied().unwrap_or(Stage::Received)
    }

    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    pub fn advance(&mut self, stage: Stage) {
        log::debug!("Job {}: {} -> {}", self.id, self.stage(), stage);
        self.history.push(stage);
    }

    /// Removes every transient file of the job. Never fails, see [cleanup::cleanup].
    pub fn cleanup(&mut self) -> usize {
        let removed = cleanup::cleanup(&self.artifacts, self.mode, self.parallelism);
        self.advance(Stage::Cleaned);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() -> Result<()> {
        let workdir = tempfile::tempdir()?;
        let mut job = Job::new(
            3,
            Mode::Sequential,
            Parallelism::default(),
            b">a\nACGT\n".to_vec(),
            workdir.path(),
        )?;
        assert!(job.artifacts().root().is_dir());
        assert_eq!(job.stage(), Stage::Received);
        assert_eq!(job.records()?.len(), 1);

        job.advance(Stage::Executing);
        job.cleanup();
        job.advance(Stage::Responded);
        assert_eq!(
            job.history(),
            [
                Stage::Received,
                Stage::Executing,
                Stage::Cleaned,
                Stage::Responded
            ]
        );
        assert!(!job.artifacts().root().exists());
        Ok(())
    }
}
