use std::path::{Path, PathBuf};

use derive_getters::Getters;

/// Layout of the transient files of a single job. All paths live in a job-private directory and
/// shard artifacts are suffixed with the shard index, so concurrent shards never share a file.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct Artifacts {
    root: PathBuf,
}

impl Artifacts {
    pub const JOB_DIR_PREFIX: &'static str = "job-";
    const RECORDS: &'static str = "records.fasta";
    const ALIGNED: &'static str = "aligned.txt";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifacts of the job `id` inside the server working directory.
    pub fn for_job(workdir: impl AsRef<Path>, id: u64) -> Self {
        Self::new(
            workdir
                .as_ref()
                .join(format!("{}{id}", Self::JOB_DIR_PREFIX)),
        )
    }

    /// Decoded records of the whole job (sequential mode only).
    pub fn records(&self) -> PathBuf {
        self.root.join(Self::RECORDS)
    }

    /// Final result of the job: the joined shard outputs or the sequential output.
    pub fn result(&self) -> PathBuf {
        self.root.join(Self::ALIGNED)
    }

    pub fn shard_records(&self, shard: usize) -> PathBuf {
        self.root.join(format!("{}.{shard}", Self::RECORDS))
    }

    pub fn shard_output(&self, shard: usize) -> PathBuf {
        self.root.join(format!("{}.{shard}", Self::ALIGNED))
    }
}
