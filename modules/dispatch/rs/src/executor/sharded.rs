use eyre::{Report, Result};

use alignfarm_core_rs::Fault;

use crate::job::{Job, Stage};
use crate::partition;

/// Splits the job records into shards and saves them as individual FASTA files.
pub(super) fn prepare(job: &mut Job) -> Result<()> {
    let records = job.records()?;
    let total = records.len();
    let shards = partition::partition(records, *job.parallelism());
    partition::write_shards(&shards, job.artifacts())?;

    log::debug!(
        "Job {}: {total} records dealt into {} shards",
        job.id(),
        job.parallelism()
    );
    job.advance(Stage::Partitioned);
    Ok(())
}

/// Turns the errors of individual shards into a single report for the whole job.
///
/// The report is rooted at the [Fault::ShardFailure] of the first failed shard, while every
/// failure is logged.
pub(super) fn fail(job: &Job, mut failures: Vec<(usize, Report)>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    failures.sort_by_key(|(shard, _)| *shard);
    for (shard, err) in &failures {
        log::error!("Job {}: shard {shard} failed: {err:#}", job.id());
    }

    let count = failures.len();
    let (shard, err) = failures.swap_remove(0);
    let fault = Fault::ShardFailure {
        shard,
        reason: format!("{err:#}"),
    };
    Err(Report::new(fault).wrap_err(format!(
        "{count} of {} shards failed",
        job.parallelism()
    )))
}
