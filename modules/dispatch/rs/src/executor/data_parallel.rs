use std::path::PathBuf;

use eyre::Result;

use alignfarm_core_rs::{Fault, Mode};

use super::{sharded, Executor};
use crate::job::Job;

/// Placeholder for a data-parallel loop over shards. Only the partitioning step is performed,
/// the job then fails without producing any alignment output.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataParallelLoop;

impl Executor for DataParallelLoop {
    fn execute(&self, job: &mut Job) -> Result<PathBuf> {
        sharded::prepare(job)?;
        log::warn!("Job {}: {} mode is not implemented", job.id(), Mode::DataParallelLoop);
        Err(Fault::NotImplemented {
            mode: Mode::DataParallelLoop,
        }
        .into())
    }
}
