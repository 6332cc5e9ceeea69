use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Report, Result};

use alignfarm_alignment_rs::pairwise::Engine;
use alignfarm_core_rs::Fault;
use alignfarm_io_rs::fasta::Writer;
use alignfarm_io_rs::WriteRecord;

use super::Executor;
use crate::aligner;
use crate::job::{Job, Stage};

/// Aligns all records on the calling thread, without partitioning.
#[derive(Clone)]
pub struct Sequential {
    engine: Arc<dyn Engine>,
}

impl Sequential {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

impl Executor for Sequential {
    fn execute(&self, job: &mut Job) -> Result<PathBuf> {
        let records = job.records()?;
        let (input, output) = (job.artifacts().records(), job.artifacts().result());

        let mut writer = Writer::from_path(&input, None)?;
        writer.write_records(&records)?;
        writer.flush()?;
        drop(writer);

        job.advance(Stage::Executing);
        aligner::align_file(&input, &output, self.engine.as_ref()).map_err(|err| {
            Report::new(Fault::ShardFailure {
                shard: 0,
                reason: format!("{err:#}"),
            })
        })?;
        Ok(output)
    }
}
