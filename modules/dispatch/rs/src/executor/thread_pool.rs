use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use eyre::Result;

use alignfarm_alignment_rs::pairwise::Engine;

use super::{sharded, Executor};
use crate::aligner;
use crate::job::{Job, Stage};
use crate::join::join;

/// Aligns each shard on a dedicated thread of a rayon pool sized to the job parallelism.
#[derive(Clone)]
pub struct ThreadPool {
    engine: Arc<dyn Engine>,
}

impl ThreadPool {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

impl Executor for ThreadPool {
    fn execute(&self, job: &mut Job) -> Result<PathBuf> {
        sharded::prepare(job)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(job.parallelism().get())
            .thread_name(|shard| format!("alignfarm-shard-{shard}"))
            .build()?;

        job.advance(Stage::Executing);
        let failed = AtomicBool::new(false);
        let failures = Mutex::new(Vec::new());
        {
            let (engine, artifacts) = (self.engine.as_ref(), job.artifacts());
            let (failed, failures) = (&failed, &failures);
            pool.scope(|s| {
                for shard in job.parallelism().shards() {
                    s.spawn(move |_| {
                        let (input, output) =
                            (artifacts.shard_records(shard), artifacts.shard_output(shard));
                        match aligner::align_file(&input, &output, engine) {
                            Ok(entries) => log::debug!("Shard {shard}: {entries} entries"),
                            Err(err) => {
                                failed.store(true, Ordering::Relaxed);
                                match failures.lock() {
                                    Ok(mut failures) => failures.push((shard, err)),
                                    Err(_) => log::error!("Shard {shard} failed: {err:#}"),
                                }
                            }
                        }
                    });
                }
            });
        }

        if failed.load(Ordering::Relaxed) {
            sharded::fail(job, failures.into_inner()?)?;
        }
        let result = join(job.artifacts(), *job.parallelism())?;
        job.advance(Stage::Joined);
        Ok(result)
    }
}
