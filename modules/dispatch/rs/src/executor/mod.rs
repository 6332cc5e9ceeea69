use std::path::PathBuf;
use std::sync::Arc;

use derive_more::From;
use eyre::Result;

use alignfarm_alignment_rs::pairwise::Engine;
use alignfarm_core_rs::Mode;

use crate::job::Job;

pub use data_parallel::DataParallelLoop;
pub use process_pool::{ProcessPool, WorkerCommand};
pub use sequential::Sequential;
pub use thread_pool::ThreadPool;

mod data_parallel;
mod process_pool;
mod sequential;
mod sharded;
mod thread_pool;

/// Runs a job to completion and returns the path of its result file.
///
/// Executors advance the job through its stages but never clean up after it: the job artifacts
/// must outlive the executor until the result is delivered.
pub trait Executor {
    fn execute(&self, job: &mut Job) -> Result<PathBuf>;
}

/// Execution strategy for each [Mode].
#[derive(Clone, From)]
pub enum Strategy {
    Sequential(Sequential),
    ThreadPool(ThreadPool),
    ProcessPool(ProcessPool),
    DataParallelLoop(DataParallelLoop),
}

impl Executor for Strategy {
    fn execute(&self, job: &mut Job) -> Result<PathBuf> {
        match self {
            Strategy::Sequential(x) => x.execute(job),
            Strategy::ThreadPool(x) => x.execute(job),
            Strategy::ProcessPool(x) => x.execute(job),
            Strategy::DataParallelLoop(x) => x.execute(job),
        }
    }
}

/// Shared execution resources, turned into a [Strategy] once the job mode is known.
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<dyn Engine>,
    worker: WorkerCommand,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn Engine>, worker: WorkerCommand) -> Self {
        Self { engine, worker }
    }

    pub fn strategy(&self, mode: Mode) -> Strategy {
        match mode {
            Mode::Sequential => Sequential::new(self.engine.clone()).into(),
            Mode::ThreadPool => ThreadPool::new(self.engine.clone()).into(),
            Mode::ProcessPool => ProcessPool::new(self.worker.clone()).into(),
            Mode::DataParallelLoop => DataParallelLoop.into(),
        }
    }
}

impl Executor for Dispatcher {
    fn execute(&self, job: &mut Job) -> Result<PathBuf> {
        self.strategy(*job.mode()).execute(job)
    }
}
