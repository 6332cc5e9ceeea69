pub use artifacts::Artifacts;
pub use executor::{Dispatcher, Executor, Strategy, WorkerCommand};
pub use job::{Job, Stage};
pub use partition::Shard;

pub mod aligner;
mod artifacts;
pub mod cleanup;
pub mod executor;
mod job;
pub mod join;
pub mod partition;
