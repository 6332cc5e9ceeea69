use derive_more::Display;

use crate::Fault;

/// Execution strategy requested by the submitter. The numeric codes are part of the wire protocol.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum Mode {
    /// All pairs are aligned on the calling thread, no partitioning.
    #[display("sequential")]
    Sequential = 1,
    /// Shards are aligned by a pool of in-process worker threads.
    #[display("thread-pool")]
    ThreadPool = 2,
    /// Shards are aligned by isolated OS processes communicating through the filesystem.
    #[display("process-pool")]
    ProcessPool = 3,
    /// Data-parallel loop over shards. Reserved, has no working implementation.
    #[display("data-parallel-loop")]
    DataParallelLoop = 4,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::Sequential,
        Mode::ThreadPool,
        Mode::ProcessPool,
        Mode::DataParallelLoop,
    ];

    pub fn code(&self) -> u64 {
        *self as u8 as u64
    }

    /// Returns `true` if the mode splits the records into shards.
    pub fn is_sharded(&self) -> bool {
        !matches!(self, Mode::Sequential)
    }
}

impl TryFrom<u64> for Mode {
    type Error = Fault;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.code() == code)
            .ok_or(Fault::UnrecognizedMode { code })
    }
}
