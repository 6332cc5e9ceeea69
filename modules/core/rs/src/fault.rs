use std::path::PathBuf;

use derive_more::{Display, Error};

use crate::Mode;

/// Failures of a single job. Each fault maps to a [Status] reported back to the submitter.
#[derive(Debug, Display, Error)]
pub enum Fault {
    /// Socket-level I/O failure while talking to the peer.
    #[display("connection fault: {reason}")]
    ConnectionFault { reason: String },
    /// Request fields that can't be parsed or are out of the accepted range.
    #[display("malformed request: {reason}")]
    MalformedRequest { reason: String },
    /// Numeric mode code that doesn't correspond to any execution mode.
    #[display("unrecognized mode code: {code}")]
    UnrecognizedMode { code: u64 },
    /// The aligner failed while processing the shard.
    #[display("shard {shard} failed: {reason}")]
    ShardFailure { shard: usize, reason: String },
    /// The shard output artifact is absent at join time.
    #[display("shard {shard} output is missing: {}", path.display())]
    JoinFailure { shard: usize, path: PathBuf },
    /// Transient file could not be removed. Never fatal for a job.
    #[display("failed to remove {}: {reason}", path.display())]
    FileSystemFault { path: PathBuf, reason: String },
    /// The execution mode is recognized, but has no working implementation.
    #[display("execution mode {mode} is not implemented")]
    NotImplemented { mode: Mode },
    /// The payload can't be decoded into sequence records.
    #[display("invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

impl Fault {
    pub fn status(&self) -> Status {
        match self {
            Fault::ConnectionFault { .. } | Fault::FileSystemFault { .. } => Status::Internal,
            Fault::MalformedRequest { .. } => Status::MalformedRequest,
            Fault::UnrecognizedMode { .. } => Status::UnrecognizedMode,
            Fault::ShardFailure { .. } => Status::ShardFailure,
            Fault::JoinFailure { .. } => Status::JoinFailure,
            Fault::NotImplemented { .. } => Status::NotImplemented,
            Fault::InvalidPayload { .. } => Status::InvalidPayload,
        }
    }

    /// Finds the first fault in the report's chain of errors.
    pub fn find(report: &eyre::Report) -> Option<&Fault> {
        report.chain().find_map(|err| err.downcast_ref::<Fault>())
    }
}

/// Response status sent to the submitter ahead of the response body.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum Status {
    #[display("ok")]
    Ok = 0,
    #[display("malformed request")]
    MalformedRequest = 1,
    #[display("unrecognized mode")]
    UnrecognizedMode = 2,
    #[display("shard failure")]
    ShardFailure = 3,
    #[display("join failure")]
    JoinFailure = 4,
    #[display("not implemented")]
    NotImplemented = 5,
    #[display("invalid payload")]
    InvalidPayload = 6,
    #[display("internal error")]
    Internal = 7,
}

impl Status {
    pub fn code(&self) -> u64 {
        *self as u8 as u64
    }

    pub fn from_code(code: u64) -> Option<Self> {
        let status = match code {
            0 => Status::Ok,
            1 => Status::MalformedRequest,
            2 => Status::UnrecognizedMode,
            3 => Status::ShardFailure,
            4 => Status::JoinFailure,
            5 => Status::NotImplemented,
            6 => Status::InvalidPayload,
            7 => Status::Internal,
            _ => return None,
        };
        Some(status)
    }

    /// Status of a failed job. Reports without a [Fault] are internal errors.
    pub fn of(report: &eyre::Report) -> Self {
        Fault::find(report)
            .map(Fault::status)
            .unwrap_or(Status::Internal)
    }
}
