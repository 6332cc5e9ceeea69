use std::num::NonZeroUsize;
use std::ops::Range;

use derive_more::{Display, Into};
use eyre::Result;

use crate::Fault;

/// Number of shards (and workers) a job is split into. Always at least one.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Into)]
#[display("{_0}")]
pub struct Parallelism(NonZeroUsize);

impl Parallelism {
    /// Upper bound used when the caller doesn't provide one.
    pub const DEFAULT_MAX: usize = 256;

    pub const ONE: Self = Self(NonZeroUsize::MIN);

    /// Validates the requested parallelism. Zero is rejected as a malformed request.
    pub fn new(requested: usize) -> Result<Self> {
        Self::bounded(requested as u64, Self::DEFAULT_MAX)
    }

    /// Same as [Parallelism::new], but with an explicit upper bound. Values above the bound are
    /// rejected rather than clamped: silently running fewer shards would change the output layout.
    pub fn bounded(requested: u64, max: usize) -> Result<Self> {
        let value = usize::try_from(requested)
            .ok()
            .filter(|x| *x <= max)
            .and_then(NonZeroUsize::new)
            .ok_or_else(|| Fault::MalformedRequest {
                reason: format!("parallelism must be within [1, {max}], got {requested}"),
            })?;
        Ok(Self(value))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// Indices of all shards: `0..P`.
    pub fn shards(&self) -> Range<usize> {
        0..self.get()
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::ONE
    }
}
