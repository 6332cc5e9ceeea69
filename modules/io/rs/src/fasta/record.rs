use derive_getters::{Dissolve, Getters};
use eyre::Result;
use std::error::Error;

use super::validate;

/// A single sequence record, the unit of work for the pairwise aligner.
/// - The ID is non-empty UTF-8 without newline characters (CR or LF).
/// - The sequence is non-empty and contains only ASCII alphabetic characters.
///
/// Records are immutable once parsed: fields are exposed through getters only.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Dissolve, Getters)]
pub struct Record {
    id: String,
    seq: Vec<u8>,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: "Default ID".to_string(),
            seq: b"ACGT".to_vec(),
        }
    }
}

impl<ID, SEQ> TryFrom<(ID, SEQ)> for Record
where
    ID: TryInto<String, Error: Error + Send + Sync + 'static>,
    SEQ: TryInto<Vec<u8>, Error: Error + Send + Sync + 'static>,
{
    type Error = eyre::Report;

    fn try_from(value: (ID, SEQ)) -> Result<Self> {
        Self::new(value.0.try_into()?, value.1.try_into()?)
    }
}

impl Record {
    pub fn new(id: String, seq: Vec<u8>) -> Result<Self> {
        validate::id(&id)?;
        validate::seq(&seq)?;
        Ok(Self { id, seq })
    }

    /// # Safety
    /// The caller must ensure that both fields are valid once the borrow ends.
    pub(crate) unsafe fn fields(&mut self) -> (&mut String, &mut Vec<u8>) {
        (&mut self.id, &mut self.seq)
    }
}
