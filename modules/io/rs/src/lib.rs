pub mod compression;
pub mod fasta;
pub mod genbank;
pub mod source;
mod traits;

pub use traits::{ReadRecord, WriteRecord};
