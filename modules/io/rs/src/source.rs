use std::io::Cursor;

use derive_more::Display;
use eyre::Result;

use alignfarm_core_rs::Fault;

use crate::compression;
use crate::fasta::{self, Record};
use crate::genbank;
use crate::traits::ReadRecord;

/// Sequence formats accepted in job payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Format {
    #[display("fasta")]
    Fasta,
    #[display("genbank")]
    GenBank,
}

impl Format {
    /// Infers the format from the first non-whitespace bytes of the payload.
    /// Returns `None` for empty payloads and unknown formats alike.
    pub fn sniff(payload: &[u8]) -> Option<Self> {
        let start = payload.iter().position(|x| !x.is_ascii_whitespace())?;
        let head = &payload[start..];
        if head.starts_with(b">") {
            Some(Format::Fasta)
        } else if head.starts_with(b"LOCUS") {
            Some(Format::GenBank)
        } else {
            None
        }
    }
}

/// Decodes a raw job payload into an ordered sequence of records.
///
/// The payload may be gzip-compressed and contain FASTA or GenBank records. An empty (or
/// whitespace-only) payload yields no records. Any decoding failure is reported as
/// [Fault::InvalidPayload].
pub fn records(payload: &[u8]) -> Result<Vec<Record>> {
    _records(payload).map_err(|err| {
        Fault::InvalidPayload {
            reason: format!("{err:#}"),
        }
        .into()
    })
}

fn _records(payload: &[u8]) -> Result<Vec<Record>> {
    let payload = compression::decode(payload)?;
    let mut records = Vec::new();

    match Format::sniff(&payload) {
        Some(Format::Fasta) => {
            let start = payload.iter().position(|x| *x == b'>').unwrap_or(0);
            fasta::Reader::new(Cursor::new(&payload[start..]))?.read_to_end(&mut records)?;
        }
        Some(Format::GenBank) => {
            genbank::Reader::new(Cursor::new(payload.as_ref())).read_to_end(&mut records)?;
        }
        None if payload.iter().all(u8::is_ascii_whitespace) => {}
        None => eyre::bail!("Unknown sequence format, expected FASTA or GenBank"),
    }

    log::debug!("Decoded {} records from the payload", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        for (payload, expected) in [
            (&b">id\nACGT\n"[..], Some(Format::Fasta)),
            (&b"\n\n  >id\nACGT\n"[..], Some(Format::Fasta)),
            (&b"LOCUS  X 4 bp\n"[..], Some(Format::GenBank)),
            (&b""[..], None),
            (&b"   \n"[..], None),
            (&b"ACGT"[..], None),
        ] {
            assert_eq!(Format::sniff(payload), expected, "{:?}", payload);
        }
    }

    #[test]
    fn test_records_from_both_formats() -> Result<()> {
        let fasta = records(b"\n>Z78533.1\nCGTA\n>Z78532.1\nCGTT\n")?;
        let genbank = records(
            b"LOCUS  Z78533 4 bp\nVERSION Z78533.1\nORIGIN\n 1 cgta\n//\n\
              LOCUS  Z78532 4 bp\nVERSION Z78532.1\nORIGIN\n 1 cgtt\n//\n",
        )?;
        assert_eq!(fasta, genbank);
        assert_eq!(fasta.len(), 2);
        Ok(())
    }

    #[test]
    fn test_empty_payload() -> Result<()> {
        assert!(records(b"")?.is_empty());
        assert!(records(b" \r\n")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_payload_fault() {
        for payload in [&b"not a sequence file"[..], &b">id\nAC GT\n"[..]] {
            let err = records(payload).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<Fault>(),
                Some(Fault::InvalidPayload { .. })
            ));
        }
    }
}
