use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use derive_getters::Dissolve;
use eyre::{ensure, Result, WrapErr};

use super::{record::Record, validate};
use crate::traits::ReadRecord;

/// A strict FASTA reader that parses a single record at a time. Carriage returns at the end of
/// lines are ignored and sequences may span several lines.
///
/// Returns an error if there are:
/// - Errors while reading from the underlying reader
/// - Extra characters before the first record
/// - Non-alphabetic characters inside the sequence
/// - Empty ID or sequence fields in any record
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Dissolve)]
pub struct Reader<R> {
    reader: R,
}

impl Reader<()> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Reader<BufReader<File>>> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open FASTA file {}", path.display()))?;
        Reader::new(BufReader::new(file))
    }
}

impl<R: BufRead> Reader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let buffer = reader.fill_buf()?;
        ensure!(
            buffer.first().map(|x| *x == b'>').unwrap_or(true),
            "Expected '>' at the start of the FASTA file"
        );
        Ok(Self { reader })
    }

    fn read_parts(&mut self, record: &mut Record) -> Result<bool> {
        let buffer = self.reader.fill_buf()?;
        if buffer.is_empty() {
            return Ok(false);
        }
        ensure!(
            buffer[0] == b'>',
            "Expected '>' at the start of the FASTA record"
        );
        self.reader.consume(1);

        // SAFETY: both fields are validated before returning
        let (id, seq) = unsafe { record.fields() };

        id.clear();
        let read = self.reader.read_line(id)?;
        ensure!(read > 0, "Unexpected EOF after '>'");
        ensure!(
            id.ends_with('\n'),
            "FASTA ID line is not terminated with a newline: {id}"
        );
        id.pop();
        if id.ends_with('\r') {
            id.pop();
        }
        validate::id(id)?;

        seq.clear();
        loop {
            let buffer = self.reader.fill_buf()?;
            if buffer.is_empty() || buffer[0] == b'>' {
                break;
            }

            let (line, consume) = match memchr::memchr(b'\n', buffer) {
                Some(pos) => {
                    let line = &buffer[..pos];
                    match line.last() {
                        Some(b'\r') => (&line[..pos - 1], pos + 1),
                        _ => (line, pos + 1),
                    }
                }
                None => (buffer, buffer.len()),
            };

            // Empty lines are skipped: a buffer boundary right before '\n' is indistinguishable
            // from an empty line here.
            seq.extend_from_slice(line);
            self.reader.consume(consume);
        }
        validate::seq(seq).wrap_err_with(|| format!("Invalid sequence for FASTA record {id}"))?;

        Ok(true)
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = Record;

    /// Parse the next FASTA record into the given [Record] buffer.
    /// On error, the buffer is left in an unspecified state, but can be reused for the next read.
    fn read_record(&mut self, buf: &mut Self::Record) -> Result<bool> {
        self.read_parts(buf)
    }
}
