use std::io::BufRead;

use derive_getters::Dissolve;
use eyre::{ensure, eyre, Result, WrapErr};

use crate::fasta::Record;
use crate::traits::ReadRecord;

/// A minimal GenBank flat-file reader. Only the fields required to build a sequence [Record]
/// are interpreted:
/// - `LOCUS` opens a record, its name is the fallback ID
/// - `ACCESSION` and `VERSION` provide the preferred IDs (`VERSION` wins)
/// - `ORIGIN` starts the sequence block, where digits and whitespace are dropped
/// - `//` closes the record
///
/// Sequence letters are upper-cased. Every other section (features, references, etc.) is skipped.
#[derive(Debug, Clone, Dissolve)]
pub struct Reader<R> {
    reader: R,
    line: String,
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    fn next_line(&mut self) -> Result<bool> {
        self.line.clear();
        Ok(self.reader.read_line(&mut self.line)? > 0)
    }

    fn keyword_value<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
        line.strip_prefix(keyword)
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            .and_then(|rest| rest.split_whitespace().next())
    }

    fn read_parts(&mut self) -> Result<Option<Record>> {
        // Skip blank lines between records
        loop {
            if !self.next_line()? {
                return Ok(None);
            }
            if !self.line.trim().is_empty() {
                break;
            }
        }

        let locus = Self::keyword_value(&self.line, "LOCUS")
            .ok_or_else(|| eyre!("Expected LOCUS at the start of the GenBank record"))?
            .to_string();

        let (mut accession, mut version) = (None, None);
        let mut seq = Vec::new();
        let mut in_origin = false;
        loop {
            ensure!(
                self.next_line()?,
                "Unexpected EOF inside the GenBank record {locus}"
            );
            let line = self.line.trim_end();
            if line.starts_with("//") {
                break;
            }

            if in_origin {
                seq.extend(
                    line.bytes()
                        .filter(u8::is_ascii_alphabetic)
                        .map(|x| x.to_ascii_uppercase()),
                );
            } else if let Some(value) = Self::keyword_value(line, "ACCESSION") {
                accession = Some(value.to_string());
            } else if let Some(value) = Self::keyword_value(line, "VERSION") {
                version = Some(value.to_string());
            } else if line.starts_with("ORIGIN") {
                in_origin = true;
            }
        }

        let id = version.or(accession).unwrap_or_else(|| locus.clone());
        let record = Record::new(id, seq)
            .wrap_err_with(|| format!("Invalid GenBank record {locus}"))?;
        Ok(Some(record))
    }
}

impl<R: BufRead> ReadRecord for Reader<R> {
    type Record = Record;

    fn read_record(&mut self, into: &mut Self::Record) -> Result<bool> {
        match self.read_parts()? {
            Some(record) => {
                *into = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
