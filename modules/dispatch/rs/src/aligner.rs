use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use eyre::{Result, WrapErr};
use itertools::Itertools;

use alignfarm_alignment_rs::pairwise::Engine;
use alignfarm_io_rs::fasta::{Reader, Record};
use alignfarm_io_rs::ReadRecord;

/// Writes a single alignment entry: the record ID and its gapped sequence.
fn write_entry(sink: &mut impl Write, id: &str, row: &[u8]) -> Result<()> {
    sink.write_all(b">")?;
    sink.write_all(id.as_bytes())?;
    sink.write_all(b"\n")?;
    sink.write_all(row)?;
    sink.write_all(b"\n")?;
    Ok(())
}

/// Aligns every unordered pair of records and writes two entries per pair, the first member first.
///
/// Pairs are visited in lexicographic order of their positions, so the output is deterministic.
/// Returns the number of written entries, which is always `M * (M - 1)` for `M` records.
pub fn align_all(records: &[Record], engine: &dyn Engine, sink: &mut impl Write) -> Result<usize> {
    let mut entries = 0;
    for (first, second) in records.iter().tuple_combinations() {
        let alignment = engine
            .align(first.seq(), second.seq())
            .wrap_err_with(|| format!("Failed to align {} vs {}", first.id(), second.id()))?;
        let (row1, row2) = alignment.render(first.seq(), second.seq())?;

        write_entry(sink, first.id(), &row1)?;
        write_entry(sink, second.id(), &row2)?;
        entries += 2;
    }
    Ok(entries)
}

/// Aligns all records of the FASTA file `input` and saves the entries to `output`.
///
/// A failed run doesn't leave a truncated `output` behind.
pub fn align_file(input: &Path, output: &Path, engine: &dyn Engine) -> Result<usize> {
    let mut records = Vec::new();
    Reader::from_path(input)
        .and_then(|mut reader| reader.read_to_end(&mut records))
        .wrap_err_with(|| format!("Failed to read records from {}", input.display()))?;

    let result = File::create(output)
        .wrap_err_with(|| format!("Failed to create {}", output.display()))
        .and_then(|file| {
            let mut sink = BufWriter::new(file);
            let entries = align_all(&records, engine, &mut sink)?;
            sink.flush()?;
            Ok(entries)
        });

    match &result {
        Ok(entries) => log::debug!(
            "{} records from {} -> {entries} entries in {}",
            records.len(),
            input.display(),
            output.display()
        ),
        Err(_) => {
            if let Err(err) = fs::remove_file(output) {
                log::debug!("Partial output {} not removed: {err}", output.display());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use eyre::eyre;

    use super::*;
    use alignfarm_alignment_rs::pairwise::alignment::{Alignment, Op, Step};
    use alignfarm_alignment_rs::pairwise::{Global, Scoring};

    /// Remembers the aligned pairs and treats sequences as ungapped matches of equal length.
    #[derive(Default)]
    struct Recorder {
        pairs: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
    }

    impl Engine for Recorder {
        fn align(&self, seq1: &[u8], seq2: &[u8]) -> Result<Alignment<i32>> {
            self.pairs
                .lock()
                .map_err(|_| eyre!("Poisoned"))?
                .push((seq1.to_vec(), seq2.to_vec()));
            let steps = Step::encode(vec![Op::Match; seq1.len()]);
            Ok(Alignment::new(0, steps, 0..seq1.len(), 0..seq2.len()))
        }
    }

    struct Failing;

    impl Engine for Failing {
        fn align(&self, _: &[u8], _: &[u8]) -> Result<Alignment<i32>> {
            Err(eyre!("engine exploded"))
        }
    }

    fn records(total: usize) -> Result<Vec<Record>> {
        (0..total)
            .map(|i| Record::new(format!("r{i}"), vec![b"ACGT"[i % 4]; 3]))
            .collect()
    }

    #[test]
    fn test_entries_count() -> Result<()> {
        let engine = Global::with_scoring(&Scoring::default());
        for total in 0..7 {
            let mut sink = Vec::new();
            let entries = align_all(&records(total)?, &engine, &mut sink)?;
            assert_eq!(entries, total * total.saturating_sub(1));
            assert_eq!(sink.iter().filter(|x| **x == b'>').count(), entries);
        }
        Ok(())
    }

    #[test]
    fn test_pair_order() -> Result<()> {
        let engine = Recorder::default();
        let mut sink = Vec::new();
        align_all(&records(4)?, &engine, &mut sink)?;

        let pairs = engine.pairs.into_inner().map_err(|_| eyre!("Poisoned"))?;
        let expected: Vec<_> = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
            .into_iter()
            .map(|(i, j)| (vec![b"ACGT"[i]; 3], vec![b"ACGT"[j]; 3]))
            .collect();
        assert_eq!(pairs, expected);

        let text = String::from_utf8(sink)?;
        assert!(text.starts_with(">r0\nAAA\n>r1\nCCC\n>r0\nAAA\n>r2\nGGG\n"));
        assert!(text.ends_with(">r2\nGGG\n>r3\nTTT\n"));
        Ok(())
    }

    #[test]
    fn test_gapped_entries() -> Result<()> {
        let engine = Global::with_scoring(&Scoring::new(2, -1, -3, -1));
        let records = vec![
            Record::new("long".into(), b"ACGTTACG".to_vec())?,
            Record::new("short".into(), b"ACGTACG".to_vec())?,
        ];
        let mut sink = Vec::new();
        assert_eq!(align_all(&records, &engine, &mut sink)?, 2);

        let text = String::from_utf8(sink)?;
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], ">long");
        assert_eq!(lines[1], "ACGTTACG");
        assert_eq!(lines[2], ">short");
        assert_eq!(lines[3].len(), 8);
        assert_eq!(lines[3].replace('-', ""), "ACGTACG");
        Ok(())
    }

    #[test]
    fn test_failure_leaves_no_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (input, output) = (dir.path().join("in.fasta"), dir.path().join("out.txt"));
        fs::write(&input, ">a\nACGT\n>b\nACGA\n")?;

        assert!(align_file(&input, &output, &Failing).is_err());
        assert!(!output.exists());

        let engine = Global::with_scoring(&Scoring::default());
        assert_eq!(align_file(&input, &output, &engine)?, 2);
        assert_eq!(fs::read_to_string(&output)?, ">a\nACGT\n>b\nACGA\n");
        Ok(())
    }
}
