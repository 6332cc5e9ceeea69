use std::path::PathBuf;

use derive_getters::{Dissolve, Getters};
use eyre::{Result, WrapErr};

use alignfarm_core_rs::Parallelism;
use alignfarm_io_rs::fasta::{Record, Writer};
use alignfarm_io_rs::WriteRecord;

use crate::artifacts::Artifacts;

/// Subset of the job records processed by a single worker.
#[derive(Clone, Debug, PartialEq, Eq, Getters, Dissolve)]
pub struct Shard {
    index: usize,
    records: Vec<Record>,
}

/// Deals records into `parallelism` shards: the record at position `i` goes to shard
/// `i % parallelism`. The relative order of records is preserved within each shard and shards
/// are returned in index order, including the empty ones.
pub fn partition(records: Vec<Record>, parallelism: Parallelism) -> Vec<Shard> {
    let total = parallelism.get();
    let mut shards: Vec<Shard> = parallelism
        .shards()
        .map(|index| Shard {
            index,
            records: Vec::with_capacity(records.len() / total + 1),
        })
        .collect();

    for (position, record) in records.into_iter().enumerate() {
        shards[position % total].records.push(record);
    }
    shards
}

/// Persists every shard as a FASTA file inside the job artifacts directory.
pub fn write_shards(shards: &[Shard], artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
    shards
        .iter()
        .map(|shard| {
            let path = artifacts.shard_records(shard.index);
            let mut writer = Writer::from_path(&path, None)?;
            writer
                .write_records(&shard.records)
                .and_then(|_| writer.flush())
                .wrap_err_with(|| format!("Failed to write shard {}", path.display()))?;
            log::debug!(
                "Shard {} with {} records -> {}",
                shard.index,
                shard.records.len(),
                path.display()
            );
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alignfarm_io_rs::fasta::Reader;
    use alignfarm_io_rs::ReadRecord;

    fn records(total: usize) -> Result<Vec<Record>> {
        (0..total)
            .map(|i| Record::new(format!("seq{i}"), b"ACGT".repeat(i + 1)))
            .collect()
    }

    #[test]
    fn test_partition_sizes() -> Result<()> {
        for (total, parallelism, expected) in [
            (5, 2, vec![3, 2]),
            (5, 1, vec![5]),
            (6, 3, vec![2, 2, 2]),
            (2, 4, vec![1, 1, 0, 0]),
            (0, 3, vec![0, 0, 0]),
            (7, 7, vec![1; 7]),
        ] {
            let shards = partition(records(total)?, Parallelism::new(parallelism)?);
            let sizes: Vec<_> = shards.iter().map(|x| x.records().len()).collect();
            assert_eq!(sizes, expected, "N = {total}, P = {parallelism}");
            assert_eq!(sizes.iter().sum::<usize>(), total);
        }
        Ok(())
    }

    #[test]
    fn test_partition_assignment() -> Result<()> {
        let shards = partition(records(10)?, Parallelism::new(3)?);
        for shard in &shards {
            for (k, record) in shard.records().iter().enumerate() {
                // Position in the input is recoverable from the shard index and intra-shard order
                let position = shard.index() + k * 3;
                assert_eq!(record.id(), &format!("seq{position}"));
            }
        }
        let indices: Vec<_> = shards.iter().map(|x| *x.index()).collect();
        assert_eq!(indices, [0, 1, 2]);
        Ok(())
    }

    #[test]
    fn test_write_shards() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let artifacts = Artifacts::new(dir.path());
        let shards = partition(records(3)?, Parallelism::new(4)?);
        let paths = write_shards(&shards, &artifacts)?;
        assert_eq!(paths.len(), 4);

        for (shard, path) in shards.iter().zip(&paths) {
            assert_eq!(path, &artifacts.shard_records(*shard.index()));
            let mut restored = Vec::new();
            Reader::from_path(path)?.read_to_end(&mut restored)?;
            assert_eq!(&restored, shard.records());
        }
        Ok(())
    }
}
