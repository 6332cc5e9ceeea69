use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use eyre::{Result, WrapErr};

use alignfarm_core_rs::{Fault, Parallelism};

use crate::artifacts::Artifacts;

/// Concatenates shard outputs in ascending shard order into the job result file.
///
/// Every shard must have produced an output, a missing one fails the join with
/// [Fault::JoinFailure] instead of silently shrinking the result.
pub fn join(artifacts: &Artifacts, parallelism: Parallelism) -> Result<PathBuf> {
    let result = artifacts.result();
    let file = File::create(&result)
        .wrap_err_with(|| format!("Failed to create {}", result.display()))?;
    let mut sink = BufWriter::new(file);

    let mut total = 0;
    for shard in parallelism.shards() {
        let path = artifacts.shard_output(shard);
        let mut source = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Fault::JoinFailure { shard, path }.into())
            }
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("Failed to open {}", path.display()))
            }
        };
        total += io::copy(&mut source, &mut sink)
            .wrap_err_with(|| format!("Failed to append {}", path.display()))?;
    }
    sink.flush()?;

    log::debug!(
        "Joined {} shard outputs into {} ({total} bytes)",
        parallelism,
        result.display()
    );
    Ok(result)
}
