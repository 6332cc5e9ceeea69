use std::fs;
use std::io;
use std::path::Path;

use eyre::{Result, WrapErr};

use alignfarm_core_rs::{Fault, Mode, Parallelism};

use crate::artifacts::Artifacts;

/// Removes a single file. Failures are logged and swallowed, absent files are expected.
fn remove(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            let fault = Fault::FileSystemFault {
                path: path.to_path_buf(),
                reason: err.to_string(),
            };
            if err.kind() == io::ErrorKind::NotFound {
                log::debug!("Cleanup: {fault}");
            } else {
                log::warn!("Cleanup: {fault}");
            }
            false
        }
    }
}

/// Deletes the transient files of a job and then its directory if nothing else is left there.
///
/// Safe to call any number of times: every deletion is independent and nothing is reported back
/// except the number of removed files.
pub fn cleanup(artifacts: &Artifacts, mode: Mode, parallelism: Parallelism) -> usize {
    let mut removed = 0;
    if mode.is_sharded() {
        for shard in parallelism.shards() {
            removed += remove(&artifacts.shard_records(shard)) as usize;
            removed += remove(&artifacts.shard_output(shard)) as usize;
        }
    } else {
        removed += remove(&artifacts.records()) as usize;
    }
    removed += remove(&artifacts.result()) as usize;

    match fs::remove_dir(artifacts.root()) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::warn!(
            "Cleanup: job directory {} is kept: {err}",
            artifacts.root().display()
        ),
    }
    log::debug!(
        "Cleanup: removed {removed} files from {}",
        artifacts.root().display()
    );
    removed
}

/// Removes job directories left in `workdir` by a previous server run.
pub fn purge(workdir: &Path) -> Result<usize> {
    let mut purged = 0;
    let entries = match fs::read_dir(workdir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(err) => {
            return Err(err).wrap_err_with(|| format!("Failed to list {}", workdir.display()))
        }
    };

    for entry in entries {
        let entry = entry?;
        let stale = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(Artifacts::JOB_DIR_PREFIX))
            && entry.file_type()?.is_dir();
        if !stale {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => purged += 1,
            Err(err) => log::warn!("Failed to purge {}: {err}", entry.path().display()),
        }
    }
    if purged > 0 {
        log::info!("Purged {purged} stale job directories from {}", workdir.display());
    }
    Ok(purged)
}
