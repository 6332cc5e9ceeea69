use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use derive_getters::Getters;
use eyre::{eyre, Report, Result, WrapErr};

use super::{sharded, Executor};
use crate::job::{Job, Stage};
use crate::join::join;

/// Command line of a shard worker. Each worker is invoked as
/// `program [args...] --input <shard records> --output <shard output>` and must exit with zero
/// status only when the output is complete.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct WorkerCommand {
    program: PathBuf,
    #[getter(skip)]
    args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Worker running the `shard` subcommand of the current executable.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe().wrap_err("Failed to locate the current executable")?;
        Ok(Self::new(program).arg("shard"))
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|x| x.as_ref().to_os_string()));
        self
    }

    pub fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        command
    }
}

/// Aligns each shard in a separate worker process. Workers only exchange files with the server.
#[derive(Clone, Debug)]
pub struct ProcessPool {
    worker: WorkerCommand,
}

impl ProcessPool {
    pub fn new(worker: WorkerCommand) -> Self {
        Self { worker }
    }
}

impl Executor for ProcessPool {
    fn execute(&self, job: &mut Job) -> Result<PathBuf> {
        sharded::prepare(job)?;
        job.advance(Stage::Executing);

        let mut failures = Vec::new();
        let mut workers: Vec<(usize, Child)> = Vec::with_capacity(job.parallelism().get());
        for shard in job.parallelism().shards() {
            let (input, output) = (
                job.artifacts().shard_records(shard),
                job.artifacts().shard_output(shard),
            );
            match self.worker.command(&input, &output).spawn() {
                Ok(child) => {
                    log::debug!("Shard {shard}: worker pid {}", child.id());
                    workers.push((shard, child));
                }
                Err(err) => failures.push((
                    shard,
                    Report::new(err).wrap_err(format!(
                        "Failed to spawn {}",
                        self.worker.program().display()
                    )),
                )),
            }
        }

        // Every spawned worker is awaited, even when some of them have already failed
        for (shard, mut child) in workers {
            match child.wait() {
                Ok(status) if status.success() => log::debug!("Shard {shard}: worker finished"),
                Ok(status) => failures.push((shard, eyre!("Worker exited with {status}"))),
                Err(err) => failures.push((
                    shard,
                    Report::new(err).wrap_err("Failed to wait for the worker"),
                )),
            }
        }

        sharded::fail(job, failures)?;
        let result = join(job.artifacts(), *job.parallelism())?;
        job.advance(Stage::Joined);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let worker = WorkerCommand::new("/usr/bin/alignfarm")
            .arg("shard")
            .args(["--match", "2"]);
        let command = worker.command(Path::new("in.fasta.0"), Path::new("out.txt.0"));

        assert_eq!(worker.program(), Path::new("/usr/bin/alignfarm"));
        assert_eq!(command.get_program(), "/usr/bin/alignfarm");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(
            args,
            ["shard", "--match", "2", "--input", "in.fasta.0", "--output", "out.txt.0"]
        );
    }
}
