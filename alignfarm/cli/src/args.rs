use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use alignfarm_alignment_rs::pairwise::Scoring;
use alignfarm_transport_rs::ServerConfig;

#[derive(Parser)]
#[command(name = "alignfarm")]
#[command(about = "All-vs-all pairwise alignment of sequences over TCP", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace). RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the alignment server
    Serve {
        #[arg(long, env = "ALIGNFARM_HOST", default_value = ServerConfig::DEFAULT_HOST)]
        host: String,
        #[arg(short, long, env = "ALIGNFARM_PORT", default_value_t = ServerConfig::DEFAULT_PORT)]
        port: u16,
        /// Directory for transient job files
        #[arg(long, env = "ALIGNFARM_WORKDIR", value_name = "DIR")]
        workdir: Option<PathBuf>,
        /// Upper bound on the requested parallelism
        #[arg(long, env = "ALIGNFARM_MAX_PARALLELISM", value_name = "INT", default_value_t = alignfarm_core_rs::Parallelism::DEFAULT_MAX)]
        max_parallelism: usize,
        /// Upper bound on the payload size in bytes
        #[arg(long, env = "ALIGNFARM_MAX_PAYLOAD", value_name = "BYTES", default_value_t = ServerConfig::DEFAULT_MAX_PAYLOAD)]
        max_payload: u64,
        /// Shard worker executable for the process pool mode (defaults to this binary)
        #[arg(long, env = "ALIGNFARM_WORKER", value_name = "PATH")]
        worker: Option<PathBuf>,
        #[command(flatten)]
        scoring: ScoringArgs,
    },
    /// Submit sequences to a running server and save the alignments
    Submit {
        #[arg(long, env = "ALIGNFARM_HOST", default_value = ServerConfig::DEFAULT_HOST)]
        host: String,
        #[arg(short, long, env = "ALIGNFARM_PORT", default_value_t = ServerConfig::DEFAULT_PORT)]
        port: u16,
        /// Execution mode: 1 sequential, 2 thread pool, 3 process pool, 4 data-parallel loop
        #[arg(short, long, value_name = "CODE", default_value_t = 1)]
        mode: u64,
        /// Number of shards for the parallel modes
        #[arg(short = 'j', long, value_name = "INT", default_value_t = 1)]
        parallelism: u64,
        /// FASTA or GenBank file, optionally gzipped
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
        /// Destination of the alignment entries
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Align a single shard (process pool worker)
    #[command(hide = true)]
    Shard {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
        #[command(flatten)]
        scoring: ScoringArgs,
    },
}

/// Alignment scores, penalties are negative numbers.
#[derive(Args, Clone, Copy, Debug)]
pub struct ScoringArgs {
    #[arg(long = "match", value_name = "INT", default_value_t = 1, allow_negative_numbers = true)]
    pub matched: i32,
    #[arg(long = "mismatch", value_name = "INT", default_value_t = 0, allow_negative_numbers = true)]
    pub mismatched: i32,
    #[arg(long, value_name = "INT", default_value_t = 0, allow_negative_numbers = true)]
    pub gap_open: i32,
    #[arg(long, value_name = "INT", default_value_t = 0, allow_negative_numbers = true)]
    pub gap_extend: i32,
}

impl ScoringArgs {
    pub fn scoring(&self) -> Scoring {
        Scoring::new(self.matched, self.mismatched, self.gap_open, self.gap_extend)
    }

    /// Flags that reproduce these scores on a worker command line.
    pub fn to_args(&self) -> Vec<OsString> {
        [
            ("--match", self.matched),
            ("--mismatch", self.mismatched),
            ("--gap-open", self.gap_open),
            ("--gap-extend", self.gap_extend),
        ]
        .into_iter()
        .flat_map(|(flag, value)| [OsString::from(flag), OsString::from(value.to_string())])
        .collect()
    }
}
