use std::path::PathBuf;

use clap::Parser;
use eyre::{bail, Result, WrapErr};

use alignfarm_alignment_rs::pairwise::Global;
use alignfarm_dispatch_rs::{aligner, WorkerCommand};
use alignfarm_transport_rs::{Client, Response, Server, ServerConfig};

use args::{Cli, Command, ScoringArgs};

mod args;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

#[allow(clippy::too_many_arguments)]
fn serve(
    host: String,
    port: u16,
    workdir: Option<PathBuf>,
    max_parallelism: usize,
    max_payload: u64,
    worker: Option<PathBuf>,
    scoring: ScoringArgs,
) -> Result<()> {
    let workdir = match workdir {
        Some(workdir) => workdir,
        None => std::env::temp_dir().join("alignfarm"),
    };
    let worker = match worker {
        Some(program) => WorkerCommand::new(program).arg("shard"),
        None => WorkerCommand::current_exe()?,
    }
    .args(scoring.to_args());

    let config = ServerConfig::new(workdir, worker)
        .with_address(host, port)
        .with_limits(max_parallelism, max_payload)
        .with_scoring(scoring.scoring());

    runtime()?.block_on(async move {
        let server = Server::bind(config).await?;
        server
            .run(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => log::info!("Interrupted"),
                    Err(err) => log::error!("Failed to listen for the interrupt signal: {err}"),
                }
            })
            .await
    })
}

fn submit(
    host: String,
    port: u16,
    mode: u64,
    parallelism: u64,
    input: PathBuf,
    output: PathBuf,
) -> Result<()> {
    let payload = std::fs::read(&input)
        .wrap_err_with(|| format!("Failed to read {}", input.display()))?;

    let response = runtime()?.block_on(async move {
        Client::connect((host.as_str(), port))
            .await?
            .submit(mode, parallelism, payload)
            .await
    })?;

    match response {
        Response::Completed(body) => {
            std::fs::write(&output, &body)
                .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
            log::info!("Saved {} bytes to {}", body.len(), output.display());
            Ok(())
        }
        Response::Rejected { status, message } => {
            bail!("Job rejected with status {} ({status}): {message}", status.code())
        }
    }
}

fn shard(input: PathBuf, output: PathBuf, scoring: ScoringArgs) -> Result<()> {
    let engine = Global::with_scoring(&scoring.scoring());
    let entries = aligner::align_file(&input, &output, &engine)?;
    log::debug!("{} -> {entries} entries", input.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Serve {
            host,
            port,
            workdir,
            max_parallelism,
            max_payload,
            worker,
            scoring,
        } => serve(host, port, workdir, max_parallelism, max_payload, worker, scoring),
        Command::Submit {
            host,
            port,
            mode,
            parallelism,
            input,
            output,
        } => submit(host, port, mode, parallelism, input, output),
        Command::Shard {
            input,
            output,
            scoring,
        } => shard(input, output, scoring),
    }
}
