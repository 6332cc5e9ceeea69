use std::fs;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use eyre::{eyre, Result};
use tokio::sync::oneshot;

use alignfarm_core_rs::{Mode, Status};
use alignfarm_dispatch_rs::WorkerCommand;
use alignfarm_transport_rs::{Client, Response, Server, ServerConfig};

const ALIGNFARM: &str = env!("CARGO_BIN_EXE_alignfarm");
const FIVE_RECORDS: &[u8] = b">s0\nACGTACGT\n>s1\nACGTTCGT\n>s2\nAGGTACG\n>s3\nTTGTACGA\n>s4\nACGAACGTT\n";

fn entries(bytes: &[u8]) -> usize {
    bytes.iter().filter(|x| **x == b'>').count()
}

/// Runs a single job against an in-process server whose process pool uses the real binary.
async fn run_job(mode: Mode, parallelism: u64, payload: &[u8]) -> Result<Response> {
    let workdir = tempfile::tempdir()?;
    let worker = WorkerCommand::new(ALIGNFARM).arg("shard");
    let config = ServerConfig::new(workdir.path(), worker).with_address("127.0.0.1", 0);
    let server = Server::bind(config).await?;
    let addr = server.local_addr()?;

    let (shutdown, signal) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run(async move {
        let _ = signal.await;
    }));

    let response = Client::connect(addr)
        .await?
        .submit(mode.code(), parallelism, payload.to_vec())
        .await?;

    let _ = shutdown.send(());
    handle.await??;
    assert!(fs::read_dir(workdir.path())?.next().is_none());
    Ok(response)
}

#[test]
fn test_shard_worker() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (input, output) = (dir.path().join("records.fasta.0"), dir.path().join("aligned.txt.0"));
    fs::write(&input, FIVE_RECORDS)?;

    let status = Command::new(ALIGNFARM)
        .args(["shard", "--match", "2", "--mismatch", "-1", "--gap-open", "-3", "--gap-extend", "-1"])
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .status()?;
    assert!(status.success());
    assert_eq!(entries(&fs::read(&output)?), 20);
    Ok(())
}

#[test]
fn test_shard_worker_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let (input, output) = (dir.path().join("missing.fasta"), dir.path().join("aligned.txt"));

    let status = Command::new(ALIGNFARM)
        .arg("shard")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .stderr(Stdio::null())
        .status()?;
    assert!(!status.success());
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_process_pool_matches_thread_pool() -> Result<()> {
    let processes = run_job(Mode::ProcessPool, 2, FIVE_RECORDS).await?;
    let threads = run_job(Mode::ThreadPool, 2, FIVE_RECORDS).await?;

    match (&processes, &threads) {
        (Response::Completed(processes), Response::Completed(threads)) => {
            assert_eq!(entries(processes), 8);
            assert_eq!(processes, threads);
        }
        _ => panic!("Unexpected responses: {processes}, {threads}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_process_pool_single_shard_matches_sequential() -> Result<()> {
    let processes = run_job(Mode::ProcessPool, 1, FIVE_RECORDS).await?;
    let sequential = run_job(Mode::Sequential, 1, FIVE_RECORDS).await?;
    assert_eq!(processes, sequential);
    Ok(())
}

#[tokio::test]
async fn test_process_pool_invalid_payload() -> Result<()> {
    match run_job(Mode::ProcessPool, 3, b"LOCUS broken").await? {
        Response::Rejected { status, .. } => assert_eq!(status, Status::InvalidPayload),
        response => panic!("Unexpected response: {response}"),
    }
    Ok(())
}

struct Serving(Child);

impl Drop for Serving {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> Result<u16> {
    Ok(TcpListener::bind("127.0.0.1:0")?.local_addr()?.port())
}

fn wait_until_listening(addr: SocketAddr) -> Result<()> {
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(50));
    }
    Err(eyre!("Server at {addr} did not start"))
}

fn submit(port: u16, mode: &str, parallelism: &str, input: &Path, output: &Path) -> Result<bool> {
    let status = Command::new(ALIGNFARM)
        .args(["submit", "--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["--mode", mode, "--parallelism", parallelism])
        .arg("--input")
        .arg(input)
        .arg("--output")
        .arg(output)
        .stderr(Stdio::null())
        .status()?;
    Ok(status.success())
}

#[test]
fn test_serve_and_submit() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let port = free_port()?;
    let _server = Serving(
        Command::new(ALIGNFARM)
            .args(["serve", "--host", "127.0.0.1", "--port", &port.to_string()])
            .arg("--workdir")
            .arg(dir.path().join("work"))
            .stderr(Stdio::null())
            .spawn()?,
    );
    wait_until_listening(SocketAddr::from(([127, 0, 0, 1], port)))?;

    let input = dir.path().join("input.fasta");
    fs::write(&input, FIVE_RECORDS)?;

    let output = dir.path().join("process-pool.txt");
    assert!(submit(port, "3", "2", &input, &output)?);
    assert_eq!(entries(&fs::read(&output)?), 8);

    // Rejected jobs exit with an error and produce nothing
    let output = dir.path().join("rejected.txt");
    assert!(!submit(port, "9", "1", &input, &output)?);
    assert!(!output.exists());
    Ok(())
}
