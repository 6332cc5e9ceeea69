use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use derive_getters::Getters;
use eyre::{ensure, eyre, Report, Result, WrapErr};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use alignfarm_alignment_rs::pairwise::{Global, Scoring};
use alignfarm_core_rs::{Mode, Parallelism, Status};
use alignfarm_dispatch_rs::{cleanup, Dispatcher, Executor, Job, Stage, WorkerCommand};

use crate::codec::{self, Reply, Request};

/// How long a rejected peer may keep sending before the connection is dropped.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings of the alignment server.
#[derive(Clone, Debug, PartialEq, Eq, Getters)]
pub struct ServerConfig {
    host: String,
    port: u16,
    workdir: PathBuf,
    max_parallelism: usize,
    max_payload: u64,
    scoring: Scoring,
    worker: WorkerCommand,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 31337;
    pub const DEFAULT_MAX_PAYLOAD: u64 = 1 << 30;

    pub fn new(workdir: impl Into<PathBuf>, worker: WorkerCommand) -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            workdir: workdir.into(),
            max_parallelism: Parallelism::DEFAULT_MAX,
            max_payload: Self::DEFAULT_MAX_PAYLOAD,
            scoring: Scoring::default(),
            worker,
        }
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_limits(mut self, max_parallelism: usize, max_payload: u64) -> Self {
        self.max_parallelism = max_parallelism;
        self.max_payload = max_payload;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }
}

/// Alignment server. Connections are handled strictly one after another: a job is received,
/// executed, answered and cleaned up before the next connection is accepted.
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    dispatcher: Dispatcher,
    jobs: u64,
}

impl Server {
    /// Binds the listening socket and prepares the working directory, removing job artifacts
    /// left behind by a previous run.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        tokio::fs::create_dir_all(config.workdir())
            .await
            .wrap_err_with(|| {
                format!("Failed to create the workdir {}", config.workdir().display())
            })?;
        let workdir = config.workdir().clone();
        tokio::task::spawn_blocking(move || cleanup::purge(&workdir)).await??;

        let listener = TcpListener::bind((config.host().as_str(), *config.port()))
            .await
            .wrap_err_with(|| format!("Failed to bind {}:{}", config.host(), config.port()))?;

        let engine = Arc::new(Global::with_scoring(config.scoring()));
        let dispatcher = Dispatcher::new(engine, config.worker().clone());
        Ok(Self {
            listener,
            config,
            dispatcher,
            jobs: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections until `shutdown` resolves. A connection in progress is always
    /// finished before the shutdown takes effect.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        log::info!(
            "Listening on {} (workdir {})",
            self.local_addr()?,
            self.config.workdir().display()
        );
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.serve(stream, peer).await,
                    Err(err) => log::error!("Failed to accept a connection: {err}"),
                },
            }
        }
        log::info!("Shutting down after {} jobs", self.jobs);
        Ok(())
    }

    async fn serve(&mut self, mut stream: TcpStream, peer: SocketAddr) {
        let id = self.jobs;
        self.jobs += 1;
        log::info!("Job {id}: connection from {peer}");

        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);
        let job = codec::read_request(&mut reader, *self.config.max_payload())
            .await
            .and_then(|request| self.accept(id, request));
        let job = match job {
            Ok(job) => job,
            Err(err) => {
                log::error!("Job {id}: request from {peer} rejected: {err:#}");
                if let Err(err) = codec::write_reply(&mut writer, &rejection(&err)).await {
                    log::debug!("Job {id}: failed to report the rejection: {err:#}");
                }
                if let Err(err) = writer.shutdown().await {
                    log::debug!("Job {id}: failed to close the connection: {err}");
                }
                // Unread request bytes would turn the close into a reset and discard the reply
                let limit = self.config.max_payload().saturating_add(codec::MAX_HEADER);
                match tokio::time::timeout(DRAIN_TIMEOUT, codec::discard(&mut reader, limit)).await {
                    Ok(Ok(0)) => {}
                    Ok(Ok(dropped)) => log::debug!("Job {id}: discarded {dropped} request bytes"),
                    Ok(Err(err)) => log::debug!("Job {id}: failed to drain the request: {err}"),
                    Err(_) => log::debug!("Job {id}: peer kept the connection open, closing it"),
                }
                return;
            }
        };

        // Kept aside to clean up even if the execution task is lost
        let (artifacts, mode, parallelism) =
            (job.artifacts().clone(), *job.mode(), *job.parallelism());

        let dispatcher = self.dispatcher.clone();
        let (mut job, result) = match tokio::task::spawn_blocking(move || {
            let mut job = job;
            let result = dispatcher.execute(&mut job);
            (job, result)
        })
        .await
        {
            Ok((job, result)) => (Some(job), result),
            Err(err) => (None, Err(eyre!("Execution task failed: {err}"))),
        };

        let sent = match &result {
            Ok(path) => send_file(&mut writer, path).await,
            Err(err) => {
                log::error!("Job {id}: {err:#}");
                codec::write_reply(&mut writer, &rejection(err)).await
            }
        };
        if let Err(err) = &sent {
            log::error!("Job {id}: failed to send the response: {err:#}");
        }
        if let Err(err) = writer.shutdown().await {
            log::debug!("Job {id}: failed to close the connection: {err}");
        }

        match job.as_mut() {
            Some(job) => {
                job.cleanup();
                if result.is_ok() && sent.is_ok() {
                    job.advance(Stage::Responded);
                    log::info!("Job {id}: done");
                } else {
                    job.advance(Stage::Aborted);
                }
            }
            None => {
                cleanup::cleanup(&artifacts, mode, parallelism);
            }
        }
    }

    /// Validates the request fields and creates the job.
    fn accept(&self, id: u64, request: Request) -> Result<Job> {
        let (mode, parallelism, payload) = request.dissolve();
        let mode = Mode::try_from(mode)?;
        let parallelism = Parallelism::bounded(parallelism, *self.config.max_parallelism())?;
        Job::new(id, mode, parallelism, payload, self.config.workdir())
    }
}

fn rejection(err: &Report) -> Reply {
    Reply::new(Status::of(err), format!("{err:#}").into_bytes())
}

/// Streams the result file to the client. Failures before the header is written are still
/// reported to the client as an internal error.
async fn send_file<W: AsyncWrite + Unpin>(writer: &mut W, path: &Path) -> Result<()> {
    let opened = async {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok::<_, Report>((file, size))
    }
    .await
    .wrap_err_with(|| format!("Failed to open the result {}", path.display()));

    let (mut file, size) = match opened {
        Ok(opened) => opened,
        Err(err) => {
            codec::write_reply(writer, &rejection(&err)).await?;
            return Err(err);
        }
    };

    codec::write_reply_header(writer, Status::Ok, size).await?;
    let copied = tokio::io::copy(&mut file, writer).await?;
    ensure!(
        copied == size,
        "Result {} changed while being sent: {copied} of {size} bytes",
        path.display()
    );
    writer.flush().await?;
    log::debug!("Sent {size} bytes of {}", path.display());
    Ok(())
}
