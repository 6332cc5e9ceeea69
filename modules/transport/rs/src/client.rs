use derive_more::Display;
use eyre::{Result, WrapErr};
use tokio::io::BufReader;
use tokio::net::{TcpStream, ToSocketAddrs};

use alignfarm_core_rs::{Fault, Status};

use crate::codec::{self, Request};

/// Outcome of a submitted job.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum Response {
    /// Alignment entries of the whole job.
    #[display("completed with {} bytes", _0.len())]
    Completed(Vec<u8>),
    #[display("rejected ({status}): {message}")]
    Rejected { status: Status, message: String },
}

/// Connection to an alignment server. Each connection carries exactly one job.
pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|err| Fault::ConnectionFault {
            reason: format!("failed to connect: {err}"),
        })?;
        Ok(Self { stream })
    }

    /// Sends the job and waits for its outcome. Raw codes are sent as is, the server is the one
    /// to validate them.
    pub async fn submit(mut self, mode: u64, parallelism: u64, payload: Vec<u8>) -> Result<Response> {
        let (reader, mut writer) = self.stream.split();
        let mut reader = BufReader::new(reader);
        let size = payload.len();

        let sent = codec::write_request(&mut writer, &Request::new(mode, parallelism, payload)).await;
        let reply = match sent {
            Ok(()) => {
                log::debug!("Submitted {size} bytes: mode {mode}, parallelism {parallelism}");
                codec::read_reply(&mut reader)
                    .await
                    .wrap_err("Failed to read the response")?
            }
            // The server may reject the request before reading all of it
            Err(err) => match codec::read_reply(&mut reader).await {
                Ok(reply) => {
                    log::debug!("Upload interrupted by the server: {err:#}");
                    reply
                }
                Err(_) => return Err(err.wrap_err("Failed to send the request")),
            },
        };
        let (status, body) = reply.dissolve();
        let response = match status {
            Status::Ok => Response::Completed(body),
            status => Response::Rejected {
                status,
                message: String::from_utf8_lossy(&body).into_owned(),
            },
        };
        Ok(response)
    }
}
