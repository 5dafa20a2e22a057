//! The request adapter: a minimal line-based GET-only protocol over TCP.
//!
//! Each connection carries exactly one request; the response closes the
//! connection. Everything of substance is delegated to the
//! [`JobManager`]; this layer parses, dispatches, and serializes.

pub mod handler;
pub mod request;
pub mod response;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::jobs::JobManager;
use crate::server::request::Request;

pub struct Server {
    listener: TcpListener,
    manager: Arc<JobManager>,
}

impl Server {
    pub async fn bind(addr: SocketAddr, manager: Arc<JobManager>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, manager })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop. Runs until the shutdown token fires; each connection is
    /// served on its own task.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        match self.local_addr() {
            Ok(addr) => tracing::info!(addr = %addr, "server listening"),
            Err(_) => tracing::info!("server listening"),
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let manager = Arc::clone(&self.manager);
                            tokio::spawn(async move {
                                handle_connection(stream, peer, manager).await;
                            });
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to accept connection");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, manager: Arc<JobManager>) {
    let request_id = Uuid::new_v4().simple().to_string();
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    match reader.read_line(&mut request_line).await {
        Ok(0) | Err(_) => return,
        Ok(_) => {}
    }

    // Headers are read and discarded; the protocol carries no body.
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header).await {
            Ok(0) | Err(_) => break,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
        }
    }

    let (code, body) = match Request::parse(request_line.trim_end()) {
        Ok(req) => {
            tracing::debug!(
                request_id = %request_id,
                peer = %peer,
                method = %req.method,
                path = %req.path,
                "request received"
            );
            handler::handle(&req, &manager).await
        }
        Err(err) => {
            tracing::debug!(request_id = %request_id, peer = %peer, error = %err, "bad request");
            (400, format!(r#"{{"error": "{err}"}}"#))
        }
    };

    let payload = response::build(code, &body, &request_id);
    if let Err(err) = writer.write_all(payload.as_bytes()).await {
        tracing::debug!(request_id = %request_id, error = %err, "failed to write response");
        return;
    }
    let _ = writer.shutdown().await;
}
