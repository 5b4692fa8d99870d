//! IPC server for the agent
//!
//! Serves one controller connection at a time over loopback TCP, JSON
//! bodies framed by a 4-byte little-endian length prefix. When a controller
//! disconnects the server goes back to accepting.

use crate::backend::Agent;
use scry_common::ipc::{error_codes, Request, Response, MAX_MESSAGE_SIZE};
use scry_common::{Error, Result};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Default port for the agent IPC endpoint.
pub const AGENT_PORT: u16 = 13339;

pub struct IpcServer {
    listener: TcpListener,
}

impl IpcServer {
    /// Bind the loopback endpoint. Port 0 requests an ephemeral port.
    pub fn bind(port: u16) -> Result<Self> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = TcpListener::bind(&addr)
            .map_err(|e| Error::Ipc(format!("Failed to bind {}: {}", addr, e)))?;
        info!(target: "scry_agent::ipc", address = %addr, "IPC server bound");
        Ok(Self { listener })
    }

    /// The port actually bound, for ephemeral binds.
    pub fn port(&self) -> Result<u16> {
        self.listener
            .local_addr()
            .map(|a| a.port())
            .map_err(|e| Error::Ipc(format!("No local address: {}", e)))
    }

    /// Accept controllers forever, one connection at a time.
    pub fn serve(&self, agent: &Agent) -> Result<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .map_err(|e| Error::Ipc(format!("Accept failed: {}", e)))?;
            info!(target: "scry_agent::ipc", peer = %peer, "Controller connected");

            if let Err(e) = handle_connection(stream, agent) {
                warn!(target: "scry_agent::ipc", peer = %peer, error = %e, "Connection ended with error");
            } else {
                info!(target: "scry_agent::ipc", peer = %peer, "Controller disconnected");
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, agent: &Agent) -> Result<()> {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(target: "scry_agent::ipc", error = %e, "Failed to set TCP_NODELAY");
    }

    while let Some(body) = read_frame(&mut stream)? {
        let response = match serde_json::from_slice::<Request>(&body) {
            Ok(request) => agent.handle_request(&request),
            Err(e) => {
                error!(target: "scry_agent::ipc", error = %e, "Invalid JSON in request");
                Response::error(
                    0,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                )
            }
        };
        write_frame(&mut stream, &response)?;
    }
    Ok(())
}

/// Read one length-prefixed frame; `None` on clean disconnect.
fn read_frame(stream: &mut TcpStream) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::Ipc(format!("Failed to read length: {}", e))),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(Error::Ipc(format!("Message too large: {} bytes", len)));
    }

    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .map_err(|e| Error::Ipc(format!("Failed to read body: {}", e)))?;
    debug!(target: "scry_agent::ipc", size = len, "Received frame");
    Ok(Some(body))
}

fn write_frame(stream: &mut TcpStream, response: &Response) -> Result<()> {
    let body = serde_json::to_vec(response)?;
    if body.len() > MAX_MESSAGE_SIZE {
        return Err(Error::Ipc("Response too large".to_string()));
    }

    stream
        .write_all(&(body.len() as u32).to_le_bytes())
        .and_then(|_| stream.write_all(&body))
        .and_then(|_| stream.flush())
        .map_err(|e| Error::Ipc(format!("Failed to write response: {}", e)))?;
    debug!(target: "scry_agent::ipc", id = response.id, size = body.len(), "Sent response");
    Ok(())
}
