// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data channel (TCP).
//
// One connection per job: dial, write the whole job stream, shut down. The
// device starts printing only after the connection is closed, so closing is
// its own step with its own error.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use tapewerk_core::error::{Result, TapewerkError};

/// Write granularity for progress logging.
const CHUNK_SIZE: usize = 8192;

/// An open data-channel connection.
#[derive(Debug)]
pub struct DataChannel {
    stream: TcpStream,
    addr: SocketAddr,
}

impl DataChannel {
    /// Dial the device, bounded by `timeout`.
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        info!(addr = %addr, "connecting data channel");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                TapewerkError::Connect(format!("{addr} timed out after {timeout:?}"))
            })?
            .map_err(|e| TapewerkError::Connect(format!("{addr}: {e}")))?;

        debug!(addr = %addr, "data channel connected");
        Ok(Self { stream, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Write all of `bytes`; the whole write must finish within `timeout`.
    pub async fn send(&mut self, bytes: &[u8], timeout: Duration) -> Result<()> {
        let addr = self.addr;
        let stream = &mut self.stream;

        let write = async {
            let mut sent = 0usize;
            for chunk in bytes.chunks(CHUNK_SIZE) {
                stream.write_all(chunk).await.map_err(|e| {
                    TapewerkError::Transfer(format!("send failed at byte {sent}: {e}"))
                })?;
                sent += chunk.len();
                debug!(sent, total = bytes.len(), "data channel progress");
            }
            stream
                .flush()
                .await
                .map_err(|e| TapewerkError::Transfer(format!("flush: {e}")))
        };

        tokio::time::timeout(timeout, write).await.map_err(|_| {
            TapewerkError::Transfer(format!(
                "writing {} bytes to {addr} timed out after {timeout:?}",
                bytes.len()
            ))
        })??;

        info!(total = bytes.len(), "print data sent");
        Ok(())
    }

    /// Shut the connection down cleanly.
    pub async fn close(mut self) -> Result<()> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| TapewerkError::Close(format!("{}: {e}", self.addr)))?;
        debug!(addr = %self.addr, "data channel closed");
        Ok(())
    }

    /// Drop the connection after a failed step.
    pub fn abandon(self) {
        debug!(addr = %self.addr, "closing data channel after failure");
    }
}
