// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Control channel client (UDP).
//
// Every command is one datagram out and one datagram back on a fresh
// socket. A request is a 32-byte header:
//
//   0..16   magic / protocol version
//   16..20  command code (big-endian)
//   20..24  payload length (big-endian, always 0 for current commands)
//   24..32  reserved, zero
//
// No retries happen here; a lost datagram surfaces as a timeout and the
// caller decides what to do.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, instrument};

use tapewerk_core::config::ResponseFraming;
use tapewerk_core::error::{Result, TapewerkError};
use tapewerk_core::status::Status;

/// Size of request and response headers.
pub const HEADER_LEN: usize = 32;

/// Fixed prefix of every request header ("TPRT", version 1, header size 0x20).
pub const HEADER_MAGIC: [u8; 16] = [
    0x54, 0x50, 0x52, 0x54, //
    0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x01, //
    0x00, 0x00, 0x00, 0x20,
];

/// Largest datagram we expect back.
const MAX_DATAGRAM: usize = 1500;

/// Expected body of a successful lock.
const LOCK_REPLY: [u8; 3] = [0x02, 0x00, 0x00];
/// Expected body of a successful unlock.
const UNLOCK_REPLY: [u8; 3] = [0x03, 0x00, 0x00];

/// Control-channel commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetStatus,
    Lock,
    Unlock,
    StartPrint,
}

impl Command {
    pub fn code(&self) -> u32 {
        match self {
            Self::GetStatus => 0x0001,
            Self::Lock => 0x0002,
            Self::Unlock => 0x0003,
            Self::StartPrint => 0x0101,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x0001 => Some(Self::GetStatus),
            0x0002 => Some(Self::Lock),
            0x0003 => Some(Self::Unlock),
            0x0101 => Some(Self::StartPrint),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::GetStatus => "status",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::StartPrint => "start",
        }
    }
}

/// Build the 32-byte header for `command` with an empty payload.
pub fn request_header(command: Command) -> [u8; HEADER_LEN] {
    encode_header(command.code(), 0)
}

/// Header layout shared by requests and canonical responses.
pub fn encode_header(code: u32, payload_len: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0..16].copy_from_slice(&HEADER_MAGIC);
    header[16..20].copy_from_slice(&code.to_be_bytes());
    header[20..24].copy_from_slice(&payload_len.to_be_bytes());
    header
}

/// Split a response datagram into `(header, body)` according to `framing`.
pub fn split_response<'a>(
    framing: ResponseFraming,
    request: &[u8; HEADER_LEN],
    response: &'a [u8],
) -> Result<(&'a [u8], &'a [u8])> {
    if response.len() < HEADER_LEN {
        return Err(TapewerkError::protocol(
            format!("response too short ({} bytes)", response.len()),
            response,
        ));
    }
    let (header, body) = response.split_at(HEADER_LEN);
    if framing == ResponseFraming::EchoedRequest && header != request.as_slice() {
        return Err(TapewerkError::protocol(
            "response does not echo the request header",
            response,
        ));
    }
    Ok((header, body))
}

/// Client for the UDP control channel of one device.
#[derive(Debug, Clone)]
pub struct ControlClient {
    addr: SocketAddr,
    timeout: Duration,
    framing: ResponseFraming,
}

impl ControlClient {
    /// `timeout` bounds each of bind/connect, send and receive separately.
    pub fn new(addr: SocketAddr, timeout: Duration, framing: ResponseFraming) -> Self {
        Self {
            addr,
            timeout,
            framing,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Read the 20-byte status register.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn get_status(&self) -> Result<Status> {
        let body = self.exchange(Command::GetStatus).await?;
        Status::from_bytes(&body).ok_or_else(|| {
            TapewerkError::protocol(
                format!("status body is {} bytes, expected 20", body.len()),
                &body,
            )
        })
    }

    /// Reserve the device for a job.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn lock(&self) -> Result<()> {
        let body = self.exchange(Command::Lock).await?;
        expect_body(Command::Lock, &body, &LOCK_REPLY)
    }

    /// Release the device.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn unlock(&self) -> Result<()> {
        let body = self.exchange(Command::Unlock).await?;
        expect_body(Command::Unlock, &body, &UNLOCK_REPLY)
    }

    /// Tell the device a job is coming on the data channel.
    #[instrument(skip(self), fields(addr = %self.addr))]
    pub async fn start_print(&self) -> Result<()> {
        let body = self.exchange(Command::StartPrint).await?;
        expect_body(Command::StartPrint, &body, &[])
    }

    /// One request/response round trip. Returns the response body.
    async fn exchange(&self, command: Command) -> Result<Vec<u8>> {
        let request = request_header(command);
        let what = command.name();

        let local: SocketAddr = if self.addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = tokio::time::timeout(self.timeout, async {
            let socket = UdpSocket::bind(local).await?;
            socket.connect(self.addr).await?;
            Ok::<_, std::io::Error>(socket)
        })
        .await
        .map_err(|_| {
            TapewerkError::Connectivity(format!(
                "dial {} for {what}: timed out after {:?}",
                self.addr, self.timeout
            ))
        })?
        .map_err(|e| TapewerkError::Connectivity(format!("dial {} for {what}: {e}", self.addr)))?;

        debug!(request = %hex::encode(request), "sending {what} request");
        tokio::time::timeout(self.timeout, socket.send(&request))
            .await
            .map_err(|_| {
                TapewerkError::Connectivity(format!(
                    "send {what} request: timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| TapewerkError::Connectivity(format!("send {what} request: {e}")))?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let n = tokio::time::timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| {
                TapewerkError::Connectivity(format!(
                    "receive {what} response: timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| TapewerkError::Connectivity(format!("receive {what} response: {e}")))?;
        buf.truncate(n);

        let (header, body) = split_response(self.framing, &request, &buf)?;
        debug!(
            header = %hex::encode(header),
            body = %hex::encode(body),
            "received {what} response"
        );
        Ok(body.to_vec())
    }
}

fn expect_body(command: Command, body: &[u8], expected: &[u8]) -> Result<()> {
    if body == expected {
        Ok(())
    } else {
        Err(TapewerkError::protocol(
            format!("unexpected {} response", command.name()),
            body,
        ))
    }
}
