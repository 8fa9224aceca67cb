// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process fake printer for tests: a UDP control socket and a TCP data
// listener on 127.0.0.1 that record everything they receive.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinHandle;

use tapewerk_core::config::ResponseFraming;
use tapewerk_core::status::{IDLE_TEMPLATE, TapeType};

use crate::control::{Command, HEADER_LEN, encode_header};

#[derive(Debug, Default)]
struct Recorded {
    commands: Vec<Command>,
    /// One entry per accepted data connection, filled when the peer closes.
    jobs: Vec<Vec<u8>>,
    connections: usize,
    printing: bool,
    printing_polls_left: usize,
    hold_printing: bool,
}

pub(crate) struct MockDeviceBuilder {
    status: Vec<u8>,
    framing: ResponseFraming,
    lock_reply: Vec<u8>,
    unlock_reply: Vec<u8>,
    start_reply: Vec<u8>,
    silent: Option<Command>,
    printing_polls: usize,
    hold_printing: bool,
    data_listener: bool,
    stall_data: bool,
}

impl MockDeviceBuilder {
    pub(crate) fn tape(mut self, tape: TapeType) -> Self {
        if self.status.len() > 3 {
            self.status[3] = tape.code();
        }
        self
    }

    /// Raw status body, any length.
    pub(crate) fn status_body(mut self, body: Vec<u8>) -> Self {
        self.status = body;
        self
    }

    pub(crate) fn framing(mut self, framing: ResponseFraming) -> Self {
        self.framing = framing;
        self
    }

    pub(crate) fn lock_reply(mut self, body: Vec<u8>) -> Self {
        self.lock_reply = body;
        self
    }

    pub(crate) fn unlock_reply(mut self, body: Vec<u8>) -> Self {
        self.unlock_reply = body;
        self
    }

    pub(crate) fn start_reply(mut self, body: Vec<u8>) -> Self {
        self.start_reply = body;
        self
    }

    /// Never answer `command`.
    pub(crate) fn silent(mut self, command: Command) -> Self {
        self.silent = Some(command);
        self
    }

    /// Report "printing" for this many status polls after StartPrint.
    pub(crate) fn printing_polls(mut self, polls: usize) -> Self {
        self.printing_polls = polls;
        self
    }

    /// Report "printing" after StartPrint until [`MockDevice::finish_printing`].
    pub(crate) fn hold_printing(mut self) -> Self {
        self.hold_printing = true;
        self
    }

    /// Accept data connections but never read from them.
    pub(crate) fn stall_data(mut self) -> Self {
        self.stall_data = true;
        self
    }

    /// Leave the data port closed so dialing it is refused.
    pub(crate) fn without_data_listener(mut self) -> Self {
        self.data_listener = false;
        self
    }

    pub(crate) async fn spawn(self) -> MockDevice {
        let control = UdpSocket::bind("127.0.0.1:0").await.expect("bind udp");
        let control_addr = control.local_addr().expect("udp addr");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind tcp");
        let data_addr = listener.local_addr().expect("tcp addr");

        let recorded = Arc::new(Mutex::new(Recorded {
            hold_printing: self.hold_printing,
            ..Recorded::default()
        }));

        let mut tasks = Vec::new();
        if self.data_listener {
            tasks.push(tokio::spawn(serve_data(
                listener,
                self.stall_data,
                Arc::clone(&recorded),
            )));
        } else {
            drop(listener);
        }
        tasks.push(tokio::spawn(serve_control(
            control,
            self,
            Arc::clone(&recorded),
        )));

        MockDevice {
            control_addr,
            data_addr,
            recorded,
            tasks,
        }
    }
}

pub(crate) struct MockDevice {
    control_addr: SocketAddr,
    data_addr: SocketAddr,
    recorded: Arc<Mutex<Recorded>>,
    tasks: Vec<JoinHandle<()>>,
}

impl MockDevice {
    pub(crate) fn builder() -> MockDeviceBuilder {
        let mut status = IDLE_TEMPLATE.to_vec();
        status[3] = TapeType::Width12mm.code();
        MockDeviceBuilder {
            status,
            framing: ResponseFraming::HeaderAndBody,
            lock_reply: vec![0x02, 0x00, 0x00],
            unlock_reply: vec![0x03, 0x00, 0x00],
            start_reply: Vec::new(),
            silent: None,
            printing_polls: 2,
            hold_printing: false,
            data_listener: true,
            stall_data: false,
        }
    }

    pub(crate) fn control_addr(&self) -> SocketAddr {
        self.control_addr
    }

    pub(crate) fn data_port(&self) -> u16 {
        self.data_addr.port()
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.recorded.lock().expect("mock state").commands.clone()
    }

    pub(crate) fn connections(&self) -> usize {
        self.recorded.lock().expect("mock state").connections
    }

    pub(crate) fn jobs(&self) -> Vec<Vec<u8>> {
        self.recorded.lock().expect("mock state").jobs.clone()
    }

    /// Stop reporting "printing".
    pub(crate) fn finish_printing(&self) {
        let mut recorded = self.recorded.lock().expect("mock state");
        recorded.hold_printing = false;
        recorded.printing_polls_left = 0;
    }

    /// Wait until the device has seen `command`.
    pub(crate) async fn wait_for(&self, command: Command) {
        for _ in 0..500 {
            if self.commands().contains(&command) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("mock device never received {command:?}");
    }

    /// Wait until `n` data connections have been closed by the peer.
    pub(crate) async fn wait_for_jobs(&self, n: usize) {
        for _ in 0..500 {
            if self.jobs().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("mock device never saw {n} closed data connections");
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn serve_control(socket: UdpSocket, cfg: MockDeviceBuilder, recorded: Arc<Mutex<Recorded>>) {
    let mut buf = vec![0u8; 1500];
    loop {
        let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
            return;
        };
        if n < HEADER_LEN {
            continue;
        }
        let request = &buf[..HEADER_LEN];
        let code = u32::from_be_bytes([request[16], request[17], request[18], request[19]]);
        let Some(command) = Command::from_code(code) else {
            continue;
        };

        let body = {
            let mut state = recorded.lock().expect("mock state");
            state.commands.push(command);
            match command {
                Command::GetStatus => {
                    let busy = state.printing && (state.hold_printing || state.printing_polls_left > 0);
                    if busy {
                        state.printing_polls_left = state.printing_polls_left.saturating_sub(1);
                        let mut printing = cfg.status.clone();
                        if printing.len() > 1 {
                            printing[1] = 0x02;
                        }
                        printing
                    } else {
                        state.printing = false;
                        cfg.status.clone()
                    }
                }
                Command::Lock => cfg.lock_reply.clone(),
                Command::Unlock => cfg.unlock_reply.clone(),
                Command::StartPrint => {
                    state.printing = true;
                    state.printing_polls_left = cfg.printing_polls;
                    cfg.start_reply.clone()
                }
            }
        };

        if cfg.silent == Some(command) {
            continue;
        }

        let mut response = match cfg.framing {
            ResponseFraming::HeaderAndBody => encode_header(code, body.len() as u32).to_vec(),
            ResponseFraming::EchoedRequest => request.to_vec(),
        };
        response.extend_from_slice(&body);
        let _ = socket.send_to(&response, peer).await;
    }
}

async fn serve_data(listener: TcpListener, stall: bool, recorded: Arc<Mutex<Recorded>>) {
    // Stalled connections stay open until the device is dropped.
    let mut held = Vec::new();
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        recorded.lock().expect("mock state").connections += 1;
        if stall {
            held.push(stream);
            continue;
        }
        let recorded = Arc::clone(&recorded);
        tokio::spawn(async move {
            let mut job = Vec::new();
            let _ = stream.read_to_end(&mut job).await;
            recorded.lock().expect("mock state").jobs.push(job);
        });
    }
}
