//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests: a virtual terminal and serial control client talking
//! to an in-process RFC2217 peer over a duplex pipe.

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use comtel_client::{
    ClientConfig, ClientError, ControlCode, DataListener, DataSize, ModemState,
    ModemStateListener, Parity, SerialControl, StopSize, TelnetOption, VirtualTerminal, consts,
};
use comtel_codec::{AlwaysAccept, TelnetCodec, TelnetEvent, TelnetFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// Scripted RFC2217 Peer
// ============================================================================

/// Serial-port state the fake access server applies and reports.
struct PortState {
    baud: u32,
    data_size: u8,
    parity: u8,
    stop_size: u8,
    modem_mask: u8,
}

impl Default for PortState {
    fn default() -> Self {
        PortState {
            baud: 38_400,
            data_size: 8,
            parity: 1,
            stop_size: 1,
            modem_mask: 0,
        }
    }
}

/// Runs an in-process COM-PORT-OPTION server: accepts all negotiation,
/// answers every client command with `<code + reply_offset> <applied
/// value>`, and pushes a modem-state notification after each mask change.
/// `reply_offset` is normally 100; a different value simulates a
/// misbehaving server.
fn spawn_comport_server(stream: DuplexStream, reply_offset: u8) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut codec = TelnetCodec::new();
        for option in [
            TelnetOption::TransmitBinary,
            TelnetOption::Echo,
            TelnetOption::SuppressGoAhead,
            TelnetOption::ComPort,
        ] {
            codec.register(option, Box::new(AlwaysAccept));
        }
        let mut port = PortState::default();
        let mut inbound = BytesMut::with_capacity(1024);
        loop {
            match reader.read_buf(&mut inbound).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let mut outbound = BytesMut::new();
            while let Some(event) = codec.decode(&mut inbound).expect("server decode") {
                let TelnetEvent::Subnegotiation(TelnetOption::ComPort, payload) = event else {
                    continue;
                };
                let command = payload[0];
                let mut reply = BytesMut::new();
                reply.put_u8(command.wrapping_add(reply_offset));
                let mut notify_state: Option<u8> = None;
                match command {
                    consts::comport::SIGNATURE => reply.put_slice(b"ttyS1 test bench"),
                    consts::comport::SET_BAUDRATE => {
                        let requested =
                            u32::from_be_bytes(payload[1..5].try_into().expect("4 bytes"));
                        if requested != 0 {
                            port.baud = requested;
                        }
                        reply.put_u32(port.baud);
                    }
                    consts::comport::SET_DATASIZE => {
                        if payload[1] != 0 {
                            port.data_size = payload[1];
                        }
                        reply.put_u8(port.data_size);
                    }
                    consts::comport::SET_PARITY => {
                        if payload[1] != 0 {
                            port.parity = payload[1];
                        }
                        reply.put_u8(port.parity);
                    }
                    consts::comport::SET_STOPSIZE => {
                        if payload[1] != 0 {
                            port.stop_size = payload[1];
                        }
                        reply.put_u8(port.stop_size);
                    }
                    consts::comport::SET_CONTROL => {
                        // Queries report a fixed line state; settings echo.
                        let result = match payload[1] {
                            0 => 1,  // no flow control
                            4 => 6,  // break off
                            7 => 8,  // DTR on
                            10 => 11, // RTS on
                            other => other,
                        };
                        reply.put_u8(result);
                    }
                    consts::comport::SET_MODEMSTATE_MASK => {
                        port.modem_mask = payload[1];
                        reply.put_u8(port.modem_mask);
                        if port.modem_mask != 0 {
                            notify_state = Some(
                                ModemState::CARRIER_DETECT
                                    | ModemState::CLEAR_TO_SEND
                                    | ModemState::DELTA_CARRIER_DETECT,
                            );
                        }
                    }
                    _ => {}
                }
                codec
                    .encode(
                        TelnetFrame::Subnegotiate(TelnetOption::ComPort, reply),
                        &mut outbound,
                    )
                    .expect("server encode");
                if let Some(bits) = notify_state {
                    let mut notification = BytesMut::new();
                    notification.put_u8(consts::comport::NOTIFY_MODEMSTATE + 100);
                    notification.put_u8(bits & port.modem_mask);
                    codec
                        .encode(
                            TelnetFrame::Subnegotiate(TelnetOption::ComPort, notification),
                            &mut outbound,
                        )
                        .expect("server encode");
                }
            }
            while let Some(frame) = codec.take_reply() {
                codec.encode(frame, &mut outbound).expect("server encode");
            }
            if !outbound.is_empty() && writer.write_all(&outbound).await.is_err() {
                break;
            }
        }
    })
}

fn connected_pair(reply_offset: u8) -> (VirtualTerminal, JoinHandle<()>) {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let server = spawn_comport_server(server_io, reply_offset);
    let terminal = VirtualTerminal::new(client_io, ClientConfig::default());
    (terminal, server)
}

// ============================================================================
// Negotiation and Data Flow
// ============================================================================

#[tokio::test]
async fn default_negotiation_enables_options() {
    let (terminal, server) = connected_pair(100);
    terminal.negotiate().await.expect("negotiate");
    assert!(terminal.is_enabled_local(TelnetOption::TransmitBinary).await);
    assert!(terminal.is_enabled_remote(TelnetOption::TransmitBinary).await);
    assert!(terminal.is_enabled_local(TelnetOption::Echo).await);
    assert!(terminal.is_enabled_local(TelnetOption::SuppressGoAhead).await);
    terminal.close().await.expect("close");
    server.abort();
}

struct RecordingDataListener {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl DataListener for RecordingDataListener {
    async fn on_data(&self, data: &[u8]) {
        let _ = self.tx.send(data.to_vec());
    }
}

#[tokio::test]
async fn received_data_reaches_ring_and_listeners() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let server = tokio::spawn(async move {
        let (_reader, mut writer) = tokio::io::split(server_io);
        writer.write_all(b"PORT READY\r\n").await.expect("write");
        // Keep the connection open so the client does not see EOF.
        tokio::time::sleep(Duration::from_secs(60)).await;
    });
    let terminal = VirtualTerminal::new(client_io, ClientConfig::default());

    let (tx, mut rx) = mpsc::unbounded_channel();
    terminal.add_data_listener(Arc::new(RecordingDataListener { tx }));

    let mut collected = Vec::new();
    while collected.len() < 12 {
        let mut buf = [0u8; 32];
        let count = terminal
            .read_timeout(&mut buf, Duration::from_secs(5))
            .await
            .expect("read");
        assert!(count > 0, "unexpected EOF");
        collected.extend_from_slice(&buf[..count]);
    }
    assert_eq!(&collected, b"PORT READY\r\n");

    // The listener saw the same bytes, possibly batched differently.
    let mut heard = Vec::new();
    while heard.len() < 12 {
        heard.extend(rx.recv().await.expect("listener batch"));
    }
    assert_eq!(&heard, b"PORT READY\r\n");

    terminal.close().await.expect("close");
    server.abort();
}

// ============================================================================
// RFC2217 Command Round Trips
// ============================================================================

#[tokio::test]
async fn signature_query_returns_server_text() {
    let (terminal, server) = connected_pair(100);
    let serial = SerialControl::new(&terminal);
    assert!(serial.negotiate().await.expect("negotiate"));
    assert_eq!(serial.signature().await.expect("signature"), "ttyS1 test bench");
    terminal.close().await.expect("close");
    server.abort();
}

#[tokio::test]
async fn baud_rate_set_and_query_round_trip() {
    let (terminal, server) = connected_pair(100);
    let serial = SerialControl::new(&terminal);
    assert!(serial.negotiate().await.expect("negotiate"));

    assert_eq!(serial.set_baud_rate(9600).await.expect("set"), 9600);
    assert_eq!(serial.baud_rate().await.expect("query"), 9600);
    assert_eq!(serial.set_baud_rate(115_200).await.expect("set"), 115_200);
    assert_eq!(serial.baud_rate().await.expect("query"), 115_200);

    terminal.close().await.expect("close");
    server.abort();
}

#[tokio::test]
async fn serial_parameters_round_trip() {
    let (terminal, server) = connected_pair(100);
    let serial = SerialControl::new(&terminal);
    assert!(serial.negotiate().await.expect("negotiate"));

    assert_eq!(
        serial.set_parity(Parity::Even).await.expect("set parity"),
        Parity::Even
    );
    assert_eq!(serial.parity().await.expect("query parity"), Parity::Even);

    assert_eq!(
        serial
            .set_data_size(DataSize::Seven)
            .await
            .expect("set data size"),
        DataSize::Seven
    );
    assert_eq!(
        serial.data_size().await.expect("query data size"),
        DataSize::Seven
    );

    assert_eq!(
        serial
            .set_stop_size(StopSize::Two)
            .await
            .expect("set stop size"),
        StopSize::Two
    );
    assert_eq!(
        serial.stop_size().await.expect("query stop size"),
        StopSize::Two
    );

    serial.set_dtr(true).await.expect("dtr");
    serial.set_break(false).await.expect("break");
    assert_eq!(
        serial.flow_control().await.expect("flow control"),
        ControlCode::FlowControlNone
    );

    terminal.close().await.expect("close");
    server.abort();
}

#[tokio::test]
async fn modem_state_notifications_reach_listeners() {
    struct RecordingModemListener {
        tx: mpsc::UnboundedSender<ModemState>,
    }

    #[async_trait]
    impl ModemStateListener for RecordingModemListener {
        async fn on_modem_state(&self, state: ModemState) {
            let _ = self.tx.send(state);
        }
    }

    let (terminal, server) = connected_pair(100);
    let (tx, mut rx) = mpsc::unbounded_channel();
    terminal.add_modem_state_listener(Arc::new(RecordingModemListener { tx }));

    let serial = SerialControl::new(&terminal);
    assert!(serial.negotiate().await.expect("negotiate"));
    let applied = serial
        .set_modem_state_mask(ModemState::ALL)
        .await
        .expect("mask");
    assert_eq!(applied, ModemState::ALL);

    let state = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("notification in time")
        .expect("listener alive");
    assert!(state.carrier_detect());
    assert!(state.clear_to_send());
    assert!(!state.ring_indicator());
    assert!(state.changed());

    terminal.close().await.expect("close");
    server.abort();
}

// ============================================================================
// Failure Modes
// ============================================================================

#[tokio::test]
async fn mismatched_reply_code_fails_the_request() {
    // This server answers with reply codes shifted by 50 instead of 100.
    let (terminal, server) = connected_pair(50);
    let serial = SerialControl::new(&terminal);
    assert!(serial.negotiate().await.expect("negotiate"));

    let err = serial.set_baud_rate(9600).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ReplyMismatch {
            expected: 101,
            received: 51,
        }
    ));

    terminal.close().await.expect("close");
    server.abort();
}

#[tokio::test(start_paused = true)]
async fn negotiation_timeout_then_retry_succeeds() {
    let (client_io, server_io) = tokio::io::duplex(1024);
    let peer = tokio::spawn(async move {
        let (mut reader, mut writer) = tokio::io::split(server_io);
        let mut verb = [0u8; 3];
        // Ignore the first DO and let the client time out.
        reader.read_exact(&mut verb).await.expect("first request");
        assert_eq!(verb, [consts::IAC, consts::DO, consts::option::COM_PORT]);
        // Answer the retry.
        reader.read_exact(&mut verb).await.expect("second request");
        assert_eq!(verb, [consts::IAC, consts::DO, consts::option::COM_PORT]);
        writer
            .write_all(&[consts::IAC, consts::WILL, consts::option::COM_PORT])
            .await
            .expect("answer");
    });

    let config = ClientConfig::default().with_negotiation_timeout(Duration::from_secs(2));
    let terminal = VirtualTerminal::new(client_io, config);

    let started = tokio::time::Instant::now();
    let err = terminal
        .request_remote(TelnetOption::ComPort, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::NegotiationTimeout {
            option: TelnetOption::ComPort,
            ..
        }
    ));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_millis(2100));

    // The timed-out attempt must not block the retry.
    let enabled = terminal
        .request_remote(TelnetOption::ComPort, true)
        .await
        .expect("retry");
    assert!(enabled);

    peer.await.expect("peer");
    terminal.close().await.expect("close");
}

#[tokio::test(start_paused = true)]
async fn subnegotiation_request_times_out_against_silent_server() {
    let (client_io, server_io) = tokio::io::duplex(1024);
    // Peer that consumes bytes and never answers.
    let peer = tokio::spawn(async move {
        let (mut reader, _writer) = tokio::io::split(server_io);
        let mut sink = [0u8; 256];
        while reader.read(&mut sink).await.map(|n| n > 0).unwrap_or(false) {}
    });

    let config = ClientConfig::default().with_request_timeout(Duration::from_secs(1));
    let terminal = VirtualTerminal::new(client_io, config);
    let serial = SerialControl::new(&terminal);

    let started = tokio::time::Instant::now();
    let err = serial.set_baud_rate(9600).await.unwrap_err();
    assert!(matches!(err, ClientError::RequestTimeout { .. }));
    assert!(started.elapsed() >= Duration::from_secs(1));

    // The slot is free again for the next attempt.
    let err = serial.baud_rate().await.unwrap_err();
    assert!(matches!(err, ClientError::RequestTimeout { .. }));

    terminal.close().await.expect("close");
    peer.abort();
}

#[tokio::test(start_paused = true)]
async fn close_fails_outstanding_requests() {
    let (client_io, server_io) = tokio::io::duplex(1024);
    let peer = tokio::spawn(async move {
        let (mut reader, _writer) = tokio::io::split(server_io);
        let mut sink = [0u8; 256];
        while reader.read(&mut sink).await.map(|n| n > 0).unwrap_or(false) {}
    });

    let terminal = VirtualTerminal::new(client_io, ClientConfig::default());
    let serial = SerialControl::new(&terminal);
    let outstanding = tokio::spawn(async move { serial.set_baud_rate(9600).await });

    // Let the request register before closing.
    tokio::time::sleep(Duration::from_millis(50)).await;
    terminal.close().await.expect("close");

    let err = outstanding
        .await
        .expect("task completes")
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::ConnectionClosed | ClientError::Io(_)
    ));
    peer.abort();
}
