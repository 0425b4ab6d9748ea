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

//! Network Virtual Terminal over an asynchronous byte stream
//!
//! [`VirtualTerminal`] wraps a duplex transport with the Telnet engine: a
//! dedicated reader task drains the stream through the codec, answers
//! negotiation traffic, fills the receive ring buffer, fans received bytes
//! out to listeners, and completes pending subnegotiation transactions.
//! All mutation of codec and option state happens on that single reader
//! path; the public methods coordinate with it through locks and
//! notifications, never by polling raw fields.

use crate::channel::SubnegotiationChannel;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::listener::{DataListener, ModemStateListener};
use bytes::BytesMut;
use comtel_codec::comport::ModemState;
use comtel_codec::{
    AlwaysAccept, ByteRingBuffer, OptionHandler, TelnetCodec, TelnetEvent, TelnetFrame,
    TelnetOption, TelnetSide, consts,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

/// Locks a std mutex, recovering the guard if a panicking holder poisoned it.
fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Network Virtual Terminal: a Telnet connection with a background pump.
///
/// Owns the transport. Dropping or [`close`](VirtualTerminal::close)-ing the
/// terminal stops the reader task; close additionally fails every
/// outstanding negotiation and subnegotiation wait with
/// [`ClientError::ConnectionClosed`].
pub struct VirtualTerminal {
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
}

/// Connection state shared between the terminal handle, the serial control
/// client and the reader task.
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) codec: Mutex<TelnetCodec>,
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    ring: std::sync::Mutex<ByteRingBuffer>,
    readable: Notify,
    negotiation: Notify,
    pub(crate) channel: SubnegotiationChannel,
    data_listeners: std::sync::Mutex<Vec<Arc<dyn DataListener>>>,
    modem_listeners: std::sync::Mutex<Vec<Arc<dyn ModemStateListener>>>,
    closed: AtomicBool,
}

impl VirtualTerminal {
    /// Wraps `stream` in a virtual terminal and spawns its reader task.
    pub fn new<S>(stream: S, config: ClientConfig) -> VirtualTerminal
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let shared = Arc::new(Shared {
            codec: Mutex::new(TelnetCodec::new()),
            writer: Mutex::new(Box::new(write_half)),
            ring: std::sync::Mutex::new(ByteRingBuffer::new(config.buffer_capacity)),
            readable: Notify::new(),
            negotiation: Notify::new(),
            channel: SubnegotiationChannel::new(),
            data_listeners: std::sync::Mutex::new(Vec::new()),
            modem_listeners: std::sync::Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            config,
        });
        let reader = tokio::spawn(run_reader(shared.clone(), Box::new(read_half)));
        VirtualTerminal { shared, reader }
    }

    pub(crate) fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }

    /// Registers a capability handler for `option`.
    pub async fn register_option(&self, option: TelnetOption, handler: Box<dyn OptionHandler>) {
        self.shared.codec.lock().await.register(option, handler);
    }

    /// Adds a listener for asynchronously received application bytes.
    pub fn add_data_listener(&self, listener: Arc<dyn DataListener>) {
        lock(&self.shared.data_listeners).push(listener);
    }

    /// Adds a listener for RFC2217 modem-state notifications.
    pub fn add_modem_state_listener(&self, listener: Arc<dyn ModemStateListener>) {
        lock(&self.shared.modem_listeners).push(listener);
    }

    /// Runs the default startup negotiation: offer and request
    /// TRANSMIT-BINARY, ECHO and SUPPRESS-GO-AHEAD in both directions.
    ///
    /// Options the peer refuses or leaves unanswered are logged and
    /// tolerated; only a failed connection is an error.
    pub async fn negotiate(&self) -> Result<()> {
        const DEFAULTS: [TelnetOption; 3] = [
            TelnetOption::TransmitBinary,
            TelnetOption::Echo,
            TelnetOption::SuppressGoAhead,
        ];
        {
            let mut codec = self.shared.codec.lock().await;
            for option in DEFAULTS {
                if codec.options().state(option).is_none() {
                    codec.register(option, Box::new(AlwaysAccept));
                }
            }
        }
        for option in DEFAULTS {
            for side in [TelnetSide::Local, TelnetSide::Remote] {
                match self.shared.request_option(side, option, true).await {
                    Ok(true) => debug!("default option {} enabled ({})", option, side),
                    Ok(false) => debug!("default option {} refused ({})", option, side),
                    Err(ClientError::NegotiationTimeout { .. }) => {
                        debug!("default option {} unanswered ({})", option, side);
                    }
                    Err(error) => return Err(error),
                }
            }
        }
        Ok(())
    }

    /// Negotiates our side of `option` (WILL/WONT) and waits for the
    /// peer's answer.
    ///
    /// Returns `Ok(true)` when the option ends up in the requested state,
    /// `Ok(false)` when the peer refused. A refusal is a normal protocol
    /// outcome, not an error. Times out with
    /// [`ClientError::NegotiationTimeout`], clearing the pending request so
    /// a later retry starts fresh.
    pub async fn request_local(&self, option: TelnetOption, enable: bool) -> Result<bool> {
        self.shared
            .request_option(TelnetSide::Local, option, enable)
            .await
    }

    /// Negotiates the peer's side of `option` (DO/DONT). Mirrors
    /// [`request_local`](VirtualTerminal::request_local).
    pub async fn request_remote(&self, option: TelnetOption, enable: bool) -> Result<bool> {
        self.shared
            .request_option(TelnetSide::Remote, option, enable)
            .await
    }

    /// Whether `option` is confirmed enabled on the local side.
    pub async fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.shared.codec.lock().await.is_enabled_local(option)
    }

    /// Whether `option` is confirmed enabled on the remote side.
    pub async fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.shared.codec.lock().await.is_enabled_remote(option)
    }

    /// Number of decoded application bytes waiting in the receive buffer.
    pub fn available(&self) -> usize {
        lock(&self.shared.ring).available()
    }

    /// Non-blocking read: copies up to `buf.len()` buffered bytes,
    /// returning how many were copied (possibly 0).
    pub fn try_read(&self, buf: &mut [u8]) -> usize {
        lock(&self.shared.ring).read(buf)
    }

    /// Blocking read: waits until at least one byte is available, the
    /// configured read timeout elapses, or the connection closes.
    ///
    /// Returns `Ok(0)` only at end of stream (connection closed and buffer
    /// drained).
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        match self.shared.config.read_timeout {
            Some(timeout) => self.read_timeout(buf, timeout).await,
            None => self.read_until_ready(buf).await,
        }
    }

    /// Blocking read with an explicit timeout.
    pub async fn read_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        match tokio::time::timeout(timeout, self.read_until_ready(buf)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::ReadTimeout),
        }
    }

    async fn read_until_ready(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let notified = self.shared.readable.notified();
            {
                let mut ring = lock(&self.shared.ring);
                let count = ring.read(buf);
                if count > 0 {
                    return Ok(count);
                }
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return Ok(0);
            }
            notified.await;
        }
    }

    /// Writes application bytes through the engine's outbound escaping and
    /// flushes them to the transport.
    ///
    /// A trailing CR is held back by the CR-transparency lookahead until
    /// the next write or an explicit [`flush`](VirtualTerminal::flush)
    /// decides between `CR LF` and `CR NUL`.
    pub async fn write(&self, data: &[u8]) -> Result<()> {
        let mut wire = BytesMut::with_capacity(data.len() + 8);
        {
            let mut codec = self.shared.codec.lock().await;
            codec.encode(data, &mut wire)?;
        }
        self.shared.write_all(&wire).await
    }

    /// Resolves any deferred CR padding and flushes the transport.
    pub async fn flush(&self) -> Result<()> {
        let mut wire = BytesMut::new();
        self.shared.codec.lock().await.flush_pending(&mut wire);
        self.shared.write_all(&wire).await
    }

    /// Sends a single control or negotiation frame.
    pub async fn send_frame(&self, frame: TelnetFrame) -> Result<()> {
        self.shared.send_frame(frame).await
    }

    /// Sends a subnegotiation for `option` and waits for the reply whose
    /// first payload byte equals `expected_reply`, using the configured
    /// request timeout.
    pub async fn subnegotiate(
        &self,
        option: TelnetOption,
        payload: &[u8],
        expected_reply: u8,
    ) -> Result<Vec<u8>> {
        self.shared
            .send_and_wait(option, BytesMut::from(payload), expected_reply)
            .await
    }

    /// Total bytes consumed from the wire so far.
    pub async fn received_bytes(&self) -> u64 {
        self.shared.codec.lock().await.received_bytes()
    }

    /// Total bytes produced for the wire so far.
    pub async fn sent_bytes(&self) -> u64 {
        self.shared.codec.lock().await.sent_bytes()
    }

    /// Whether the connection has terminated.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Closes the connection: fails all outstanding waits, shuts the
    /// transport down and stops the reader task.
    pub async fn close(&self) -> Result<()> {
        self.shared.shutdown().await;
        {
            let mut writer = self.shared.writer.lock().await;
            // The peer may already be gone; that is not a close failure.
            let _ = writer.shutdown().await;
        }
        self.reader.abort();
        Ok(())
    }
}

impl Drop for VirtualTerminal {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Shared {
    /// Encodes and sends one frame, flushing the transport.
    pub(crate) async fn send_frame(&self, frame: TelnetFrame) -> Result<()> {
        let mut wire = BytesMut::new();
        {
            let mut codec = self.codec.lock().await;
            codec.encode(frame, &mut wire)?;
        }
        self.write_all(&wire).await
    }

    /// Writes raw, already-encoded bytes to the transport and flushes.
    async fn write_all(&self, wire: &[u8]) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::ConnectionClosed);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(wire).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Encodes and sends every queued negotiation reply, in order.
    async fn drain_replies(&self) -> Result<()> {
        let mut wire = BytesMut::new();
        {
            let mut codec = self.codec.lock().await;
            while let Some(reply) = codec.take_reply() {
                trace!("answering negotiation with {}", reply);
                codec.encode(reply, &mut wire)?;
            }
        }
        if wire.is_empty() {
            return Ok(());
        }
        self.write_all(&wire).await
    }

    /// Starts a local- or remote-side negotiation and waits for the answer.
    pub(crate) async fn request_option(
        &self,
        side: TelnetSide,
        option: TelnetOption,
        enable: bool,
    ) -> Result<bool> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::ConnectionClosed);
        }
        let frame = {
            let mut codec = self.codec.lock().await;
            match side {
                TelnetSide::Local => codec.request_local(option, enable),
                TelnetSide::Remote => codec.request_remote(option, enable),
            }
        };
        let Some(frame) = frame else {
            // Nothing to send: already in (or moving toward) the
            // requested state.
            let codec = self.codec.lock().await;
            let enabled = match side {
                TelnetSide::Local => codec.is_enabled_local(option),
                TelnetSide::Remote => codec.is_enabled_remote(option),
            };
            return Ok(enabled == enable);
        };
        self.send_frame(frame).await?;

        let timeout = self.config.negotiation_timeout;
        let answered = async {
            loop {
                let notified = self.negotiation.notified();
                {
                    let codec = self.codec.lock().await;
                    let pending = match side {
                        TelnetSide::Local => codec.options().is_pending_local(option),
                        TelnetSide::Remote => codec.options().is_pending_remote(option),
                    };
                    if !pending {
                        let enabled = match side {
                            TelnetSide::Local => codec.is_enabled_local(option),
                            TelnetSide::Remote => codec.is_enabled_remote(option),
                        };
                        return Ok(enabled == enable);
                    }
                }
                if self.closed.load(Ordering::Acquire) {
                    return Err(ClientError::ConnectionClosed);
                }
                notified.await;
            }
        };
        match tokio::time::timeout(timeout, answered).await {
            Ok(result) => result,
            Err(_) => {
                // Clear the stale request so a retry is not blocked.
                let mut codec = self.codec.lock().await;
                match side {
                    TelnetSide::Local => codec.options_mut().clear_pending_local(option),
                    TelnetSide::Remote => codec.options_mut().clear_pending_remote(option),
                }
                Err(ClientError::NegotiationTimeout { option, timeout })
            }
        }
    }

    /// Sends a subnegotiation and waits for its reply, enforcing the
    /// configured request timeout. The transaction slot is removed on
    /// timeout so a late reply cannot complete a future request.
    pub(crate) async fn send_and_wait(
        &self,
        option: TelnetOption,
        payload: BytesMut,
        expected: u8,
    ) -> Result<Vec<u8>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::ConnectionClosed);
        }
        let rx = self.channel.begin(option, expected).await?;
        if let Err(error) = self.send_frame(TelnetFrame::Subnegotiate(option, payload)).await {
            self.channel.cancel(option).await;
            return Err(error);
        }
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                self.channel.cancel(option).await;
                Err(ClientError::RequestTimeout { option, timeout })
            }
        }
    }

    /// Marks the connection closed and wakes everything that might be
    /// waiting on it.
    async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        self.channel.fail_all().await;
        self.negotiation.notify_waiters();
        self.readable.notify_waiters();
    }
}

/// Reader task: drains the transport into the engine until EOF or error.
async fn run_reader(shared: Arc<Shared>, mut reader: Box<dyn AsyncRead + Send + Unpin>) {
    let mut inbound = BytesMut::with_capacity(4096);
    loop {
        match reader.read_buf(&mut inbound).await {
            Ok(0) => {
                debug!("peer closed the connection");
                break;
            }
            Ok(_) => {
                if let Err(err) = process_inbound(&shared, &mut inbound).await {
                    error!("connection failed: {err}");
                    break;
                }
            }
            Err(err) => {
                error!("read failed: {err}");
                break;
            }
        }
    }
    shared.shutdown().await;
}

/// Decodes everything currently buffered and dispatches the results:
/// data to the ring buffer and listeners, subnegotiations to the pending
/// transactions or notification listeners, replies back to the peer.
async fn process_inbound(shared: &Arc<Shared>, inbound: &mut BytesMut) -> Result<()> {
    let mut data = Vec::new();
    let mut subnegotiations = Vec::new();
    {
        let mut codec = shared.codec.lock().await;
        while let Some(event) = codec.decode(inbound)? {
            match event {
                TelnetEvent::Data(byte) => data.push(byte),
                TelnetEvent::Subnegotiation(option, payload) => {
                    subnegotiations.push((option, payload));
                }
                TelnetEvent::OptionStatus(option, side, enabled) => {
                    debug!("option {} now {} on the {} side", option, enabled, side);
                }
                TelnetEvent::SubnegotiationOverflow(option) => {
                    warn!("oversized subnegotiation for {} discarded", option);
                }
                other => trace!("ignoring control event {:?}", other),
            }
        }
    }
    shared.drain_replies().await?;
    shared.negotiation.notify_waiters();

    if !data.is_empty() {
        {
            let mut ring = lock(&shared.ring);
            let space = ring.space();
            if data.len() > space {
                warn!(
                    "receive buffer full, dropping {} bytes",
                    data.len() - space
                );
                let _ = ring.write(&data[..space]);
            } else {
                let _ = ring.write(&data);
            }
        }
        shared.readable.notify_waiters();
        let listeners: Vec<Arc<dyn DataListener>> = lock(&shared.data_listeners).clone();
        for listener in listeners {
            listener.on_data(&data).await;
        }
    }

    for (option, payload) in subnegotiations {
        route_subnegotiation(shared, option, &payload).await;
    }
    Ok(())
}

/// Routes one completed subnegotiation: modem-state notifications to the
/// listener fan-out, everything else to the pending transaction for its
/// option.
async fn route_subnegotiation(shared: &Arc<Shared>, option: TelnetOption, payload: &[u8]) {
    const NOTIFY_MODEMSTATE_REPLY: u8 =
        consts::comport::NOTIFY_MODEMSTATE + consts::comport::SERVER_OFFSET;
    if option == TelnetOption::ComPort && payload.first() == Some(&NOTIFY_MODEMSTATE_REPLY) {
        let Some(&bits) = payload.get(1) else {
            warn!("modem-state notification without a state byte");
            return;
        };
        let state = ModemState::from(bits);
        debug!("modem state notification: {}", state);
        let listeners: Vec<Arc<dyn ModemStateListener>> = lock(&shared.modem_listeners).clone();
        for listener in listeners {
            listener.on_modem_state(state).await;
        }
        return;
    }
    if !shared.channel.complete(option, payload).await {
        warn!(
            "unsolicited subnegotiation for {} ({} bytes) discarded",
            option,
            payload.len()
        );
    }
}
