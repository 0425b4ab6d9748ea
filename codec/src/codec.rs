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

use super::{TelnetEvent, TelnetFrame, consts};
use crate::options::{OptionHandler, OptionRegistry, TelnetOption, TelnetSide};
use crate::result::CodecError;
use bytes::{Buf, BufMut, BytesMut};
use std::collections::VecDeque;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

/// Maximum accepted length of an inbound subnegotiation payload.
///
/// The largest payload this engine legitimately receives is an RFC2217
/// signature string; 4 KiB is generous headroom. A subnegotiation that
/// exceeds the limit is discarded in full: the decoder emits
/// [`TelnetEvent::SubnegotiationOverflow`] and resynchronizes at the
/// closing `IAC SE` without dropping the connection.
pub const MAX_SUBNEGOTIATION_LEN: usize = 4096;

/// A codec for handling the Telnet protocol, providing functionality to
/// encode and decode Telnet byte streams.
///
/// `TelnetCodec` owns the two independent per-connection state machines —
/// one for the inbound byte stream, one for outbound encoding — together
/// with the [`OptionRegistry`] that adjudicates option negotiation. It is
/// typically driven by a per-connection reader task and paired with a
/// transport through `tokio_util::codec`.
///
/// Decoding consumes raw, possibly IAC-escaped bytes and produces
/// [`TelnetEvent`]s: application data bytes, control commands, completed
/// negotiation status changes, and subnegotiation payloads. Negotiation
/// verbs (DO/DONT/WILL/WONT) are answered internally; the reply frames are
/// queued and must be drained with [`take_reply`](TelnetCodec::take_reply)
/// and written to the transport by the caller, in order.
///
/// Encoding doubles IAC bytes and applies the RFC854 CR transparency rule:
/// when TRANSMIT-BINARY is not enabled locally, a CR is followed by a
/// padding NUL unless the next byte is LF. The lookahead state persists
/// across `encode` calls, so a CR-LF pair split over two calls still
/// encodes as `0D 0A`; call [`flush_pending`](TelnetCodec::flush_pending)
/// before flushing the transport to resolve a trailing CR.
pub struct TelnetCodec {
    decoder_state: DecoderState,
    encoder_state: EncoderState,
    sb_option: u8,
    sb_buffer: BytesMut,
    options: OptionRegistry,
    replies: VecDeque<TelnetFrame>,
    deferred: VecDeque<TelnetEvent>,
    received_bytes: u64,
    sent_bytes: u64,
}

impl TelnetCodec {
    /// Creates a new `TelnetCodec` with an empty option registry.
    pub fn new() -> TelnetCodec {
        TelnetCodec::default()
    }

    /// Read access to the option registry.
    pub fn options(&self) -> &OptionRegistry {
        &self.options
    }

    /// Mutable access to the option registry.
    pub fn options_mut(&mut self) -> &mut OptionRegistry {
        &mut self.options
    }

    /// Registers a capability handler for `option`. Peer proposals for
    /// options without a handler are refused.
    pub fn register(&mut self, option: TelnetOption, handler: Box<dyn OptionHandler>) {
        self.options.register(option, handler);
    }

    /// Checks if a specific Telnet option is confirmed enabled locally.
    pub fn is_enabled_local(&self, option: TelnetOption) -> bool {
        self.options.local_enabled(option)
    }

    /// Checks if a specific Telnet option is confirmed enabled on the
    /// remote side.
    pub fn is_enabled_remote(&self, option: TelnetOption) -> bool {
        self.options.remote_enabled(option)
    }

    /// Starts a locally-initiated negotiation for our side of `option`
    /// (WILL/WONT). Returns the frame to send, or `None` when no
    /// negotiation is needed. The caller should watch
    /// [`OptionRegistry::is_pending_local`] for the peer's answer.
    pub fn request_local(&mut self, option: TelnetOption, enable: bool) -> Option<TelnetFrame> {
        self.options.request_local(option, enable)
    }

    /// Starts a locally-initiated negotiation for the peer's side of
    /// `option` (DO/DONT). Mirrors [`request_local`](TelnetCodec::request_local).
    pub fn request_remote(&mut self, option: TelnetOption, enable: bool) -> Option<TelnetFrame> {
        self.options.request_remote(option, enable)
    }

    /// Removes and returns the oldest queued negotiation reply, if any.
    ///
    /// The decoder answers peer negotiation verbs internally but cannot
    /// write to the transport; the connection layer drains this queue after
    /// each decode batch and sends the frames in order.
    pub fn take_reply(&mut self) -> Option<TelnetFrame> {
        self.replies.pop_front()
    }

    /// Whether any negotiation replies are waiting to be sent.
    pub fn has_replies(&self) -> bool {
        !self.replies.is_empty()
    }

    /// Total bytes consumed from the wire by the decoder.
    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    /// Total bytes produced for the wire by the encoder.
    pub fn sent_bytes(&self) -> u64 {
        self.sent_bytes
    }

    /// Resolves a deferred CR at a flush boundary.
    ///
    /// When the last encoded data byte was a CR (and TRANSMIT-BINARY is off
    /// locally), the padding decision is still open: a following LF would
    /// suppress the pad NUL. Flushing the transport closes that window, so
    /// the pad NUL is emitted here. No-op otherwise.
    pub fn flush_pending(&mut self, dst: &mut BytesMut) {
        if self.encoder_state == EncoderState::CarriageReturn {
            dst.put_u8(consts::NUL);
            self.sent_bytes += 1;
            self.encoder_state = EncoderState::NormalData;
        }
    }

    /// Encodes one application data byte, applying IAC doubling and the CR
    /// transparency rule.
    fn encode_data_byte(&mut self, byte: u8, dst: &mut BytesMut) {
        if self.encoder_state == EncoderState::CarriageReturn {
            if byte != consts::LF {
                dst.put_u8(consts::NUL);
                self.sent_bytes += 1;
            }
            self.encoder_state = EncoderState::NormalData;
        }
        match byte {
            consts::IAC => {
                dst.reserve(2);
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::IAC);
                self.sent_bytes += 2;
            }
            consts::CR if !self.options.local_enabled(TelnetOption::TransmitBinary) => {
                dst.put_u8(consts::CR);
                self.sent_bytes += 1;
                self.encoder_state = EncoderState::CarriageReturn;
            }
            byte => {
                dst.put_u8(byte);
                self.sent_bytes += 1;
            }
        }
    }

    /// Appends a byte to the subnegotiation accumulator, switching to the
    /// discard states when the payload limit is exceeded.
    fn push_sb_byte(&mut self, byte: u8) {
        if matches!(
            self.decoder_state,
            DecoderState::SubnegotiateDiscard | DecoderState::SubnegotiateDiscardIac
        ) {
            return;
        }
        if self.sb_buffer.len() >= MAX_SUBNEGOTIATION_LEN {
            warn!(
                "subnegotiation for option {} exceeded {} bytes, discarding frame",
                self.sb_option, MAX_SUBNEGOTIATION_LEN
            );
            self.sb_buffer.clear();
            self.decoder_state = DecoderState::SubnegotiateDiscard;
        } else {
            self.sb_buffer.put_u8(byte);
        }
    }
}

impl Default for TelnetCodec {
    fn default() -> Self {
        TelnetCodec {
            decoder_state: DecoderState::NormalData,
            encoder_state: EncoderState::NormalData,
            sb_option: 0,
            sb_buffer: BytesMut::new(),
            options: OptionRegistry::new(),
            replies: VecDeque::new(),
            deferred: VecDeque::new(),
            received_bytes: 0,
            sent_bytes: 0,
        }
    }
}

impl Decoder for TelnetCodec {
    type Item = TelnetEvent;
    type Error = CodecError;

    /// Decodes bytes from `src` into the next [`TelnetEvent`].
    ///
    /// The decoder advances one byte per transition and keeps its state
    /// across calls, so frames may arrive split across any number of reads.
    /// Returns `Ok(None)` when `src` is exhausted mid-frame.
    ///
    /// Protocol anomalies never fail the decode: an unrecognized command
    /// byte after IAC is logged and both raw bytes surface as data, a stray
    /// IAC sequence inside a subnegotiation is folded into the payload, and
    /// an oversized subnegotiation is dropped with a
    /// [`TelnetEvent::SubnegotiationOverflow`] marker.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<TelnetEvent>, Self::Error> {
        if let Some(event) = self.deferred.pop_front() {
            return Ok(Some(event));
        }
        while src.remaining() > 0 {
            let byte = src.get_u8();
            self.received_bytes += 1;
            match (self.decoder_state, byte) {
                (DecoderState::NormalData, consts::IAC) => {
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::NormalData, consts::CR) => {
                    // In the NVT ASCII regime a bare CR is followed by a
                    // padding NUL or an LF; track it so the pad is dropped.
                    if !self.options.remote_enabled(TelnetOption::TransmitBinary) {
                        self.decoder_state = DecoderState::CarriageReturn;
                    }
                    return Ok(Some(TelnetEvent::Data(consts::CR)));
                }
                (DecoderState::NormalData, _) => {
                    return Ok(Some(TelnetEvent::Data(byte)));
                }
                (DecoderState::CarriageReturn, consts::NUL) => {
                    // CR padding, not data.
                    self.decoder_state = DecoderState::NormalData;
                }
                (DecoderState::CarriageReturn, consts::IAC) => {
                    self.decoder_state = DecoderState::InterpretAsCommand;
                }
                (DecoderState::CarriageReturn, consts::CR) => {
                    return Ok(Some(TelnetEvent::Data(consts::CR)));
                }
                (DecoderState::CarriageReturn, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::Data(byte)));
                }
                (DecoderState::InterpretAsCommand, consts::NOP) => {
                    self.decoder_state = DecoderState::NormalData;
                    trace!("ignoring IAC NOP");
                }
                (DecoderState::InterpretAsCommand, consts::IAC) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::Data(consts::IAC)));
                }
                (DecoderState::InterpretAsCommand, consts::DM) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::DataMark));
                }
                (DecoderState::InterpretAsCommand, consts::BRK) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::Break));
                }
                (DecoderState::InterpretAsCommand, consts::IP) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::InterruptProcess));
                }
                (DecoderState::InterpretAsCommand, consts::AO) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::AbortOutput));
                }
                (DecoderState::InterpretAsCommand, consts::AYT) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::AreYouThere));
                }
                (DecoderState::InterpretAsCommand, consts::EC) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::EraseCharacter));
                }
                (DecoderState::InterpretAsCommand, consts::EL) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::EraseLine));
                }
                (DecoderState::InterpretAsCommand, consts::GA) => {
                    self.decoder_state = DecoderState::NormalData;
                    return Ok(Some(TelnetEvent::GoAhead));
                }
                (DecoderState::InterpretAsCommand, consts::DO) => {
                    self.decoder_state = DecoderState::NegotiateDo;
                }
                (DecoderState::InterpretAsCommand, consts::DONT) => {
                    self.decoder_state = DecoderState::NegotiateDont;
                }
                (DecoderState::InterpretAsCommand, consts::WILL) => {
                    self.decoder_state = DecoderState::NegotiateWill;
                }
                (DecoderState::InterpretAsCommand, consts::WONT) => {
                    self.decoder_state = DecoderState::NegotiateWont;
                }
                (DecoderState::InterpretAsCommand, consts::SB) => {
                    self.sb_buffer.clear();
                    self.decoder_state = DecoderState::Subnegotiate;
                }
                (DecoderState::InterpretAsCommand, _) => {
                    // Not a command we know; pass both raw bytes through
                    // rather than guessing at the peer's intent.
                    warn!(
                        "unrecognized command 0x{:02X} after IAC, passing through as data",
                        byte
                    );
                    self.decoder_state = DecoderState::NormalData;
                    self.deferred.push_back(TelnetEvent::Data(byte));
                    return Ok(Some(TelnetEvent::Data(consts::IAC)));
                }
                (DecoderState::NegotiateDo, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let was_enabled = self.options.local_enabled(option);
                    if let Some(reply) = self.options.recv_do(option) {
                        self.replies.push_back(reply);
                    }
                    let now_enabled = self.options.local_enabled(option);
                    if was_enabled != now_enabled {
                        return Ok(Some(TelnetEvent::OptionStatus(
                            option,
                            TelnetSide::Local,
                            now_enabled,
                        )));
                    }
                }
                (DecoderState::NegotiateDont, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let was_enabled = self.options.local_enabled(option);
                    if let Some(reply) = self.options.recv_dont(option) {
                        self.replies.push_back(reply);
                    }
                    let now_enabled = self.options.local_enabled(option);
                    if was_enabled != now_enabled {
                        return Ok(Some(TelnetEvent::OptionStatus(
                            option,
                            TelnetSide::Local,
                            now_enabled,
                        )));
                    }
                }
                (DecoderState::NegotiateWill, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let was_enabled = self.options.remote_enabled(option);
                    if let Some(reply) = self.options.recv_will(option) {
                        self.replies.push_back(reply);
                    }
                    let now_enabled = self.options.remote_enabled(option);
                    if was_enabled != now_enabled {
                        return Ok(Some(TelnetEvent::OptionStatus(
                            option,
                            TelnetSide::Remote,
                            now_enabled,
                        )));
                    }
                }
                (DecoderState::NegotiateWont, _) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(byte);
                    let was_enabled = self.options.remote_enabled(option);
                    if let Some(reply) = self.options.recv_wont(option) {
                        self.replies.push_back(reply);
                    }
                    let now_enabled = self.options.remote_enabled(option);
                    if was_enabled != now_enabled {
                        return Ok(Some(TelnetEvent::OptionStatus(
                            option,
                            TelnetSide::Remote,
                            now_enabled,
                        )));
                    }
                }
                (DecoderState::Subnegotiate, _) => {
                    self.sb_option = byte;
                    self.decoder_state = DecoderState::SubnegotiateData;
                }
                (DecoderState::SubnegotiateData, consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateIac;
                }
                (DecoderState::SubnegotiateData, _) => {
                    self.push_sb_byte(byte);
                }
                (DecoderState::SubnegotiateIac, consts::SE) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(self.sb_option);
                    let payload = self.sb_buffer.split();
                    self.options.handle_subnegotiation(option, &payload);
                    return Ok(Some(TelnetEvent::Subnegotiation(option, payload)));
                }
                (DecoderState::SubnegotiateIac, consts::IAC) => {
                    // Escaped literal 0xFF inside the payload.
                    self.decoder_state = DecoderState::SubnegotiateData;
                    self.push_sb_byte(consts::IAC);
                }
                (DecoderState::SubnegotiateIac, _) => {
                    // Not a legal escape; keep both bytes and carry on
                    // rather than losing the rest of the frame.
                    warn!(
                        "unexpected byte 0x{:02X} after IAC inside subnegotiation",
                        byte
                    );
                    self.decoder_state = DecoderState::SubnegotiateData;
                    self.push_sb_byte(consts::IAC);
                    self.push_sb_byte(byte);
                }
                (DecoderState::SubnegotiateDiscard, consts::IAC) => {
                    self.decoder_state = DecoderState::SubnegotiateDiscardIac;
                }
                (DecoderState::SubnegotiateDiscard, _) => {}
                (DecoderState::SubnegotiateDiscardIac, consts::SE) => {
                    self.decoder_state = DecoderState::NormalData;
                    let option = TelnetOption::from_u8(self.sb_option);
                    return Ok(Some(TelnetEvent::SubnegotiationOverflow(option)));
                }
                (DecoderState::SubnegotiateDiscardIac, _) => {
                    self.decoder_state = DecoderState::SubnegotiateDiscard;
                }
            }
        }
        Ok(None)
    }
}

impl Encoder<u8> for TelnetCodec {
    type Error = CodecError;

    /// Encodes a single application data byte.
    fn encode(&mut self, item: u8, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(2);
        self.encode_data_byte(item, dst);
        Ok(())
    }
}

impl Encoder<&[u8]> for TelnetCodec {
    type Error = CodecError;

    /// Encodes a slice of application data bytes.
    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        for &byte in item {
            self.encode_data_byte(byte, dst);
        }
        Ok(())
    }
}

impl Encoder<TelnetFrame> for TelnetCodec {
    type Error = CodecError;

    /// Encodes a [`TelnetFrame`] into its wire representation.
    ///
    /// Data bytes go through the same IAC doubling and CR transparency path
    /// as the slice encoder. Control and negotiation frames are emitted
    /// verbatim (`IAC <cmd>` / `IAC <verb> <option>`) and do not disturb
    /// the CR lookahead state. Subnegotiations are framed as
    /// `IAC SB <option> <payload> IAC SE` with IAC bytes in the payload
    /// doubled.
    fn encode(&mut self, item: TelnetFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            TelnetFrame::Data(byte) => {
                dst.reserve(2);
                self.encode_data_byte(byte, dst);
            }
            TelnetFrame::NoOperation => self.put_command(consts::NOP, dst),
            TelnetFrame::DataMark => self.put_command(consts::DM, dst),
            TelnetFrame::Break => self.put_command(consts::BRK, dst),
            TelnetFrame::InterruptProcess => self.put_command(consts::IP, dst),
            TelnetFrame::AbortOutput => self.put_command(consts::AO, dst),
            TelnetFrame::AreYouThere => self.put_command(consts::AYT, dst),
            TelnetFrame::EraseCharacter => self.put_command(consts::EC, dst),
            TelnetFrame::EraseLine => self.put_command(consts::EL, dst),
            TelnetFrame::GoAhead => self.put_command(consts::GA, dst),
            TelnetFrame::Do(option) => self.put_negotiation(consts::DO, option, dst),
            TelnetFrame::Dont(option) => self.put_negotiation(consts::DONT, option, dst),
            TelnetFrame::Will(option) => self.put_negotiation(consts::WILL, option, dst),
            TelnetFrame::Wont(option) => self.put_negotiation(consts::WONT, option, dst),
            TelnetFrame::Subnegotiate(option, payload) => {
                dst.reserve(5 + payload.len());
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SB);
                dst.put_u8(option.to_u8());
                self.sent_bytes += 3;
                for &byte in payload.iter() {
                    if byte == consts::IAC {
                        dst.put_u8(consts::IAC);
                        self.sent_bytes += 1;
                    }
                    dst.put_u8(byte);
                    self.sent_bytes += 1;
                }
                dst.put_u8(consts::IAC);
                dst.put_u8(consts::SE);
                self.sent_bytes += 2;
            }
        }
        Ok(())
    }
}

impl TelnetCodec {
    /// Emits a two-byte `IAC <command>` control frame.
    fn put_command(&mut self, command: u8, dst: &mut BytesMut) {
        dst.reserve(2);
        dst.put_u8(consts::IAC);
        dst.put_u8(command);
        self.sent_bytes += 2;
    }

    /// Emits a three-byte `IAC <verb> <option>` negotiation frame.
    fn put_negotiation(&mut self, verb: u8, option: TelnetOption, dst: &mut BytesMut) {
        dst.reserve(3);
        dst.put_u8(consts::IAC);
        dst.put_u8(verb);
        dst.put_u8(option.to_u8());
        self.sent_bytes += 3;
    }
}

/// Internal state of the Telnet decoder.
///
/// Tracks where the decoder stands inside a possibly multi-byte control
/// sequence. The subnegotiation discard states carry an oversized frame to
/// its closing `IAC SE` without accumulating its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecoderState {
    /// Normal Data
    NormalData,
    /// Received a bare CR in the ASCII regime; next byte may be pad NUL
    CarriageReturn,
    /// Received IAC, Next byte is Command
    InterpretAsCommand,
    /// Received DO Command, Next byte is the option code
    NegotiateDo,
    /// Received DONT Command, Next byte is the option code
    NegotiateDont,
    /// Received WILL Command, Next byte is the option code
    NegotiateWill,
    /// Received WONT Command, Next byte is the option code
    NegotiateWont,
    /// Received Subnegotiate Command, Next byte is the option code
    Subnegotiate,
    /// Accumulating subnegotiation payload bytes
    SubnegotiateData,
    /// Received IAC during subnegotiation, next byte decides escape or end
    SubnegotiateIac,
    /// Discarding an oversized subnegotiation until IAC SE
    SubnegotiateDiscard,
    /// Received IAC while discarding
    SubnegotiateDiscardIac,
}

/// Internal state of the Telnet encoder's CR lookahead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EncoderState {
    /// Normal Data
    NormalData,
    /// Last data byte was CR; pad NUL owed unless the next byte is LF
    CarriageReturn,
}
