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

//! # Comtel Telnet Protocol Codec
//!
//! This crate provides a stateful, byte-oriented codec for the Telnet
//! protocol (RFC 854) with RFC 2217 "serial port over Telnet" support. It
//! is designed to be driven by asynchronous networking libraries like Tokio
//! and implements the `tokio_util::codec` [`Decoder`]/[`Encoder`] traits.
//!
//! ## Overview
//!
//! The codec translates between a raw, possibly IAC-escaped byte stream
//! and:
//!
//! - **Application data**: decoded bytes with IAC doubling and the RFC 854
//!   CR-NUL / CR-LF transparency rules applied in both directions
//! - **Option negotiation**: DO/DONT/WILL/WONT verbs, adjudicated by a
//!   per-option state machine with pluggable capability handlers
//! - **Subnegotiation**: `IAC SB … IAC SE` frames carrying structured
//!   per-option payloads, such as the RFC 2217 COM-PORT-OPTION commands
//!
//! ## Core Components
//!
//! ### [`TelnetCodec`]
//!
//! The per-connection engine: independent inbound and outbound state
//! machines, byte counters, and the option registry. Negotiation replies
//! produced while decoding are queued on the codec and drained with
//! [`TelnetCodec::take_reply`] by the connection layer.
//!
//! ### [`OptionRegistry`] / [`OptionHandler`]
//!
//! Per-option negotiation bookkeeping: confirmed state per side, pending
//! locally-initiated requests, and idempotence latches so a repeated peer
//! verb produces neither a duplicate reply nor a duplicate side effect.
//! Options without a registered handler are refused when proposed by the
//! peer.
//!
//! ### [`ByteRingBuffer`]
//!
//! A fixed-capacity circular buffer for decoded application bytes pending
//! consumption, shared between the connection reader and its consumers.
//!
//! ### [`comport`](crate::comport)
//!
//! RFC 2217 COM-PORT-OPTION payload types: baud rate, data size, parity,
//! stop size, control verbs and the modem-state bitmask.
//!
//! ## Usage Example
//!
//! ```rust
//! use comtel_codec::{AlwaysAccept, TelnetCodec, TelnetEvent, TelnetOption};
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! # fn example() -> Result<(), comtel_codec::CodecError> {
//! let mut codec = TelnetCodec::new();
//! codec.register(TelnetOption::TransmitBinary, Box::new(AlwaysAccept));
//!
//! // Data + DO TransmitBinary
//! let mut input = BytesMut::from(&b"Hi\xFF\xFD\x00"[..]);
//! while let Some(event) = codec.decode(&mut input)? {
//!     match event {
//!         TelnetEvent::Data(byte) => println!("received: {}", byte as char),
//!         TelnetEvent::OptionStatus(option, side, enabled) => {
//!             println!("{option} is now {enabled} on the {side} side")
//!         }
//!         _ => {}
//!     }
//! }
//! // The WILL reply is queued for the caller to send.
//! while let Some(reply) = codec.take_reply() {
//!     println!("send: {reply}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Protocol Details
//!
//! All Telnet commands start with the IAC (Interpret As Command) byte
//! (0xFF):
//!
//! - 2-byte commands: `IAC <command>` (e.g., `IAC NOP`)
//! - 3-byte negotiation: `IAC <DO|DONT|WILL|WONT> <option>`
//! - Subnegotiation: `IAC SB <option> <data…> IAC SE`
//!
//! A literal 0xFF in the data stream (or inside a subnegotiation payload)
//! is escaped by doubling: `IAC IAC`.
//!
//! ## Error Handling
//!
//! Malformed frames never abort the connection: the decoder logs a warning
//! and passes unrecognized bytes through as data (or, inside a
//! subnegotiation, folds them into the payload). [`CodecError`] is reserved
//! for transport I/O failures and uninterpretable RFC 2217 payload fields.
//!
//! ## Thread Safety
//!
//! `TelnetCodec` is **not** thread-safe and should not be shared between
//! tasks without synchronization. Each connection owns its own codec,
//! mutated from that connection's reader path.
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 855: Telnet Option Specifications
//! - RFC 856: Telnet Binary Transmission
//! - RFC 857: Telnet Echo Option
//! - RFC 858: Telnet Suppress Go Ahead Option
//! - RFC 2217: Telnet Com Port Control Option

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
pub mod comport;
pub mod consts;
mod event;
mod frame;
mod options;
mod result;
mod ring;

pub use self::codec::{MAX_SUBNEGOTIATION_LEN, TelnetCodec};
pub use self::event::TelnetEvent;
pub use self::frame::TelnetFrame;
pub use self::options::{
    AlwaysAccept, OptionHandler, OptionRegistry, OptionState, TelnetOption, TelnetSide,
};
pub use self::result::{CodecError, CodecResult, SubnegotiationErrorKind};
pub use self::ring::{ByteRingBuffer, RingFull};
