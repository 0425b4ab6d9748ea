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

use crate::options::TelnetOption;
use bytes::BytesMut;
use std::fmt::Formatter;

///
/// `TelnetFrame` represents a wire-level Telnet frame accepted by the
/// encoder: a data byte, a two-byte `IAC <command>` sequence, a three-byte
/// `IAC <verb> <option>` negotiation, or a framed subnegotiation.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TelnetFrame {
    /// Telnet Data Byte
    Data(u8),
    /// No Operation
    NoOperation,
    /// End of urgent Data Stream
    DataMark,
    /// Operator pressed the Break key or the Attention key.
    Break,
    /// Interrupt current process.
    InterruptProcess,
    /// Cancel output from the current process.
    AbortOutput,
    /// Request acknowledgment.
    AreYouThere,
    /// Request that the operator erase the previous character.
    EraseCharacter,
    /// Request that the operator erase the previous line.
    EraseLine,
    /// End of input for half-duplex connections.
    GoAhead,
    /// Request the peer enables an option
    Do(TelnetOption),
    /// Request the peer disables an option
    Dont(TelnetOption),
    /// Announce we will perform an option
    Will(TelnetOption),
    /// Announce we won't perform an option
    Wont(TelnetOption),
    /// Subnegotiation payload for an option; any IAC bytes in the payload
    /// are doubled on the wire by the encoder
    Subnegotiate(TelnetOption, BytesMut),
}

impl std::fmt::Display for TelnetFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetFrame::Data(byte) => write!(f, "Data(0x{byte:02X})"),
            TelnetFrame::NoOperation => write!(f, "NoOperation"),
            TelnetFrame::DataMark => write!(f, "DataMark"),
            TelnetFrame::Break => write!(f, "Break"),
            TelnetFrame::InterruptProcess => write!(f, "InterruptProcess"),
            TelnetFrame::AbortOutput => write!(f, "AbortOutput"),
            TelnetFrame::AreYouThere => write!(f, "AreYouThere"),
            TelnetFrame::EraseCharacter => write!(f, "EraseCharacter"),
            TelnetFrame::EraseLine => write!(f, "EraseLine"),
            TelnetFrame::GoAhead => write!(f, "GoAhead"),
            TelnetFrame::Do(option) => write!(f, "Do({option})"),
            TelnetFrame::Dont(option) => write!(f, "Dont({option})"),
            TelnetFrame::Will(option) => write!(f, "Will({option})"),
            TelnetFrame::Wont(option) => write!(f, "Wont({option})"),
            TelnetFrame::Subnegotiate(option, payload) => {
                write!(f, "Subnegotiate({option}, {} bytes)", payload.len())
            }
        }
    }
}
