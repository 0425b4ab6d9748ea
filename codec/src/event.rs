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

use crate::options::{TelnetOption, TelnetSide};
use bytes::BytesMut;

///
/// `TelnetEvent` represents user-facing events from the Telnet codec.
/// Unlike [`TelnetFrame`](crate::TelnetFrame), which includes low-level
/// negotiation verbs (DO/DONT/WILL/WONT), `TelnetEvent` surfaces high-level
/// outcomes: the decoder answers negotiation verbs internally and emits an
/// `OptionStatus` only when an option actually changes state.
///
#[derive(Clone, Debug, PartialEq)]
pub enum TelnetEvent {
    /// Telnet Data Byte
    Data(u8),
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
    /// Indicate a completed negotiation
    /// Parameters: (option, side, enabled)
    /// - option: The telnet option that was negotiated
    /// - side: Whether this is Local or Remote
    /// - enabled: true if option is now enabled, false if disabled
    OptionStatus(TelnetOption, TelnetSide, bool),
    /// Completed subnegotiation payload, IAC escapes already removed
    Subnegotiation(TelnetOption, BytesMut),
    /// An inbound subnegotiation exceeded the accumulation limit and was
    /// discarded; the decoder resynchronized at the closing `IAC SE`
    SubnegotiationOverflow(TelnetOption),
}
