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

//! Wire constants for the Telnet protocol ([RFC854]) and the
//! COM-PORT-OPTION control extension ([RFC2217]).
//!
//! [RFC854]: https://tools.ietf.org/html/rfc854
//! [RFC2217]: https://tools.ietf.org/html/rfc2217

/// NUL, used as CR padding in the NVT ASCII stream
pub const NUL: u8 = 0;
/// Line Feed
pub const LF: u8 = 10;
/// Carriage Return
pub const CR: u8 = 13;
/// Subnegotiation End
pub const SE: u8 = 240;
/// No Operation
pub const NOP: u8 = 241;
/// Data Mark, end of urgent data stream
pub const DM: u8 = 242;
/// Break
pub const BRK: u8 = 243;
/// Interrupt Process
pub const IP: u8 = 244;
/// Abort Output
pub const AO: u8 = 245;
/// Are You There
pub const AYT: u8 = 246;
/// Erase Character
pub const EC: u8 = 247;
/// Erase Line
pub const EL: u8 = 248;
/// Go Ahead
pub const GA: u8 = 249;
/// Subnegotiation Begin
pub const SB: u8 = 250;
/// Will perform option
pub const WILL: u8 = 251;
/// Won't perform option
pub const WONT: u8 = 252;
/// Request peer performs option
pub const DO: u8 = 253;
/// Request peer stops performing option
pub const DONT: u8 = 254;
/// Interpret As Command escape byte
pub const IAC: u8 = 255;

///
/// [Telnet Option Codes](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
pub mod option {
    /// Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    pub const BINARY: u8 = 0;
    /// Echo [RFC857](https://tools.ietf.org/html/rfc857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    pub const SGA: u8 = 3;
    /// Status [RFC859](https://tools.ietf.org/html/rfc859)
    pub const STATUS: u8 = 5;
    /// Timing Mark [RFC860](https://tools.ietf.org/html/rfc860)
    pub const TM: u8 = 6;
    /// Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    pub const TTYPE: u8 = 24;
    /// Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    pub const NAWS: u8 = 31;
    /// Com Port Control Option [RFC2217](https://tools.ietf.org/html/rfc2217)
    pub const COM_PORT: u8 = 44;
}

///
/// COM-PORT-OPTION subnegotiation command codes [RFC2217](https://tools.ietf.org/html/rfc2217).
///
/// These are the client-to-server codes; the matching server-to-client
/// reply uses the same code plus [`SERVER_OFFSET`](comport::SERVER_OFFSET).
///
pub mod comport {
    /// Query the peer's free-text port signature
    pub const SIGNATURE: u8 = 0;
    /// Set (or query, with value 0) the baud rate; 4-byte big-endian value
    pub const SET_BAUDRATE: u8 = 1;
    /// Set (or query, with value 0) the data size; single byte, 5-8
    pub const SET_DATASIZE: u8 = 2;
    /// Set (or query, with value 0) the parity; single byte code
    pub const SET_PARITY: u8 = 3;
    /// Set (or query, with value 0) the stop size; single byte code
    pub const SET_STOPSIZE: u8 = 4;
    /// Set or query control lines (flow control, BREAK, DTR, RTS)
    pub const SET_CONTROL: u8 = 5;
    /// Server-initiated line-state notification
    pub const NOTIFY_LINESTATE: u8 = 6;
    /// Server-initiated modem-state notification
    pub const NOTIFY_MODEMSTATE: u8 = 7;
    /// Suspend transmission to the port
    pub const FLOWCONTROL_SUSPEND: u8 = 8;
    /// Resume transmission to the port
    pub const FLOWCONTROL_RESUME: u8 = 9;
    /// Set the line-state notification mask
    pub const SET_LINESTATE_MASK: u8 = 10;
    /// Set the modem-state notification mask
    pub const SET_MODEMSTATE_MASK: u8 = 11;
    /// Purge the access server's data buffers
    pub const PURGE_DATA: u8 = 12;
    /// Offset added to a client command code to form the server reply code
    pub const SERVER_OFFSET: u8 = 100;
}
