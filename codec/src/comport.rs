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

//! COM-PORT-OPTION payload types [RFC2217](https://tools.ietf.org/html/rfc2217).
//!
//! Each subnegotiation under option 44 carries a one-byte command code
//! followed by a command-specific value: a 4-byte big-endian baud rate, a
//! single enumerated byte for data size / parity / stop size / control
//! verbs, or a modem-state bitmask. In every numeric field the value 0
//! means "report the current setting". Server replies reuse the client
//! command code plus 100.

use crate::consts;
use crate::result::{CodecError, CodecResult, SubnegotiationErrorKind};
use byteorder::{BigEndian, WriteBytesExt};
use bytes::{Buf, BufMut};

/// Baud rate field of SET-BAUDRATE, a 4-byte big-endian unsigned integer.
/// The value 0 queries the current rate without changing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaudRate(pub u32);

impl BaudRate {
    /// The query value: ask the server for the current rate.
    pub const QUERY: BaudRate = BaudRate(0);

    /// Encoded length in bytes; the field is always 4 bytes.
    pub fn len(&self) -> usize {
        4
    }

    /// Always `false`; present for API symmetry with buffer types.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Encodes this baud rate into a byte buffer in big-endian order.
    pub fn encode<T: BufMut>(&self, dst: &mut T) -> CodecResult<usize> {
        Ok(self.write(&mut dst.writer())?)
    }

    /// Writes this baud rate to a writer in big-endian order.
    pub fn write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<usize> {
        writer.write_u32::<BigEndian>(self.0)?;
        Ok(4)
    }

    /// Decodes a baud rate from a byte buffer in big-endian order.
    pub fn decode<T: Buf>(src: &mut T) -> CodecResult<BaudRate> {
        if src.remaining() >= 4 {
            Ok(BaudRate(src.get_u32()))
        } else {
            Err(CodecError::SubnegotiationError {
                option: Some(consts::option::COM_PORT),
                reason: SubnegotiationErrorKind::InsufficientData {
                    required: 4,
                    available: src.remaining(),
                },
            })
        }
    }
}

impl Default for BaudRate {
    /// 9600, the customary console default.
    fn default() -> Self {
        BaudRate(9600)
    }
}

impl std::fmt::Display for BaudRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} baud", self.0)
    }
}

/// Data size field of SET-DATASIZE: bits per character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataSize {
    /// 5 data bits
    Five,
    /// 6 data bits
    Six,
    /// 7 data bits
    Seven,
    /// 8 data bits
    Eight,
}

impl DataSize {
    /// Converts to the wire code (the literal bit count).
    pub fn to_u8(&self) -> u8 {
        match self {
            DataSize::Five => 5,
            DataSize::Six => 6,
            DataSize::Seven => 7,
            DataSize::Eight => 8,
        }
    }

    /// Converts a wire code to a `DataSize`.
    pub fn from_u8(value: u8) -> CodecResult<DataSize> {
        match value {
            5 => Ok(DataSize::Five),
            6 => Ok(DataSize::Six),
            7 => Ok(DataSize::Seven),
            8 => Ok(DataSize::Eight),
            value => Err(invalid_value(consts::comport::SET_DATASIZE, value)),
        }
    }
}

impl std::fmt::Display for DataSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} data bits", self.to_u8())
    }
}

/// Parity field of SET-PARITY.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
    /// Mark parity (parity bit always 1)
    Mark,
    /// Space parity (parity bit always 0)
    Space,
}

impl Parity {
    /// Converts to the wire code.
    pub fn to_u8(&self) -> u8 {
        match self {
            Parity::None => 1,
            Parity::Odd => 2,
            Parity::Even => 3,
            Parity::Mark => 4,
            Parity::Space => 5,
        }
    }

    /// Converts a wire code to a `Parity`.
    pub fn from_u8(value: u8) -> CodecResult<Parity> {
        match value {
            1 => Ok(Parity::None),
            2 => Ok(Parity::Odd),
            3 => Ok(Parity::Even),
            4 => Ok(Parity::Mark),
            5 => Ok(Parity::Space),
            value => Err(invalid_value(consts::comport::SET_PARITY, value)),
        }
    }
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::None => write!(f, "no parity"),
            Parity::Odd => write!(f, "odd parity"),
            Parity::Even => write!(f, "even parity"),
            Parity::Mark => write!(f, "mark parity"),
            Parity::Space => write!(f, "space parity"),
        }
    }
}

/// Stop size field of SET-STOPSIZE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopSize {
    /// 1 stop bit
    One,
    /// 2 stop bits
    Two,
    /// 1.5 stop bits
    OneAndHalf,
}

impl StopSize {
    /// Converts to the wire code.
    pub fn to_u8(&self) -> u8 {
        match self {
            StopSize::One => 1,
            StopSize::Two => 2,
            StopSize::OneAndHalf => 3,
        }
    }

    /// Converts a wire code to a `StopSize`.
    pub fn from_u8(value: u8) -> CodecResult<StopSize> {
        match value {
            1 => Ok(StopSize::One),
            2 => Ok(StopSize::Two),
            3 => Ok(StopSize::OneAndHalf),
            value => Err(invalid_value(consts::comport::SET_STOPSIZE, value)),
        }
    }
}

impl std::fmt::Display for StopSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopSize::One => write!(f, "1 stop bit"),
            StopSize::Two => write!(f, "2 stop bits"),
            StopSize::OneAndHalf => write!(f, "1.5 stop bits"),
        }
    }
}

/// Control verbs of SET-CONTROL: flow-control, BREAK, DTR and RTS handling.
///
/// The `Request*` verbs query current state without changing it; the server
/// reply carries the applicable `*On`/`*Off` (or flow-control) code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCode {
    /// Query the current flow control setting
    RequestFlowControl,
    /// Use no flow control
    FlowControlNone,
    /// Use XON/XOFF software flow control
    FlowControlSoftware,
    /// Use hardware flow control
    FlowControlHardware,
    /// Query the current BREAK state
    RequestBreak,
    /// Assert BREAK on the line
    BreakOn,
    /// Release BREAK on the line
    BreakOff,
    /// Query the current DTR state
    RequestDtr,
    /// Assert DTR
    DtrOn,
    /// Release DTR
    DtrOff,
    /// Query the current RTS state
    RequestRts,
    /// Assert RTS
    RtsOn,
    /// Release RTS
    RtsOff,
}

impl ControlCode {
    /// Converts to the wire code.
    pub fn to_u8(&self) -> u8 {
        match self {
            ControlCode::RequestFlowControl => 0,
            ControlCode::FlowControlNone => 1,
            ControlCode::FlowControlSoftware => 2,
            ControlCode::FlowControlHardware => 3,
            ControlCode::RequestBreak => 4,
            ControlCode::BreakOn => 5,
            ControlCode::BreakOff => 6,
            ControlCode::RequestDtr => 7,
            ControlCode::DtrOn => 8,
            ControlCode::DtrOff => 9,
            ControlCode::RequestRts => 10,
            ControlCode::RtsOn => 11,
            ControlCode::RtsOff => 12,
        }
    }

    /// Converts a wire code to a `ControlCode`.
    pub fn from_u8(value: u8) -> CodecResult<ControlCode> {
        match value {
            0 => Ok(ControlCode::RequestFlowControl),
            1 => Ok(ControlCode::FlowControlNone),
            2 => Ok(ControlCode::FlowControlSoftware),
            3 => Ok(ControlCode::FlowControlHardware),
            4 => Ok(ControlCode::RequestBreak),
            5 => Ok(ControlCode::BreakOn),
            6 => Ok(ControlCode::BreakOff),
            7 => Ok(ControlCode::RequestDtr),
            8 => Ok(ControlCode::DtrOn),
            9 => Ok(ControlCode::DtrOff),
            10 => Ok(ControlCode::RequestRts),
            11 => Ok(ControlCode::RtsOn),
            12 => Ok(ControlCode::RtsOff),
            value => Err(invalid_value(consts::comport::SET_CONTROL, value)),
        }
    }
}

impl std::fmt::Display for ControlCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlCode::RequestFlowControl => write!(f, "RequestFlowControl"),
            ControlCode::FlowControlNone => write!(f, "FlowControlNone"),
            ControlCode::FlowControlSoftware => write!(f, "FlowControlSoftware"),
            ControlCode::FlowControlHardware => write!(f, "FlowControlHardware"),
            ControlCode::RequestBreak => write!(f, "RequestBreak"),
            ControlCode::BreakOn => write!(f, "BreakOn"),
            ControlCode::BreakOff => write!(f, "BreakOff"),
            ControlCode::RequestDtr => write!(f, "RequestDtr"),
            ControlCode::DtrOn => write!(f, "DtrOn"),
            ControlCode::DtrOff => write!(f, "DtrOff"),
            ControlCode::RequestRts => write!(f, "RequestRts"),
            ControlCode::RtsOn => write!(f, "RtsOn"),
            ControlCode::RtsOff => write!(f, "RtsOff"),
        }
    }
}

/// Modem-state bitmask carried by NOTIFY-MODEMSTATE and
/// SET-MODEMSTATE-MASK.
///
/// The high nibble reports the current signal levels, the low nibble the
/// "changed since last notification" delta bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModemState(pub u8);

impl ModemState {
    /// Data Carrier Detect level
    pub const CARRIER_DETECT: u8 = 0x80;
    /// Ring Indicator level
    pub const RING_INDICATOR: u8 = 0x40;
    /// Data Set Ready level
    pub const DATA_SET_READY: u8 = 0x20;
    /// Clear To Send level
    pub const CLEAR_TO_SEND: u8 = 0x10;
    /// Carrier Detect changed since last notification
    pub const DELTA_CARRIER_DETECT: u8 = 0x08;
    /// Ring Indicator trailing edge seen since last notification
    pub const TRAILING_RING_INDICATOR: u8 = 0x04;
    /// Data Set Ready changed since last notification
    pub const DELTA_DATA_SET_READY: u8 = 0x02;
    /// Clear To Send changed since last notification
    pub const DELTA_CLEAR_TO_SEND: u8 = 0x01;

    /// Mask enabling every level and delta bit.
    pub const ALL: ModemState = ModemState(0xFF);

    /// The raw bitmask.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Whether Data Carrier Detect is asserted.
    pub fn carrier_detect(&self) -> bool {
        self.0 & Self::CARRIER_DETECT != 0
    }

    /// Whether Ring Indicator is asserted.
    pub fn ring_indicator(&self) -> bool {
        self.0 & Self::RING_INDICATOR != 0
    }

    /// Whether Data Set Ready is asserted.
    pub fn data_set_ready(&self) -> bool {
        self.0 & Self::DATA_SET_READY != 0
    }

    /// Whether Clear To Send is asserted.
    pub fn clear_to_send(&self) -> bool {
        self.0 & Self::CLEAR_TO_SEND != 0
    }

    /// Whether any of the delta bits is set.
    pub fn changed(&self) -> bool {
        self.0 & 0x0F != 0
    }
}

impl std::fmt::Display for ModemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DCD={} RI={} DSR={} CTS={} (0x{:02X})",
            self.carrier_detect() as u8,
            self.ring_indicator() as u8,
            self.data_set_ready() as u8,
            self.clear_to_send() as u8,
            self.0
        )
    }
}

impl From<u8> for ModemState {
    fn from(bits: u8) -> Self {
        ModemState(bits)
    }
}

impl From<ModemState> for u8 {
    fn from(state: ModemState) -> Self {
        state.0
    }
}

fn invalid_value(command: u8, value: u8) -> CodecError {
    CodecError::SubnegotiationError {
        option: Some(consts::option::COM_PORT),
        reason: SubnegotiationErrorKind::InvalidValue { command, value },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn baud_rate_encodes_big_endian() {
        let mut buf = BytesMut::new();
        BaudRate(9600).encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x00, 0x25, 0x80]);

        let mut buf = BytesMut::new();
        BaudRate(115_200).encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00, 0x01, 0xC2, 0x00]);
    }

    #[test]
    fn baud_rate_decodes_big_endian() {
        let mut buf = BytesMut::from(&[0x00, 0x00, 0x25, 0x80][..]);
        assert_eq!(BaudRate::decode(&mut buf).unwrap(), BaudRate(9600));
    }

    #[test]
    fn baud_rate_round_trip() {
        for rate in [300u32, 9600, 19_200, 57_600, 115_200, 921_600] {
            let mut buf = BytesMut::new();
            BaudRate(rate).encode(&mut buf).unwrap();
            assert_eq!(BaudRate::decode(&mut buf).unwrap(), BaudRate(rate));
        }
    }

    #[test]
    fn baud_rate_decode_rejects_short_buffer() {
        let mut buf = BytesMut::from(&[0x00, 0x25][..]);
        let err = BaudRate::decode(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            CodecError::SubnegotiationError {
                reason: SubnegotiationErrorKind::InsufficientData {
                    required: 4,
                    available: 2
                },
                ..
            }
        ));
    }

    #[test]
    fn data_size_codes() {
        assert_eq!(DataSize::Eight.to_u8(), 8);
        assert_eq!(DataSize::from_u8(5).unwrap(), DataSize::Five);
        assert!(DataSize::from_u8(9).is_err());
    }

    #[test]
    fn parity_codes() {
        assert_eq!(Parity::None.to_u8(), 1);
        assert_eq!(Parity::Space.to_u8(), 5);
        assert_eq!(Parity::from_u8(3).unwrap(), Parity::Even);
        assert!(Parity::from_u8(0).is_err());
        assert!(Parity::from_u8(6).is_err());
    }

    #[test]
    fn stop_size_codes() {
        assert_eq!(StopSize::OneAndHalf.to_u8(), 3);
        assert_eq!(StopSize::from_u8(2).unwrap(), StopSize::Two);
        assert!(StopSize::from_u8(4).is_err());
    }

    #[test]
    fn control_codes_round_trip() {
        for code in 0u8..=12 {
            assert_eq!(ControlCode::from_u8(code).unwrap().to_u8(), code);
        }
        assert!(ControlCode::from_u8(13).is_err());
    }

    #[test]
    fn modem_state_bits() {
        let state = ModemState(ModemState::CARRIER_DETECT | ModemState::DELTA_CLEAR_TO_SEND);
        assert!(state.carrier_detect());
        assert!(!state.ring_indicator());
        assert!(!state.data_set_ready());
        assert!(!state.clear_to_send());
        assert!(state.changed());

        let quiet = ModemState(ModemState::DATA_SET_READY | ModemState::CLEAR_TO_SEND);
        assert!(quiet.data_set_ready());
        assert!(quiet.clear_to_send());
        assert!(!quiet.changed());
    }
}
