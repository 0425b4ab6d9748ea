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

//! Integration tests for the comtel codec

use bytes::BytesMut;
use comtel_codec::{
    AlwaysAccept, TelnetCodec, TelnetEvent, TelnetFrame, TelnetOption, TelnetSide, comport, consts,
};
use proptest::prelude::*;
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// Helper Functions
// ============================================================================

fn decode_all(codec: &mut TelnetCodec, mut src: BytesMut) -> Vec<TelnetEvent> {
    let mut events = Vec::new();
    while let Some(event) = codec.decode(&mut src).unwrap() {
        events.push(event);
    }
    events
}

fn data_bytes(events: &[TelnetEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            TelnetEvent::Data(byte) => Some(*byte),
            _ => None,
        })
        .collect()
}

/// A codec pair with TRANSMIT-BINARY confirmed in the sender->receiver
/// direction, so CR transparency stays out of the way of binary payloads.
fn binary_pair() -> (TelnetCodec, TelnetCodec) {
    let mut sender = TelnetCodec::new();
    sender.register(TelnetOption::TransmitBinary, Box::new(AlwaysAccept));
    sender.request_local(TelnetOption::TransmitBinary, true);
    assert_eq!(
        sender.options_mut().recv_do(TelnetOption::TransmitBinary),
        None
    );

    let mut receiver = TelnetCodec::new();
    receiver.register(TelnetOption::TransmitBinary, Box::new(AlwaysAccept));
    receiver.request_remote(TelnetOption::TransmitBinary, true);
    assert_eq!(
        receiver
            .options_mut()
            .recv_will(TelnetOption::TransmitBinary),
        None
    );

    (sender, receiver)
}

// ============================================================================
// Escaping Round Trips
// ============================================================================

#[test]
fn iac_heavy_payload_round_trips() {
    let (mut sender, mut receiver) = binary_pair();
    let payload = vec![
        consts::IAC,
        consts::IAC,
        0x00,
        consts::IAC,
        b'x',
        consts::IAC,
    ];

    let mut wire = BytesMut::new();
    sender.encode(&payload[..], &mut wire).unwrap();
    sender.flush_pending(&mut wire);

    let events = decode_all(&mut receiver, wire);
    assert_eq!(data_bytes(&events), payload);
}

proptest! {
    /// Escaping is lossless for arbitrary binary payloads: whatever the
    /// encoder puts on the wire, the decoder reconstructs byte for byte.
    #[test]
    fn escaping_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
        let (mut sender, mut receiver) = binary_pair();

        let mut wire = BytesMut::new();
        sender.encode(&payload[..], &mut wire).unwrap();
        sender.flush_pending(&mut wire);

        let events = decode_all(&mut receiver, wire);
        prop_assert_eq!(data_bytes(&events), payload);
    }

    /// The same property with the wire split at an arbitrary point,
    /// exercising decoder state across read boundaries.
    #[test]
    fn escaping_round_trip_split_reads(
        payload in proptest::collection::vec(any::<u8>(), 1..256),
        split in any::<prop::sample::Index>(),
    ) {
        let (mut sender, mut receiver) = binary_pair();

        let mut wire = BytesMut::new();
        sender.encode(&payload[..], &mut wire).unwrap();
        sender.flush_pending(&mut wire);

        let cut = split.index(wire.len() + 1);
        let tail = wire.split_off(cut);
        let mut events = decode_all(&mut receiver, wire);
        events.extend(decode_all(&mut receiver, tail));
        prop_assert_eq!(data_bytes(&events), payload);
    }
}

// ============================================================================
// CR Transparency on the Wire
// ============================================================================

#[test]
fn ascii_crlf_wire_bytes() {
    let mut codec = TelnetCodec::new();
    let mut wire = BytesMut::new();
    codec.encode(&b"\r\n"[..], &mut wire).unwrap();
    codec.flush_pending(&mut wire);
    assert_eq!(&wire[..], &[0x0D, 0x0A]);
}

#[test]
fn ascii_lone_cr_wire_bytes() {
    let mut codec = TelnetCodec::new();
    let mut wire = BytesMut::new();
    codec.encode(&b"\r"[..], &mut wire).unwrap();
    codec.flush_pending(&mut wire);
    assert_eq!(&wire[..], &[0x0D, 0x00]);
}

#[test]
fn ascii_cr_round_trips_through_peer() {
    // sender (ASCII) -> receiver (ASCII): the pad NUL inserted by the
    // encoder is removed again by the decoder.
    let mut sender = TelnetCodec::new();
    let mut wire = BytesMut::new();
    sender.encode(&b"a\rb\r\nc"[..], &mut wire).unwrap();
    sender.flush_pending(&mut wire);

    let mut receiver = TelnetCodec::new();
    let events = decode_all(&mut receiver, wire);
    assert_eq!(data_bytes(&events), b"a\rb\r\nc");
}

// ============================================================================
// Negotiation Traffic
// ============================================================================

#[test]
fn full_negotiation_exchange_between_two_codecs() {
    // Client asks the server to enable COM-PORT on both sides; the server
    // accepts. Frames are shuttled by encoding each codec's replies into
    // the other's inbound buffer.
    let mut client = TelnetCodec::new();
    client.register(TelnetOption::ComPort, Box::new(AlwaysAccept));
    let mut server = TelnetCodec::new();
    server.register(TelnetOption::ComPort, Box::new(AlwaysAccept));

    let mut client_to_server = BytesMut::new();
    let will = client.request_local(TelnetOption::ComPort, true).unwrap();
    client.encode(will, &mut client_to_server).unwrap();
    let do_frame = client.request_remote(TelnetOption::ComPort, true).unwrap();
    client.encode(do_frame, &mut client_to_server).unwrap();

    let events = decode_all(&mut server, client_to_server);
    assert_eq!(
        events,
        vec![
            TelnetEvent::OptionStatus(TelnetOption::ComPort, TelnetSide::Remote, true),
            TelnetEvent::OptionStatus(TelnetOption::ComPort, TelnetSide::Local, true),
        ]
    );

    let mut server_to_client = BytesMut::new();
    while let Some(reply) = server.take_reply() {
        server.encode(reply, &mut server_to_client).unwrap();
    }

    let events = decode_all(&mut client, server_to_client);
    assert_eq!(
        events,
        vec![
            TelnetEvent::OptionStatus(TelnetOption::ComPort, TelnetSide::Local, true),
            TelnetEvent::OptionStatus(TelnetOption::ComPort, TelnetSide::Remote, true),
        ]
    );
    assert!(client.is_enabled_local(TelnetOption::ComPort));
    assert!(client.is_enabled_remote(TelnetOption::ComPort));
    assert!(server.is_enabled_local(TelnetOption::ComPort));
    assert!(server.is_enabled_remote(TelnetOption::ComPort));
    assert!(!client.has_replies());
}

// ============================================================================
// RFC2217 Payloads Through the Codec
// ============================================================================

#[test]
fn set_baudrate_frame_wire_format() {
    let mut codec = TelnetCodec::new();
    let mut payload = BytesMut::new();
    payload.extend_from_slice(&[consts::comport::SET_BAUDRATE]);
    comport::BaudRate(9600).encode(&mut payload).unwrap();

    let mut wire = BytesMut::new();
    codec
        .encode(
            TelnetFrame::Subnegotiate(TelnetOption::ComPort, payload),
            &mut wire,
        )
        .unwrap();
    assert_eq!(
        &wire[..],
        &[
            consts::IAC,
            consts::SB,
            consts::option::COM_PORT,
            consts::comport::SET_BAUDRATE,
            0x00,
            0x00,
            0x25,
            0x80,
            consts::IAC,
            consts::SE,
        ]
    );
}

#[test]
fn baudrate_reply_decodes_through_subnegotiation() {
    let mut codec = TelnetCodec::new();
    let wire = [
        consts::IAC,
        consts::SB,
        consts::option::COM_PORT,
        consts::comport::SET_BAUDRATE + consts::comport::SERVER_OFFSET,
        0x00,
        0x01,
        0xC2,
        0x00,
        consts::IAC,
        consts::SE,
    ];
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));
    let TelnetEvent::Subnegotiation(option, payload) = &events[0] else {
        panic!("expected subnegotiation event, got {events:?}");
    };
    assert_eq!(*option, TelnetOption::ComPort);
    assert_eq!(payload[0], 101);
    let mut value = &payload[1..];
    assert_eq!(
        comport::BaudRate::decode(&mut value).unwrap(),
        comport::BaudRate(115_200)
    );
}

#[test]
fn modem_state_notification_decodes() {
    let mut codec = TelnetCodec::new();
    let state = comport::ModemState::CARRIER_DETECT | comport::ModemState::DELTA_CARRIER_DETECT;
    let wire = [
        consts::IAC,
        consts::SB,
        consts::option::COM_PORT,
        consts::comport::NOTIFY_MODEMSTATE + consts::comport::SERVER_OFFSET,
        state,
        consts::IAC,
        consts::SE,
    ];
    let events = decode_all(&mut codec, BytesMut::from(&wire[..]));
    assert_eq!(
        events,
        vec![TelnetEvent::Subnegotiation(
            TelnetOption::ComPort,
            BytesMut::from(&[107, state][..])
        )]
    );
    let modem = comport::ModemState::from(state);
    assert!(modem.carrier_detect());
    assert!(modem.changed());
}
