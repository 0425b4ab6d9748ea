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

//! RFC2217 serial-port control over a Telnet connection
//!
//! [`SerialControl`] layers the COM-PORT-OPTION command set on top of a
//! [`VirtualTerminal`]: every accessor builds a 1-5 byte payload, sends it
//! as a subnegotiation, and decodes the server's reply (client command code
//! plus 100). Asynchronous modem-state notifications are delivered through
//! the terminal's [`ModemStateListener`](crate::ModemStateListener)
//! fan-out, not through these request/response calls.

use crate::error::{ClientError, Result};
use crate::terminal::{Shared, VirtualTerminal};
use bytes::{BufMut, BytesMut};
use comtel_codec::comport::{BaudRate, ControlCode, DataSize, ModemState, Parity, StopSize};
use comtel_codec::{AlwaysAccept, TelnetOption, TelnetSide, consts};
use std::sync::Arc;
use tracing::debug;

/// RFC2217 client for a remote serial port.
///
/// Cheap to clone; all clones talk to the same connection. Values of 0 in
/// the numeric commands mean "report the current setting", which is how the
/// query accessors are implemented.
#[derive(Clone)]
pub struct SerialControl {
    shared: Arc<Shared>,
}

impl SerialControl {
    /// Creates a serial control client on `terminal`'s connection.
    pub fn new(terminal: &VirtualTerminal) -> SerialControl {
        SerialControl {
            shared: terminal.shared(),
        }
    }

    /// Announces COM-PORT-OPTION support to the server (`WILL`, plus `DO`
    /// for the server's direction) and waits for the answer.
    ///
    /// Returns whether the server accepted our side of the option, which
    /// is what RFC2217 requires before client commands are valid. The
    /// server-direction request is advisory and its refusal is tolerated.
    pub async fn negotiate(&self) -> Result<bool> {
        {
            let mut codec = self.shared.codec.lock().await;
            if codec.options().state(TelnetOption::ComPort).is_none() {
                codec.register(TelnetOption::ComPort, Box::new(AlwaysAccept));
            }
        }
        let local = self
            .shared
            .request_option(TelnetSide::Local, TelnetOption::ComPort, true)
            .await?;
        match self
            .shared
            .request_option(TelnetSide::Remote, TelnetOption::ComPort, true)
            .await
        {
            Ok(_) => {}
            Err(ClientError::NegotiationTimeout { .. }) => {
                debug!("server did not answer DO ComPort");
            }
            Err(error) => return Err(error),
        }
        Ok(local)
    }

    /// Queries the server's free-text port signature.
    pub async fn signature(&self) -> Result<String> {
        let reply = self.command(consts::comport::SIGNATURE, &[]).await?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    /// Sets the baud rate, returning the rate the server actually applied.
    ///
    /// A `baud` of 0 queries the current rate without changing it, which is
    /// what [`baud_rate`](SerialControl::baud_rate) does.
    pub async fn set_baud_rate(&self, baud: u32) -> Result<u32> {
        let mut value = BytesMut::with_capacity(4);
        BaudRate(baud).encode(&mut value)?;
        let reply = self.command(consts::comport::SET_BAUDRATE, &value).await?;
        let mut reply = &reply[..];
        Ok(BaudRate::decode(&mut reply)?.0)
    }

    /// Queries the current baud rate.
    pub async fn baud_rate(&self) -> Result<u32> {
        self.set_baud_rate(BaudRate::QUERY.0).await
    }

    /// Sets the data size, returning the size the server applied.
    pub async fn set_data_size(&self, size: DataSize) -> Result<DataSize> {
        self.data_size_command(size.to_u8()).await
    }

    /// Queries the current data size.
    pub async fn data_size(&self) -> Result<DataSize> {
        self.data_size_command(0).await
    }

    async fn data_size_command(&self, value: u8) -> Result<DataSize> {
        let reply = self
            .command(consts::comport::SET_DATASIZE, &[value])
            .await?;
        Ok(DataSize::from_u8(self.single_byte(&reply, "data size")?)?)
    }

    /// Sets the parity, returning the parity the server applied.
    pub async fn set_parity(&self, parity: Parity) -> Result<Parity> {
        self.parity_command(parity.to_u8()).await
    }

    /// Queries the current parity.
    pub async fn parity(&self) -> Result<Parity> {
        self.parity_command(0).await
    }

    async fn parity_command(&self, value: u8) -> Result<Parity> {
        let reply = self.command(consts::comport::SET_PARITY, &[value]).await?;
        Ok(Parity::from_u8(self.single_byte(&reply, "parity")?)?)
    }

    /// Sets the stop size, returning the size the server applied.
    pub async fn set_stop_size(&self, size: StopSize) -> Result<StopSize> {
        self.stop_size_command(size.to_u8()).await
    }

    /// Queries the current stop size.
    pub async fn stop_size(&self) -> Result<StopSize> {
        self.stop_size_command(0).await
    }

    async fn stop_size_command(&self, value: u8) -> Result<StopSize> {
        let reply = self
            .command(consts::comport::SET_STOPSIZE, &[value])
            .await?;
        Ok(StopSize::from_u8(self.single_byte(&reply, "stop size")?)?)
    }

    /// Sends a generic SET-CONTROL verb and returns the server's one-byte
    /// result code.
    pub async fn control(&self, code: ControlCode) -> Result<u8> {
        let reply = self
            .command(consts::comport::SET_CONTROL, &[code.to_u8()])
            .await?;
        self.single_byte(&reply, "control")
    }

    /// Queries the current flow control setting.
    pub async fn flow_control(&self) -> Result<ControlCode> {
        let result = self.control(ControlCode::RequestFlowControl).await?;
        Ok(ControlCode::from_u8(result)?)
    }

    /// Raises or drops the DTR line.
    pub async fn set_dtr(&self, asserted: bool) -> Result<()> {
        let code = if asserted {
            ControlCode::DtrOn
        } else {
            ControlCode::DtrOff
        };
        self.control(code).await.map(|_| ())
    }

    /// Raises or drops the RTS line.
    pub async fn set_rts(&self, asserted: bool) -> Result<()> {
        let code = if asserted {
            ControlCode::RtsOn
        } else {
            ControlCode::RtsOff
        };
        self.control(code).await.map(|_| ())
    }

    /// Asserts or releases BREAK on the line.
    pub async fn set_break(&self, asserted: bool) -> Result<()> {
        let code = if asserted {
            ControlCode::BreakOn
        } else {
            ControlCode::BreakOff
        };
        self.control(code).await.map(|_| ())
    }

    /// Sets the modem-state notification mask and returns the mask the
    /// server applied. With any level bits enabled the server starts
    /// sending asynchronous NOTIFY-MODEMSTATE frames, delivered through
    /// the terminal's modem-state listeners.
    pub async fn set_modem_state_mask(&self, mask: ModemState) -> Result<ModemState> {
        let reply = self
            .command(consts::comport::SET_MODEMSTATE_MASK, &[mask.bits()])
            .await?;
        Ok(ModemState::from(self.single_byte(&reply, "modem-state mask")?))
    }

    /// Sends one COM-PORT-OPTION command and returns the reply payload
    /// with the reply code stripped.
    async fn command(&self, command: u8, value: &[u8]) -> Result<Vec<u8>> {
        let mut payload = BytesMut::with_capacity(1 + value.len());
        payload.put_u8(command);
        payload.extend_from_slice(value);
        let expected = command + consts::comport::SERVER_OFFSET;
        let reply = self
            .shared
            .send_and_wait(TelnetOption::ComPort, payload, expected)
            .await?;
        // The channel verified the reply code, so the payload is nonempty.
        Ok(reply[1..].to_vec())
    }

    /// Extracts the single value byte of a fixed-size reply.
    fn single_byte(&self, reply: &[u8], what: &str) -> Result<u8> {
        reply
            .first()
            .copied()
            .ok_or_else(|| ClientError::InvalidReply {
                reason: format!("{what} reply carried no value byte"),
            })
    }
}
