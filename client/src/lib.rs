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

//! # Comtel Telnet Client
//!
//! Asynchronous Network Virtual Terminal and RFC2217 serial-port control
//! on top of the [`comtel_codec`] protocol engine.
//!
//! ## Features
//!
//! - **Background pump** - A dedicated reader task per connection drains
//!   the stream, answers option negotiation, and fans out received data
//! - **Synchronous control calls** - Option negotiation and RFC2217
//!   commands look blocking to the caller but await completions from the
//!   reader task, with configurable timeouts
//! - **Serial port control** - Baud rate, parity, data/stop size, control
//!   lines (DTR/RTS/BREAK) and modem-state notifications per RFC2217
//! - **Async-First** - Built on Tokio; works with any `AsyncRead +
//!   AsyncWrite` transport
//!
//! ## Quick Start
//!
//! ```no_run
//! use comtel_client::{ClientConfig, SerialControl, VirtualTerminal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = tokio::net::TcpStream::connect("10.0.0.7:2217").await?;
//!     let terminal = VirtualTerminal::new(stream, ClientConfig::default());
//!     terminal.negotiate().await?;
//!
//!     let serial = SerialControl::new(&terminal);
//!     if serial.negotiate().await? {
//!         println!("attached to: {}", serial.signature().await?);
//!         serial.set_baud_rate(115_200).await?;
//!     }
//!
//!     let mut buf = [0u8; 256];
//!     let count = terminal.read(&mut buf).await?;
//!     println!("first {count} bytes received");
//!     terminal.close().await?;
//!     Ok(())
//! }
//! ```

mod channel;
mod config;
mod error;
mod listener;
mod serial;
mod terminal;

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use listener::{DataListener, ModemStateListener};
pub use serial::SerialControl;
pub use terminal::VirtualTerminal;

// Re-export the codec types that appear in this crate's API.
pub use comtel_codec::comport::{BaudRate, ControlCode, DataSize, ModemState, Parity, StopSize};
pub use comtel_codec::{
    AlwaysAccept, CodecError, OptionHandler, TelnetEvent, TelnetFrame, TelnetOption, TelnetSide,
    consts,
};
