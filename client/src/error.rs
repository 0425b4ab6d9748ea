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

//! Client error types
//!
//! A peer refusing a negotiation (answering WONT/DONT) is a normal protocol
//! outcome and is reported as `Ok(false)` by the request calls, never as an
//! error. The variants here cover transport failures, timeouts, and replies
//! that cannot be interpreted.

use comtel_codec::{CodecError, TelnetOption};
use std::time::Duration;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the codec layer
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The connection was closed while an operation was outstanding
    #[error("Connection closed")]
    ConnectionClosed,

    /// The peer did not answer an option negotiation in time
    #[error("Negotiation for {option} timed out after {timeout:?}")]
    NegotiationTimeout {
        /// The option being negotiated
        option: TelnetOption,
        /// The configured negotiation timeout
        timeout: Duration,
    },

    /// The peer did not answer a subnegotiation request in time
    #[error("Request for {option} timed out after {timeout:?}")]
    RequestTimeout {
        /// The option the request was sent under
        option: TelnetOption,
        /// The configured request timeout
        timeout: Duration,
    },

    /// A subnegotiation request for the same option is already in flight
    #[error("A request for {option} is already outstanding")]
    RequestPending {
        /// The option with the outstanding request
        option: TelnetOption,
    },

    /// A subnegotiation reply carried an unexpected reply code
    #[error("Reply code mismatch (expected {expected}, received {received})")]
    ReplyMismatch {
        /// The reply code the transaction was waiting for
        expected: u8,
        /// The reply code that actually arrived
        received: u8,
    },

    /// A subnegotiation reply was too short or otherwise uninterpretable
    #[error("Invalid reply: {reason}")]
    InvalidReply {
        /// What was wrong with the reply
        reason: String,
    },

    /// A blocking read did not produce data in time
    #[error("Read timed out")]
    ReadTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = ClientError::ReplyMismatch {
            expected: 101,
            received: 107,
        };
        assert_eq!(
            err.to_string(),
            "Reply code mismatch (expected 101, received 107)"
        );

        let err = ClientError::NegotiationTimeout {
            option: TelnetOption::ComPort,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.to_string(), "Negotiation for ComPort timed out after 5s");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err = ClientError::from(io);
        assert!(matches!(err, ClientError::Io(_)));
    }
}
