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

//! Synchronous request/response transactions over the asynchronous
//! subnegotiation stream.
//!
//! A caller registers a transaction before sending its subnegotiation
//! frame; the connection's reader task completes the transaction when a
//! subnegotiation for the same option arrives. Each transaction owns its
//! oneshot slot: a timed-out transaction is removed by the caller, so a
//! late reply finds no slot and is discarded instead of completing an
//! unrelated newer request.

use crate::error::{ClientError, Result};
use comtel_codec::TelnetOption;
use std::collections::HashMap;
use tokio::sync::{Mutex, oneshot};
use tracing::warn;

/// One outstanding request awaiting its reply.
struct Pending {
    /// Reply code the transaction is waiting for (client command + 100)
    expected: u8,
    tx: oneshot::Sender<Result<Vec<u8>>>,
}

/// Pending subnegotiation transactions, at most one per option code.
#[derive(Default)]
pub(crate) struct SubnegotiationChannel {
    pending: Mutex<HashMap<u8, Pending>>,
}

impl SubnegotiationChannel {
    pub(crate) fn new() -> Self {
        SubnegotiationChannel::default()
    }

    /// Registers a transaction for `option` expecting reply code
    /// `expected`. Fails if a transaction for the option is already in
    /// flight.
    pub(crate) async fn begin(
        &self,
        option: TelnetOption,
        expected: u8,
    ) -> Result<oneshot::Receiver<Result<Vec<u8>>>> {
        let mut pending = self.pending.lock().await;
        if pending.contains_key(&option.to_u8()) {
            return Err(ClientError::RequestPending { option });
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(option.to_u8(), Pending { expected, tx });
        Ok(rx)
    }

    /// Removes the transaction for `option`, if any. Called on timeout or
    /// when sending the request failed.
    pub(crate) async fn cancel(&self, option: TelnetOption) {
        self.pending.lock().await.remove(&option.to_u8());
    }

    /// Hands a received subnegotiation payload to the pending transaction
    /// for `option`. Returns `false` when no transaction was waiting (the
    /// payload is unsolicited).
    ///
    /// A reply whose first byte differs from the expected code fails the
    /// transaction rather than completing it.
    pub(crate) async fn complete(&self, option: TelnetOption, payload: &[u8]) -> bool {
        let entry = self.pending.lock().await.remove(&option.to_u8());
        let Some(Pending { expected, tx }) = entry else {
            return false;
        };
        let result = match payload.first() {
            Some(&code) if code == expected => Ok(payload.to_vec()),
            Some(&code) => {
                warn!(
                    "subnegotiation reply for {} carried code {} where {} was expected",
                    option, code, expected
                );
                Err(ClientError::ReplyMismatch {
                    expected,
                    received: code,
                })
            }
            None => Err(ClientError::InvalidReply {
                reason: "empty subnegotiation reply".to_string(),
            }),
        };
        // The requester may have given up; a dead receiver is fine.
        let _ = tx.send(result);
        true
    }

    /// Fails every outstanding transaction with `ConnectionClosed`. Called
    /// when the connection terminates so no waiter hangs.
    pub(crate) async fn fail_all(&self) {
        for (_, pending) in self.pending.lock().await.drain() {
            let _ = pending.tx.send(Err(ClientError::ConnectionClosed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn matching_reply_completes_transaction() {
        let channel = SubnegotiationChannel::new();
        let rx = channel
            .begin(TelnetOption::ComPort, 101)
            .await
            .expect("begin");
        assert!(channel.complete(TelnetOption::ComPort, &[101, 1, 2]).await);
        let reply = rx.await.expect("sender alive").expect("reply ok");
        assert_eq!(reply, vec![101, 1, 2]);
    }

    #[tokio::test]
    async fn mismatched_reply_code_fails_transaction() {
        let channel = SubnegotiationChannel::new();
        let rx = channel
            .begin(TelnetOption::ComPort, 101)
            .await
            .expect("begin");
        assert!(channel.complete(TelnetOption::ComPort, &[107, 0]).await);
        let err = rx.await.expect("sender alive").unwrap_err();
        assert!(matches!(
            err,
            ClientError::ReplyMismatch {
                expected: 101,
                received: 107
            }
        ));
    }

    #[tokio::test]
    async fn unsolicited_payload_is_reported() {
        let channel = SubnegotiationChannel::new();
        assert!(!channel.complete(TelnetOption::ComPort, &[107, 0]).await);
    }

    #[tokio::test]
    async fn second_request_for_same_option_is_rejected() {
        let channel = SubnegotiationChannel::new();
        let _rx = channel
            .begin(TelnetOption::ComPort, 101)
            .await
            .expect("begin");
        let err = channel
            .begin(TelnetOption::ComPort, 102)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RequestPending { .. }));
    }

    #[tokio::test]
    async fn cancelled_transaction_ignores_late_reply() {
        let channel = SubnegotiationChannel::new();
        let _rx = channel
            .begin(TelnetOption::ComPort, 101)
            .await
            .expect("begin");
        channel.cancel(TelnetOption::ComPort).await;
        // The late reply is unsolicited now.
        assert!(!channel.complete(TelnetOption::ComPort, &[101, 1]).await);
    }

    #[tokio::test]
    async fn fail_all_errors_outstanding_waiters() {
        let channel = SubnegotiationChannel::new();
        let rx = channel
            .begin(TelnetOption::ComPort, 101)
            .await
            .expect("begin");
        channel.fail_all().await;
        let err = rx.await.expect("sender alive").unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));
    }
}
