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

//! Listener traits for asynchronously received events
//!
//! Listeners are held as `Arc<dyn …>` and dispatched from the connection's
//! reader task. Dispatch works on a snapshot of the listener list taken
//! under a short lock, so a listener registered mid-dispatch simply starts
//! receiving from the next batch.

use async_trait::async_trait;
use comtel_codec::comport::ModemState;

/// Receives application bytes as they are decoded from the connection.
///
/// Called from the reader task with each batch of newly available bytes.
/// The same bytes are also appended to the receive ring buffer, so a
/// consumer should pick one model (pull via `read` or push via listener)
/// per connection to avoid processing data twice.
#[async_trait]
pub trait DataListener: Send + Sync {
    /// Called with each batch of newly received application bytes.
    async fn on_data(&self, data: &[u8]);
}

/// Receives RFC2217 modem-state-change notifications.
///
/// The server sends these asynchronously once a modem-state mask has been
/// set; the bitmask carries the DCD/RI/DSR/CTS levels and their delta bits.
#[async_trait]
pub trait ModemStateListener: Send + Sync {
    /// Called with each modem-state notification from the server.
    async fn on_modem_state(&self, state: ModemState);
}
