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

//! Client configuration

use std::time::Duration;

/// Virtual terminal configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a locally-initiated option negotiation waits for the
    /// peer's DO/DONT/WILL/WONT answer before failing
    pub negotiation_timeout: Duration,

    /// How long a subnegotiation request/response transaction waits for
    /// the matching reply before failing
    pub request_timeout: Duration,

    /// Default timeout for blocking reads (None to wait indefinitely)
    pub read_timeout: Option<Duration>,

    /// Capacity of the receive ring buffer in bytes
    pub buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
            read_timeout: None,
            buffer_capacity: 8192,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with the default timeouts and buffer size
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the option negotiation timeout
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = timeout;
        self
    }

    /// Set the subnegotiation request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the default read timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the receive ring buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ClientConfig::default();
        assert_eq!(config.negotiation_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.buffer_capacity, 8192);
    }

    #[test]
    fn builders_override_fields() {
        let config = ClientConfig::new()
            .with_negotiation_timeout(Duration::from_secs(1))
            .with_request_timeout(Duration::from_millis(250))
            .with_read_timeout(Some(Duration::from_secs(30)))
            .with_buffer_capacity(1024);
        assert_eq!(config.negotiation_timeout, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.buffer_capacity, 1024);
    }
}
