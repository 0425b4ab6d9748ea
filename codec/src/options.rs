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

use crate::{TelnetFrame, consts};
use std::collections::HashMap;
use std::fmt::Formatter;
use tracing::{debug, warn};

///
/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
/// The engine only names the options a serial-over-Telnet session
/// actually negotiates; everything else round-trips through
/// [`TelnetOption::Unknown`].
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Telnet Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::STATUS`] Telnet Status Option [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// [`consts::option::TM`] Telnet Timing Mark Option [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TerminalType,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    WindowSize,
    /// [`consts::option::COM_PORT`] Com Port Control Option [RFC2217](http://www.iana.org/go/rfc2217)
    ComPort,
    /// Unknown Option
    Unknown(u8),
}

impl TelnetOption {
    /// Converts a `TelnetOption` into its wire option code.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TerminalType => consts::option::TTYPE,
            TelnetOption::WindowSize => consts::option::NAWS,
            TelnetOption::ComPort => consts::option::COM_PORT,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Converts a wire option code into the corresponding `TelnetOption`.
    /// Codes this engine does not name become [`TelnetOption::Unknown`].
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TerminalType,
            consts::option::NAWS => TelnetOption::WindowSize,
            consts::option::COM_PORT => TelnetOption::ComPort,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Status => write!(f, "Status"),
            TelnetOption::TimingMark => write!(f, "TimingMark"),
            TelnetOption::TerminalType => write!(f, "TerminalType"),
            TelnetOption::WindowSize => write!(f, "WindowSize"),
            TelnetOption::ComPort => write!(f, "ComPort"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// Represents the perspective of a Telnet option in a negotiation.
///
/// Each option maintains two independent negotiation paths: the local path
/// (whether *we* perform the option, negotiated with WILL/WONT answered by
/// DO/DONT) and the remote path (whether the *peer* performs it, negotiated
/// with DO/DONT answered by WILL/WONT). `TelnetSide` disambiguates the two
/// when reporting a completed negotiation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetSide {
    /// The local side of the Telnet connection (what we perform)
    Local,
    /// The remote side of the Telnet connection (what the peer performs)
    Remote,
}

impl std::fmt::Display for TelnetSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetSide::Local => write!(f, "Local"),
            TelnetSide::Remote => write!(f, "Remote"),
        }
    }
}

///
/// Capability handler for a registered option.
///
/// A handler decides whether peer-initiated negotiations are accepted and
/// receives completed subnegotiation payloads for its option. Options
/// without a handler are always refused when proposed by the peer.
///
/// Note on the disable direction: RFC854 does not permit refusing a
/// `DONT`/`WONT`. When [`accept_dont`](OptionHandler::accept_dont) or
/// [`accept_wont`](OptionHandler::accept_wont) returns `false` the engine
/// logs a warning and complies anyway; the predicates exist so a handler
/// can observe the transition.
///
pub trait OptionHandler: Send {
    /// Whether to accept a peer request (`DO`) that we enable this option
    /// locally.
    fn accept_do(&mut self, option: TelnetOption) -> bool {
        let _ = option;
        true
    }

    /// Consent hook for a peer request (`DONT`) that we disable this option
    /// locally. Advisory only; the engine always complies.
    fn accept_dont(&mut self, option: TelnetOption) -> bool {
        let _ = option;
        true
    }

    /// Whether to accept a peer offer (`WILL`) to enable this option on the
    /// remote side.
    fn accept_will(&mut self, option: TelnetOption) -> bool {
        let _ = option;
        true
    }

    /// Consent hook for a peer announcement (`WONT`) that the remote side
    /// disables this option. Advisory only; the engine always complies.
    fn accept_wont(&mut self, option: TelnetOption) -> bool {
        let _ = option;
        true
    }

    /// Called with each completed subnegotiation payload for this option,
    /// IAC escapes already removed.
    fn on_subnegotiation(&mut self, option: TelnetOption, payload: &[u8]) {
        let _ = (option, payload);
    }
}

/// An [`OptionHandler`] that accepts every negotiation and ignores
/// subnegotiation payloads. The usual choice for plumbing options like
/// TRANSMIT-BINARY or SUPPRESS-GO-AHEAD that need no per-payload logic.
pub struct AlwaysAccept;

impl OptionHandler for AlwaysAccept {}

///
/// Per-option negotiation bookkeeping.
///
/// `local_enabled`/`remote_enabled` are the confirmed WILL/DO states. The
/// `*_sent` flags mark an outstanding locally-initiated request awaiting the
/// peer's answer; at most one of `will_sent`/`wont_sent` and one of
/// `do_sent`/`dont_sent` is set at any time. The `*_processed` flags latch
/// peer-initiated negotiations so a repeated verb produces neither a second
/// reply nor a second handler side effect.
///
pub struct OptionState {
    option: TelnetOption,
    local_enabled: bool,
    remote_enabled: bool,
    will_sent: bool,
    wont_sent: bool,
    do_sent: bool,
    dont_sent: bool,
    do_processed: bool,
    dont_processed: bool,
    will_processed: bool,
    wont_processed: bool,
    handler: Option<Box<dyn OptionHandler>>,
}

impl OptionState {
    fn new(option: TelnetOption, handler: Option<Box<dyn OptionHandler>>) -> Self {
        OptionState {
            option,
            local_enabled: false,
            remote_enabled: false,
            will_sent: false,
            wont_sent: false,
            do_sent: false,
            dont_sent: false,
            do_processed: false,
            dont_processed: false,
            will_processed: false,
            wont_processed: false,
            handler,
        }
    }

    /// The option this state belongs to.
    pub fn option(&self) -> TelnetOption {
        self.option
    }

    /// Whether the option is confirmed enabled on the local side.
    pub fn local_enabled(&self) -> bool {
        self.local_enabled
    }

    /// Whether the option is confirmed enabled on the remote side.
    pub fn remote_enabled(&self) -> bool {
        self.remote_enabled
    }

    /// Whether a locally-initiated WILL/WONT is awaiting the peer's answer.
    pub fn is_pending_local(&self) -> bool {
        self.will_sent || self.wont_sent
    }

    /// Whether a locally-initiated DO/DONT is awaiting the peer's answer.
    pub fn is_pending_remote(&self) -> bool {
        self.do_sent || self.dont_sent
    }
}

///
/// Maps option codes to their negotiation state and capability handler,
/// and adjudicates received DO/DONT/WILL/WONT verbs.
///
/// Entries are created when an option is registered (or first requested
/// locally) and live for the connection's duration. A verb for an option
/// with no entry, or an entry with no handler, is refused: `DO` is answered
/// with `WONT` and `WILL` with `DONT`. A `DONT`/`WONT` for an option that
/// was never enabled is not answered at all; in particular the engine does
/// not reproduce the legacy behavior of answering an unregistered `DONT`
/// with `WILL`.
///
#[derive(Default)]
pub struct OptionRegistry {
    states: HashMap<u8, OptionState>,
}

impl OptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        OptionRegistry::default()
    }

    /// Registers `handler` for `option`, creating the option's state entry.
    /// Replaces any previously registered handler; negotiation state is
    /// preserved across replacement.
    pub fn register(&mut self, option: TelnetOption, handler: Box<dyn OptionHandler>) {
        self.states
            .entry(option.to_u8())
            .or_insert_with(|| OptionState::new(option, None))
            .handler = Some(handler);
    }

    /// Returns the negotiation state for `option`, if registered.
    pub fn state(&self, option: TelnetOption) -> Option<&OptionState> {
        self.states.get(&option.to_u8())
    }

    /// Whether `option` is confirmed enabled on the local side.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.state(option).is_some_and(OptionState::local_enabled)
    }

    /// Whether `option` is confirmed enabled on the remote side.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.state(option).is_some_and(OptionState::remote_enabled)
    }

    /// Whether a locally-initiated WILL/WONT for `option` is awaiting the
    /// peer's answer.
    pub fn is_pending_local(&self, option: TelnetOption) -> bool {
        self.state(option).is_some_and(OptionState::is_pending_local)
    }

    /// Whether a locally-initiated DO/DONT for `option` is awaiting the
    /// peer's answer.
    pub fn is_pending_remote(&self, option: TelnetOption) -> bool {
        self.state(option)
            .is_some_and(OptionState::is_pending_remote)
    }

    /// Clears an outstanding WILL/WONT request for `option`, e.g. after the
    /// wait for the peer's answer timed out. A later request for the same
    /// option starts from a clean slate.
    pub fn clear_pending_local(&mut self, option: TelnetOption) {
        if let Some(state) = self.states.get_mut(&option.to_u8()) {
            state.will_sent = false;
            state.wont_sent = false;
        }
    }

    /// Clears an outstanding DO/DONT request for `option`.
    pub fn clear_pending_remote(&mut self, option: TelnetOption) {
        if let Some(state) = self.states.get_mut(&option.to_u8()) {
            state.do_sent = false;
            state.dont_sent = false;
        }
    }

    /// Starts a locally-initiated negotiation to enable (`WILL`) or disable
    /// (`WONT`) `option` on our side.
    ///
    /// Returns the frame to put on the wire, or `None` when no negotiation
    /// is needed (already in the requested state, or the same request is
    /// still in flight). The caller is expected to wait for the matching
    /// pending flag to clear before treating the request as answered.
    pub fn request_local(&mut self, option: TelnetOption, enable: bool) -> Option<TelnetFrame> {
        let state = self
            .states
            .entry(option.to_u8())
            .or_insert_with(|| OptionState::new(option, None));
        if enable {
            if state.local_enabled || state.will_sent {
                return None;
            }
            state.wont_sent = false;
            state.will_sent = true;
            debug!("requesting local enable of {} (WILL)", option);
            Some(TelnetFrame::Will(option))
        } else {
            if state.wont_sent {
                return None;
            }
            if !state.local_enabled && !state.will_sent {
                return None;
            }
            state.will_sent = false;
            state.wont_sent = true;
            debug!("requesting local disable of {} (WONT)", option);
            Some(TelnetFrame::Wont(option))
        }
    }

    /// Starts a locally-initiated negotiation to enable (`DO`) or disable
    /// (`DONT`) `option` on the peer's side. Mirrors
    /// [`request_local`](OptionRegistry::request_local).
    pub fn request_remote(&mut self, option: TelnetOption, enable: bool) -> Option<TelnetFrame> {
        let state = self
            .states
            .entry(option.to_u8())
            .or_insert_with(|| OptionState::new(option, None));
        if enable {
            if state.remote_enabled || state.do_sent {
                return None;
            }
            state.dont_sent = false;
            state.do_sent = true;
            debug!("requesting remote enable of {} (DO)", option);
            Some(TelnetFrame::Do(option))
        } else {
            if state.dont_sent {
                return None;
            }
            if !state.remote_enabled && !state.do_sent {
                return None;
            }
            state.do_sent = false;
            state.dont_sent = true;
            debug!("requesting remote disable of {} (DONT)", option);
            Some(TelnetFrame::Dont(option))
        }
    }

    /// Dispatches a received negotiation verb to the matching `recv_*`
    /// method, returning the reply frame to send, if any. Non-negotiation
    /// frames are ignored.
    pub fn handle_received(&mut self, frame: &TelnetFrame) -> Option<TelnetFrame> {
        match frame {
            TelnetFrame::Do(option) => self.recv_do(*option),
            TelnetFrame::Dont(option) => self.recv_dont(*option),
            TelnetFrame::Will(option) => self.recv_will(*option),
            TelnetFrame::Wont(option) => self.recv_wont(*option),
            _ => None,
        }
    }

    /// Processes a received `DO` (the peer asks us to enable `option`).
    ///
    /// Either completes our own pending `WILL`, or asks the handler whether
    /// to accept. A repeat of an already-accepted `DO` is idempotent: no
    /// reply, no handler side effect.
    pub fn recv_do(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let Some(state) = self.states.get_mut(&option.to_u8()) else {
            debug!("refusing DO {} (option not registered)", option);
            return Some(TelnetFrame::Wont(option));
        };
        if state.will_sent {
            // The peer is granting a request we made.
            state.will_sent = false;
            state.local_enabled = true;
            debug!("option {} enabled locally (peer answered WILL)", option);
            return None;
        }
        if state.wont_sent {
            // Our disable request is still in flight; re-refuse.
            return Some(TelnetFrame::Wont(option));
        }
        let accepted = state.handler.as_mut().is_some_and(|h| h.accept_do(option));
        if accepted {
            if state.do_processed {
                return None;
            }
            state.do_processed = true;
            state.dont_processed = false;
            state.local_enabled = true;
            debug!("option {} enabled locally (accepted peer DO)", option);
            Some(TelnetFrame::Will(option))
        } else {
            debug!("refusing DO {}", option);
            Some(TelnetFrame::Wont(option))
        }
    }

    /// Processes a received `DONT` (the peer asks us to disable `option`).
    ///
    /// Completes a pending `WONT`, records the refusal of a pending `WILL`,
    /// or disables the option. Disabling cannot be refused; a handler that
    /// declines is logged and overridden.
    pub fn recv_dont(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let Some(state) = self.states.get_mut(&option.to_u8()) else {
            // Never registered, so never enabled; nothing to acknowledge.
            debug!("ignoring DONT {} (option not registered)", option);
            return None;
        };
        if state.wont_sent {
            state.wont_sent = false;
            state.local_enabled = false;
            state.do_processed = false;
            debug!("option {} disabled locally (peer answered WONT)", option);
            return None;
        }
        if state.will_sent {
            // The peer refused our enable request.
            state.will_sent = false;
            state.local_enabled = false;
            debug!("option {} refused by peer (DONT answers WILL)", option);
            return None;
        }
        if state.dont_processed {
            return None;
        }
        if !state
            .handler
            .as_mut()
            .is_none_or(|h| h.accept_dont(option))
        {
            warn!("handler declined DONT {}, complying anyway", option);
        }
        state.dont_processed = true;
        state.do_processed = false;
        state.local_enabled = false;
        Some(TelnetFrame::Wont(option))
    }

    /// Processes a received `WILL` (the peer offers to enable `option` on
    /// its side). Mirrors [`recv_do`](OptionRegistry::recv_do) on the
    /// remote path.
    pub fn recv_will(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let Some(state) = self.states.get_mut(&option.to_u8()) else {
            debug!("refusing WILL {} (option not registered)", option);
            return Some(TelnetFrame::Dont(option));
        };
        if state.do_sent {
            // The peer is granting a request we made.
            state.do_sent = false;
            state.remote_enabled = true;
            debug!("option {} enabled remotely (peer answered DO)", option);
            return None;
        }
        if state.dont_sent {
            // Our disable request is still in flight; re-refuse.
            return Some(TelnetFrame::Dont(option));
        }
        let accepted = state
            .handler
            .as_mut()
            .is_some_and(|h| h.accept_will(option));
        if accepted {
            if state.will_processed {
                return None;
            }
            state.will_processed = true;
            state.wont_processed = false;
            state.remote_enabled = true;
            debug!("option {} enabled remotely (accepted peer WILL)", option);
            Some(TelnetFrame::Do(option))
        } else {
            debug!("refusing WILL {}", option);
            Some(TelnetFrame::Dont(option))
        }
    }

    /// Processes a received `WONT` (the peer announces `option` disabled on
    /// its side). Mirrors [`recv_dont`](OptionRegistry::recv_dont) on the
    /// remote path.
    pub fn recv_wont(&mut self, option: TelnetOption) -> Option<TelnetFrame> {
        let Some(state) = self.states.get_mut(&option.to_u8()) else {
            debug!("ignoring WONT {} (option not registered)", option);
            return None;
        };
        if state.dont_sent {
            state.dont_sent = false;
            state.remote_enabled = false;
            state.will_processed = false;
            debug!("option {} disabled remotely (peer answered DONT)", option);
            return None;
        }
        if state.do_sent {
            // The peer refused our enable request.
            state.do_sent = false;
            state.remote_enabled = false;
            debug!("option {} refused by peer (WONT answers DO)", option);
            return None;
        }
        if state.wont_processed {
            return None;
        }
        if !state
            .handler
            .as_mut()
            .is_none_or(|h| h.accept_wont(option))
        {
            warn!("handler declined WONT {}, complying anyway", option);
        }
        state.wont_processed = true;
        state.will_processed = false;
        state.remote_enabled = false;
        Some(TelnetFrame::Dont(option))
    }

    /// Routes a completed subnegotiation payload to the option's handler.
    /// Payloads for options without a handler are dropped.
    pub fn handle_subnegotiation(&mut self, option: TelnetOption, payload: &[u8]) {
        match self
            .states
            .get_mut(&option.to_u8())
            .and_then(|state| state.handler.as_mut())
        {
            Some(handler) => handler.on_subnegotiation(option, payload),
            None => debug!("dropping subnegotiation for unhandled option {}", option),
        }
    }
}

impl std::fmt::Debug for OptionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut options: Vec<u8> = self.states.keys().copied().collect();
        options.sort_unstable();
        f.debug_struct("OptionRegistry")
            .field("options", &options)
            .finish()
    }
}
