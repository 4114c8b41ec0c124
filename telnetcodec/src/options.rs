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
use std::fmt::Formatter;
use std::sync::Arc;

/// [Telnet Terminal Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Telnet Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Telnet Echo Option [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::STATUS`] Telnet Status Option [RFC859](http://www.iana.org/go/rfc859)
    Status,
    /// [`consts::option::TM`] Telnet Timing Mark Option [RFC860](http://www.iana.org/go/rfc860)
    TimingMark,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](http://www.iana.org/go/rfc1091)
    TTYPE,
    /// [`consts::option::EOR`] End of Record [RFC885](http://www.iana.org/go/rfc885)
    EOR,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](http://www.iana.org/go/rfc1073)
    NAWS,
    /// [`consts::option::LINEMODE`] Linemode [RFC1184](http://www.iana.org/go/rfc1184)
    Linemode,
    /// [`consts::option::NEW_ENVIRONMENT`] New Environment Option [RFC1572](http://www.iana.org/go/rfc1572)
    NewEnvironment,
    /// [`consts::option::CHARSET`] Charset [RFC2066](http://www.iana.org/go/rfc2066)
    Charset,
    /// [`consts::option::MSDP`] Mud Server Data Protocol
    MSDP,
    /// [`consts::option::MSSP`] Mud Server Status Protocol
    MSSP,
    /// [`consts::option::COMPRESS2`] Mud Client Compression Protocol version 2
    Compress2,
    /// [`consts::option::GMCP`] Generic Mud Communication Protocol
    GMCP,
    /// Any option code without a name in this crate
    Unknown(u8),
}

impl TelnetOption {
    /// Wire code of this option.
    pub fn to_u8(&self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TTYPE => consts::option::TTYPE,
            TelnetOption::EOR => consts::option::EOR,
            TelnetOption::NAWS => consts::option::NAWS,
            TelnetOption::Linemode => consts::option::LINEMODE,
            TelnetOption::NewEnvironment => consts::option::NEW_ENVIRONMENT,
            TelnetOption::Charset => consts::option::CHARSET,
            TelnetOption::MSDP => consts::option::MSDP,
            TelnetOption::MSSP => consts::option::MSSP,
            TelnetOption::Compress2 => consts::option::COMPRESS2,
            TelnetOption::GMCP => consts::option::GMCP,
            TelnetOption::Unknown(byte) => *byte,
        }
    }

    /// Option for a wire code. Codes without a name map to [`TelnetOption::Unknown`].
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TTYPE,
            consts::option::EOR => TelnetOption::EOR,
            consts::option::NAWS => TelnetOption::NAWS,
            consts::option::LINEMODE => TelnetOption::Linemode,
            consts::option::NEW_ENVIRONMENT => TelnetOption::NewEnvironment,
            consts::option::CHARSET => TelnetOption::Charset,
            consts::option::MSDP => TelnetOption::MSDP,
            consts::option::MSSP => TelnetOption::MSSP,
            consts::option::COMPRESS2 => TelnetOption::Compress2,
            consts::option::GMCP => TelnetOption::GMCP,
            byte => TelnetOption::Unknown(byte),
        }
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "BINARY"),
            TelnetOption::Echo => write!(f, "ECHO"),
            TelnetOption::SuppressGoAhead => write!(f, "SGA"),
            TelnetOption::Status => write!(f, "STATUS"),
            TelnetOption::TimingMark => write!(f, "TIMING-MARK"),
            TelnetOption::TTYPE => write!(f, "TTYPE"),
            TelnetOption::EOR => write!(f, "EOR"),
            TelnetOption::NAWS => write!(f, "NAWS"),
            TelnetOption::Linemode => write!(f, "LINEMODE"),
            TelnetOption::NewEnvironment => write!(f, "NEW-ENVIRON"),
            TelnetOption::Charset => write!(f, "CHARSET"),
            TelnetOption::MSDP => write!(f, "MSDP"),
            TelnetOption::MSSP => write!(f, "MSSP"),
            TelnetOption::Compress2 => write!(f, "MCCP2"),
            TelnetOption::GMCP => write!(f, "GMCP"),
            TelnetOption::Unknown(byte) => write!(f, "UNKNOWN({byte})"),
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        TelnetOption::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

/// Negotiation command issued by the local side.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Negotiation {
    /// Offer to perform an option.
    Will,
    /// Refuse or stop performing an option.
    Wont,
    /// Ask the peer to perform an option.
    Do,
    /// Ask the peer to stop performing an option.
    Dont,
}

/// Whether we offer to perform an option ourselves.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LocalStance {
    /// Offer `WILL` on accept and agree to a peer `DO`.
    Will,
    /// Never perform the option; a peer `DO` is refused with `WONT`.
    Wont,
}

/// Whether we ask the peer to perform an option.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RemoteStance {
    /// Request `DO` on accept and agree to a peer `WILL`.
    Do,
    /// Never let the peer perform the option; a peer `WILL` is refused with `DONT`.
    Dont,
}

/// One row of a [`NegotiationTable`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Telopt {
    /// The option this row governs.
    pub option: TelnetOption,
    /// Our own stance.
    pub local: LocalStance,
    /// The stance we take towards the peer.
    pub remote: RemoteStance,
}

impl Telopt {
    /// Build a table row.
    pub const fn new(option: TelnetOption, local: LocalStance, remote: RemoteStance) -> Self {
        Self {
            option,
            local,
            remote,
        }
    }
}

/// Ordered, immutable list of the options a codec supports.
///
/// The table decides both what is offered when a connection is accepted and how unsolicited
/// peer requests are answered. Options absent from the table are refused. It is shared
/// between codecs and cannot be changed once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegotiationTable {
    entries: Arc<[Telopt]>,
}

impl NegotiationTable {
    /// Build a table from rows in offer order. An option listed twice keeps its first row.
    pub fn new(entries: impl IntoIterator<Item = Telopt>) -> Self {
        let mut seen = [false; 256];
        let entries: Vec<Telopt> = entries
            .into_iter()
            .filter(|entry| {
                let code = entry.option.to_u8() as usize;
                !std::mem::replace(&mut seen[code], true)
            })
            .collect();
        Self {
            entries: entries.into(),
        }
    }

    /// A table that supports nothing.
    pub fn empty() -> Self {
        Self::new([])
    }

    /// The reference server table: SGA and BINARY both ways, CHARSET offered only.
    pub fn server_default() -> Self {
        Self::new([
            Telopt::new(
                TelnetOption::SuppressGoAhead,
                LocalStance::Will,
                RemoteStance::Do,
            ),
            Telopt::new(
                TelnetOption::TransmitBinary,
                LocalStance::Will,
                RemoteStance::Do,
            ),
            Telopt::new(TelnetOption::Charset, LocalStance::Will, RemoteStance::Dont),
        ])
    }

    /// Rows in offer order.
    pub fn iter(&self) -> impl Iterator<Item = &Telopt> {
        self.entries.iter()
    }

    /// Row for an option, if the table has one.
    pub fn get(&self, option: TelnetOption) -> Option<&Telopt> {
        self.entries.iter().find(|entry| entry.option == option)
    }

    /// True if we agree to perform `option`.
    pub fn supports_local(&self, option: TelnetOption) -> bool {
        self.get(option)
            .is_some_and(|entry| entry.local == LocalStance::Will)
    }

    /// True if we agree to let the peer perform `option`.
    pub fn supports_remote(&self, option: TelnetOption) -> bool {
        self.get(option)
            .is_some_and(|entry| entry.remote == RemoteStance::Do)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NegotiationTable {
    fn default() -> Self {
        Self::server_default()
    }
}

/// Result of feeding one negotiation command through the Q-method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    /// Command to put on the wire, if any.
    pub reply: Option<TelnetFrame>,
    /// Protocol contradiction noticed by the state machine.
    pub violation: Option<&'static str>,
}

impl Outcome {
    fn none() -> Self {
        Self::default()
    }

    fn reply(frame: TelnetFrame) -> Self {
        Self {
            reply: Some(frame),
            violation: None,
        }
    }

    fn violation(reason: &'static str) -> Self {
        Self {
            reply: None,
            violation: Some(reason),
        }
    }
}

/// Per-connection option state, negotiated with the Q-method of
/// [RFC1143](https://tools.ietf.org/html/rfc1143) against a [`NegotiationTable`].
#[derive(Clone, Debug)]
pub struct TelnetOptions {
    table: NegotiationTable,
    state: [OptionState; 256],
}

impl TelnetOptions {
    /// Fresh state for every option, supported per `table`.
    pub fn new(table: NegotiationTable) -> Self {
        Self {
            table,
            state: [OptionState::default(); 256],
        }
    }

    /// The table this state negotiates against.
    pub fn table(&self) -> &NegotiationTable {
        &self.table
    }

    pub(crate) fn local_qstate(&self, option: TelnetOption) -> QState {
        self.state[option.to_u8() as usize].local
    }

    pub(crate) fn remote_qstate(&self, option: TelnetOption) -> QState {
        self.state[option.to_u8() as usize].remote
    }

    /// True while we are performing `option`.
    pub fn local_enabled(&self, option: TelnetOption) -> bool {
        self.local_qstate(option).is_enabled()
    }

    /// True while the peer is performing `option`.
    pub fn remote_enabled(&self, option: TelnetOption) -> bool {
        self.remote_qstate(option).is_enabled()
    }

    /// Start a locally initiated negotiation. Returns the frame to send, if any.
    pub(crate) fn request(&mut self, command: Negotiation, option: TelnetOption) -> Option<TelnetFrame> {
        let slot = &mut self.state[option.to_u8() as usize];
        match command {
            Negotiation::Will => request_enable(&mut slot.local, TelnetFrame::Will(option)),
            Negotiation::Wont => request_disable(&mut slot.local, TelnetFrame::Wont(option)),
            Negotiation::Do => request_enable(&mut slot.remote, TelnetFrame::Do(option)),
            Negotiation::Dont => request_disable(&mut slot.remote, TelnetFrame::Dont(option)),
        }
    }

    /// Peer sent `WILL option`.
    pub(crate) fn recv_will(&mut self, option: TelnetOption) -> Outcome {
        let supported = self.table.supports_remote(option);
        let slot = &mut self.state[option.to_u8() as usize].remote;
        recv_enable(
            slot,
            supported,
            TelnetFrame::Do(option),
            TelnetFrame::Dont(option),
            "DONT answered by WILL",
        )
    }

    /// Peer sent `WONT option`.
    pub(crate) fn recv_wont(&mut self, option: TelnetOption) -> Outcome {
        let slot = &mut self.state[option.to_u8() as usize].remote;
        recv_disable(slot, TelnetFrame::Do(option), TelnetFrame::Dont(option))
    }

    /// Peer sent `DO option`.
    pub(crate) fn recv_do(&mut self, option: TelnetOption) -> Outcome {
        let supported = self.table.supports_local(option);
        let slot = &mut self.state[option.to_u8() as usize].local;
        recv_enable(
            slot,
            supported,
            TelnetFrame::Will(option),
            TelnetFrame::Wont(option),
            "WONT answered by DO",
        )
    }

    /// Peer sent `DONT option`.
    pub(crate) fn recv_dont(&mut self, option: TelnetOption) -> Outcome {
        let slot = &mut self.state[option.to_u8() as usize].local;
        recv_disable(slot, TelnetFrame::Will(option), TelnetFrame::Wont(option))
    }
}

impl Default for TelnetOptions {
    fn default() -> Self {
        Self::new(NegotiationTable::default())
    }
}

fn request_enable(state: &mut QState, announce: TelnetFrame) -> Option<TelnetFrame> {
    match *state {
        QState::No => {
            *state = QState::WantYes;
            Some(announce)
        }
        QState::WantNo => {
            *state = QState::WantNoOpposite;
            None
        }
        QState::WantYesOpposite => {
            *state = QState::WantYes;
            None
        }
        QState::Yes | QState::WantYes | QState::WantNoOpposite => None,
    }
}

fn request_disable(state: &mut QState, announce: TelnetFrame) -> Option<TelnetFrame> {
    match *state {
        QState::Yes => {
            *state = QState::WantNo;
            Some(announce)
        }
        QState::WantYes => {
            *state = QState::WantYesOpposite;
            None
        }
        QState::WantNoOpposite => {
            *state = QState::WantNo;
            None
        }
        QState::No | QState::WantNo | QState::WantYesOpposite => None,
    }
}

/// Peer announced it will perform (WILL) or asked us to perform (DO).
fn recv_enable(
    state: &mut QState,
    supported: bool,
    accept: TelnetFrame,
    refuse: TelnetFrame,
    contradiction: &'static str,
) -> Outcome {
    match *state {
        QState::No if supported => {
            *state = QState::Yes;
            Outcome::reply(accept)
        }
        QState::No => Outcome::reply(refuse),
        QState::Yes => Outcome::none(),
        QState::WantNo => {
            *state = QState::No;
            Outcome::violation(contradiction)
        }
        QState::WantNoOpposite => {
            *state = QState::Yes;
            Outcome::violation(contradiction)
        }
        QState::WantYes => {
            *state = QState::Yes;
            Outcome::none()
        }
        QState::WantYesOpposite => {
            *state = QState::WantNo;
            Outcome::reply(refuse)
        }
    }
}

/// Peer announced it will not perform (WONT) or asked us to stop (DONT).
fn recv_disable(state: &mut QState, accept: TelnetFrame, refuse: TelnetFrame) -> Outcome {
    match *state {
        QState::No => Outcome::none(),
        QState::Yes => {
            *state = QState::No;
            Outcome::reply(refuse)
        }
        QState::WantNo | QState::WantYes | QState::WantYesOpposite => {
            *state = QState::No;
            Outcome::none()
        }
        QState::WantNoOpposite => {
            *state = QState::WantYes;
            Outcome::reply(accept)
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct OptionState {
    local: QState,
    remote: QState,
}

/// RFC1143 option state. The `Opposite` variants carry a queued request for the other outcome.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub(crate) enum QState {
    #[default]
    No,
    WantNo,
    WantNoOpposite,
    Yes,
    WantYes,
    WantYesOpposite,
}

impl QState {
    /// The option counts as enabled until a disable request is confirmed.
    pub(crate) fn is_enabled(self) -> bool {
        matches!(self, QState::Yes | QState::WantNo | QState::WantNoOpposite)
    }
}

impl std::fmt::Display for QState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QState::No => write!(f, "No"),
            QState::WantNo => write!(f, "WantNo"),
            QState::WantNoOpposite => write!(f, "WantNoOpposite"),
            QState::Yes => write!(f, "Yes"),
            QState::WantYes => write!(f, "WantYes"),
            QState::WantYesOpposite => write!(f, "WantYesOpposite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> TelnetOptions {
        TelnetOptions::new(NegotiationTable::server_default())
    }

    #[test]
    fn test_option_code_roundtrip() {
        for code in 0..=255u8 {
            assert_eq!(TelnetOption::from_u8(code).to_u8(), code);
        }
        assert_eq!(TelnetOption::from_u8(42), TelnetOption::Charset);
    }

    #[test]
    fn test_table_keeps_first_duplicate() {
        let table = NegotiationTable::new([
            Telopt::new(TelnetOption::Echo, LocalStance::Will, RemoteStance::Dont),
            Telopt::new(TelnetOption::Echo, LocalStance::Wont, RemoteStance::Do),
        ]);
        assert_eq!(table.len(), 1);
        assert!(table.supports_local(TelnetOption::Echo));
        assert!(!table.supports_remote(TelnetOption::Echo));
    }

    #[test]
    fn test_server_default_table() {
        let table = NegotiationTable::server_default();
        let order: Vec<TelnetOption> = table.iter().map(|entry| entry.option).collect();
        assert_eq!(
            order,
            vec![
                TelnetOption::SuppressGoAhead,
                TelnetOption::TransmitBinary,
                TelnetOption::Charset
            ]
        );
        assert!(table.supports_local(TelnetOption::Charset));
        assert!(!table.supports_remote(TelnetOption::Charset));
        assert!(!table.supports_local(TelnetOption::Echo));
    }

    #[test]
    fn test_local_enable_handshake() {
        let mut opts = options();
        let frame = opts.request(Negotiation::Will, TelnetOption::SuppressGoAhead);
        assert_eq!(frame, Some(TelnetFrame::Will(TelnetOption::SuppressGoAhead)));
        assert_eq!(opts.local_qstate(TelnetOption::SuppressGoAhead), QState::WantYes);
        assert!(!opts.local_enabled(TelnetOption::SuppressGoAhead));

        let outcome = opts.recv_do(TelnetOption::SuppressGoAhead);
        assert_eq!(outcome, Outcome::none());
        assert!(opts.local_enabled(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn test_request_is_idempotent() {
        let mut opts = options();
        assert!(opts.request(Negotiation::Do, TelnetOption::TransmitBinary).is_some());
        assert!(opts.request(Negotiation::Do, TelnetOption::TransmitBinary).is_none());
    }

    #[test]
    fn test_unsolicited_do_for_unsupported_option_is_refused() {
        let mut opts = options();
        let outcome = opts.recv_do(TelnetOption::Echo);
        assert_eq!(outcome.reply, Some(TelnetFrame::Wont(TelnetOption::Echo)));
        assert!(!opts.local_enabled(TelnetOption::Echo));
    }

    #[test]
    fn test_unsolicited_will_for_offer_only_option_is_refused() {
        let mut opts = options();
        let outcome = opts.recv_will(TelnetOption::Charset);
        assert_eq!(outcome.reply, Some(TelnetFrame::Dont(TelnetOption::Charset)));
        assert!(!opts.remote_enabled(TelnetOption::Charset));
    }

    #[test]
    fn test_unsolicited_will_for_supported_option_is_accepted() {
        let mut opts = options();
        let outcome = opts.recv_will(TelnetOption::TransmitBinary);
        assert_eq!(outcome.reply, Some(TelnetFrame::Do(TelnetOption::TransmitBinary)));
        assert!(opts.remote_enabled(TelnetOption::TransmitBinary));
        // A repeated WILL must not be answered again.
        assert_eq!(opts.recv_will(TelnetOption::TransmitBinary), Outcome::none());
    }

    #[test]
    fn test_refusal_of_our_offer() {
        let mut opts = options();
        opts.request(Negotiation::Will, TelnetOption::Charset);
        let outcome = opts.recv_dont(TelnetOption::Charset);
        assert_eq!(outcome, Outcome::none());
        assert_eq!(opts.local_qstate(TelnetOption::Charset), QState::No);
    }

    #[test]
    fn test_peer_disables_enabled_option() {
        let mut opts = options();
        opts.recv_will(TelnetOption::SuppressGoAhead);
        let outcome = opts.recv_wont(TelnetOption::SuppressGoAhead);
        assert_eq!(outcome.reply, Some(TelnetFrame::Dont(TelnetOption::SuppressGoAhead)));
        assert!(!opts.remote_enabled(TelnetOption::SuppressGoAhead));
    }

    #[test]
    fn test_contradiction_is_reported() {
        let mut opts = options();
        opts.recv_will(TelnetOption::TransmitBinary);
        opts.request(Negotiation::Dont, TelnetOption::TransmitBinary);
        assert_eq!(opts.remote_qstate(TelnetOption::TransmitBinary), QState::WantNo);
        let outcome = opts.recv_will(TelnetOption::TransmitBinary);
        assert_eq!(outcome.violation, Some("DONT answered by WILL"));
        assert_eq!(opts.remote_qstate(TelnetOption::TransmitBinary), QState::No);
    }

    #[test]
    fn test_queued_opposite_request() {
        let mut opts = options();
        opts.request(Negotiation::Will, TelnetOption::SuppressGoAhead);
        // Change our mind before the peer answers: nothing new goes on the wire.
        assert!(opts.request(Negotiation::Wont, TelnetOption::SuppressGoAhead).is_none());
        assert_eq!(
            opts.local_qstate(TelnetOption::SuppressGoAhead),
            QState::WantYesOpposite
        );
        // Peer agrees; the queued disable is sent immediately.
        let outcome = opts.recv_do(TelnetOption::SuppressGoAhead);
        assert_eq!(outcome.reply, Some(TelnetFrame::Wont(TelnetOption::SuppressGoAhead)));
        assert_eq!(opts.local_qstate(TelnetOption::SuppressGoAhead), QState::WantNo);
        opts.recv_dont(TelnetOption::SuppressGoAhead);
        assert_eq!(opts.local_qstate(TelnetOption::SuppressGoAhead), QState::No);
    }
}
