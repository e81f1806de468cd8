//! Per-connection gamepad session.
//!
//! [`Session`] owns everything one host connection needs: the connection
//! handle, the HID protocol mode, a single-slot report mailbox and the demo
//! sequencer. BLE callbacks are translated into [`GamepadEvent`]s and fed to
//! [`Session::handle`], which returns the [`Action`] the BLE glue must
//! perform. The session itself never touches the radio, so the whole state
//! machine runs on the host in tests.

use crate::demo::DemoSequencer;
use crate::hid::{EncodedReport, GamepadReport, ReportLayout};

/// HID Protocol Mode characteristic values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProtocolMode {
    Boot = 0,
    #[default]
    Report = 1,
}

impl ProtocolMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProtocolMode::Boot),
            1 => Some(ProtocolMode::Report),
            _ => None,
        }
    }
}

/// HID Control Point commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlPoint {
    Suspend,
    ExitSuspend,
}

impl ControlPoint {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ControlPoint::Suspend),
            1 => Some(ControlPoint::ExitSuspend),
            _ => None,
        }
    }
}

/// Notifications bit of a Client Characteristic Configuration value.
pub const CCCD_NOTIFY: u16 = 0x0001;

/// Pairing requests raised by the security manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingRequest {
    JustWorks,
    NumericComparison { passkey: u32 },
    PasskeyDisplay { passkey: u32 },
}

/// Everything the BLE side can tell the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GamepadEvent {
    Disconnected,
    Pairing(PairingRequest),
    /// Host wrote the Input Report CCCD.
    InputReportEnable { handle: u16, enabled: bool },
    /// A bonded host's stored Input Report CCCD was restored on connect.
    SubscriptionRestored { handle: u16, cccd: u16 },
    ProtocolMode(ProtocolMode),
    ControlPoint(ControlPoint),
    /// The stack can take a notification now.
    CanSendNow,
}

/// What the BLE glue must do in response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    None,
    ConfirmPairing,
    StartDemo,
    StopDemo,
    /// Ask the stack for a send opportunity ([`GamepadEvent::CanSendNow`]).
    RequestSend,
    /// Notify these bytes on the Input Report characteristic.
    Send(EncodedReport),
}

/// Result of one demo timer tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DemoTick {
    /// Script index of the step just submitted.
    pub step: usize,
    pub label: &'static str,
    pub action: Action,
}

/// Auto-confirm policy for pairing requests.
///
/// The gamepad has no display or keyboard, so Just Works and numeric
/// comparison are accepted unconditionally. A passkey display request
/// needs no answer.
pub fn pairing_action(request: PairingRequest) -> Action {
    match request {
        PairingRequest::JustWorks | PairingRequest::NumericComparison { .. } => {
            Action::ConfirmPairing
        }
        PairingRequest::PasskeyDisplay { .. } => Action::None,
    }
}

/// State of one gamepad connection.
#[derive(Debug)]
pub struct Session {
    layout: ReportLayout,
    conn_handle: Option<u16>,
    protocol_mode: ProtocolMode,
    pending: Option<GamepadReport>,
    demo: Option<DemoSequencer>,
    suspended: bool,
}

impl Session {
    pub const fn new(layout: ReportLayout) -> Self {
        Self {
            layout,
            conn_handle: None,
            protocol_mode: ProtocolMode::Report,
            pending: None,
            demo: None,
            suspended: false,
        }
    }

    pub fn layout(&self) -> ReportLayout {
        self.layout
    }

    pub fn conn_handle(&self) -> Option<u16> {
        self.conn_handle
    }

    pub fn is_connected(&self) -> bool {
        self.conn_handle.is_some()
    }

    pub fn protocol_mode(&self) -> ProtocolMode {
        self.protocol_mode
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn demo_running(&self) -> bool {
        self.demo.is_some()
    }

    pub fn pending(&self) -> Option<&GamepadReport> {
        self.pending.as_ref()
    }

    /// Apply one event.
    pub fn handle(&mut self, event: GamepadEvent) -> Action {
        match event {
            GamepadEvent::Disconnected => {
                let was_running = self.demo.take().is_some();
                self.conn_handle = None;
                self.pending = None;
                self.suspended = false;
                self.protocol_mode = ProtocolMode::Report;
                if was_running {
                    Action::StopDemo
                } else {
                    Action::None
                }
            }
            GamepadEvent::Pairing(request) => pairing_action(request),
            GamepadEvent::InputReportEnable {
                handle,
                enabled: true,
            } => self.start_demo(handle),
            GamepadEvent::SubscriptionRestored { handle, cccd } => {
                if cccd & CCCD_NOTIFY == 0 || self.demo.is_some() {
                    return Action::None;
                }
                self.start_demo(handle)
            }
            GamepadEvent::InputReportEnable { enabled: false, .. } => {
                self.demo = None;
                self.pending = None;
                Action::StopDemo
            }
            GamepadEvent::ProtocolMode(mode) => {
                self.protocol_mode = mode;
                Action::None
            }
            GamepadEvent::ControlPoint(ControlPoint::Suspend) => {
                self.suspended = true;
                Action::None
            }
            GamepadEvent::ControlPoint(ControlPoint::ExitSuspend) => {
                self.suspended = false;
                if self.pending.is_some() && self.conn_handle.is_some() {
                    Action::RequestSend
                } else {
                    Action::None
                }
            }
            GamepadEvent::CanSendNow => {
                // A suspended host keeps its mailbox for Exit Suspend.
                if self.suspended {
                    return Action::None;
                }
                // Read at most once, even when nothing is sent.
                let Some(report) = self.pending.take() else {
                    return Action::None;
                };
                if self.conn_handle.is_none() || self.protocol_mode == ProtocolMode::Boot {
                    return Action::None;
                }
                Action::Send(report.encode(self.layout))
            }
        }
    }

    fn start_demo(&mut self, handle: u16) -> Action {
        self.conn_handle = Some(handle);
        match self.demo.as_mut() {
            Some(seq) => seq.reset(),
            None => self.demo = Some(DemoSequencer::new(self.layout)),
        }
        self.pending = Some(GamepadReport::neutral());
        Action::StartDemo
    }

    /// Put `report` in the mailbox, replacing any unsent report.
    pub fn submit(&mut self, report: GamepadReport) -> Action {
        self.pending = Some(report);
        if self.conn_handle.is_some() && !self.suspended {
            Action::RequestSend
        } else {
            Action::None
        }
    }

    /// Advance the demo by one step.
    ///
    /// Returns `None` when no demo is running, which ends the timer loop.
    pub fn tick(&mut self) -> Option<DemoTick> {
        let seq = self.demo.as_mut()?;
        let index = seq.position();
        let step = seq.next_step();
        Some(DemoTick {
            step: index,
            label: step.label,
            action: self.submit(step.report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::{button, Dpad};

    fn connected(layout: ReportLayout) -> Session {
        let mut s = Session::new(layout);
        assert_eq!(
            s.handle(GamepadEvent::InputReportEnable {
                handle: 7,
                enabled: true
            }),
            Action::StartDemo
        );
        s
    }

    fn sent_bytes(action: Action) -> heapless::Vec<u8, 13> {
        match action {
            Action::Send(report) => heapless::Vec::from_slice(report.as_bytes()).unwrap(),
            other => panic!("expected Send, got {:?}", other),
        }
    }

    #[test]
    fn new_session_is_idle() {
        let s = Session::new(ReportLayout::Compact);
        assert!(!s.is_connected());
        assert!(!s.demo_running());
        assert_eq!(s.protocol_mode(), ProtocolMode::Report);
        assert!(s.pending().is_none());
    }

    #[test]
    fn enable_starts_demo_with_neutral_pending() {
        let mut s = connected(ReportLayout::Compact);
        assert_eq!(s.conn_handle(), Some(7));
        assert!(s.demo_running());
        assert!(s.pending().unwrap().is_neutral());

        let bytes = sent_bytes(s.handle(GamepadEvent::CanSendNow));
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 0, 0, 0, 0, 8]);
    }

    #[test]
    fn mailbox_is_overwritten_not_queued() {
        let mut s = connected(ReportLayout::Compact);
        let a = GamepadReport {
            buttons: button::A,
            ..GamepadReport::default()
        };
        let b = GamepadReport {
            buttons: button::B,
            ..GamepadReport::default()
        };
        assert_eq!(s.submit(a), Action::RequestSend);
        assert_eq!(s.submit(b), Action::RequestSend);

        let bytes = sent_bytes(s.handle(GamepadEvent::CanSendNow));
        assert_eq!(bytes[0], 0x02);
        assert_eq!(s.handle(GamepadEvent::CanSendNow), Action::None);
    }

    #[test]
    fn submit_without_connection_only_stores() {
        let mut s = Session::new(ReportLayout::Compact);
        assert_eq!(s.submit(GamepadReport::default()), Action::None);
        assert!(s.pending().is_some());
        // Not connected: the mailbox is consumed but nothing is sent.
        assert_eq!(s.handle(GamepadEvent::CanSendNow), Action::None);
        assert!(s.pending().is_none());
    }

    #[test]
    fn tick_walks_the_script() {
        let mut s = connected(ReportLayout::Extended);
        let first = s.tick().unwrap();
        assert_eq!(first.step, 0);
        assert_eq!(first.label, "A Button (Button 1)");
        assert_eq!(first.action, Action::RequestSend);
        let bytes = sent_bytes(s.handle(GamepadEvent::CanSendNow));
        assert_eq!(bytes.len(), 13);
        assert_eq!(bytes[0], 0x01);

        let second = s.tick().unwrap();
        assert_eq!(second.step, 1);
        assert_eq!(second.label, "B Button (Button 2)");
    }

    #[test]
    fn disconnect_stops_demo_and_clears_state() {
        let mut s = connected(ReportLayout::Compact);
        s.handle(GamepadEvent::ProtocolMode(ProtocolMode::Boot));
        s.handle(GamepadEvent::ControlPoint(ControlPoint::Suspend));
        s.tick();

        assert_eq!(s.handle(GamepadEvent::Disconnected), Action::StopDemo);
        assert!(!s.is_connected());
        assert!(!s.demo_running());
        assert!(!s.is_suspended());
        assert!(s.pending().is_none());
        assert_eq!(s.protocol_mode(), ProtocolMode::Report);
        assert!(s.tick().is_none());

        // Second disconnect has nothing to stop.
        assert_eq!(s.handle(GamepadEvent::Disconnected), Action::None);
    }

    #[test]
    fn unsubscribe_stops_demo() {
        let mut s = connected(ReportLayout::Compact);
        assert_eq!(
            s.handle(GamepadEvent::InputReportEnable {
                handle: 7,
                enabled: false
            }),
            Action::StopDemo
        );
        assert!(s.tick().is_none());
    }

    #[test]
    fn resubscribe_restarts_from_first_step() {
        let mut s = connected(ReportLayout::Compact);
        for _ in 0..5 {
            s.tick();
        }
        s.handle(GamepadEvent::InputReportEnable {
            handle: 7,
            enabled: true,
        });
        assert_eq!(s.tick().unwrap().label, "A Button (Button 1)");
    }

    #[test]
    fn boot_mode_drains_without_sending() {
        let mut s = connected(ReportLayout::Compact);
        s.handle(GamepadEvent::ProtocolMode(ProtocolMode::Boot));
        assert_eq!(s.handle(GamepadEvent::CanSendNow), Action::None);
        assert!(s.pending().is_none());

        s.handle(GamepadEvent::ProtocolMode(ProtocolMode::Report));
        s.submit(GamepadReport {
            dpad: Dpad::Down,
            ..GamepadReport::default()
        });
        let bytes = sent_bytes(s.handle(GamepadEvent::CanSendNow));
        assert_eq!(bytes[8], 4);
    }

    #[test]
    fn suspend_holds_reports_until_exit() {
        let mut s = connected(ReportLayout::Compact);
        s.handle(GamepadEvent::ControlPoint(ControlPoint::Suspend));
        let tick = s.tick().unwrap();
        assert_eq!(tick.action, Action::None);
        assert!(s.pending().is_some());

        s.handle(GamepadEvent::ControlPoint(ControlPoint::ExitSuspend));
        assert_eq!(s.tick().unwrap().action, Action::RequestSend);
    }

    #[test]
    fn suspended_host_gets_nothing_until_exit() {
        let mut s = connected(ReportLayout::Compact);
        s.handle(GamepadEvent::ControlPoint(ControlPoint::Suspend));
        s.handle(GamepadEvent::InputReportEnable {
            handle: 7,
            enabled: true,
        });

        // The neutral report queued on subscribe stays put.
        assert_eq!(s.handle(GamepadEvent::CanSendNow), Action::None);
        assert!(s.pending().unwrap().is_neutral());

        assert_eq!(
            s.handle(GamepadEvent::ControlPoint(ControlPoint::ExitSuspend)),
            Action::RequestSend
        );
        let bytes = sent_bytes(s.handle(GamepadEvent::CanSendNow));
        assert_eq!(&bytes[..], &[0, 0, 0, 0, 0, 0, 0, 0, 8]);
    }

    #[test]
    fn exit_suspend_with_empty_mailbox_requests_nothing() {
        let mut s = connected(ReportLayout::Compact);
        s.handle(GamepadEvent::CanSendNow);
        s.handle(GamepadEvent::ControlPoint(ControlPoint::Suspend));
        assert_eq!(
            s.handle(GamepadEvent::ControlPoint(ControlPoint::ExitSuspend)),
            Action::None
        );
    }

    #[test]
    fn restored_subscription_starts_demo() {
        let mut s = Session::new(ReportLayout::Compact);
        assert_eq!(
            s.handle(GamepadEvent::SubscriptionRestored {
                handle: 3,
                cccd: CCCD_NOTIFY,
            }),
            Action::StartDemo
        );
        assert_eq!(s.conn_handle(), Some(3));
        assert!(s.demo_running());

        let bytes = sent_bytes(s.handle(GamepadEvent::CanSendNow));
        assert_eq!(bytes[8], 8);
        assert_eq!(s.tick().unwrap().label, "A Button (Button 1)");
    }

    #[test]
    fn restored_subscription_without_notify_bit_is_ignored() {
        let mut s = Session::new(ReportLayout::Compact);
        // Indications only.
        assert_eq!(
            s.handle(GamepadEvent::SubscriptionRestored { handle: 3, cccd: 0x0002 }),
            Action::None
        );
        assert!(!s.demo_running());
        assert!(s.tick().is_none());
    }

    #[test]
    fn restored_subscription_does_not_restart_running_demo() {
        let mut s = connected(ReportLayout::Compact);
        s.tick();
        s.tick();
        assert_eq!(
            s.handle(GamepadEvent::SubscriptionRestored {
                handle: 7,
                cccd: CCCD_NOTIFY,
            }),
            Action::None
        );
        assert_eq!(s.tick().unwrap().step, 2);
    }

    #[test]
    fn pairing_is_auto_confirmed() {
        let mut s = Session::new(ReportLayout::Compact);
        assert_eq!(
            s.handle(GamepadEvent::Pairing(PairingRequest::JustWorks)),
            Action::ConfirmPairing
        );
        assert_eq!(
            s.handle(GamepadEvent::Pairing(PairingRequest::NumericComparison {
                passkey: 123456
            })),
            Action::ConfirmPairing
        );
        assert_eq!(
            pairing_action(PairingRequest::PasskeyDisplay { passkey: 1 }),
            Action::None
        );
    }

    #[test]
    fn characteristic_value_decoding() {
        assert_eq!(ProtocolMode::from_u8(0), Some(ProtocolMode::Boot));
        assert_eq!(ProtocolMode::from_u8(1), Some(ProtocolMode::Report));
        assert_eq!(ProtocolMode::from_u8(2), None);
        assert_eq!(ControlPoint::from_u8(0), Some(ControlPoint::Suspend));
        assert_eq!(ControlPoint::from_u8(1), Some(ControlPoint::ExitSuspend));
        assert_eq!(ControlPoint::from_u8(9), None);
    }
}
