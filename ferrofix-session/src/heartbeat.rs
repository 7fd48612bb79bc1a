/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Heartbeat and deadline tracking.
//!
//! The clock keeps the last-sent/last-received instants plus the one-shot
//! logon and logout deadlines, and turns them into [`Event`]s when the
//! session sweeps it. All events are edge-triggered: a fired deadline stays
//! quiet until it is re-armed by traffic or by the state machine.

use crate::events::Event;
use std::time::{Duration, Instant};

/// Peer timeout factor: a counterparty is late after 1.2 × HeartBtInt
/// without inbound traffic.
const PEER_TIMEOUT_FACTOR: f64 = 1.2;

/// Tracks heartbeat timing and one-shot deadlines for a session.
#[derive(Debug)]
pub struct HeartbeatClock {
    interval: Duration,
    last_sent: Instant,
    last_received: Instant,
    peer_fired: bool,
    pending_test_req: Option<String>,
    logon_deadline: Option<Instant>,
    logout_deadline: Option<Instant>,
}

impl HeartbeatClock {
    /// Creates a clock with the given heartbeat interval.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            interval,
            last_sent: now,
            last_received: now,
            peer_fired: false,
            pending_test_req: None,
            logon_deadline: None,
            logout_deadline: None,
        }
    }

    /// Returns the heartbeat interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Adopts a new interval, as negotiated by HeartBtInt on Logon.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Returns the peer timeout window (1.2 × interval).
    #[must_use]
    pub fn peer_window(&self) -> Duration {
        self.interval.mul_f64(PEER_TIMEOUT_FACTOR)
    }

    /// Notches an outbound message.
    pub fn sent_notch(&mut self) {
        self.last_sent = Instant::now();
    }

    /// Notches an inbound message, re-arming the peer deadline.
    pub fn received_notch(&mut self) {
        self.last_received = Instant::now();
        self.peer_fired = false;
    }

    /// Records an outbound TestRequest challenge and restarts the peer
    /// window for the answer.
    pub fn test_request_sent(&mut self, test_req_id: String) {
        self.pending_test_req = Some(test_req_id);
        self.last_sent = Instant::now();
        self.last_received = Instant::now();
        self.peer_fired = false;
    }

    /// Returns the outstanding TestRequest challenge, if any.
    #[must_use]
    pub fn pending_test_req(&self) -> Option<&str> {
        self.pending_test_req.as_deref()
    }

    /// Clears the outstanding challenge (answered or connection dropped).
    pub fn clear_test_req(&mut self) {
        self.pending_test_req = None;
    }

    /// Arms the one-shot logon deadline.
    pub fn arm_logon_deadline(&mut self, timeout: Duration) {
        self.logon_deadline = Some(Instant::now() + timeout);
    }

    /// Arms the one-shot logout deadline.
    pub fn arm_logout_deadline(&mut self, timeout: Duration) {
        self.logout_deadline = Some(Instant::now() + timeout);
    }

    /// Disarms both one-shot deadlines.
    pub fn disarm_deadlines(&mut self) {
        self.logon_deadline = None;
        self.logout_deadline = None;
    }

    /// Restarts the clock on connect.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_sent = now;
        self.last_received = now;
        self.peer_fired = false;
        self.pending_test_req = None;
        self.logon_deadline = None;
        self.logout_deadline = None;
    }

    /// Sweeps all deadlines against `now`, returning due events.
    ///
    /// One-shot deadlines disarm when they fire; the peer deadline stays
    /// quiet until re-armed by inbound traffic or a TestRequest.
    pub fn sweep(&mut self, now: Instant) -> Vec<Event> {
        let mut events = Vec::new();

        if let Some(deadline) = self.logon_deadline
            && now >= deadline
        {
            self.logon_deadline = None;
            events.push(Event::LogonTimeout);
        }

        if let Some(deadline) = self.logout_deadline
            && now >= deadline
        {
            self.logout_deadline = None;
            events.push(Event::LogoutTimeout);
        }

        if !self.peer_fired && now.duration_since(self.last_received) >= self.peer_window() {
            self.peer_fired = true;
            events.push(Event::PeerTimeout);
        }

        if now.duration_since(self.last_sent) >= self.interval {
            events.push(Event::NeedHeartbeat);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn quiet_clock_emits_nothing() {
        let mut clock = HeartbeatClock::new(Duration::from_secs(30));
        assert!(clock.sweep(Instant::now()).is_empty());
    }

    #[test]
    fn heartbeat_due_after_send_silence() {
        let mut clock = HeartbeatClock::new(Duration::from_millis(10));
        sleep(Duration::from_millis(15));
        let events = clock.sweep(Instant::now());
        assert!(events.contains(&Event::NeedHeartbeat));

        clock.sent_notch();
        // Peer may still be due, but the send side is satisfied.
        assert!(!clock.sweep(Instant::now()).contains(&Event::NeedHeartbeat));
    }

    #[test]
    fn peer_timeout_fires_once_until_rearmed() {
        let mut clock = HeartbeatClock::new(Duration::from_millis(10));
        sleep(Duration::from_millis(15));
        assert!(clock.sweep(Instant::now()).contains(&Event::PeerTimeout));
        // Edge-triggered: no repeat while silent.
        assert!(!clock.sweep(Instant::now()).contains(&Event::PeerTimeout));

        clock.received_notch();
        sleep(Duration::from_millis(15));
        assert!(clock.sweep(Instant::now()).contains(&Event::PeerTimeout));
    }

    #[test]
    fn test_request_restarts_peer_window() {
        let mut clock = HeartbeatClock::new(Duration::from_millis(10));
        sleep(Duration::from_millis(15));
        assert!(clock.sweep(Instant::now()).contains(&Event::PeerTimeout));

        clock.test_request_sent("PING1".to_string());
        assert_eq!(clock.pending_test_req(), Some("PING1"));
        // Window restarted: quiet immediately after.
        assert!(!clock.sweep(Instant::now()).contains(&Event::PeerTimeout));

        sleep(Duration::from_millis(15));
        // Second expiry with the challenge still outstanding.
        assert!(clock.sweep(Instant::now()).contains(&Event::PeerTimeout));
        assert_eq!(clock.pending_test_req(), Some("PING1"));
    }

    #[test]
    fn logon_deadline_is_one_shot() {
        let mut clock = HeartbeatClock::new(Duration::from_secs(30));
        clock.arm_logon_deadline(Duration::from_millis(5));
        sleep(Duration::from_millis(10));
        assert!(clock.sweep(Instant::now()).contains(&Event::LogonTimeout));
        assert!(!clock.sweep(Instant::now()).contains(&Event::LogonTimeout));
    }

    #[test]
    fn disarm_silences_deadlines() {
        let mut clock = HeartbeatClock::new(Duration::from_secs(30));
        clock.arm_logout_deadline(Duration::from_millis(5));
        clock.disarm_deadlines();
        sleep(Duration::from_millis(10));
        assert!(!clock.sweep(Instant::now()).contains(&Event::LogoutTimeout));
    }

    #[test]
    fn peer_window_is_scaled() {
        let clock = HeartbeatClock::new(Duration::from_secs(30));
        assert_eq!(clock.peer_window(), Duration::from_secs(36));
    }
}
