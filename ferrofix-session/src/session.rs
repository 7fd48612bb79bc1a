/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! The session core.
//!
//! A [`Session`] is a single-task actor owning all per-session state:
//! identity, configuration, message store, heartbeat clock, outbound queue,
//! and the state machine. Producers (transport reader, timers, user code)
//! reach it only through its channels; every state decision happens
//! synchronously between awaits inside the actor.
//!
//! Inbound flow: session-time check, raw log, structural decode, then the
//! current state's message handler. Outbound flow: header stamp, callback,
//! sequence allocation, encode, persist, then the transport write. The
//! persist-before-send order is load-bearing: it is what makes resend
//! replay possible after a crash.

use crate::application::Application;
use crate::config::SessionConfig;
use crate::events::Event;
use crate::heartbeat::HeartbeatClock;
use crate::log::SessionLog;
use crate::state::{ResendInfo, SessionState};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ferrofix_codec::decoder::MessageDecoder;
use ferrofix_codec::encoder::encode_message;
use ferrofix_core::error::{
    ConfigError, FixError, MessageRejectError, RejectReason, SessionError,
};
use ferrofix_core::message::{Message, MsgType};
use ferrofix_core::tags;
use ferrofix_core::types::{SessionId, Timestamp};
use ferrofix_dictionary::{Dictionary, Version};
use ferrofix_store::MessageStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// SendingTime tolerance for inbound messages.
const SENDING_TIME_TOLERANCE: Duration = Duration::from_secs(120);

/// Clock sweep granularity for the actor loop.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// A framed inbound unit handed over by the transport reader.
#[derive(Debug, Clone)]
pub struct FixIn {
    /// The complete framed message bytes.
    pub bytes: Bytes,
    /// Instant the frame was read off the socket.
    pub receive_time: Timestamp,
}

/// Admin commands accepted by the session actor.
#[derive(Debug)]
enum Command {
    Send(Message),
    Connect(mpsc::Sender<Bytes>),
    Disconnect,
    Stop,
}

/// Cheap handle for feeding a running session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<Command>,
    inbound: mpsc::Sender<FixIn>,
    in_session: watch::Receiver<bool>,
}

impl SessionHandle {
    /// Returns the session identity.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns a watch that flips to true whenever the session enters its
    /// configured time window; reconnect loops wait on it.
    #[must_use]
    pub fn in_session_time(&self) -> watch::Receiver<bool> {
        self.in_session.clone()
    }

    /// Waits until the session is inside its time window.
    pub async fn wait_in_session_time(&self) {
        let mut watch = self.in_session.clone();
        // An error means the actor is gone; waiting further is pointless.
        let _ = watch.wait_for(|in_session| *in_session).await;
    }

    /// Submits an outbound application message.
    ///
    /// # Errors
    /// Returns `SessionError::Terminated` if the actor has stopped.
    pub async fn send(&self, message: Message) -> Result<(), SessionError> {
        self.commands
            .send(Command::Send(message))
            .await
            .map_err(|_| SessionError::Terminated)
    }

    /// Attaches a transport: outbound wire bytes flow into `sink`.
    ///
    /// # Errors
    /// Returns `SessionError::Terminated` if the actor has stopped.
    pub async fn connect(&self, sink: mpsc::Sender<Bytes>) -> Result<(), SessionError> {
        self.commands
            .send(Command::Connect(sink))
            .await
            .map_err(|_| SessionError::Terminated)
    }

    /// Detaches the transport.
    ///
    /// # Errors
    /// Returns `SessionError::Terminated` if the actor has stopped.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::Disconnect)
            .await
            .map_err(|_| SessionError::Terminated)
    }

    /// Requests a graceful stop (logout first when logged on).
    ///
    /// # Errors
    /// Returns `SessionError::Terminated` if the actor has stopped.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::Stop)
            .await
            .map_err(|_| SessionError::Terminated)
    }

    /// Feeds one framed inbound message.
    ///
    /// # Errors
    /// Returns `SessionError::Terminated` if the actor has stopped.
    pub async fn incoming(&self, fix_in: FixIn) -> Result<(), SessionError> {
        self.inbound
            .send(fix_in)
            .await
            .map_err(|_| SessionError::Terminated)
    }
}

/// Verification failures, in escalation order.
#[derive(Debug)]
enum VerifyError {
    /// Answer with a Reject / BusinessMessageReject and move on.
    Reject(MessageRejectError),
    /// Counterparty is ahead; fill the gap.
    TooHigh { received: u64, expected: u64 },
    /// Counterparty is behind and it is not a replay; logout.
    TooLow { received: u64, expected: u64 },
    /// Wrong protocol version on the wire; logout.
    BeginStringMismatch(String),
    /// Replayed duplicate; drop silently.
    DuplicateIgnored,
}

/// Snapshot of the outgoing state taken before a transition, for
/// disconnect bookkeeping.
#[derive(Debug, Clone)]
struct PrevState {
    connected: bool,
    logged_on: bool,
    logout_pending: bool,
    logon_pending: bool,
    label: String,
}

impl PrevState {
    fn of(state: &SessionState) -> Self {
        Self {
            connected: state.is_connected(),
            logged_on: state.is_logged_on(),
            logout_pending: matches!(state, SessionState::LogoutPending),
            logon_pending: matches!(state, SessionState::LogonPending),
            label: state.to_string(),
        }
    }
}

/// A FIX session actor.
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    version: Version,
    store: Arc<dyn MessageStore>,
    app: Arc<dyn Application>,
    log: Arc<dyn SessionLog>,
    transport_dict: Arc<Dictionary>,
    app_dict: Arc<Dictionary>,
    decoder: MessageDecoder,
    clock: HeartbeatClock,
    state: SessionState,
    pending_stop: bool,
    stopped: bool,
    /// Set when our own Logon carried ResetSeqNumFlag=Y, so the echoed
    /// flag on the response does not reset the store a second time.
    sent_reset: bool,
    outbound: Option<mpsc::Sender<Bytes>>,
    /// Prepared outbound wire bytes awaiting a logged-on flush.
    queue: Vec<Bytes>,
    in_session_tx: watch::Sender<bool>,
    commands_rx: mpsc::Receiver<Command>,
    inbound_rx: mpsc::Receiver<FixIn>,
}

impl Session {
    /// Creates a session actor and its handle.
    ///
    /// # Errors
    /// Returns `ConfigError` if the configured BeginString is not a known
    /// FIX version.
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn MessageStore>,
        app: Arc<dyn Application>,
        log: Arc<dyn SessionLog>,
    ) -> Result<(Self, SessionHandle), ConfigError> {
        let version = config
            .version()
            .ok_or_else(|| ConfigError::InvalidSetting {
                key: "begin_string".into(),
                reason: format!("unknown FIX version: {}", config.session_id.begin_string),
            })?;

        let dict = Arc::new(Dictionary::session_defaults(version));
        let decoder = if config.validate_checksum {
            MessageDecoder::new()
        } else {
            MessageDecoder::new().without_checksum_validation()
        };

        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(1024);
        let (in_session_tx, in_session_rx) = watch::channel(true);

        let id = config.session_id.clone();
        let clock = HeartbeatClock::new(config.heart_bt_int);
        let session = Self {
            id: id.clone(),
            config,
            version,
            store,
            app,
            log,
            transport_dict: Arc::clone(&dict),
            app_dict: dict,
            decoder,
            clock,
            state: SessionState::Latent,
            pending_stop: false,
            stopped: false,
            sent_reset: false,
            outbound: None,
            queue: Vec::new(),
            in_session_tx,
            commands_rx,
            inbound_rx,
        };
        let handle = SessionHandle {
            id,
            commands: commands_tx,
            inbound: inbound_tx,
            in_session: in_session_rx,
        };
        Ok((session, handle))
    }

    /// Replaces the default (admin-only) dictionaries; the decoder adopts
    /// the transport dictionary's tag classification.
    #[must_use]
    pub fn with_dictionaries(
        mut self,
        transport_dict: Arc<Dictionary>,
        app_dict: Arc<Dictionary>,
    ) -> Self {
        let decoder = MessageDecoder::with_classifier(transport_dict.classifier.clone());
        self.decoder = if self.config.validate_checksum {
            decoder
        } else {
            decoder.without_checksum_validation()
        };
        self.transport_dict = transport_dict;
        self.app_dict = app_dict;
        self
    }

    /// Returns the session identity.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the current state token.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Returns the message store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Returns the heartbeat clock.
    #[must_use]
    pub fn clock(&self) -> &HeartbeatClock {
        &self.clock
    }

    /// Returns true once a stop request has completed.
    #[must_use]
    pub const fn stopped(&self) -> bool {
        self.stopped
    }

    /// Initializes the session: fires `on_create` and runs the first
    /// session-time check.
    pub async fn start(&mut self) {
        self.pending_stop = false;
        self.stopped = false;
        self.app.on_create(&self.id).await;
        self.goto(SessionState::Latent).await;
        self.check_session_time(Utc::now()).await;
    }

    /// Drives the actor until stopped.
    pub async fn run(mut self) {
        self.start().await;
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stopped {
            tokio::select! {
                maybe_in = self.inbound_rx.recv() => match maybe_in {
                    Some(fix_in) => self.on_incoming(fix_in).await,
                    None => break,
                },
                maybe_cmd = self.commands_rx.recv() => match maybe_cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => break,
                },
                _ = ticker.tick() => self.on_tick().await,
            }
        }

        if let Err(err) = self.store.close().await {
            self.log.on_event(&format!("store close failed: {err}"));
        }
        self.log.on_event("Session stopped");
    }

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Send(msg) => self.send_app_message(msg).await,
            Command::Connect(sink) => self.connect(sink).await,
            Command::Disconnect => self.disconnect().await,
            Command::Stop => self.stop().await,
        }
    }

    /// Attaches a transport and, for initiators, opens the logon exchange.
    pub async fn connect(&mut self, sink: mpsc::Sender<Bytes>) {
        if self.state.is_connected() {
            self.log.on_event("Connect ignored: already connected");
            return;
        }
        if !self.check_session_time(Utc::now()).await {
            self.log.on_event("Connect ignored: outside session time");
            return;
        }

        self.outbound = Some(sink);
        self.clock.reset();
        self.clock.set_interval(self.config.heart_bt_int);
        self.sent_reset = false;

        if !self.config.initiate_logon {
            self.goto(SessionState::LogonPending).await;
            return;
        }

        if self.config.refresh_on_logon
            && let Err(err) = self.store.refresh().await
        {
            self.log.on_event(&format!("store refresh failed: {err}"));
            self.outbound = None;
            return;
        }
        if self.config.reset_on_logon {
            if let Err(err) = self.store.reset().await {
                self.log.on_event(&format!("store reset failed: {err}"));
                self.outbound = None;
                return;
            }
            self.sent_reset = true;
        }

        self.log.on_event("Sending logon request");
        let logon = self.build_logon();
        if let Err(err) = self.send_admin(logon).await {
            self.log.on_event(&format!("send logon failed: {err}"));
            self.outbound = None;
            return;
        }
        self.goto(SessionState::LogonPending).await;
        self.clock.arm_logon_deadline(self.config.logon_timeout);
    }

    /// Detaches the transport.
    pub async fn disconnect(&mut self) {
        if self.state.is_connected() {
            self.goto(SessionState::Latent).await;
        }
    }

    /// Requests a graceful stop: a logged-on session logs out first and
    /// waits (bounded) for the reply; anything else drops straight out.
    pub async fn stop(&mut self) {
        self.log.on_event("Stop requested");
        self.pending_stop = true;

        if self.state.is_logged_on() {
            let prev = PrevState::of(&self.state);
            std::mem::take(&mut self.state);
            let next = self.initiate_logout("").await;
            self.apply(prev, next).await;
        } else if matches!(self.state, SessionState::LogonPending) {
            self.goto(SessionState::Latent).await;
        } else if !self.state.is_connected() {
            self.stopped = true;
        }
    }

    /// Processes one framed inbound message.
    pub async fn on_incoming(&mut self, fix_in: FixIn) {
        if !self.check_session_time(Utc::now()).await {
            return;
        }
        if !self.state.is_connected() {
            return;
        }

        self.log.on_incoming(&fix_in.bytes);

        match self.decoder.decode(&fix_in.bytes) {
            Ok(mut msg) => {
                msg.receive_time = Some(fix_in.receive_time);
                self.fix_msg_in(msg).await;
            }
            Err(err) => {
                self.log.on_event(&format!("message parse error: {err}"));
            }
        }

        self.clock.received_notch();
    }

    /// Processes one timer event.
    pub async fn on_timeout(&mut self, event: Event) {
        if !self.check_session_time(Utc::now()).await {
            return;
        }
        let prev = PrevState::of(&self.state);
        let state = std::mem::take(&mut self.state);
        let next = match state {
            SessionState::InSession => self.in_session_on_timeout(event).await,
            SessionState::Resend(info) => match event {
                Event::NeedHeartbeat => {
                    let next = self.send_heartbeat(None).await;
                    next.unwrap_or(SessionState::Resend(info))
                }
                Event::PeerTimeout => self.escalate_peer_timeout().await,
                _ => SessionState::Resend(info),
            },
            SessionState::PendingTimeout => match event {
                Event::PeerTimeout => {
                    self.log
                        .on_event("Peer timed out with TestRequest outstanding, disconnecting");
                    SessionState::Latent
                }
                Event::NeedHeartbeat => {
                    let next = self.send_heartbeat(None).await;
                    next.unwrap_or(SessionState::PendingTimeout)
                }
                _ => SessionState::PendingTimeout,
            },
            SessionState::LogonPending => match event {
                Event::LogonTimeout => {
                    self.log.on_event("Timed out waiting for logon response");
                    SessionState::Latent
                }
                _ => SessionState::LogonPending,
            },
            SessionState::LogoutPending => match event {
                Event::LogoutTimeout => {
                    self.log.on_event("Timed out waiting for logout response");
                    SessionState::Latent
                }
                _ => SessionState::LogoutPending,
            },
            other @ (SessionState::Latent | SessionState::NotSessionTime) => other,
        };
        self.apply(prev, next).await;
    }

    /// Submits an outbound application message: header stamp, callback,
    /// sequence allocation, persist, then send (or queue until logged on).
    pub async fn send_app_message(&mut self, msg: Message) {
        if !self.check_session_time(Utc::now()).await {
            self.log.on_event("Dropping outbound message: outside session time");
            return;
        }
        match self.build_outbound(msg).await {
            Ok(Some(bytes)) => {
                self.queue.push(bytes);
                self.flush_queue().await;
            }
            Ok(None) => {}
            Err(err) => self.log.on_event(&format!("outbound message failed: {err}")),
        }
    }

    /// Re-checks the session-time window; returns false when out of range.
    pub async fn check_session_time(&mut self, now: DateTime<Utc>) -> bool {
        if !self.config.schedule.is_in_range(now) {
            if self.state.is_session_time() {
                self.log.on_event("Not in session");
                self.in_session_tx.send_replace(false);
            }
            self.shutdown_now().await;
            self.goto(SessionState::NotSessionTime).await;
            return false;
        }

        if !self.state.is_session_time() {
            self.log.on_event("In session");
            self.in_session_tx.send_replace(true);
            self.goto(SessionState::Latent).await;
        }

        let creation = self.store.creation_time().to_datetime();
        if !self.config.schedule.is_in_same_range(creation, now) {
            self.log.on_event("Session reset: new trading day");
            self.shutdown_now().await;
            self.queue.clear();
            if let Err(err) = self.store.reset().await {
                self.log.on_event(&format!("store reset failed: {err}"));
            }
            self.goto(SessionState::Latent).await;
        }
        true
    }

    async fn on_tick(&mut self) {
        if !self.check_session_time(Utc::now()).await {
            return;
        }
        if self.state.is_connected() && self.outbound.is_none() {
            self.log.on_event("Transport gone, disconnecting");
            self.goto(SessionState::Latent).await;
            return;
        }
        if self.state.is_connected() {
            let events = self.clock.sweep(Instant::now());
            for event in events {
                self.on_timeout(event).await;
            }
        }
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    async fn goto(&mut self, next: SessionState) {
        let prev = PrevState::of(&self.state);
        self.apply(prev, next).await;
    }

    async fn apply(&mut self, prev: PrevState, next: SessionState) {
        if !next.is_connected() {
            if prev.connected {
                self.handle_disconnect(&prev).await;
            }
            if self.pending_stop {
                self.stopped = true;
            }
        }

        let next_label = next.to_string();
        if prev.label != next_label {
            self.log
                .on_event(&format!("change state: {} -> {next_label}", prev.label));
        }
        self.state = next;

        if self.state.is_logged_on() && !self.queue.is_empty() {
            self.flush_queue().await;
        }
    }

    async fn handle_disconnect(&mut self, prev: &PrevState) {
        let fire_on_logout = prev.logged_on
            || prev.logout_pending
            || (prev.logon_pending && self.config.initiate_logon);
        if fire_on_logout {
            self.app.on_logout(&self.id).await;
        }

        self.log.on_event("Disconnected");
        if self.config.reset_on_disconnect
            && let Err(err) = self.store.reset().await
        {
            self.log.on_event(&format!("store reset failed: {err}"));
        }
        self.outbound = None;
        self.queue.clear();
        self.clock.disarm_deadlines();
        self.clock.clear_test_req();
    }

    /// Terminates the current state immediately: a Logout is sent when
    /// logged on, nothing else happens. Safe in any state.
    async fn shutdown_now(&mut self) {
        if self.state.is_logged_on() {
            let logout = build_logout("");
            if let Err(err) = self.send_admin(logout).await {
                self.log.on_event(&format!("send logout failed: {err}"));
            }
        }
    }

    fn state_error(&mut self, context: &str, err: &FixError) -> SessionState {
        self.log.on_event(&format!("session error in {context}: {err}"));
        SessionState::Latent
    }

    // ------------------------------------------------------------------
    // Inbound dispatch
    // ------------------------------------------------------------------

    async fn fix_msg_in(&mut self, msg: Message) {
        let prev = PrevState::of(&self.state);
        let state = std::mem::take(&mut self.state);
        let next = match state {
            other @ (SessionState::Latent | SessionState::NotSessionTime) => {
                self.log.on_event("Message received while not in active communication");
                other
            }
            SessionState::LogonPending => self.logon_on_message(msg).await,
            SessionState::InSession => self.in_session_on_message(msg).await,
            SessionState::PendingTimeout => {
                // Any inbound traffic recovers the session.
                self.in_session_on_message(msg).await
            }
            SessionState::Resend(info) => self.resend_on_message(info, msg).await,
            SessionState::LogoutPending => self.logout_on_message(msg).await,
        };
        self.apply(prev, next).await;
    }

    async fn logon_on_message(&mut self, msg: Message) -> SessionState {
        match msg.msg_type() {
            Ok(MsgType::Logon) => self.handle_logon(msg).await,
            Ok(other) => {
                self.log.on_event(&format!(
                    "Invalid session state: received {other} while waiting for Logon"
                ));
                SessionState::Latent
            }
            Err(_) => {
                self.log.on_event("Message without MsgType while waiting for Logon");
                SessionState::Latent
            }
        }
    }

    async fn handle_logon(&mut self, msg: Message) -> SessionState {
        let reset_received = msg.body.get_flag(tags::RESET_SEQ_NUM_FLAG);

        if !self.config.initiate_logon && self.config.reset_on_logon {
            if let Err(err) = self.store.reset().await {
                return self.state_error("reset on logon", &err.into());
            }
            self.sent_reset = true;
        }
        if reset_received {
            self.log
                .on_event("Logon contains ResetSeqNumFlag=Y, resetting sequence numbers to 1");
            // Queued outbound carries stale sequence numbers now.
            self.queue.clear();
            if !self.sent_reset
                && let Err(err) = self.store.reset().await
            {
                return self.state_error("sequence reset", &err.into());
            }
        }

        // Seq-too-high is resolved after the reply; everything else fails
        // the logon.
        if let Err(err) = self.verify(&msg, false, true).await {
            self.log.on_event(&format!("logon failed: {}", describe(&err)));
            return SessionState::Latent;
        }

        if let Ok(secs) = msg.body.get_parsed::<u64>(tags::HEART_BT_INT) {
            self.clock.set_interval(Duration::from_secs(secs));
        }

        if self.config.initiate_logon {
            self.log.on_event("Received logon response");
            self.clock.disarm_deadlines();
        } else {
            self.log.on_event("Received logon request");
            let reply = self.build_logon_reply(&msg, reset_received);
            if let Err(err) = self.send_admin(reply).await {
                return self.state_error("logon reply", &err);
            }
            self.log.on_event("Responding to logon request");
        }

        self.app.on_logon(&self.id).await;

        let Ok(seq) = msg.seq_num() else {
            self.log.on_event("Logon missing MsgSeqNum");
            return SessionState::Latent;
        };
        let expected = self.store.next_target_seq();
        if seq > expected {
            return self.start_resend(expected, seq, None).await;
        }
        if let Err(err) = self.incr_target().await {
            return self.state_error("target increment", &err);
        }
        SessionState::InSession
    }

    async fn in_session_on_message(&mut self, msg: Message) -> SessionState {
        let msg_type = match msg.msg_type() {
            Ok(t) => t,
            Err(_) => {
                let reject = MessageRejectError::required_tag_missing(tags::MSG_TYPE);
                return self.reject_and_advance(&msg, &reject).await;
            }
        };

        match msg_type {
            MsgType::Logon => {
                self.log.on_event("Protocol error: second Logon while in session");
                self.initiate_logout("second Logon received while in session").await
            }
            MsgType::Logout => self.handle_logout_request(msg).await,
            MsgType::Heartbeat => self.handle_heartbeat(msg).await,
            MsgType::TestRequest => self.handle_test_request(msg).await,
            MsgType::ResendRequest => self.handle_resend_request(msg).await,
            MsgType::SequenceReset => self.handle_sequence_reset(msg).await,
            MsgType::Reject | MsgType::BusinessMessageReject | MsgType::Other(_) => {
                self.handle_delivery(msg).await
            }
        }
    }

    async fn resend_on_message(&mut self, mut info: ResendInfo, msg: Message) -> SessionState {
        // Ahead-of-sequence messages are parked instead of triggering a
        // second ResendRequest; SequenceReset-Reset realigns immediately.
        if let Ok(seq) = msg.seq_num() {
            let expected = self.store.next_target_seq();
            let is_reset = msg
                .msg_type()
                .is_ok_and(|t| t == MsgType::SequenceReset)
                && !msg.body.get_flag(tags::GAP_FILL_FLAG);
            if seq > expected && !is_reset {
                info.range_end = info.range_end.max(seq);
                info.stash.insert(seq, msg);
                return SessionState::Resend(info);
            }
        }

        let next = self.in_session_on_message(msg).await;
        if !matches!(next, SessionState::InSession) {
            return next;
        }

        // Drain parked messages the gap fill has reached.
        loop {
            let expected = self.store.next_target_seq();
            let Some(parked) = info.stash.remove(&expected) else {
                break;
            };
            let drained = self.in_session_on_message(parked).await;
            if !matches!(drained, SessionState::InSession) {
                return drained;
            }
        }

        if info.stash.is_empty() && self.store.next_target_seq() > info.range_end {
            self.log.on_event("Resend complete");
            SessionState::InSession
        } else {
            SessionState::Resend(info)
        }
    }

    async fn logout_on_message(&mut self, msg: Message) -> SessionState {
        if msg.msg_type() == Ok(MsgType::Logout) {
            self.log.on_event("Received logout response");
            if self.verify(&msg, false, false).await.is_ok()
                && let Err(err) = self.incr_target().await
            {
                return self.state_error("target increment", &err);
            }
            if self.config.reset_on_logout
                && let Err(err) = self.store.reset().await
            {
                self.log.on_event(&format!("store reset failed: {err}"));
            }
            return SessionState::Latent;
        }

        match self.in_session_on_message(msg).await {
            SessionState::Latent => SessionState::Latent,
            _ => SessionState::LogoutPending,
        }
    }

    // ------------------------------------------------------------------
    // Per-message-type handlers (logged-on states)
    // ------------------------------------------------------------------

    async fn handle_heartbeat(&mut self, msg: Message) -> SessionState {
        match self.verify(&msg, true, true).await {
            Ok(()) => {
                let answered = msg.body.get_str(tags::TEST_REQ_ID);
                if self
                    .clock
                    .pending_test_req()
                    .is_some_and(|pending| Some(pending) == answered)
                {
                    self.clock.clear_test_req();
                }
                if let Err(err) = self.incr_target().await {
                    return self.state_error("target increment", &err);
                }
                SessionState::InSession
            }
            Err(err) => self.process_verify_error(&msg, err).await,
        }
    }

    async fn handle_test_request(&mut self, msg: Message) -> SessionState {
        match self.verify(&msg, true, true).await {
            Ok(()) => {
                let challenge = msg.body.get_str(tags::TEST_REQ_ID).map(str::to_string);
                if let Some(next) = self.send_heartbeat(challenge.as_deref()).await {
                    return next;
                }
                if let Err(err) = self.incr_target().await {
                    return self.state_error("target increment", &err);
                }
                SessionState::InSession
            }
            Err(err) => self.process_verify_error(&msg, err).await,
        }
    }

    async fn handle_logout_request(&mut self, msg: Message) -> SessionState {
        match self.verify(&msg, false, true).await {
            Ok(()) => {
                self.log.on_event("Received logout request");
                let reply = build_logout("");
                if let Err(err) = self.send_admin(reply).await {
                    return self.state_error("logout reply", &err);
                }
                if let Err(err) = self.incr_target().await {
                    return self.state_error("target increment", &err);
                }
                if self.config.reset_on_logout
                    && let Err(err) = self.store.reset().await
                {
                    self.log.on_event(&format!("store reset failed: {err}"));
                }
                SessionState::Latent
            }
            Err(err) => self.process_verify_error(&msg, err).await,
        }
    }

    async fn handle_resend_request(&mut self, msg: Message) -> SessionState {
        match self.verify(&msg, false, true).await {
            Ok(()) => {
                let begin = match msg.body.get_parsed::<u64>(tags::BEGIN_SEQ_NO) {
                    Ok(v) => v,
                    Err(_) => {
                        let reject = MessageRejectError::required_tag_missing(tags::BEGIN_SEQ_NO);
                        return self.reject_and_advance(&msg, &reject).await;
                    }
                };
                let end = msg.body.get_parsed::<u64>(tags::END_SEQ_NO).unwrap_or(0);
                self.log
                    .on_event(&format!("Received ResendRequest range {begin}..{end}"));

                let next_sender = self.store.next_sender_seq();
                let effective_end = if end == 0 || end == 999_999 || end >= next_sender {
                    next_sender.saturating_sub(1)
                } else {
                    end
                };
                if begin <= effective_end
                    && let Err(err) = self.replay_range(begin, effective_end).await
                {
                    return self.state_error("resend replay", &err);
                }
                if let Err(err) = self.incr_target().await {
                    return self.state_error("target increment", &err);
                }
                SessionState::InSession
            }
            Err(err) => self.process_verify_error(&msg, err).await,
        }
    }

    async fn handle_sequence_reset(&mut self, msg: Message) -> SessionState {
        let gap_fill = msg.body.get_flag(tags::GAP_FILL_FLAG);
        // Reset mode skips sequence checks entirely; GapFill verifies like
        // any sequenced message.
        let verdict = if gap_fill {
            self.verify(&msg, true, true).await
        } else {
            self.verify(&msg, false, false).await
        };

        match verdict {
            Ok(()) => {
                let new_seq = match msg.body.get_parsed::<u64>(tags::NEW_SEQ_NO) {
                    Ok(v) => v,
                    Err(_) => {
                        let reject = MessageRejectError::required_tag_missing(tags::NEW_SEQ_NO);
                        return self.reject_and_advance(&msg, &reject).await;
                    }
                };
                let expected = self.store.next_target_seq();
                if new_seq < expected {
                    let reject = MessageRejectError::value_is_incorrect(tags::NEW_SEQ_NO);
                    return self.reject_and_advance(&msg, &reject).await;
                }
                self.log.on_event(&format!(
                    "Received SequenceReset ({}) NewSeqNo={new_seq}",
                    if gap_fill { "GapFill" } else { "Reset" }
                ));
                if let Err(err) = self.store.set_next_target_seq(new_seq).await {
                    return self.state_error("sequence realign", &FixError::Store(err));
                }
                self.clock.clear_test_req();
                SessionState::InSession
            }
            Err(err) => self.process_verify_error(&msg, err).await,
        }
    }

    /// Reject (3), BusinessMessageReject (j), and application messages:
    /// verification (which includes the from-callback delivery), then
    /// advance.
    async fn handle_delivery(&mut self, msg: Message) -> SessionState {
        match self.verify(&msg, true, true).await {
            Ok(()) => {
                if let Err(err) = self.incr_target().await {
                    return self.state_error("target increment", &err);
                }
                SessionState::InSession
            }
            Err(err) => self.process_verify_error(&msg, err).await,
        }
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    async fn verify(
        &self,
        msg: &Message,
        check_too_high: bool,
        check_too_low: bool,
    ) -> Result<(), VerifyError> {
        // BeginString.
        match msg.begin_string() {
            Some(bs) if bs == self.id.begin_string => {}
            Some(bs) => return Err(VerifyError::BeginStringMismatch(bs.to_string())),
            None => {
                return Err(VerifyError::Reject(MessageRejectError::required_tag_missing(
                    tags::BEGIN_STRING,
                )));
            }
        }

        // CompIDs arrive reversed relative to our identity.
        let sender_ok =
            msg.header.get_str(tags::SENDER_COMP_ID) == Some(self.id.target_comp_id.as_str());
        let target_ok =
            msg.header.get_str(tags::TARGET_COMP_ID) == Some(self.id.sender_comp_id.as_str());
        if !sender_ok || !target_ok {
            return Err(VerifyError::Reject(
                MessageRejectError::new(RejectReason::CompIdProblem, "CompID problem")
                    .with_ref_tag(if sender_ok {
                        tags::TARGET_COMP_ID
                    } else {
                        tags::SENDER_COMP_ID
                    }),
            ));
        }

        // SendingTime presence, format, and accuracy.
        let sending_time = match msg.header.get_str(tags::SENDING_TIME) {
            Some(s) => match Timestamp::parse_fix(s) {
                Ok(ts) => ts,
                Err(_) => {
                    return Err(VerifyError::Reject(
                        MessageRejectError::new(
                            RejectReason::IncorrectDataFormat,
                            "unparseable SendingTime",
                        )
                        .with_ref_tag(tags::SENDING_TIME),
                    ));
                }
            },
            None => {
                return Err(VerifyError::Reject(MessageRejectError::required_tag_missing(
                    tags::SENDING_TIME,
                )));
            }
        };
        let now_millis = Timestamp::now().as_millis();
        let delta = now_millis.abs_diff(sending_time.as_millis());
        if delta > SENDING_TIME_TOLERANCE.as_millis() as u64 {
            return Err(VerifyError::Reject(
                MessageRejectError::new(
                    RejectReason::SendingTimeAccuracyProblem,
                    "SendingTime accuracy problem",
                )
                .with_ref_tag(tags::SENDING_TIME),
            ));
        }

        // Replays must carry a plausible OrigSendingTime.
        if msg.is_poss_dup() {
            match msg.header.get_str(tags::ORIG_SENDING_TIME) {
                Some(orig) => match Timestamp::parse_fix(orig) {
                    Ok(orig_ts) if orig_ts > sending_time => {
                        return Err(VerifyError::Reject(
                            MessageRejectError::new(
                                RejectReason::SendingTimeAccuracyProblem,
                                "OrigSendingTime after SendingTime",
                            )
                            .with_ref_tag(tags::ORIG_SENDING_TIME),
                        ));
                    }
                    Ok(_) => {}
                    Err(_) => {
                        return Err(VerifyError::Reject(
                            MessageRejectError::new(
                                RejectReason::IncorrectDataFormat,
                                "unparseable OrigSendingTime",
                            )
                            .with_ref_tag(tags::ORIG_SENDING_TIME),
                        ));
                    }
                },
                None => {
                    return Err(VerifyError::Reject(
                        MessageRejectError::required_tag_missing(tags::ORIG_SENDING_TIME),
                    ));
                }
            }
        }

        // Sequence discipline comes before validation and delivery: a
        // gapped message must be stashed for replay, never validated,
        // delivered, or counted.
        let seq = match msg.seq_num() {
            Ok(seq) => seq,
            Err(_) => {
                return Err(VerifyError::Reject(MessageRejectError::required_tag_missing(
                    tags::MSG_SEQ_NUM,
                )));
            }
        };
        let expected = self.store.next_target_seq();
        if check_too_low && seq < expected {
            if msg.is_poss_dup() {
                return Err(VerifyError::DuplicateIgnored);
            }
            return Err(VerifyError::TooLow {
                received: seq,
                expected,
            });
        }
        if check_too_high && seq > expected {
            return Err(VerifyError::TooHigh {
                received: seq,
                expected,
            });
        }

        // Data dictionary, then the application's own acceptance check.
        // Both run only for in-sequence messages, so the application sees
        // each message exactly once, in order.
        let is_admin = msg.is_admin();
        let dict = if is_admin {
            &self.transport_dict
        } else {
            &self.app_dict
        };
        if let Err(reject) = dict.validate(msg) {
            return Err(VerifyError::Reject(reject));
        }
        let callback_result = if is_admin {
            self.app.from_admin(msg, &self.id).await
        } else {
            self.app.from_app(msg, &self.id).await
        };
        if let Err(reject) = callback_result {
            return Err(VerifyError::Reject(reject));
        }
        Ok(())
    }

    async fn process_verify_error(&mut self, msg: &Message, err: VerifyError) -> SessionState {
        match err {
            VerifyError::Reject(reject) => self.reject_and_advance(msg, &reject).await,
            VerifyError::TooHigh { received, expected } => {
                self.log.on_event(&format!(
                    "MsgSeqNum too high, expecting {expected} but received {received}"
                ));
                self.start_resend(expected, received, Some(msg.clone())).await
            }
            VerifyError::TooLow { received, expected } => {
                self.initiate_logout(&format!(
                    "MsgSeqNum too low, expecting {expected} but received {received}"
                ))
                .await
            }
            VerifyError::BeginStringMismatch(received) => {
                self.initiate_logout(&format!("Incorrect BeginString: {received}"))
                    .await
            }
            VerifyError::DuplicateIgnored => SessionState::InSession,
        }
    }

    /// Answers a failed message with Reject (3) or BusinessMessageReject
    /// (j) and advances the target counter.
    async fn reject_and_advance(
        &mut self,
        msg: &Message,
        reject: &MessageRejectError,
    ) -> SessionState {
        self.log
            .on_event(&format!("Rejecting message: {reject}"));
        let answer = self.build_reject(msg, reject);
        if let Err(err) = self.send_admin(answer).await {
            return self.state_error("send reject", &err);
        }
        if let Err(err) = self.incr_target().await {
            return self.state_error("target increment", &err);
        }
        SessionState::InSession
    }

    async fn start_resend(
        &mut self,
        expected: u64,
        received: u64,
        stash_msg: Option<Message>,
    ) -> SessionState {
        let request = self.build_resend_request(expected);
        if let Err(err) = self.send_admin(request).await {
            return self.state_error("send resend request", &err);
        }
        let mut info = ResendInfo {
            stash: BTreeMap::new(),
            range_end: received,
        };
        if let Some(msg) = stash_msg {
            info.stash.insert(received, msg);
        }
        SessionState::Resend(info)
    }

    async fn initiate_logout(&mut self, text: &str) -> SessionState {
        let logout = build_logout(text);
        if let Err(err) = self.send_admin(logout).await {
            return self.state_error("send logout", &err);
        }
        self.clock.arm_logout_deadline(self.config.logout_timeout);
        SessionState::LogoutPending
    }

    async fn in_session_on_timeout(&mut self, event: Event) -> SessionState {
        match event {
            Event::NeedHeartbeat => {
                let next = self.send_heartbeat(None).await;
                next.unwrap_or(SessionState::InSession)
            }
            Event::PeerTimeout => self.escalate_peer_timeout().await,
            _ => SessionState::InSession,
        }
    }

    /// Sends a TestRequest with a monotonic challenge and waits one more
    /// peer window.
    async fn escalate_peer_timeout(&mut self) -> SessionState {
        let challenge = format!("TEST{}", Timestamp::now().as_nanos());
        let mut msg = Message::of_type(&MsgType::TestRequest);
        msg.body.set_str(tags::TEST_REQ_ID, &challenge);
        if let Err(err) = self.send_admin(msg).await {
            return self.state_error("send test request", &err);
        }
        self.clock.test_request_sent(challenge);
        SessionState::PendingTimeout
    }

    /// Sends a Heartbeat; `Some(state)` is returned only on transport
    /// failure.
    async fn send_heartbeat(&mut self, test_req_id: Option<&str>) -> Option<SessionState> {
        let mut msg = Message::of_type(&MsgType::Heartbeat);
        if let Some(id) = test_req_id {
            msg.body.set_str(tags::TEST_REQ_ID, id);
        }
        match self.send_admin(msg).await {
            Ok(()) => None,
            Err(err) => Some(self.state_error("send heartbeat", &err)),
        }
    }

    // ------------------------------------------------------------------
    // Resend replay (answering the counterparty's ResendRequest)
    // ------------------------------------------------------------------

    async fn replay_range(&mut self, begin: u64, end: u64) -> Result<(), FixError> {
        let stored = self.store.get_messages(begin, end).await?;
        let mut lookup: BTreeMap<u64, Bytes> = stored.into_iter().collect();
        let replay_decoder = MessageDecoder::new().without_checksum_validation();

        let mut gap_start: Option<u64> = None;
        for seq in begin..=end {
            // Admin messages and unreadable entries are gap-filled over.
            let replayable = match lookup.remove(&seq) {
                Some(bytes) => match replay_decoder.decode(&bytes) {
                    Ok(msg) if !msg.is_admin() => Some(msg),
                    _ => None,
                },
                None => None,
            };
            match replayable {
                Some(msg) => {
                    if let Some(from) = gap_start.take() {
                        self.send_gap_fill(from, seq).await?;
                    }
                    self.replay_app_message(msg).await?;
                }
                None => {
                    if gap_start.is_none() {
                        gap_start = Some(seq);
                    }
                }
            }
        }
        if let Some(from) = gap_start.take() {
            self.send_gap_fill(from, end + 1).await?;
        }
        Ok(())
    }

    /// SequenceReset-GapFill covering `[at_seq, new_seq)`.
    async fn send_gap_fill(&mut self, at_seq: u64, new_seq: u64) -> Result<(), FixError> {
        let mut msg = Message::of_type(&MsgType::SequenceReset);
        msg.body.set_flag(tags::GAP_FILL_FLAG, true);
        msg.body.set_uint(tags::NEW_SEQ_NO, new_seq);
        self.stamp_header(&mut msg);
        msg.header.set_uint(tags::MSG_SEQ_NUM, at_seq);
        msg.header.set_flag(tags::POSS_DUP_FLAG, true);
        let stamp = self.timestamp_now();
        msg.header.set_str(tags::ORIG_SENDING_TIME, &stamp);
        self.app.to_admin(&mut msg, &self.id).await;

        let bytes = encode_message(&msg)?.freeze();
        self.write_wire(bytes).await?;
        Ok(())
    }

    async fn replay_app_message(&mut self, mut msg: Message) -> Result<(), FixError> {
        let original_sending_time = msg
            .header
            .get_str(tags::SENDING_TIME)
            .map(str::to_string);
        msg.header.set_flag(tags::POSS_DUP_FLAG, true);
        if let Some(orig) = original_sending_time {
            msg.header.set_str(tags::ORIG_SENDING_TIME, &orig);
        }
        let stamp = self.timestamp_now();
        msg.header.set_str(tags::SENDING_TIME, &stamp);

        let bytes = encode_message(&msg)?.freeze();
        self.write_wire(bytes).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outbound plumbing
    // ------------------------------------------------------------------

    fn timestamp_now(&self) -> String {
        let now = Timestamp::now();
        if self.version.supports_subsecond_time() {
            now.format_millis().to_string()
        } else {
            now.format_seconds().to_string()
        }
    }

    fn stamp_header(&self, msg: &mut Message) {
        let stamp = self.timestamp_now();
        let header = &mut msg.header;
        header.set_str(tags::BEGIN_STRING, &self.id.begin_string);
        header.set_str(tags::SENDER_COMP_ID, self.id.sender_comp_id.as_str());
        header.set_str(tags::TARGET_COMP_ID, self.id.target_comp_id.as_str());
        if let Some(v) = &self.id.sender_sub_id {
            header.set_str(tags::SENDER_SUB_ID, v);
        }
        if let Some(v) = &self.id.sender_location_id {
            header.set_str(tags::SENDER_LOCATION_ID, v);
        }
        if let Some(v) = &self.id.target_sub_id {
            header.set_str(tags::TARGET_SUB_ID, v);
        }
        if let Some(v) = &self.id.target_location_id {
            header.set_str(tags::TARGET_LOCATION_ID, v);
        }
        header.set_str(tags::SENDING_TIME, &stamp);
    }

    /// Stamps, calls back, allocates a sequence number, persists, and
    /// encodes one outbound message. `None` means the application vetoed
    /// it; the sequence number is not consumed in that case.
    async fn build_outbound(&mut self, mut msg: Message) -> Result<Option<Bytes>, FixError> {
        self.stamp_header(&mut msg);

        let is_admin = msg.is_admin();
        if is_admin {
            self.app.to_admin(&mut msg, &self.id).await;
        } else if self.app.to_app(&mut msg, &self.id).await.is_err() {
            self.log.on_event("Outbound message vetoed by application");
            return Ok(None);
        }

        let seq = self.store.next_sender_seq();
        msg.header.set_uint(tags::MSG_SEQ_NUM, seq);

        let bytes = encode_message(&msg)?.freeze();
        // Persist-before-send; SequenceReset is the one exempt type.
        if msg.msg_type() != Ok(MsgType::SequenceReset) {
            self.store.save_message(seq, bytes.clone()).await?;
        }
        self.store.incr_next_sender_seq().await?;
        Ok(Some(bytes))
    }

    /// Builds and immediately writes an admin message.
    async fn send_admin(&mut self, msg: Message) -> Result<(), FixError> {
        if let Some(bytes) = self.build_outbound(msg).await? {
            self.write_wire(bytes).await?;
        }
        Ok(())
    }

    async fn write_wire(&mut self, bytes: Bytes) -> Result<(), FixError> {
        let Some(sink) = &self.outbound else {
            return Err(SessionError::Connection("no transport attached".into()).into());
        };
        if sink.send(bytes.clone()).await.is_err() {
            self.outbound = None;
            return Err(SessionError::Connection("transport closed".into()).into());
        }
        self.log.on_outgoing(&bytes);
        self.clock.sent_notch();
        Ok(())
    }

    async fn flush_queue(&mut self) {
        if !self.state.is_logged_on() {
            return;
        }
        while !self.queue.is_empty() {
            let bytes = self.queue.remove(0);
            if let Err(err) = self.write_wire(bytes).await {
                self.log.on_event(&format!("queued send failed: {err}"));
                self.queue.clear();
                return;
            }
        }
    }

    async fn incr_target(&mut self) -> Result<(), FixError> {
        self.clock.clear_test_req();
        self.store.incr_next_target_seq().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Admin message builders
    // ------------------------------------------------------------------

    fn build_logon(&self) -> Message {
        let mut msg = Message::of_type(&MsgType::Logon);
        msg.body.set_uint(tags::ENCRYPT_METHOD, 0);
        msg.body
            .set_uint(tags::HEART_BT_INT, self.config.heart_bt_int.as_secs());
        if self.config.reset_on_logon {
            msg.body.set_flag(tags::RESET_SEQ_NUM_FLAG, true);
        }
        if let Some(ver) = &self.config.default_appl_ver_id {
            msg.body.set_str(tags::DEFAULT_APPL_VER_ID, ver);
        }
        msg
    }

    fn build_logon_reply(&self, request: &Message, reset_received: bool) -> Message {
        let mut msg = Message::of_type(&MsgType::Logon);
        msg.body.set_uint(tags::ENCRYPT_METHOD, 0);
        // Mirror the counterparty's heartbeat interval.
        if let Ok(secs) = request.body.get_parsed::<u64>(tags::HEART_BT_INT) {
            msg.body.set_uint(tags::HEART_BT_INT, secs);
        } else {
            msg.body
                .set_uint(tags::HEART_BT_INT, self.config.heart_bt_int.as_secs());
        }
        if reset_received {
            msg.body.set_flag(tags::RESET_SEQ_NUM_FLAG, true);
        }
        if let Some(ver) = &self.config.default_appl_ver_id {
            msg.body.set_str(tags::DEFAULT_APPL_VER_ID, ver);
        }
        msg
    }

    fn build_resend_request(&self, begin: u64) -> Message {
        let mut msg = Message::of_type(&MsgType::ResendRequest);
        msg.body.set_uint(tags::BEGIN_SEQ_NO, begin);
        msg.body
            .set_uint(tags::END_SEQ_NO, self.version.unbounded_end_seq_no());
        msg
    }

    fn build_reject(&self, offender: &Message, reject: &MessageRejectError) -> Message {
        let ref_seq = offender.seq_num().unwrap_or(self.store.next_target_seq());

        if reject.reason.is_business() {
            let mut msg = Message::of_type(&MsgType::BusinessMessageReject);
            msg.body.set_uint(tags::REF_SEQ_NUM, ref_seq);
            msg.body
                .set_uint(tags::BUSINESS_REJECT_REASON, u64::from(reject.reason.code()));
            if let Some(mt) = &reject.ref_msg_type {
                msg.body.set_str(tags::REF_MSG_TYPE, mt);
            }
            msg.body.set_str(tags::TEXT, &reject.text);
            return msg;
        }

        let mut msg = Message::of_type(&MsgType::Reject);
        msg.body.set_uint(tags::REF_SEQ_NUM, ref_seq);
        if self.version.has_session_reject_reason() {
            msg.body
                .set_uint(tags::SESSION_REJECT_REASON, u64::from(reject.reason.code()));
            if let Some(tag) = reject.ref_tag_id {
                msg.body.set_uint(tags::REF_TAG_ID, u64::from(tag));
            }
            if let Some(mt) = &reject.ref_msg_type {
                msg.body.set_str(tags::REF_MSG_TYPE, mt);
            }
        }
        msg.body.set_str(tags::TEXT, &reject.text);
        msg
    }
}

fn build_logout(text: &str) -> Message {
    let mut msg = Message::of_type(&MsgType::Logout);
    if !text.is_empty() {
        msg.body.set_str(tags::TEXT, text);
    }
    msg
}

fn describe(err: &VerifyError) -> String {
    match err {
        VerifyError::Reject(reject) => reject.to_string(),
        VerifyError::TooHigh { received, expected } => {
            format!("MsgSeqNum too high, expecting {expected} but received {received}")
        }
        VerifyError::TooLow { received, expected } => {
            format!("MsgSeqNum too low, expecting {expected} but received {received}")
        }
        VerifyError::BeginStringMismatch(bs) => format!("incorrect BeginString: {bs}"),
        VerifyError::DuplicateIgnored => "duplicate ignored".to_string(),
    }
}
