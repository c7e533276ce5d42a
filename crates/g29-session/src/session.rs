//! Session controller.
//!
//! A [`Session`] is the single owner of everything that changes over a
//! connection's lifetime: the device handle, the connection state, the last
//! decoded state tree, the last raw frame, and the last LED mask written.
//! Every mutating operation takes `&mut self`, so inbound frame processing
//! and outbound command writes are serialized by construction.

use core::fmt;
use core::future::Future;
use std::sync::Arc;

use racing_wheel_hid_g29_protocol::{
    AutoCenter, ChangeSet, Command, EffectSlot, G29_TABLE, LedPattern, ProtocolTable,
    WheelInputState, decode, diff, encode, led_mask,
};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::bus::{Event, EventBus, SubscriptionId, Topic};
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::transport::{WheelHandle, WheelPort};

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Initializing,
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Initializing => "initializing",
            SessionState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Counters kept across reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub commands_sent: u64,
    pub reports_written: u64,
    pub led_writes_suppressed: u64,
}

/// Result of reading one frame from the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// The frame was decoded and published.
    Processed(ChangeSet),
    /// The frame was malformed and dropped.
    Dropped,
    /// The transport has no more frames; the session is now disconnected.
    EndOfStream,
}

pub struct Session {
    port: Arc<dyn WheelPort>,
    table: &'static ProtocolTable,
    config: SessionConfig,
    handle: Option<Box<dyn WheelHandle>>,
    state: SessionState,
    bus: EventBus,
    previous_state: WheelInputState,
    previous_frame: Option<Vec<u8>>,
    last_led_mask: Option<u8>,
    stats: SessionStats,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("table", &self.table.name)
            .field("state", &self.state)
            .field("config", &self.config)
            .field("bus", &self.bus)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A disconnected session for the G29.
    pub fn new(port: Arc<dyn WheelPort>) -> Self {
        Self::with_table(port, &G29_TABLE)
    }

    /// A disconnected session speaking another protocol table.
    pub fn with_table(port: Arc<dyn WheelPort>, table: &'static ProtocolTable) -> Self {
        Self {
            port,
            table,
            config: SessionConfig::default(),
            handle: None,
            state: SessionState::Disconnected,
            bus: EventBus::new(),
            previous_state: WheelInputState::default(),
            previous_frame: None,
            last_led_mask: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Last decoded state tree; survives disconnects.
    pub fn wheel_state(&self) -> &WheelInputState {
        &self.previous_state
    }

    /// Last accepted raw frame.
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.previous_frame.as_deref()
    }

    /// Last LED mask written to the device since the most recent connect.
    pub fn last_led_mask(&self) -> Option<u8> {
        self.last_led_mask
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn table(&self) -> &'static ProtocolTable {
        self.table
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Open the device and run the initialization sequence.
    ///
    /// An already-open handle is closed first. On success the session is
    /// `Active`; on any failure it is `Disconnected` and the handle released.
    ///
    /// # Errors
    ///
    /// The transport error from opening the device or from any write of the
    /// initialization sequence.
    pub async fn connect(&mut self, config: SessionConfig) -> SessionResult<()> {
        if self.handle.is_some() {
            info!("closing previously open device before reconnecting");
            self.teardown().await;
        }
        self.config = config;
        self.set_state(SessionState::Connecting);

        let handle = match self.port.open(&config.filter).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(filter = ?config.filter, error = %e, "failed to open wheel");
                self.set_state(SessionState::Disconnected);
                return Err(e.into());
            }
        };
        self.handle = Some(handle);
        self.last_led_mask = None;
        self.set_state(SessionState::Initializing);

        let init = [
            Command::ForceOff(EffectSlot::All),
            Command::Range(config.range),
            Command::AutoCenter(config.autocenter),
            Command::Leds(LedPattern::Off),
        ];
        for command in &init {
            if let Err(e) = self.write_command(command).await {
                error!(command = command.kind(), error = %e, "wheel initialization failed");
                self.teardown().await;
                return Err(e);
            }
        }

        self.set_state(SessionState::Active);
        info!(
            table = self.table.name,
            range = config.range,
            autocenter = ?config.autocenter,
            "wheel initialized"
        );
        Ok(())
    }

    /// Release the device. Safe to call when already disconnected.
    ///
    /// The last known state and frame are kept so a later `connect` resumes
    /// decoding from them.
    pub async fn disconnect(&mut self) {
        if self.handle.is_some() {
            info!("disconnecting wheel");
        }
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close().await {
                warn!(error = %e, "error while closing wheel handle");
            }
        }
        self.set_state(SessionState::Disconnected);
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "session state change");
            self.state = next;
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        self.bus.subscribe(topic, handler)
    }

    pub fn subscribe_once<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        self.bus.subscribe_once(topic, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ── Inbound ──────────────────────────────────────────────────────────────

    /// Decode, diff and publish one inbound frame.
    ///
    /// A malformed frame is logged and dropped; the retained state is left
    /// untouched and the session stays active.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] unless the session is active, and
    /// [`SessionError::Protocol`] for a dropped frame.
    pub fn process_frame(&mut self, frame: &[u8]) -> SessionResult<ChangeSet> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotConnected(self.state));
        }

        let next = match decode(
            self.table,
            frame,
            self.previous_frame.as_deref(),
            &self.previous_state,
        ) {
            Ok(next) => next,
            Err(e) => {
                self.stats.frames_dropped += 1;
                warn!(len = frame.len(), error = %e, "dropping malformed frame");
                return Err(e.into());
            }
        };

        let changes = diff(&self.previous_state, &next);
        self.previous_state = next;
        match self.previous_frame.as_mut() {
            Some(buf) => {
                buf.clear();
                buf.extend_from_slice(frame);
            }
            None => self.previous_frame = Some(frame.to_vec()),
        }
        self.stats.frames_processed += 1;

        if !changes.is_empty() {
            if self.config.debug {
                debug!(changed = changes.len(), changes = ?changes, "frame");
            } else {
                trace!(changed = changes.len(), "frame");
            }
        }

        self.bus.publish_frame(&changes, &self.previous_state, frame);
        Ok(changes)
    }

    /// Read one frame from the transport and process it.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] when there is no open device, or the
    /// transport's read error; in the latter case the session is now
    /// disconnected.
    pub async fn poll_frame(&mut self) -> SessionResult<PollOutcome> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(SessionError::NotConnected(self.state));
        };
        if self.state != SessionState::Active {
            return Err(SessionError::NotConnected(self.state));
        }

        let frame = match handle.read_report().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("wheel input stream ended");
                self.teardown().await;
                return Ok(PollOutcome::EndOfStream);
            }
            Err(e) => {
                error!(error = %e, "wheel read failed");
                self.teardown().await;
                return Err(e.into());
            }
        };

        match self.process_frame(&frame) {
            Ok(changes) => Ok(PollOutcome::Processed(changes)),
            Err(SessionError::Protocol(_)) => Ok(PollOutcome::Dropped),
            Err(e) => Err(e),
        }
    }

    /// Process frames until the input stream ends.
    ///
    /// # Errors
    ///
    /// The first transport error; the session is disconnected by then.
    pub async fn run(&mut self) -> SessionResult<()> {
        while self.poll_frame().await? != PollOutcome::EndOfStream {}
        Ok(())
    }

    /// Process frames until the input stream ends or `shutdown` resolves,
    /// then disconnect.
    ///
    /// # Errors
    ///
    /// The first transport error; the session is disconnected by then.
    pub async fn run_until<F>(&mut self, shutdown: F) -> SessionResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let polled = tokio::select! {
                biased;
                () = &mut shutdown => None,
                outcome = self.poll_frame() => Some(outcome),
            };
            match polled {
                None => {
                    debug!("shutdown requested");
                    self.disconnect().await;
                    return Ok(());
                }
                Some(Ok(PollOutcome::EndOfStream)) => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
            }
        }
    }

    // ── Outbound ─────────────────────────────────────────────────────────────

    /// Encode and write a command.
    ///
    /// LED commands that would write the mask already on the device are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] unless active, a protocol error for a
    /// malformed command (nothing is written), or the transport error, after
    /// which the session is disconnected.
    pub async fn send_command(&mut self, command: Command) -> SessionResult<()> {
        if self.state != SessionState::Active {
            return Err(SessionError::NotConnected(self.state));
        }
        match self.write_command(&command).await {
            Err(SessionError::Transport(e)) => {
                error!(command = command.kind(), error = %e, "wheel write failed");
                self.teardown().await;
                Err(e.into())
            }
            other => other,
        }
    }

    async fn write_command(&mut self, command: &Command) -> SessionResult<()> {
        let sequence = encode(self.table, command)?;
        let mask = match command {
            Command::Leds(pattern) => Some(led_mask(&self.table.output.leds, pattern)?),
            _ => None,
        };
        if mask.is_some() && mask == self.last_led_mask {
            self.stats.led_writes_suppressed += 1;
            trace!(?mask, "LED pattern unchanged, write suppressed");
            return Ok(());
        }

        let Some(handle) = self.handle.as_mut() else {
            return Err(SessionError::NotConnected(self.state));
        };
        for report in &sequence {
            handle.send(report).await?;
            self.stats.reports_written += 1;
        }
        if mask.is_some() {
            self.last_led_mask = mask;
        }
        self.stats.commands_sent += 1;
        trace!(command = command.kind(), reports = sequence.len(), "command sent");
        Ok(())
    }

    // ── Convenience wrappers ─────────────────────────────────────────────────

    /// Set the rotation range in degrees (clamped to 40..=900).
    pub async fn set_range(&mut self, degrees: u16) -> SessionResult<()> {
        self.send_command(Command::Range(degrees)).await
    }

    pub async fn set_autocenter(&mut self, autocenter: AutoCenter) -> SessionResult<()> {
        self.send_command(Command::AutoCenter(autocenter)).await
    }

    pub async fn leds(&mut self, pattern: LedPattern) -> SessionResult<()> {
        self.send_command(Command::Leds(pattern)).await
    }

    /// Constant force; `0.5` stops it.
    pub async fn force_constant(&mut self, value: f32) -> SessionResult<()> {
        self.send_command(Command::ConstantForce(value)).await
    }

    /// Friction; `0` stops it.
    pub async fn force_friction(&mut self, value: f32) -> SessionResult<()> {
        self.send_command(Command::Friction(value)).await
    }

    /// Stop effect slot `slot` (`0` = every slot).
    pub async fn force_off(&mut self, slot: u8) -> SessionResult<()> {
        let slot = EffectSlot::from_index(slot)?;
        self.send_command(Command::ForceOff(slot)).await
    }

    /// Write a caller-built 7-byte output report as is.
    pub async fn relay(&mut self, report: Vec<u8>) -> SessionResult<()> {
        self.send_command(Command::Relay(report)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockWheelPort;

    fn session() -> (MockWheelPort, Session) {
        let port = MockWheelPort::new();
        let session = Session::new(Arc::new(port.clone()));
        (port, session)
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let (_, session) = session();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.wheel_state(), &WheelInputState::default());
        assert!(session.last_frame().is_none());
        assert_eq!(session.table().name, "logitech-g29");
    }

    #[test]
    fn test_frames_rejected_while_disconnected() {
        let (_, mut session) = session();
        assert!(matches!(
            session.process_frame(&[0; 12]),
            Err(SessionError::NotConnected(SessionState::Disconnected))
        ));
    }

    #[tokio::test]
    async fn test_commands_rejected_while_disconnected() {
        let (port, mut session) = session();
        let result = session.set_range(540).await;
        assert!(matches!(result, Err(SessionError::NotConnected(_))));
        assert!(port.written_reports().is_empty());
    }

    #[tokio::test]
    async fn test_poll_without_device() {
        let (_, mut session) = session();
        assert!(matches!(
            session.poll_frame().await,
            Err(SessionError::NotConnected(SessionState::Disconnected))
        ));
    }

    #[tokio::test]
    async fn test_invalid_command_writes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let (port, mut session) = session();
        session.connect(SessionConfig::default()).await?;
        port.clear_written();

        let result = session.leds(LedPattern::Text("12".into())).await;
        assert!(matches!(result, Err(SessionError::Protocol(_))));
        assert!(session.force_off(7).await.is_err());
        assert!(port.written_reports().is_empty());
        assert!(session.is_active(), "shape errors do not disconnect");
        Ok(())
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Initializing.to_string(), "initializing");
        assert_eq!(
            SessionError::NotConnected(SessionState::Connecting).to_string(),
            "Session not connected (state: connecting)"
        );
    }
}
