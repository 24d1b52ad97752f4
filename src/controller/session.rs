use std::sync::Arc;
use std::time::Duration;
use futures::channel::mpsc::Sender;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::spawn;
use tokio_util::sync::CancellationToken;

use crate::controller::battery::lipo_voltage_to_percent;
use crate::controller::jump::{parse_threshold, JumpTrigger};
use crate::device::scale::{DeviceFactory, ScaleDevice};
use crate::device::types::{MassData, SessionId, SessionReading};
use crate::error::{ControlError, DeviceError};
use crate::ui::document::Document;
use crate::ui::reflector::{
    set_threshold_text, toggle_panel, update_battery_display, update_connection_status, update_weight_display,
    ConnectionStatus, NO_VALUE,
};

/// Receives the jumps produced by the trigger.
pub trait JumpSink: Send + Sync {
    fn jump(&mut self);
}

/// Emitted by the reading forwarder of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    Reading(SessionReading),
    // the device ended the reading stream on its own
    Lost(SessionId),
}

enum Session {
    Absent,
    Connecting {
        id: SessionId,
        device: Arc<dyn ScaleDevice>,
    },
    Connected {
        id: SessionId,
        device: Arc<dyn ScaleDevice>,
        // cancels the reading forwarder of this session
        cancel: CancellationToken,
    },
}

/// Owns the single device session and the element document, and applies every user
/// action and scale reading to both.
pub struct ScaleController {
    factory: DeviceFactory,
    document: Document,
    jump_sink: Box<dyn JumpSink>,
    session_events: Sender<SessionEvent>,

    session: Session,
    last_session_id: u64,

    trigger: JumpTrigger,
    current_weight: f32,
    panel_expanded: bool,
    initialized: bool,
}

fn forward_readings(
    cancel: CancellationToken,
    session: SessionId,
    mut readings: BoxStream<'static, MassData>,
    mut sender: Sender<SessionEvent>,
) {
    spawn(async move {
        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                data = readings.next() => {
                    let event = match data {
                        Some(data) => SessionEvent::Reading(SessionReading { session, data }),
                        None => SessionEvent::Lost(session),
                    };
                    let lost = matches!(event, SessionEvent::Lost(_));

                    if sender.send(event).await.is_err() || lost {
                        break 'mainloop;
                    }
                }
            }
        }

        debug!("Reading forwarder of session {} stopped", session);
    });
}

async fn start_streaming(device: &dyn ScaleDevice) -> Result<(), DeviceError> {
    info!("Performing tare...");
    device.tare().await?;
    info!("Starting stream...");
    device.stream().await
}

// Disconnects in the background; nobody waits for a released device.
fn release_device(device: Arc<dyn ScaleDevice>) {
    spawn(async move {
        if let Err(err) = device.disconnect().await {
            warn!("Failed to disconnect device: {}", err);
        }
    });
}

impl ScaleController {
    pub fn new(
        factory: DeviceFactory,
        document: Document,
        jump_sink: Box<dyn JumpSink>,
        session_events: Sender<SessionEvent>,
        threshold: f32,
        debounce: Duration,
    ) -> Self {
        ScaleController {
            factory,
            document,
            jump_sink,
            session_events,
            session: Session::Absent,
            last_session_id: 0,
            trigger: JumpTrigger::new(threshold, debounce),
            current_weight: 0.0,
            panel_expanded: false,
            initialized: false,
        }
    }

    /// Puts the document in its initial, disconnected state. Only the first call has any
    /// effect; returns whether this call did the initialization.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            return false;
        }

        info!("Initializing scale control...");
        self.reset_ui();
        set_threshold_text(&mut self.document, &self.trigger.threshold().to_string());
        self.initialized = true;
        true
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn threshold(&self) -> f32 {
        self.trigger.threshold()
    }

    pub fn current_weight(&self) -> f32 {
        self.current_weight
    }

    pub fn panel_expanded(&self) -> bool {
        self.panel_expanded
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.session {
            Session::Absent => ConnectionStatus::Disconnected,
            Session::Connecting { .. } => ConnectionStatus::Connecting,
            Session::Connected { .. } => ConnectionStatus::Connected,
        }
    }

    /// The id of the session readings are currently accepted from.
    pub fn connected_session(&self) -> Option<SessionId> {
        match self.session {
            Session::Connected { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Connects a new device: connect, subscribe to readings, read the battery, tare and
    /// start streaming. Any failure except reading the battery releases the device and
    /// leaves the controller disconnected.
    pub async fn connect(&mut self) -> Result<(), ControlError> {
        if !self.begin_connect() {
            return Ok(());
        }
        self.finish_connect().await
    }

    /// First half of [`ScaleController::connect`]: opens a session and shows the
    /// connecting state. Returns false if a session is already active.
    pub fn begin_connect(&mut self) -> bool {
        if !matches!(self.session, Session::Absent) {
            warn!("Ignoring connect request, a session is already active");
            return false;
        }

        info!("Attempting to connect to Progressor...");
        update_connection_status(&mut self.document, ConnectionStatus::Connecting, self.current_weight);

        self.last_session_id += 1;
        let id = SessionId(self.last_session_id);
        let device = (self.factory)();
        self.session = Session::Connecting { id, device };
        true
    }

    /// Second half of [`ScaleController::connect`]: brings up the device of the session
    /// opened by [`ScaleController::begin_connect`].
    pub async fn finish_connect(&mut self) -> Result<(), ControlError> {
        let (id, device) = match &self.session {
            Session::Connecting { id, device } => (*id, device.clone()),
            _ => return Ok(()),
        };

        match self.establish(id, device.clone()).await {
            Ok(cancel) => {
                info!("Session {} streaming", id);
                self.session = Session::Connected { id, device, cancel };
                Ok(())
            },
            Err(err) => {
                error!("Connection failed: {}", err);
                self.session = Session::Absent;
                release_device(device);
                self.reset_ui();
                Err(ControlError::Connection { source: err })
            },
        }
    }

    async fn establish(&mut self, id: SessionId, device: Arc<dyn ScaleDevice>) -> Result<CancellationToken, DeviceError> {
        device.connect().await?;
        info!("Progressor connected successfully");
        update_connection_status(&mut self.document, ConnectionStatus::Connected, self.current_weight);

        let readings = device.notify().await?;
        let cancel = CancellationToken::new();
        forward_readings(cancel.clone(), id, readings, self.session_events.clone());

        match device.battery().await {
            Ok(millivolts) => {
                let percent = lipo_voltage_to_percent(f64::from(millivolts));
                update_battery_display(&mut self.document, &format!("{}%", percent));
                info!("Battery level: {}% ({} mV)", percent, millivolts);
            },
            Err(err) => error!("Error getting battery level: {}", err),
        }

        match start_streaming(device.as_ref()).await {
            Ok(()) => Ok(cancel),
            Err(err) => {
                cancel.cancel();
                Err(err)
            },
        }
    }

    pub async fn tare(&mut self) -> Result<(), ControlError> {
        let device = match &self.session {
            Session::Absent => {
                error!("Progressor not connected");
                return Err(ControlError::NotConnected);
            },
            Session::Connecting { device, .. } | Session::Connected { device, .. } => device.clone(),
        };

        info!("Performing manual tare...");
        device.tare().await.map_err(|err| {
            error!("Tare failed: {}", err);
            ControlError::Tare { source: err }
        })
    }

    /// Ends the session, if any, and resets the document. Safe to call at any time.
    pub fn disconnect(&mut self) {
        match std::mem::replace(&mut self.session, Session::Absent) {
            Session::Absent => {},
            Session::Connecting { id, device } => {
                info!("Abandoning session {}", id);
                release_device(device);
            },
            Session::Connected { id, device, cancel } => {
                info!("Disconnecting Progressor (session {})...", id);
                cancel.cancel();
                release_device(device);
            },
        }

        self.reset_ui();
    }

    fn reset_ui(&mut self) {
        update_connection_status(&mut self.document, ConnectionStatus::Disconnected, self.current_weight);
        update_weight_display(&mut self.document, None, false, self.trigger.threshold());
        update_battery_display(&mut self.document, NO_VALUE);
    }

    /// Returns true if the event caused a jump.
    pub fn handle_session_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Reading(reading) => self.handle_reading(reading),
            SessionEvent::Lost(id) => {
                if self.connected_session() == Some(id) {
                    warn!("Progressor stopped sending readings, disconnecting");
                    self.disconnect();
                }
                false
            },
        }
    }

    /// Shows the reading and fires the jump sink when the trigger allows it. Readings
    /// from any session other than the connected one are dropped.
    pub fn handle_reading(&mut self, reading: SessionReading) -> bool {
        if self.connected_session() != Some(reading.session) {
            debug!("Dropping reading from stale session {}", reading.session);
            return false;
        }

        self.current_weight = reading.data.mass_total;
        update_weight_display(&mut self.document, Some(self.current_weight), true, self.trigger.threshold());

        if !self.trigger.evaluate(self.current_weight, reading.data.arrived) {
            return false;
        }

        info!("Triggering jump - weight: {} kg, threshold: {} kg", self.current_weight, self.trigger.threshold());
        self.jump_sink.jump();
        true
    }

    pub fn set_threshold_input(&mut self, text: &str) {
        let threshold = parse_threshold(text);
        self.trigger.set_threshold(threshold);
        set_threshold_text(&mut self.document, text);
        info!("Jump threshold updated to: {} kg", threshold);
    }

    pub fn toggle_panel(&mut self) {
        toggle_panel(&mut self.document, &mut self.panel_expanded);
    }

    pub fn close_panel(&mut self) {
        if self.panel_expanded {
            self.toggle_panel();
        }
    }
}
