use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use futures::channel::mpsc::{channel, Receiver, SendError, Sender};
use futures::{SinkExt, StreamExt};
use iced_futures::subscription::{self, Subscription};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::config::types::Config;
use crate::controller::session::{ScaleController, SessionEvent};
use crate::device::progressor::Progressor;
use crate::device::scale::{DeviceFactory, ScaleDevice};
use crate::device::simulated::SimulatedScale;
use crate::sim::input_sim::{input_sim_task, KeyTapJump};
use crate::ui::document::Document;

/**
 * Weight (kilograms) the simulated scale is pulled with.
 */
const SIMULATED_PULL: f32 = 8.0;

#[derive(Debug, Clone)]
pub enum ControlCommand {
    Connect,
    Tare,
    Disconnect,
    ThresholdInput(String),
    TogglePanel,
    ClosePanel,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    // the controller is running and accepts commands on this sender
    Ready(Sender<ControlCommand>),
    Document(Document),
    Alert(String),
}

pub fn make_device_factory(config: &Config) -> DeviceFactory {
    if config.simulate {
        info!("Using a simulated scale");
        return Box::new(|| Arc::new(SimulatedScale::new(SIMULATED_PULL)) as Arc<dyn ScaleDevice>);
    }

    let name_prefix = config.device_name_prefix.clone();
    Box::new(move || Arc::new(Progressor::new(&name_prefix)) as Arc<dyn ScaleDevice>)
}

async fn publish_document(
    controller: &ScaleController,
    published: &mut Document,
    output: &mut Sender<ControllerEvent>,
) -> Result<(), SendError> {
    if controller.document() != &*published {
        *published = controller.document().clone();
        output.send(ControllerEvent::Document(published.clone())).await?;
    }
    Ok(())
}

// Returns the alert to show, if any.
async fn apply_command(
    controller: &mut ScaleController,
    command: ControlCommand,
    published: &mut Document,
    output: &mut Sender<ControllerEvent>,
) -> Result<Option<String>, SendError> {
    match command {
        ControlCommand::Connect => {
            if !controller.begin_connect() {
                return Ok(None);
            }

            // searching for the scale takes a while, show that it is happening
            publish_document(controller, published, output).await?;

            if let Err(err) = controller.finish_connect().await {
                return Ok(Some(err.to_string()));
            }
        },
        ControlCommand::Tare => {
            // failures are logged by the controller
            let _ = controller.tare().await;
        },
        ControlCommand::Disconnect => controller.disconnect(),
        ControlCommand::ThresholdInput(text) => controller.set_threshold_input(&text),
        ControlCommand::TogglePanel => controller.toggle_panel(),
        ControlCommand::ClosePanel => controller.close_panel(),
    }

    Ok(None)
}

/// Runs `controller` until `cancel` fires or the receiving end of `output` goes away,
/// publishing a new document after every change.
pub async fn run_controller(
    cancel: CancellationToken,
    mut controller: ScaleController,
    mut commands: Receiver<ControlCommand>,
    mut session_events: Receiver<SessionEvent>,
    mut output: Sender<ControllerEvent>,
) {
    controller.initialize();
    let mut published = controller.document().clone();
    if output.send(ControllerEvent::Document(published.clone())).await.is_err() {
        return;
    }

    'mainloop: loop {
        let mut alert: Option<String> = None;

        tokio::select! {
            _ = cancel.cancelled() => {
                break 'mainloop;
            },
            Some(command) = commands.next() => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        break 'mainloop;
                    },
                    result = apply_command(&mut controller, command, &mut published, &mut output) => {
                        match result {
                            Ok(result) => alert = result,
                            Err(_) => break 'mainloop,
                        }
                    }
                }
            },
            Some(event) = session_events.next() => {
                controller.handle_session_event(event);
            },
            else => {
                break 'mainloop;
            },
        }

        if publish_document(&controller, &mut published, &mut output).await.is_err() {
            break 'mainloop;
        }

        if let Some(message) = alert {
            if output.send(ControllerEvent::Alert(message)).await.is_err() {
                break 'mainloop;
            }
        }
    }

    controller.disconnect();
    info!("Scale controller stopped");
}

async fn controller_main(cancel: CancellationToken, config: Config, mut output: Sender<ControllerEvent>) {
    let (command_sender, command_receiver) = channel::<ControlCommand>(32);
    let (session_event_sender, session_event_receiver) = channel::<SessionEvent>(256);
    let (input_sim_sender, input_sim_handle) = input_sim_task(cancel.clone());

    let controller = ScaleController::new(
        make_device_factory(&config),
        Document::with_all_elements(),
        Box::new(KeyTapJump::new(input_sim_sender, config.jump_button)),
        session_event_sender,
        config.threshold,
        Duration::from_millis(config.debounce_ms),
    );

    if output.send(ControllerEvent::Ready(command_sender)).await.is_err() {
        error!("Application went away before the scale controller started");
        return;
    }

    run_controller(cancel, controller, command_receiver, session_event_receiver, output).await;

    if let Err(err) = input_sim_handle.await {
        error!("Failed to join input_sim_task: {}", err);
    }
}

pub fn controller_subscription(cancel: CancellationToken, config: Config) -> Subscription<ControllerEvent> {
    struct Controller;

    subscription::channel(
        std::any::TypeId::of::<Controller>(),
        64,
        move |output| async move {
            controller_main(cancel, config, output).await;

            // note: subscription::channel expects the future to never resolve (Infallible)
            futures::future::pending::<Infallible>().await
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use futures::stream::BoxStream;

    use crate::controller::session::JumpSink;
    use crate::device::types::MassData;
    use crate::error::DeviceError;
    use crate::ui::document::ElementId;

    // a scale that is never found
    struct MissingScale;

    #[async_trait]
    impl ScaleDevice for MissingScale {
        async fn connect(&self) -> Result<(), DeviceError> {
            Err(DeviceError::NotFound { seconds: 10 })
        }

        async fn notify(&self) -> Result<BoxStream<'static, MassData>, DeviceError> {
            Err(DeviceError::NotConnected)
        }

        async fn battery(&self) -> Result<u32, DeviceError> {
            Err(DeviceError::NotConnected)
        }

        async fn tare(&self) -> Result<(), DeviceError> {
            Err(DeviceError::NotConnected)
        }

        async fn stream(&self) -> Result<(), DeviceError> {
            Err(DeviceError::NotConnected)
        }

        async fn disconnect(&self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    struct CountingJump(Arc<AtomicUsize>);

    impl JumpSink for CountingJump {
        fn jump(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn simulated_controller(session_events: Sender<SessionEvent>, jumps: Arc<AtomicUsize>) -> ScaleController {
        let config = Config { simulate: true, ..Config::default() };

        ScaleController::new(
            make_device_factory(&config),
            Document::with_all_elements(),
            Box::new(CountingJump(jumps)),
            session_events,
            config.threshold,
            Duration::from_millis(config.debounce_ms),
        )
    }

    fn missing_scale_controller(session_events: Sender<SessionEvent>) -> ScaleController {
        ScaleController::new(
            Box::new(|| Arc::new(MissingScale) as Arc<dyn ScaleDevice>),
            Document::with_all_elements(),
            Box::new(CountingJump(Arc::new(AtomicUsize::new(0)))),
            session_events,
            5.0,
            Duration::from_millis(300),
        )
    }

    async fn next_document(output: &mut Receiver<ControllerEvent>) -> Document {
        loop {
            match output.next().await {
                Some(ControllerEvent::Document(document)) => return document,
                Some(_) => {},
                None => panic!("controller stopped"),
            }
        }
    }

    #[tokio::test]
    async fn publishes_initial_document_and_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let (_command_tx, command_rx) = channel::<ControlCommand>(4);
        let (event_tx, event_rx) = channel::<SessionEvent>(4);
        let (output_tx, mut output_rx) = channel::<ControllerEvent>(16);
        let controller = simulated_controller(event_tx, Arc::new(AtomicUsize::new(0)));

        let handle = tokio::spawn(run_controller(cancel.clone(), controller, command_rx, event_rx, output_tx));

        let document = next_document(&mut output_rx).await;
        assert_eq!(document.text(ElementId::ConnectionStatus), Some("Disconnected"));
        assert_eq!(document.text(ElementId::ThresholdInput), Some("5"));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn commands_update_the_document() {
        let cancel = CancellationToken::new();
        let (mut command_tx, command_rx) = channel::<ControlCommand>(4);
        let (event_tx, event_rx) = channel::<SessionEvent>(4);
        let (output_tx, mut output_rx) = channel::<ControllerEvent>(16);
        let controller = simulated_controller(event_tx, Arc::new(AtomicUsize::new(0)));

        let handle = tokio::spawn(run_controller(cancel.clone(), controller, command_rx, event_rx, output_tx));
        next_document(&mut output_rx).await;

        command_tx.send(ControlCommand::ThresholdInput("9".to_string())).await.unwrap();
        let document = next_document(&mut output_rx).await;
        assert_eq!(document.text(ElementId::ThresholdInput), Some("9"));

        command_tx.send(ControlCommand::TogglePanel).await.unwrap();
        let document = next_document(&mut output_rx).await;
        assert!(document.has_class(ElementId::ControlPanel, "expanded"));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn tare_without_session_changes_nothing() {
        let cancel = CancellationToken::new();
        let (mut command_tx, command_rx) = channel::<ControlCommand>(4);
        let (event_tx, event_rx) = channel::<SessionEvent>(4);
        let (output_tx, mut output_rx) = channel::<ControllerEvent>(16);
        let controller = simulated_controller(event_tx, Arc::new(AtomicUsize::new(0)));

        let handle = tokio::spawn(run_controller(cancel.clone(), controller, command_rx, event_rx, output_tx));
        next_document(&mut output_rx).await;

        command_tx.send(ControlCommand::Tare).await.unwrap();
        command_tx.send(ControlCommand::ThresholdInput("6".to_string())).await.unwrap();

        // the first document after the initial one is caused by the threshold, no alerts
        match output_rx.next().await {
            Some(ControllerEvent::Document(document)) => {
                assert_eq!(document.text(ElementId::ThresholdInput), Some("6"));
            },
            other => panic!("unexpected event {:?}", other),
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn connect_failure_publishes_states_then_alert() {
        let cancel = CancellationToken::new();
        let (mut command_tx, command_rx) = channel::<ControlCommand>(4);
        let (event_tx, event_rx) = channel::<SessionEvent>(4);
        let (output_tx, mut output_rx) = channel::<ControllerEvent>(16);
        let controller = missing_scale_controller(event_tx);

        let handle = tokio::spawn(run_controller(cancel.clone(), controller, command_rx, event_rx, output_tx));
        next_document(&mut output_rx).await;

        command_tx.send(ControlCommand::Connect).await.unwrap();

        match output_rx.next().await {
            Some(ControllerEvent::Document(document)) => {
                assert_eq!(document.text(ElementId::ConnectionStatus), Some("Connecting..."));
                assert_eq!(document.is_disabled(ElementId::ConnectButton), Some(true));
            },
            other => panic!("unexpected event {:?}", other),
        }
        match output_rx.next().await {
            Some(ControllerEvent::Document(document)) => {
                assert_eq!(document.text(ElementId::ConnectionStatus), Some("Disconnected"));
                assert_eq!(document.is_disabled(ElementId::ConnectButton), Some(false));
            },
            other => panic!("unexpected event {:?}", other),
        }
        match output_rx.next().await {
            Some(ControllerEvent::Alert(message)) => {
                assert_eq!(message, "Connection failed: No Progressor was found within 10 seconds");
            },
            other => panic!("unexpected event {:?}", other),
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn simulated_pull_triggers_a_jump() {
        let cancel = CancellationToken::new();
        let (mut command_tx, command_rx) = channel::<ControlCommand>(4);
        let (event_tx, event_rx) = channel::<SessionEvent>(256);
        let (output_tx, mut output_rx) = channel::<ControllerEvent>(16);
        let jumps = Arc::new(AtomicUsize::new(0));
        let controller = simulated_controller(event_tx, jumps.clone());

        let handle = tokio::spawn(run_controller(cancel.clone(), controller, command_rx, event_rx, output_tx));
        next_document(&mut output_rx).await;

        command_tx.send(ControlCommand::Connect).await.unwrap();

        // the simulated scale is pulled 1.6 seconds into every 2 second cycle
        let wait = async {
            while jumps.load(Ordering::SeqCst) == 0 {
                match output_rx.next().await {
                    Some(ControllerEvent::Alert(message)) => panic!("unexpected alert {}", message),
                    Some(_) => {},
                    None => panic!("controller stopped"),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait).await.unwrap();

        cancel.cancel();
        handle.await.unwrap();
    }
}
