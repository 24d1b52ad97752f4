use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use futures::StreamExt;
use futures::channel::mpsc::{channel, Sender};
use log::{info, warn};
use tokio_util::sync::CancellationToken;
use rdev::{EventType, simulate};

use crate::controller::session::JumpSink;
use crate::sim::types::{Button, InputSimCommand};

/**
 * How long (milliseconds) a tapped button is held down. Games polling input once per
 * frame miss shorter taps.
 */
const TAP_DURATION: u64 = 40;

fn send(event_type: &EventType) {
    if let Err(err) = simulate(event_type) {
        warn!("Failed to simulate {:?}: {:?}", event_type, err);
    }
}

async fn tap(button: Button) {
    if let Some(btn) = button.rdev_mouse_button() {
        send(&EventType::ButtonPress(btn));
        sleep(Duration::from_millis(TAP_DURATION)).await;
        send(&EventType::ButtonRelease(btn));
    }
    else if let Some(key) = button.rdev_key() {
        send(&EventType::KeyPress(key));
        sleep(Duration::from_millis(TAP_DURATION)).await;
        send(&EventType::KeyRelease(key));
    }
}

pub fn input_sim_task(cancel: CancellationToken) -> (Sender<InputSimCommand>, JoinHandle<()>) {
    let (tx, mut rx) = channel::<InputSimCommand>(16);

    let handle = spawn(async move {
        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(command) = rx.next() => {
                    match command {
                        InputSimCommand::Tap(button) => tap(button).await,
                    }
                },
            }
        }
    });

    return (tx, handle);
}

/// Jumps by tapping `button` through the input simulation task.
pub struct KeyTapJump {
    sender: Sender<InputSimCommand>,
    button: Button,
}

impl KeyTapJump {
    pub fn new(sender: Sender<InputSimCommand>, button: Button) -> Self {
        KeyTapJump { sender, button }
    }
}

impl JumpSink for KeyTapJump {
    fn jump(&mut self) {
        info!("Tapping {} for a jump", self.button);
        if let Err(err) = self.sender.try_send(InputSimCommand::Tap(self.button)) {
            // a tap is still in progress, or the task has stopped
            warn!("Dropping jump: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc::channel;

    #[test]
    fn jump_queues_a_tap() {
        let (tx, mut rx) = channel::<InputSimCommand>(4);
        let mut sink = KeyTapJump::new(tx, Button::ArrowUp);

        sink.jump();

        match rx.try_next() {
            Ok(Some(InputSimCommand::Tap(Button::ArrowUp))) => {},
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn jump_survives_a_stopped_task() {
        let (tx, rx) = channel::<InputSimCommand>(4);
        drop(rx);
        let mut sink = KeyTapJump::new(tx, Button::Space);

        sink.jump();
    }
}
