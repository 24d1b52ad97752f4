use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use futures::channel::mpsc::{channel, Sender};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::info;
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::device::scale::ScaleDevice;
use crate::device::types::MassData;
use crate::error::DeviceError;

/**
 * How long (milliseconds) the simulated scale takes to connect.
 */
const CONNECT_DELAY: u64 = 500;

/**
 * Time (microseconds) between two simulated samples; the Progressor samples at 80 Hz.
 */
const SAMPLE_INTERVAL: u64 = 12_500;

/**
 * Length (milliseconds) of one rest + pull cycle, and of the pull at its end.
 */
const CYCLE: u64 = 2000;
const PULL: u64 = 400;

/**
 * Load (kilograms) on the simulated scale while resting, before tare.
 */
const RESTING_LOAD: f32 = 0.4;

const BATTERY_MILLIVOLTS: u32 = 3960;

/// Raw load at `elapsed` since connecting: a resting load with a pull of `pull` kg at
/// the end of every cycle.
pub fn simulated_load(elapsed: Duration, pull: f32) -> f32 {
    let in_cycle = elapsed.as_millis() as u64 % CYCLE;
    if in_cycle >= CYCLE - PULL {
        RESTING_LOAD + pull
    } else {
        RESTING_LOAD
    }
}

#[derive(Default)]
struct SimulatedState {
    connected_at: Option<Instant>,
    offset: f32,
    subscribers: Vec<Sender<MassData>>,
    streamer: Option<(CancellationToken, JoinHandle<()>)>,
}

/// A scale that needs no hardware, for trying out the application.
pub struct SimulatedScale {
    pull: f32,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedScale {
    pub fn new(pull: f32) -> Self {
        SimulatedScale {
            pull,
            state: Arc::new(Mutex::new(SimulatedState::default())),
        }
    }

    fn connected_at(&self) -> Result<Instant, DeviceError> {
        self.state.lock().expect("Failed to lock simulated scale").connected_at.ok_or(DeviceError::NotConnected)
    }
}

fn stream_task(cancel: CancellationToken, pull: f32, state: Arc<Mutex<SimulatedState>>) -> JoinHandle<()> {
    spawn(async move {
        let mut ticks = interval(Duration::from_micros(SAMPLE_INTERVAL));

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                now = ticks.tick() => {
                    let mut state = state.lock().expect("Failed to lock simulated scale");
                    let Some(connected_at) = state.connected_at else {
                        break 'mainloop;
                    };

                    let load = simulated_load(now.duration_since(connected_at), pull) - state.offset;
                    let data = MassData { mass_total: load, arrived: now.into_std() };
                    state.subscribers.retain_mut(|sender| match sender.try_send(data) {
                        Ok(()) => true,
                        Err(err) => err.is_full(),
                    });
                }
            }
        }
    })
}

#[async_trait]
impl ScaleDevice for SimulatedScale {
    async fn connect(&self) -> Result<(), DeviceError> {
        sleep(Duration::from_millis(CONNECT_DELAY)).await;
        info!("Simulated scale connected");
        self.state.lock().expect("Failed to lock simulated scale").connected_at = Some(Instant::now());
        Ok(())
    }

    async fn notify(&self) -> Result<BoxStream<'static, MassData>, DeviceError> {
        self.connected_at()?;
        let (tx, rx) = channel::<MassData>(64);
        self.state.lock().expect("Failed to lock simulated scale").subscribers.push(tx);
        Ok(rx.boxed())
    }

    async fn battery(&self) -> Result<u32, DeviceError> {
        self.connected_at()?;
        Ok(BATTERY_MILLIVOLTS)
    }

    async fn tare(&self) -> Result<(), DeviceError> {
        let connected_at = self.connected_at()?;
        let load = simulated_load(connected_at.elapsed(), self.pull);
        self.state.lock().expect("Failed to lock simulated scale").offset = load;
        Ok(())
    }

    async fn stream(&self) -> Result<(), DeviceError> {
        self.connected_at()?;
        let mut state = self.state.lock().expect("Failed to lock simulated scale");
        if state.streamer.is_none() {
            let cancel = CancellationToken::new();
            let handle = stream_task(cancel.clone(), self.pull, self.state.clone());
            state.streamer = Some((cancel, handle));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        let streamer = {
            let mut state = self.state.lock().expect("Failed to lock simulated scale");
            state.connected_at = None;
            state.subscribers.clear();
            state.streamer.take()
        };

        if let Some((cancel, handle)) = streamer {
            cancel.cancel();
            if let Err(err) = handle.await {
                return Err(DeviceError::Other(format!("Failed to join simulated stream task: {}", err)));
            }
        }

        info!("Simulated scale disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_follows_the_cycle() {
        assert_eq!(simulated_load(Duration::from_millis(0), 8.0), RESTING_LOAD);
        assert_eq!(simulated_load(Duration::from_millis(1599), 8.0), RESTING_LOAD);
        assert_eq!(simulated_load(Duration::from_millis(1600), 8.0), RESTING_LOAD + 8.0);
        assert_eq!(simulated_load(Duration::from_millis(2000), 8.0), RESTING_LOAD);
    }

    #[tokio::test]
    async fn operations_need_a_connection() {
        let scale = SimulatedScale::new(8.0);

        assert!(matches!(scale.battery().await, Err(DeviceError::NotConnected)));
        assert!(matches!(scale.tare().await, Err(DeviceError::NotConnected)));
        assert!(scale.notify().await.is_err());
    }

    #[tokio::test]
    async fn streams_tared_readings_until_disconnect() {
        let scale = SimulatedScale::new(8.0);
        scale.connect().await.unwrap();
        assert_eq!(scale.battery().await.unwrap(), BATTERY_MILLIVOLTS);

        let mut readings = scale.notify().await.unwrap();
        scale.tare().await.unwrap();
        scale.stream().await.unwrap();

        let first = readings.next().await.unwrap();
        assert!(first.mass_total.abs() < 0.001, "resting load should be tared, got {}", first.mass_total);

        scale.disconnect().await.unwrap();
        // drain whatever was sent before the disconnect, then the stream ends
        while readings.next().await.is_some() {}
    }
}
