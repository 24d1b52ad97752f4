use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::channel::mpsc::{channel, Sender};
use futures::channel::oneshot;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::device::constants::{
    make_progressor_control_uuid, make_progressor_data_uuid, make_progressor_service_uuid,
    COMMAND_GET_BATTERY_VOLTAGE, COMMAND_START_WEIGHT_MEASUREMENT, COMMAND_STOP_WEIGHT_MEASUREMENT,
    COMMAND_TARE_SCALE, POLL_DELAY, RESPONSE_DEADLINE, SCAN_DEADLINE, WRITE_DEADLINE,
};
use crate::device::protocol::{parse_battery_millivolts, parse_frame};
use crate::device::scale::ScaleDevice;
use crate::device::types::{Frame, MassData};
use crate::error::DeviceError;

struct Link {
    peripheral: Peripheral,
    control_char: Characteristic,
    reader_cancel: CancellationToken,
    reader: JoinHandle<Result<(), DeviceError>>,
}

#[derive(Default)]
struct Subscribers {
    mass: Vec<Sender<MassData>>,
    // the Progressor answers one command at a time, on the data characteristic
    pending_response: Option<oneshot::Sender<Vec<u8>>>,
}

/// A Tindeq Progressor force gauge, reached over btleplug.
pub struct Progressor {
    name_prefix: String,
    link: tokio::sync::Mutex<Option<Link>>,
    subscribers: Arc<Mutex<Subscribers>>,
}

async fn start_scanning(manager: &Manager) -> Result<Vec<Adapter>, DeviceError> {
    let adapters = manager.adapters().await?;
    let progressor_service_uuid = make_progressor_service_uuid();

    let filter = ScanFilter {
        services: vec![progressor_service_uuid],
    };

    for adapter in &adapters {
        info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
        adapter.start_scan(filter.clone()).await?;
    }

    Ok(adapters)
}

async fn stop_scanning(adapters: &[Adapter]) {
    for adapter in adapters {
        if let Err(err) = adapter.stop_scan().await {
            warn!("Failed to stop scanning: {}", err);
        }
    }
}

async fn find_peripheral(adapters: &[Adapter], name_prefix: &str) -> Option<Peripheral> {
    let progressor_service_uuid = make_progressor_service_uuid();

    for adapter in adapters {
        let peripherals = match adapter.peripherals().await {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to query BLE adapter for peripherals: {}", err);
                continue;
            },
        };

        for peripheral in peripherals {
            match peripheral.properties().await {
                Err(err) => {
                    warn!("Could not query peripheral for properties: {:?}", err);
                },
                Ok(None) => {
                    debug!("Peripheral has no properties");
                },
                Ok(Some(properties)) => {
                    // Some platforms ignore the scan filter, and the service is not always
                    // advertised, so accept either the service or the advertised name
                    let name_matches = properties.local_name
                        .as_ref()
                        .map(|name| name.starts_with(name_prefix))
                        .unwrap_or(false);

                    if name_matches || properties.services.contains(&progressor_service_uuid) {
                        info!(
                            "Using peripheral {} {} {:?}",
                            properties.address,
                            properties.local_name.unwrap_or(String::from("NONE")),
                            properties.services,
                        );
                        return Some(peripheral);
                    }
                }
            }
        }
    }

    None
}

async fn connect_peripheral(peripheral: &Peripheral) -> Result<Characteristic, DeviceError> {
    let progressor_service_uuid = make_progressor_service_uuid();
    let data_uuid = make_progressor_data_uuid();
    let control_uuid = make_progressor_control_uuid();

    info!("Connecting to peripheral...");
    peripheral.connect().await?;

    info!("Connected; Discovering services...");
    peripheral.discover_services().await?;

    let service = peripheral.services()
        .into_iter()
        .find(|service| service.uuid == progressor_service_uuid)
        .ok_or(DeviceError::MissingCharacteristic)?;

    let data_char = service.characteristics.iter().find(|c| c.uuid == data_uuid);
    let control_char = service.characteristics.iter().find(|c| c.uuid == control_uuid);

    match (data_char, control_char) {
        (Some(data_char), Some(control_char)) => {
            info!("Subscribing to characteristic {:?} {:?}", service.uuid, data_char.uuid);
            peripheral.subscribe(data_char).await?;
            Ok(control_char.clone())
        },
        _ => Err(DeviceError::MissingCharacteristic),
    }
}

fn dispatch_frame(frame: Frame, subscribers: &Mutex<Subscribers>) {
    let mut subscribers = subscribers.lock().expect("Failed to lock Progressor subscribers");

    match frame {
        Frame::Weight(samples) => {
            for sample in samples {
                let data = MassData::now(sample.weight);

                // readings are not buffered: a subscriber that falls behind misses samples
                subscribers.mass.retain_mut(|sender| match sender.try_send(data) {
                    Ok(()) => true,
                    Err(err) if err.is_full() => {
                        debug!("Mass subscriber is full, dropping sample");
                        true
                    },
                    Err(_) => false,
                });
            }
        },
        Frame::CommandResponse(payload) => {
            match subscribers.pending_response.take() {
                Some(sender) => {
                    // the requester may have timed out already
                    let _ = sender.send(payload);
                },
                None => debug!("Unsolicited command response {:?}", payload),
            }
        },
        Frame::LowPowerWarning => warn!("Progressor reports low battery"),
        Frame::Unknown(code) => debug!("Ignoring frame with response code {}", code),
    }
}

fn read_notifications_task(cancel: CancellationToken, peripheral: &Peripheral, subscribers: Arc<Mutex<Subscribers>>) -> JoinHandle<Result<(), DeviceError>> {
    let peripheral_clone = peripheral.clone();
    let data_uuid = make_progressor_data_uuid();

    spawn(async move {
        let mut notification_stream = peripheral_clone.notifications().await?;

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                notification = notification_stream.next() => {
                    let Some(data) = notification else {
                        info!("Notification stream ended");
                        break 'mainloop;
                    };

                    if data.uuid != data_uuid {
                        continue 'mainloop;
                    }

                    match parse_frame(&data.value) {
                        Ok(frame) => dispatch_frame(frame, &subscribers),
                        Err(err) => warn!("Failed to decode frame {:?}: {}", data.value, err),
                    }
                }
            }
        }

        // ends the streams handed out by notify()
        subscribers.lock().expect("Failed to lock Progressor subscribers").mass.clear();
        Ok(())
    })
}

impl Progressor {
    pub fn new(name_prefix: &str) -> Self {
        Progressor {
            name_prefix: name_prefix.to_string(),
            link: tokio::sync::Mutex::new(None),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
        }
    }

    async fn scan_for_peripheral(&self) -> Result<Peripheral, DeviceError> {
        let manager = Manager::new().await?;
        let adapters = start_scanning(&manager).await?;
        if adapters.is_empty() {
            return Err(DeviceError::NoAdapter);
        }

        let deadline = Instant::now() + Duration::from_millis(SCAN_DEADLINE);
        let result = loop {
            if let Some(peripheral) = find_peripheral(&adapters, &self.name_prefix).await {
                break Ok(peripheral);
            }
            if Instant::now() >= deadline {
                break Err(DeviceError::NotFound { seconds: SCAN_DEADLINE / 1000 });
            }
            debug!("No peripherals matched");
            sleep(Duration::from_millis(POLL_DELAY)).await;
        };

        stop_scanning(&adapters).await;
        result
    }

    async fn write_command(&self, command: u8) -> Result<(), DeviceError> {
        let link = self.link.lock().await;
        let link = link.as_ref().ok_or(DeviceError::NotConnected)?;

        let data = [command];
        let fut = link.peripheral.write(&link.control_char, &data, WriteType::WithResponse);

        match timeout(Duration::from_millis(WRITE_DEADLINE), fut).await {
            Err(_) => Err(DeviceError::ResponseTimeout { millis: WRITE_DEADLINE }),
            Ok(result) => Ok(result?),
        }
    }
}

#[async_trait]
impl ScaleDevice for Progressor {
    async fn connect(&self) -> Result<(), DeviceError> {
        let mut link = self.link.lock().await;
        if link.is_some() {
            return Ok(());
        }

        let peripheral = self.scan_for_peripheral().await?;
        let control_char = match connect_peripheral(&peripheral).await {
            Ok(v) => v,
            Err(err) => {
                if let Err(disconnect_err) = peripheral.disconnect().await {
                    debug!("Disconnecting after failed connect: {:?}", disconnect_err);
                }
                return Err(err);
            },
        };

        let reader_cancel = CancellationToken::new();
        let reader = read_notifications_task(reader_cancel.clone(), &peripheral, self.subscribers.clone());

        info!("Peripheral ready");
        *link = Some(Link { peripheral, control_char, reader_cancel, reader });
        Ok(())
    }

    async fn notify(&self) -> Result<BoxStream<'static, MassData>, DeviceError> {
        if self.link.lock().await.is_none() {
            return Err(DeviceError::NotConnected);
        }

        let (tx, rx) = channel::<MassData>(64);
        self.subscribers.lock().expect("Failed to lock Progressor subscribers").mass.push(tx);
        Ok(rx.boxed())
    }

    async fn battery(&self) -> Result<u32, DeviceError> {
        let (tx, rx) = oneshot::channel();
        self.subscribers.lock().expect("Failed to lock Progressor subscribers").pending_response = Some(tx);

        self.write_command(COMMAND_GET_BATTERY_VOLTAGE).await?;

        match timeout(Duration::from_millis(RESPONSE_DEADLINE), rx).await {
            Err(_) => Err(DeviceError::ResponseTimeout { millis: RESPONSE_DEADLINE }),
            Ok(Err(_)) => Err(DeviceError::NotConnected),
            Ok(Ok(payload)) => parse_battery_millivolts(&payload),
        }
    }

    async fn tare(&self) -> Result<(), DeviceError> {
        self.write_command(COMMAND_TARE_SCALE).await
    }

    async fn stream(&self) -> Result<(), DeviceError> {
        self.write_command(COMMAND_START_WEIGHT_MEASUREMENT).await
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        if let Err(err) = self.write_command(COMMAND_STOP_WEIGHT_MEASUREMENT).await {
            debug!("Failed to stop weight measurement: {}", err);
        }

        let Some(link) = self.link.lock().await.take() else {
            return Ok(());
        };

        link.reader_cancel.cancel();
        match link.reader.await {
            Err(err) => error!("Failed to join read notifications task: {}", err),
            Ok(Err(err)) => warn!("Error during read notifications task: {}", err),
            Ok(Ok(())) => {},
        }

        info!("Disconnecting from peripheral");
        link.peripheral.disconnect().await?;
        Ok(())
    }
}
