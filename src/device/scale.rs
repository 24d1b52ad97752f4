//! The seam between the controller and a concrete scale.

use std::sync::Arc;
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::device::types::MassData;
use crate::error::DeviceError;

/// Operations of a Bluetooth force scale. Implemented by [`crate::device::progressor::Progressor`]
/// for real hardware, by [`crate::device::simulated::SimulatedScale`] for use without
/// hardware, and by test doubles.
#[async_trait]
pub trait ScaleDevice: Send + Sync {
    /// Find and connect to the scale.
    async fn connect(&self) -> Result<(), DeviceError>;

    /// Subscribe to mass readings. The stream ends when the device disconnects.
    async fn notify(&self) -> Result<BoxStream<'static, MassData>, DeviceError>;

    /// Read the battery voltage in millivolts.
    async fn battery(&self) -> Result<u32, DeviceError>;

    /// Zero the scale.
    async fn tare(&self) -> Result<(), DeviceError>;

    /// Start streaming mass readings to the `notify` subscribers.
    async fn stream(&self) -> Result<(), DeviceError>;

    async fn disconnect(&self) -> Result<(), DeviceError>;
}

/// Creates a fresh, unconnected device for every connection attempt.
pub type DeviceFactory = Box<dyn Fn() -> Arc<dyn ScaleDevice> + Send + Sync>;
