use crate::device::constants::{
    MINIMUM_MASS, RESPONSE_COMMAND, RESPONSE_LOW_POWER_WARNING, RESPONSE_WEIGHT_MEASUREMENT, WEIGHT_SAMPLE_SIZE,
};
use crate::device::types::{Frame, WeightSample};
use crate::error::DeviceError;

// Frames are laid out as [response code, payload length, payload...]
pub fn parse_frame(data: &[u8]) -> Result<Frame, DeviceError> {
    if data.len() < 2 {
        return Err(DeviceError::MalformedFrame { reason: "frame shorter than its header" });
    }

    let code = data[0];
    let length = usize::from(data[1]);
    let payload = data.get(2..2 + length)
        .ok_or(DeviceError::MalformedFrame { reason: "payload shorter than its declared length" })?;

    match code {
        RESPONSE_COMMAND => Ok(Frame::CommandResponse(payload.to_vec())),
        RESPONSE_WEIGHT_MEASUREMENT => {
            if payload.len() % WEIGHT_SAMPLE_SIZE != 0 {
                return Err(DeviceError::MalformedFrame { reason: "weight payload is not a whole number of samples" });
            }

            let samples = payload
                .chunks_exact(WEIGHT_SAMPLE_SIZE)
                .map(|chunk| {
                    let weight = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    let timestamp_us = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
                    WeightSample { weight: weight.max(MINIMUM_MASS), timestamp_us }
                })
                .collect();

            Ok(Frame::Weight(samples))
        },
        RESPONSE_LOW_POWER_WARNING => Ok(Frame::LowPowerWarning),
        other => Ok(Frame::Unknown(other)),
    }
}

/// Decodes the reply to a battery voltage request.
pub fn parse_battery_millivolts(payload: &[u8]) -> Result<u32, DeviceError> {
    match payload {
        [a, b, c, d, ..] => Ok(u32::from_le_bytes([*a, *b, *c, *d])),
        _ => Err(DeviceError::MalformedFrame { reason: "battery response shorter than 4 bytes" }),
    }
}
