use std::time::Instant;

/// One mass sample from the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassData {
    pub mass_total: f32, // kilograms
    pub arrived: Instant,
}

impl MassData {
    pub fn now(mass_total: f32) -> Self {
        MassData { mass_total, arrived: Instant::now() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A sample tagged with the session that produced it, so that samples from a session
/// that has since been closed can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionReading {
    pub session: SessionId,
    pub data: MassData,
}

/// A decoded notification frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    CommandResponse(Vec<u8>),
    Weight(Vec<WeightSample>),
    LowPowerWarning,
    Unknown(u8),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub weight: f32,
    pub timestamp_us: u32,
}
