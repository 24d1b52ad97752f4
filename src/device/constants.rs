use uuid::Uuid;

/**
 * How often (milliseconds) to look for the scale in the scan results.
 */
pub const POLL_DELAY: u64 = 250;

/**
 * How long (milliseconds) to scan for the scale before giving up.
 */
pub const SCAN_DEADLINE: u64 = 10_000;

/**
 * How long (milliseconds) a write to a characteristic may take.
 */
pub const WRITE_DEADLINE: u64 = 2000;

/**
 * How long (milliseconds) to wait for the response to a command.
 */
pub const RESPONSE_DEADLINE: u64 = 2000;

/**
 * The UUID of the Bluetooth BLE service of the Progressor
 */
pub const PROGRESSOR_SERVICE: &str = "7e4e1701-1ea6-40c9-9dcc-13d34ffead57";

/**
 * The UUID of the characteristic the Progressor sends its notification frames on.
 */
pub const PROGRESSOR_DATA_CHARACTERISTIC: &str = "7e4e1702-1ea6-40c9-9dcc-13d34ffead57";

/**
 * The UUID of the characteristic to write commands to.
 */
pub const PROGRESSOR_CONTROL_CHARACTERISTIC: &str = "7e4e1703-1ea6-40c9-9dcc-13d34ffead57";

pub const DEFAULT_NAME_PREFIX: &str = "Progressor";

pub const COMMAND_TARE_SCALE: u8 = 0x64; // d
pub const COMMAND_START_WEIGHT_MEASUREMENT: u8 = 0x65; // e
pub const COMMAND_STOP_WEIGHT_MEASUREMENT: u8 = 0x66; // f
pub const COMMAND_GET_BATTERY_VOLTAGE: u8 = 0x6F; // o

pub const RESPONSE_COMMAND: u8 = 0x00;
pub const RESPONSE_WEIGHT_MEASUREMENT: u8 = 0x01;
pub const RESPONSE_LOW_POWER_WARNING: u8 = 0x04;

/**
 * Size of one (f32 weight, u32 timestamp) pair in a weight frame.
 */
pub const WEIGHT_SAMPLE_SIZE: usize = 8;

/**
 * Readings below this value are clamped, the load cell reports garbage when overloaded
 * in the pushing direction.
 */
pub const MINIMUM_MASS: f32 = -1000.0;

pub fn make_progressor_service_uuid() -> Uuid {
    Uuid::parse_str(PROGRESSOR_SERVICE).unwrap()
}

pub fn make_progressor_data_uuid() -> Uuid {
    Uuid::parse_str(PROGRESSOR_DATA_CHARACTERISTIC).unwrap()
}

pub fn make_progressor_control_uuid() -> Uuid {
    Uuid::parse_str(PROGRESSOR_CONTROL_CHARACTERISTIC).unwrap()
}
