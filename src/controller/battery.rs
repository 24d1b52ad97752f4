/**
 * Discharge curve of a single LiPo cell: (minimum voltage, remaining percentage), highest
 * voltage first.
 */
const LIPO_DISCHARGE_CURVE: [(f64, u8); 21] = [
    (4.20, 100),
    (4.15, 95),
    (4.11, 90),
    (4.08, 85),
    (4.02, 80),
    (3.98, 75),
    (3.95, 70),
    (3.91, 65),
    (3.87, 60),
    (3.85, 55),
    (3.84, 50),
    (3.82, 45),
    (3.80, 40),
    (3.79, 35),
    (3.77, 30),
    (3.75, 25),
    (3.73, 20),
    (3.71, 15),
    (3.69, 10),
    (3.61, 5),
    (3.50, 1),
];

/// Maps a battery voltage in millivolts to a coarse charge percentage. Anything below
/// 3.50V (including NaN) is 0%.
pub fn lipo_voltage_to_percent(millivolts: f64) -> u8 {
    let volts = millivolts / 1000.0;

    LIPO_DISCHARGE_CURVE
        .iter()
        .find(|(minimum, _)| volts >= *minimum)
        .map(|(_, percent)| *percent)
        .unwrap_or(0)
}
