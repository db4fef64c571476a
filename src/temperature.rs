//! Antenna board temperature conversion.
//!
//! The board returns a 10-bit ADC count of the temperature sensor output.
//! Counts are converted to millivolts against the 3.3 V reference and then
//! looked up in a calibration table covering -40 C to +70 C, one entry per
//! degree. Readings outside the table are reported as unknown rather than
//! clamped.

use static_assertions::const_assert;

pub const V_REF_MV: u32 = 3300;
pub const ADC_MAX_COUNT: u32 = 1023;

pub const MIN_CALIBRATED_C: i16 = -40;
pub const MAX_CALIBRATED_C: i16 = 70;

/// Telemetry value for a temperature that could not be determined.
pub const TEMPERATURE_UNKNOWN: u16 = 0xFFFF;

const KELVIN_OFFSET: i32 = 273;

const CALIBRATION_LEN: usize = (MAX_CALIBRATED_C - MIN_CALIBRATED_C + 1) as usize;

/// `(threshold_mv, celsius)`, thresholds strictly decreasing.
///
/// A sample at or above a threshold (and below the previous one) reads as
/// that entry's temperature.
pub const CALIBRATION: [(u16, i16); CALIBRATION_LEN] = [
    (2507, -40), (2496, -39), (2485, -38), (2474, -37), (2463, -36), (2452, -35),
    (2441, -34), (2430, -33), (2420, -32), (2409, -31), (2398, -30), (2387, -29),
    (2376, -28), (2365, -27), (2354, -26), (2343, -25), (2332, -24), (2321, -23),
    (2310, -22), (2300, -21), (2289, -20), (2278, -19), (2267, -18), (2256, -17),
    (2245, -16), (2234, -15), (2223, -14), (2212, -13), (2201, -12), (2190, -11),
    (2180, -10), (2169, -9), (2158, -8), (2147, -7), (2136, -6), (2125, -5),
    (2114, -4), (2103, -3), (2092, -2), (2081, -1), (2070, 0), (2059, 1),
    (2049, 2), (2038, 3), (2027, 4), (2016, 5), (2005, 6), (1994, 7),
    (1983, 8), (1972, 9), (1961, 10), (1950, 11), (1939, 12), (1929, 13),
    (1918, 14), (1907, 15), (1896, 16), (1885, 17), (1874, 18), (1863, 19),
    (1852, 20), (1841, 21), (1830, 22), (1819, 23), (1809, 24), (1798, 25),
    (1787, 26), (1776, 27), (1765, 28), (1754, 29), (1743, 30), (1732, 31),
    (1721, 32), (1710, 33), (1699, 34), (1688, 35), (1678, 36), (1667, 37),
    (1656, 38), (1645, 39), (1634, 40), (1623, 41), (1612, 42), (1601, 43),
    (1590, 44), (1579, 45), (1568, 46), (1558, 47), (1547, 48), (1536, 49),
    (1525, 50), (1514, 51), (1503, 52), (1492, 53), (1481, 54), (1470, 55),
    (1459, 56), (1448, 57), (1437, 58), (1427, 59), (1416, 60), (1405, 61),
    (1394, 62), (1383, 63), (1372, 64), (1361, 65), (1350, 66), (1339, 67),
    (1328, 68), (1317, 69), (1307, 70),
];

/// Linearised threshold of -41 C, the exclusive upper edge of the -40 C
/// bucket.
const UPPER_EDGE_MV: u16 = 2518;

const_assert!(CALIBRATION_LEN == 111);
const_assert!(UPPER_EDGE_MV > CALIBRATION[0].0);
const_assert!(CALIBRATION[0].1 == MIN_CALIBRATED_C);
const_assert!(CALIBRATION[CALIBRATION_LEN - 1].1 == MAX_CALIBRATED_C);

pub fn raw_to_millivolts(raw: u16) -> u32 {
    u32::from(raw) * V_REF_MV / ADC_MAX_COUNT
}

/// Converts a raw ADC count to degrees Celsius, `None` outside the
/// calibrated band.
pub fn raw_to_celsius(raw: u16) -> Option<i16> {
    let vout = raw_to_millivolts(raw);

    let (lowest_mv, _) = CALIBRATION[CALIBRATION_LEN - 1];
    if vout >= u32::from(UPPER_EDGE_MV) || vout < u32::from(lowest_mv) {
        return None;
    }

    CALIBRATION
        .iter()
        .find(|(threshold_mv, _)| vout >= u32::from(*threshold_mv))
        .map(|&(_, celsius)| celsius)
}

pub fn celsius_to_kelvin(celsius: Option<i16>) -> Option<u16> {
    celsius.and_then(|c| u16::try_from(i32::from(c) + KELVIN_OFFSET).ok())
}

/// Kelvin reading packed for telemetry, [`TEMPERATURE_UNKNOWN`] when the
/// raw sample is outside the calibrated band.
pub fn raw_to_telemetry_kelvin(raw: u16) -> u16 {
    celsius_to_kelvin(raw_to_celsius(raw)).unwrap_or(TEMPERATURE_UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_strictly_decreasing() {
        for pair in CALIBRATION.windows(2) {
            assert!(pair[0].0 > pair[1].0, "thresholds {:?} out of order", pair);
            assert_eq!(pair[0].1 + 1, pair[1].1);
        }
    }

    #[test]
    fn test_millivolt_conversion() {
        assert_eq!(raw_to_millivolts(0), 0);
        assert_eq!(raw_to_millivolts(1023), 3300);
        assert_eq!(raw_to_millivolts(560), 1806);
    }

    #[test]
    fn test_threshold_hits_exact_entry() {
        // 1806 mV sits between the 24 C (1809 mV) and 25 C (1798 mV) thresholds
        assert_eq!(raw_to_celsius(560), Some(25));
    }

    #[test]
    fn test_coldest_bucket_has_width() {
        // 2509 mV and 2516 mV both sit in [2507, 2518)
        assert_eq!(raw_to_celsius(778), Some(MIN_CALIBRATED_C));
        assert_eq!(raw_to_celsius(780), Some(MIN_CALIBRATED_C));
        assert_eq!(raw_to_celsius(781), None);
    }
}
