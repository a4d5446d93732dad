/// Rounds a current limit to 0.1 A, half away from zero.
///
/// Every limit written into a charging schedule goes through this function.
pub fn round_current(amps: f64) -> f64 {
    (amps * 10.0).round() / 10.0
}

pub(crate) fn watts_to_amps(watts: f64, voltage: f64) -> f64 {
    watts / voltage
}

pub(crate) fn kwh_to_amp_hours(kwh: f64, voltage: f64) -> f64 {
    kwh * 1000.0 / voltage
}
