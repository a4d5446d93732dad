use serde::{Deserialize, Serialize};

/// Efficiency assumed for a DC charge point that does not declare one, in percent.
pub const DEFAULT_DC_EFFICIENCY_PERCENT: f64 = 80.0;
/// Lowest current per phase a vehicle is guaranteed, in A.
pub const DEFAULT_MIN_CURRENT_PER_PHASE: f64 = 6.0;
/// Battery assumed when the vehicle is unknown, in kWh.
pub const NOMINAL_BATTERY_KWH: f64 = 100.0;
/// Schedule length used when a station does not report its own limit.
pub const DEFAULT_MAX_SCHEDULE_PERIODS: usize = 20;
/// A schedule is never cut on a zero slot before reaching this length.
pub const MIN_SCHEDULE_PERIODS: usize = 3;
/// Station configuration key holding the maximum number of schedule periods.
pub const MAX_SCHEDULE_PERIODS_KEY: &str = "ChargingScheduleMaxPeriods";
pub const SMART_CHARGING_STACK_LEVEL: i32 = 2;
pub const SMART_CHARGING_PROFILE_ID: i32 = 100;

/// Knobs shaping the car models sent to the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitationSettings {
    /// Enables the sticky limitation heuristic
    pub sticky_limitation: bool,
    /// Headroom granted over the measured draw of an AC vehicle, in percent
    pub limit_buffer_ac: f64,
    /// Headroom granted over the measured draw of a DC vehicle, in percent
    pub limit_buffer_dc: f64,
    pub min_current_per_phase: f64,
    pub dc_efficiency_percent: f64,
}

impl Default for LimitationSettings {
    fn default() -> Self {
        LimitationSettings {
            sticky_limitation: false,
            limit_buffer_ac: 0.0,
            limit_buffer_dc: 0.0,
            min_current_per_phase: DEFAULT_MIN_CURRENT_PER_PHASE,
            dc_efficiency_percent: DEFAULT_DC_EFFICIENCY_PERCENT,
        }
    }
}
