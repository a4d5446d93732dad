use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A charging site: the grid connection shared by all of its stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    /// Maximum power of the grid connection in W
    pub max_power: Option<f64>,
    /// Phase-to-neutral voltage in V
    pub voltage: Option<f64>,
    pub number_of_phases: Option<u8>,
    /// Time zone defining the local midnight the optimizer plans from
    #[serde(default)]
    pub timezone: Option<Tz>,
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    #[serde(default)]
    pub excluded_from_smart_charging: bool,
    /// Rated power of the whole station in W
    pub maximum_power: f64,
    #[serde(default)]
    pub voltage: Option<f64>,
    #[serde(default)]
    pub charge_points: Vec<ChargePoint>,
    pub connectors: Vec<Connector>,
}

/// A power delivery unit. When present it is the source of truth for the
/// electrical characteristics of the connectors it serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePoint {
    pub id: u32,
    pub connector_ids: Vec<u32>,
    #[serde(default)]
    pub current_type: Option<CurrentType>,
    /// Amperage of each served connector, summed over its phases
    #[serde(default)]
    pub amperage: Option<f64>,
    #[serde(default)]
    pub number_of_connected_phases: Option<u8>,
    /// Rated power in W
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub share_power_to_all_connectors: bool,
    #[serde(default)]
    pub cannot_charge_in_parallel: bool,
    #[serde(default)]
    pub excluded_from_power_limitation: bool,
    /// AC/DC conversion efficiency in percent
    #[serde(default)]
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub connector_id: u32,
    pub status: ConnectorStatus,
    /// Only used when no charge point serves the connector
    #[serde(default)]
    pub amperage: Option<f64>,
    #[serde(default)]
    pub number_of_connected_phases: Option<u8>,
    #[serde(default)]
    pub current_type: Option<CurrentType>,
    #[serde(default)]
    pub current_transaction_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    #[serde(rename = "SuspendedEVSE")]
    SuspendedEvse,
    #[serde(rename = "SuspendedEV")]
    SuspendedEv,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
    Occupied,
}

impl ConnectorStatus {
    /// A session is running on the connector.
    pub fn is_charging(&self) -> bool {
        matches!(
            self,
            ConnectorStatus::Charging | ConnectorStatus::SuspendedEv | ConnectorStatus::SuspendedEvse
        )
    }

    /// The connector holds a share of the charge point's power.
    pub fn is_active(&self) -> bool {
        self.is_charging() || *self == ConnectorStatus::Occupied
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrentType {
    #[default]
    Ac,
    Dc,
}

/// A charging session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub station_id: String,
    pub connector_id: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub current_total_consumption_wh: f64,
    /// Instantaneous current summed over the phases in A
    #[serde(default)]
    pub current_instant_amps: f64,
    #[serde(default)]
    pub current_instant_watts: f64,
    /// Filled once meter values report per-phase readings
    #[serde(default)]
    pub phases_used: Option<PhasesUsed>,
    #[serde(default)]
    pub car_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhasesUsed {
    pub phase1: bool,
    pub phase2: bool,
    pub phase3: bool,
}

impl PhasesUsed {
    pub const ALL: PhasesUsed = PhasesUsed {
        phase1: true,
        phase2: true,
        phase3: true,
    };

    pub fn as_array(&self) -> [bool; 3] {
        [self.phase1, self.phase2, self.phase3]
    }

    pub fn count(&self) -> u8 {
        self.as_array().iter().filter(|used| **used).count() as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfile {
    pub id: String,
    #[serde(default)]
    pub converter: Option<Converter>,
    /// DC fast charge ceiling in kW
    #[serde(default)]
    pub fast_charge_power_max: Option<f64>,
    /// Usable battery capacity in kWh
    #[serde(default)]
    pub battery_capacity_full: Option<f64>,
}

/// On-board AC charger of a vehicle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Converter {
    pub amperage_per_phase: f64,
    pub number_of_phases: u8,
}
