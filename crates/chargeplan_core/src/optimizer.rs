//! Wire format of the optimizer's request and response.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{FuseTree, SmartChargingError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerRequest {
    pub event: OptimizerEvent,
    pub state: OptimizerState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerEvent {
    pub event_type: OptimizerEventType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OptimizerEventType {
    Reoptimize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerState {
    pub fuse_tree: FuseTree,
    pub cars: Vec<OptimizerCar>,
    pub car_assignments: Vec<CarAssignment>,
    /// Seconds since the site's local midnight
    pub current_time_seconds: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CarType {
    #[serde(rename = "BEV")]
    Bev,
}

/// Constraint model of one charging session. Currents are in A, capacities
/// in Ah.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerCar {
    pub id: u32,
    pub name: String,
    pub car_type: CarType,
    /// Seconds since the site's local midnight
    pub timestamp_arrival: u32,
    pub max_capacity: f64,
    pub start_capacity: f64,
    pub min_current: f64,
    pub min_current_per_phase: f64,
    pub max_current: f64,
    pub max_current_per_phase: f64,
    pub suspendable: bool,
    pub can_use_variable_power: bool,
    pub can_load_phase1: bool,
    pub can_load_phase2: bool,
    pub can_load_phase3: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CarAssignment {
    #[serde(rename = "carID")]
    pub car_id: u32,
    #[serde(rename = "chargingStationID")]
    pub charging_station_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerResponse {
    #[serde(default)]
    pub cars: Vec<OptimizerCarPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerCarPlan {
    pub name: String,
    /// Current per phase for each 15 minute slot since local midnight
    #[serde(default)]
    pub current_plan: Vec<f64>,
}

/// Correlates an optimizer car with the connector it charges on, encoded as
/// `stationID~connectorID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CarName {
    pub station_id: String,
    pub connector_id: u32,
}

impl CarName {
    pub fn new(station_id: impl Into<String>, connector_id: u32) -> Self {
        CarName {
            station_id: station_id.into(),
            connector_id,
        }
    }
}

impl fmt::Display for CarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.station_id, self.connector_id)
    }
}

impl FromStr for CarName {
    type Err = SmartChargingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let invalid = || SmartChargingError::InvalidCarName {
            name: name.to_string(),
        };
        let (station_id, connector_id) = name.rsplit_once('~').ok_or_else(invalid)?;
        if station_id.is_empty() {
            return Err(invalid());
        }
        let connector_id = connector_id.parse().map_err(|_| invalid())?;
        Ok(CarName::new(station_id, connector_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_name_round_trip() {
        let name: CarName = "CS~EU~01~2".parse().unwrap();
        assert_eq!(name.station_id, "CS~EU~01");
        assert_eq!(name.connector_id, 2);
        assert_eq!(name.to_string(), "CS~EU~01~2");
    }

    #[test]
    fn test_invalid_car_names() {
        for name in ["CS-01", "~1", "CS-01~", "CS-01~A", "CS-01~-1"] {
            assert!(
                matches!(
                    name.parse::<CarName>(),
                    Err(SmartChargingError::InvalidCarName { .. })
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_response_deserialization() {
        let json = r#"
        {
          "cars": [
            {"name": "CS-01~1", "currentPlan": [0, 16.5, 32]},
            {"name": "CS-01~2"}
          ]
        }
        "#;
        let response: OptimizerResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.cars.len(), 2);
        assert_eq!(response.cars[0].current_plan, vec![0.0, 16.5, 32.0]);
        assert!(response.cars[1].current_plan.is_empty());
    }

    #[test]
    fn test_car_assignment_wire_names() {
        let json = serde_json::to_value(CarAssignment {
            car_id: 2,
            charging_station_id: 2,
        })
        .unwrap();
        assert_eq!(json["carID"], 2);
        assert_eq!(json["chargingStationID"], 2);
    }
}
